//! Saga coordinator for order fulfillment.

use std::time::Instant;

use domain::{Aggregate, DomainEvent, Order, OrderError, OrderStatus};
use event_store::{AppendOptions, EventEnvelope, EventStore, EventStoreError, Version};
use tokio::sync::{mpsc, watch};

use crate::activities::ActivityRegistry;
use crate::aggregate::{SagaInstance, StepOutcome};
use crate::error::SagaError;
use crate::events::SagaEvent;
use crate::order_fulfillment::{self, SagaInstanceId, steps};
use crate::retry::{RetryPolicy, StepFailure, execute_with_retry};

/// Channels connecting a running saga to its callers.
#[derive(Debug)]
pub struct SagaChannels {
    /// Cancellation reasons, in arrival order.
    pub cancellations: mpsc::UnboundedReceiver<String>,
    /// Latest order snapshot. Updated after every journaled transition.
    pub status: watch::Sender<Order>,
}

/// How a saga ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SagaOutcome {
    Completed,
    Cancelled { reason: String },
}

/// Drives order fulfillment sagas and journals their progress.
///
/// Step results are journaled before the saga acts on them. Running a saga
/// whose journal already holds a step result reuses that result instead of
/// invoking the activity again.
pub struct OrderFulfillmentSaga<S: EventStore> {
    store: S,
    activities: ActivityRegistry,
    retry_policy: RetryPolicy,
}

impl<S: EventStore> OrderFulfillmentSaga<S> {
    pub fn new(store: S, activities: ActivityRegistry, retry_policy: RetryPolicy) -> Self {
        Self {
            store,
            activities,
            retry_policy,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn activities(&self) -> &ActivityRegistry {
        &self.activities
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Binds a new saga instance to `order` and journals `SagaStarted`.
    ///
    /// Fails with [`SagaError::AlreadyStarted`] if the order already has a
    /// saga, including one started by another runtime on the same journal.
    #[tracing::instrument(skip(self, order), fields(order_id = %order.order_id()))]
    pub async fn begin(&self, order: Order) -> Result<SagaInstance, SagaError> {
        let order_id = order.order_id();
        if order.status() != OrderStatus::Created {
            return Err(OrderError::InvalidTransition {
                from: order.status(),
                to: OrderStatus::Checking,
            }
            .into());
        }

        let saga_id = SagaInstanceId::for_order(order_id);
        let started = SagaEvent::saga_started(saga_id, order_fulfillment::SAGA_TYPE, order);
        let envelope = Self::envelope(saga_id.stream_id(), Version::first(), &started)?;

        let version = match self.store.append(vec![envelope], AppendOptions::expect_new()).await {
            Ok(version) => version,
            Err(EventStoreError::ConcurrencyConflict { .. }) => {
                return Err(SagaError::AlreadyStarted(order_id));
            }
            Err(e) => return Err(e.into()),
        };

        let mut instance = SagaInstance::default();
        instance.apply(started);
        instance.set_version(version);

        metrics::counter!("saga_executions_total").increment(1);
        tracing::info!(saga_id = %saga_id, "Saga started");
        Ok(instance)
    }

    /// Runs `instance` from wherever its journal left off to a terminal state.
    ///
    /// Returns the outcome for sagas that end `Completed`. Inventory and
    /// payment failures come back as errors after the failure is journaled.
    #[tracing::instrument(skip_all, fields(saga_id = ?instance.saga_id()))]
    pub async fn run(
        &self,
        mut instance: SagaInstance,
        mut channels: SagaChannels,
    ) -> Result<SagaOutcome, SagaError> {
        if !instance.state().can_run() {
            return Err(not_running(&instance));
        }
        let order = instance
            .order()
            .cloned()
            .ok_or_else(|| not_running(&instance))?;
        let order_id = order.order_id();
        let started = Instant::now();

        Self::publish(&instance, &channels.status);

        // Step 1: check inventory
        self.advance(&mut instance, &channels.status, OrderStatus::Checking)
            .await?;
        let inventory = match replayed(&instance, steps::CHECK_INVENTORY) {
            Some(outcome) => outcome,
            None => {
                tracing::info!(step = steps::CHECK_INVENTORY, "Saga step started");
                let activity = self.activities.inventory();
                let items = order.items();
                let result = execute_with_retry(&self.retry_policy, steps::CHECK_INVENTORY, move |_| {
                    activity.check_inventory(items)
                })
                .await;
                self.settle(&mut instance, steps::CHECK_INVENTORY, result)
                    .await?
            }
        };
        match inventory {
            StepOutcome::Completed(true) => {}
            StepOutcome::Completed(false) => {
                let error = SagaError::InsufficientInventory(order_id);
                return self.fail(&mut instance, &channels.status, error, started).await;
            }
            StepOutcome::Failed { attempts, error } => {
                let error = SagaError::InventoryCheckFailed {
                    order_id,
                    attempts,
                    reason: error,
                };
                return self.fail(&mut instance, &channels.status, error, started).await;
            }
        }

        // Step 2: process payment, unless a cancellation arrives first
        self.advance(&mut instance, &channels.status, OrderStatus::Processing)
            .await?;
        let payment = match replayed(&instance, steps::PROCESS_PAYMENT) {
            Some(outcome) => outcome,
            None => {
                tracing::info!(step = steps::PROCESS_PAYMENT, "Saga step started");
                let activity = self.activities.payment();
                let customer_id = order.customer_id();
                let amount = order.total_amount();
                let charge = execute_with_retry(&self.retry_policy, steps::PROCESS_PAYMENT, move |_| {
                    activity.process_payment(customer_id, amount)
                });
                tokio::pin!(charge);

                tokio::select! {
                    result = &mut charge => {
                        self.settle(&mut instance, steps::PROCESS_PAYMENT, result).await?
                    }
                    Some(reason) = channels.cancellations.recv() => {
                        // The in-flight charge is dropped; a charge that already
                        // went through is not refunded.
                        return self.cancel(&mut instance, &channels.status, reason, started).await;
                    }
                }
            }
        };
        match payment {
            StepOutcome::Completed(true) => {}
            StepOutcome::Completed(false) => {
                let error = SagaError::PaymentDeclined(order_id);
                return self.fail(&mut instance, &channels.status, error, started).await;
            }
            StepOutcome::Failed { attempts, error } => {
                let error = SagaError::PaymentFailed {
                    order_id,
                    attempts,
                    reason: error,
                };
                return self.fail(&mut instance, &channels.status, error, started).await;
            }
        }

        // Step 3: notify the customer; failure does not fail the order
        self.advance(&mut instance, &channels.status, OrderStatus::Notifying)
            .await?;
        let notification = match replayed(&instance, steps::NOTIFY_CUSTOMER) {
            Some(outcome) => outcome,
            None => {
                tracing::info!(step = steps::NOTIFY_CUSTOMER, "Saga step started");
                let activity = self.activities.notification();
                let customer_id = order.customer_id();
                let message = order_fulfillment::success_message(order_id);
                let message = message.as_str();
                let result = execute_with_retry(&self.retry_policy, steps::NOTIFY_CUSTOMER, move |_| {
                    activity.notify_customer(customer_id, message)
                })
                .await
                .map(|((), attempts)| (true, attempts));
                self.settle(&mut instance, steps::NOTIFY_CUSTOMER, result)
                    .await?
            }
        };
        if let StepOutcome::Failed { error, .. } = &notification {
            tracing::warn!(error = %error, "Customer notification failed, completing order anyway");
        }

        self.complete(&mut instance, &channels.status, started).await
    }

    /// Loads a saga instance by folding its journal.
    pub async fn get_saga(&self, saga_id: SagaInstanceId) -> Result<Option<SagaInstance>, SagaError> {
        let events = self.store.get_events_for_aggregate(saga_id.stream_id()).await?;
        let Some(last_version) = events.last().map(|e| e.version) else {
            return Ok(None);
        };

        let mut instance = SagaInstance::default();
        for envelope in &events {
            instance.apply(envelope.decode::<SagaEvent>()?);
        }
        instance.set_version(last_version);
        Ok(Some(instance))
    }

    /// Journals the result of a step that just ran.
    async fn settle(
        &self,
        instance: &mut SagaInstance,
        step: &'static str,
        result: Result<(bool, u32), StepFailure>,
    ) -> Result<StepOutcome, SagaError> {
        let (event, outcome) = match result {
            Ok((answer, attempts)) => (
                SagaEvent::step_completed(step, answer, attempts),
                StepOutcome::Completed(answer),
            ),
            Err(failure) => {
                let error = failure.last_error.to_string();
                (
                    SagaEvent::step_failed(step, failure.attempts, error.clone()),
                    StepOutcome::Failed {
                        attempts: failure.attempts,
                        error,
                    },
                )
            }
        };
        self.record(instance, vec![event]).await?;
        tracing::info!(step, outcome = ?outcome, "Saga step finished");
        Ok(outcome)
    }

    /// Moves the order to `next` unless the journal already has it there.
    async fn advance(
        &self,
        instance: &mut SagaInstance,
        status: &watch::Sender<Order>,
        next: OrderStatus,
    ) -> Result<(), SagaError> {
        if instance.order().is_some_and(|order| order.has_reached(next)) {
            return Ok(());
        }
        let transition = transition(instance, next)?;
        self.record(instance, vec![transition]).await?;
        Self::publish(instance, status);
        tracing::info!(status = %next, "Order status changed");
        Ok(())
    }

    async fn complete(
        &self,
        instance: &mut SagaInstance,
        status: &watch::Sender<Order>,
        started: Instant,
    ) -> Result<SagaOutcome, SagaError> {
        let transition = transition(instance, OrderStatus::Completed)?;
        self.record(instance, vec![transition, SagaEvent::saga_completed()])
            .await?;
        Self::publish(instance, status);

        metrics::counter!("saga_completed_total").increment(1);
        metrics::histogram!("saga_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!("Saga completed");
        Ok(SagaOutcome::Completed)
    }

    async fn cancel(
        &self,
        instance: &mut SagaInstance,
        status: &watch::Sender<Order>,
        reason: String,
        started: Instant,
    ) -> Result<SagaOutcome, SagaError> {
        tracing::info!(reason = %reason, "Order cancellation requested");
        let transition = transition(instance, OrderStatus::Cancelled)?;
        self.record(
            instance,
            vec![
                SagaEvent::cancellation_received(reason.clone()),
                transition,
                SagaEvent::saga_completed(),
            ],
        )
        .await?;
        Self::publish(instance, status);

        metrics::counter!("saga_cancelled_total").increment(1);
        metrics::histogram!("saga_duration_seconds").record(started.elapsed().as_secs_f64());
        Ok(SagaOutcome::Cancelled { reason })
    }

    async fn fail(
        &self,
        instance: &mut SagaInstance,
        status: &watch::Sender<Order>,
        error: SagaError,
        started: Instant,
    ) -> Result<SagaOutcome, SagaError> {
        let transition = transition(instance, OrderStatus::Failed)?;
        self.record(instance, vec![transition, SagaEvent::saga_failed(error.to_string())])
            .await?;
        Self::publish(instance, status);

        metrics::counter!("saga_failed_total").increment(1);
        metrics::histogram!("saga_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::warn!(error = %error, "Saga failed");
        Err(error)
    }

    /// Appends `events` as one batch, then folds them into `instance`.
    async fn record(&self, instance: &mut SagaInstance, events: Vec<SagaEvent>) -> Result<(), SagaError> {
        let stream_id = instance.id().ok_or_else(|| not_running(instance))?;
        let expected = instance.version();

        let mut version = expected;
        let mut envelopes = Vec::with_capacity(events.len());
        for event in &events {
            version = version.next();
            envelopes.push(Self::envelope(stream_id, version, event)?);
        }

        let new_version = self
            .store
            .append(envelopes, AppendOptions::expect_version(expected))
            .await?;

        instance.apply_events(events);
        instance.set_version(new_version);
        Ok(())
    }

    fn envelope(
        stream_id: common::AggregateId,
        version: Version,
        event: &SagaEvent,
    ) -> Result<EventEnvelope, SagaError> {
        Ok(EventEnvelope::builder()
            .event_type(event.event_type())
            .aggregate_id(stream_id)
            .aggregate_type(SagaInstance::aggregate_type())
            .version(version)
            .payload(event)?
            .build()?)
    }

    fn publish(instance: &SagaInstance, status: &watch::Sender<Order>) {
        if let Some(order) = instance.order() {
            status.send_replace(order.clone());
        }
    }
}

fn replayed(instance: &SagaInstance, step: &str) -> Option<StepOutcome> {
    let outcome = instance.step_outcome(step).cloned()?;
    tracing::info!(step, outcome = ?outcome, "Reusing journaled step result");
    Some(outcome)
}

/// Builds the status change event, rejecting edges outside the lifecycle.
fn transition(instance: &SagaInstance, next: OrderStatus) -> Result<SagaEvent, SagaError> {
    let current = instance
        .order_status()
        .ok_or_else(|| not_running(instance))?;
    if !current.can_transition_to(next) {
        return Err(OrderError::InvalidTransition {
            from: current,
            to: next,
        }
        .into());
    }
    Ok(SagaEvent::status_changed(current, next))
}

fn not_running(instance: &SagaInstance) -> SagaError {
    SagaError::InvalidState {
        expected: "Running".to_string(),
        actual: instance.state(),
    }
}
