//! Saga runtime: starts sagas in background tasks and serves status
//! queries and cancellation signals while they run.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{Order, OrderStatus};
use event_store::EventStore;
use tokio::sync::{RwLock, mpsc, watch};

use crate::activities::ActivityRegistry;
use crate::aggregate::SagaInstance;
use crate::coordinator::{OrderFulfillmentSaga, SagaChannels, SagaOutcome};
use crate::error::SagaError;
use crate::order_fulfillment::SagaInstanceId;
use crate::retry::RetryPolicy;
use crate::state::SagaState;

/// Execution metadata of one saga instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SagaExecutionInfo {
    pub saga_id: SagaInstanceId,
    pub order_id: OrderId,
    pub state: SagaState,
    pub order_status: Option<OrderStatus>,
    pub started_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

impl SagaExecutionInfo {
    fn from_instance(saga_id: SagaInstanceId, instance: &SagaInstance) -> Self {
        Self {
            saga_id,
            order_id: saga_id.order_id(),
            state: instance.state(),
            order_status: instance.order_status(),
            started_at: instance.started_at(),
            closed_at: instance.closed_at(),
            failure_reason: instance.failure_reason().map(str::to_string),
        }
    }
}

struct SagaHandle {
    cancellations: mpsc::UnboundedSender<String>,
    status: watch::Receiver<Order>,
}

impl SagaHandle {
    /// The saga task drops the cancellation receiver when it ends.
    fn is_running(&self) -> bool {
        !self.cancellations.is_closed()
    }
}

/// Hosts saga instances for the lifetime of the process.
///
/// Clones share the same set of instances.
pub struct SagaRuntime<S: EventStore + 'static> {
    saga: Arc<OrderFulfillmentSaga<S>>,
    instances: Arc<RwLock<HashMap<OrderId, SagaHandle>>>,
}

impl<S: EventStore + 'static> Clone for SagaRuntime<S> {
    fn clone(&self) -> Self {
        Self {
            saga: Arc::clone(&self.saga),
            instances: Arc::clone(&self.instances),
        }
    }
}

impl<S: EventStore + 'static> SagaRuntime<S> {
    pub fn new(store: S, activities: ActivityRegistry, retry_policy: RetryPolicy) -> Self {
        Self {
            saga: Arc::new(OrderFulfillmentSaga::new(store, activities, retry_policy)),
            instances: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn saga(&self) -> &OrderFulfillmentSaga<S> {
        &self.saga
    }

    /// Starts a saga for `order` and returns once `SagaStarted` is journaled.
    ///
    /// The steps run in a background task.
    #[tracing::instrument(skip(self, order), fields(order_id = %order.order_id()))]
    pub async fn start(&self, order: Order) -> Result<SagaInstanceId, SagaError> {
        let order_id = order.order_id();
        if self.is_hosted(order_id).await {
            return Err(SagaError::AlreadyStarted(order_id));
        }

        // Concurrent starts of the same order are settled by the journal,
        // which accepts only one `SagaStarted` per stream.
        let instance = self.saga.begin(order).await?;
        self.launch(instance).await
    }

    /// Resumes a saga from its journal after a restart or an aborted run.
    ///
    /// Steps whose results are journaled are not invoked again. A saga that
    /// already finished is left alone and served from the journal.
    #[tracing::instrument(skip(self))]
    pub async fn recover(&self, order_id: OrderId) -> Result<SagaInstanceId, SagaError> {
        let saga_id = SagaInstanceId::for_order(order_id);
        if self.is_hosted(order_id).await {
            return Err(SagaError::AlreadyStarted(order_id));
        }

        let instance = self
            .saga
            .get_saga(saga_id)
            .await?
            .ok_or_else(|| SagaError::SagaNotFound(saga_id.to_string()))?;

        if instance.state().is_terminal() {
            tracing::info!(saga_id = %saga_id, state = %instance.state(), "Saga already finished");
            return Ok(saga_id);
        }

        tracing::info!(saga_id = %saga_id, status = ?instance.order_status(), "Resuming saga");
        self.launch(instance).await
    }

    /// Returns true while a task of this runtime is running the order's saga.
    async fn is_hosted(&self, order_id: OrderId) -> bool {
        self.instances
            .read()
            .await
            .get(&order_id)
            .is_some_and(SagaHandle::is_running)
    }

    async fn launch(&self, instance: SagaInstance) -> Result<SagaInstanceId, SagaError> {
        let (Some(saga_id), Some(order)) = (instance.saga_id(), instance.order().cloned()) else {
            return Err(SagaError::InvalidState {
                expected: "Running".to_string(),
                actual: instance.state(),
            });
        };
        let order_id = saga_id.order_id();

        let (cancel_tx, cancel_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(order);
        {
            let mut instances = self.instances.write().await;
            if instances.get(&order_id).is_some_and(SagaHandle::is_running) {
                return Err(SagaError::AlreadyStarted(order_id));
            }
            instances.insert(
                order_id,
                SagaHandle {
                    cancellations: cancel_tx.clone(),
                    status: status_rx,
                },
            );
        }

        let saga = Arc::clone(&self.saga);
        let instances = Arc::clone(&self.instances);
        let channels = SagaChannels {
            cancellations: cancel_rx,
            status: status_tx,
        };
        tokio::spawn(async move {
            match saga.run(instance, channels).await {
                Ok(SagaOutcome::Completed) => {
                    tracing::info!(saga_id = %saga_id, "Saga finished");
                }
                Ok(SagaOutcome::Cancelled { reason }) => {
                    tracing::info!(saga_id = %saga_id, reason = %reason, "Saga finished with cancellation");
                }
                Err(e) if e.is_step_failure() => {
                    tracing::info!(saga_id = %saga_id, error = %e, "Saga finished with failure");
                }
                Err(e) => {
                    tracing::error!(saga_id = %saga_id, error = %e, "Saga aborted, recover it to resume");
                }
            }

            // Later reads go to the journal. A handle installed by a newer
            // run of the same order stays.
            let mut instances = instances.write().await;
            if instances
                .get(&order_id)
                .is_some_and(|handle| handle.cancellations.same_channel(&cancel_tx))
            {
                instances.remove(&order_id);
            }
        });

        Ok(saga_id)
    }

    /// Current order snapshot, or `None` if no saga exists for the order.
    pub async fn query_status(&self, order_id: OrderId) -> Result<Option<Order>, SagaError> {
        if let Some(handle) = self.instances.read().await.get(&order_id) {
            return Ok(Some(handle.status.borrow().clone()));
        }

        let instance = self.saga.get_saga(SagaInstanceId::for_order(order_id)).await?;
        Ok(instance.and_then(|instance| instance.order().cloned()))
    }

    /// Subscribes to status changes of a saga hosted by this runtime.
    pub async fn watch_status(&self, order_id: OrderId) -> Option<watch::Receiver<Order>> {
        self.instances
            .read()
            .await
            .get(&order_id)
            .map(|handle| handle.status.clone())
    }

    /// Delivers a cancellation request to the saga of `order_id`.
    ///
    /// Succeeds for any existing saga. Only a request that arrives before
    /// payment resolves changes the outcome.
    #[tracing::instrument(skip(self, reason))]
    pub async fn signal_cancel(&self, order_id: OrderId, reason: impl Into<String>) -> Result<(), SagaError> {
        let reason = reason.into();
        if let Some(handle) = self.instances.read().await.get(&order_id) {
            if handle.cancellations.send(reason).is_err() {
                tracing::debug!("Saga already finished, cancellation ignored");
            }
            return Ok(());
        }

        let saga_id = SagaInstanceId::for_order(order_id);
        match self.saga.get_saga(saga_id).await? {
            Some(_) => {
                tracing::debug!("Saga not hosted here, cancellation ignored");
                Ok(())
            }
            None => Err(SagaError::SagaNotFound(saga_id.to_string())),
        }
    }

    /// Execution metadata, read from the journal.
    pub async fn describe(&self, saga_id: SagaInstanceId) -> Result<Option<SagaExecutionInfo>, SagaError> {
        let instance = self.saga.get_saga(saga_id).await?;
        Ok(instance.map(|instance| SagaExecutionInfo::from_instance(saga_id, &instance)))
    }

    /// Waits until the order reaches a terminal status and returns it.
    pub async fn wait_for_terminal(&self, order_id: OrderId) -> Result<Order, SagaError> {
        let Some(mut status) = self.watch_status(order_id).await else {
            let saga_id = SagaInstanceId::for_order(order_id);
            return match self.query_status(order_id).await? {
                Some(order) if order.is_terminal() => Ok(order),
                Some(_) => Err(SagaError::Interrupted(saga_id.to_string())),
                None => Err(SagaError::SagaNotFound(saga_id.to_string())),
            };
        };

        let order = status
            .wait_for(Order::is_terminal)
            .await
            .map_err(|_| SagaError::Interrupted(SagaInstanceId::for_order(order_id).to_string()))?
            .clone();
        Ok(order)
    }
}
