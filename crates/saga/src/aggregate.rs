//! Saga instance aggregate.

use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{Aggregate, Order, OrderStatus};
use event_store::Version;

use crate::events::SagaEvent;
use crate::order_fulfillment::SagaInstanceId;
use crate::state::SagaState;

/// Journaled result of one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The activity answered; the flag is its boolean result.
    Completed(bool),
    /// The activity exhausted its retries or failed permanently.
    Failed { attempts: u32, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StepRecord {
    step_name: String,
    outcome: StepOutcome,
}

/// An event-sourced saga instance.
///
/// Folding the journal yields the order as last journaled, the result of
/// every finished step and the reason the saga ended, if it has.
#[derive(Debug, Clone, Default)]
pub struct SagaInstance {
    id: Option<AggregateId>,
    version: Version,
    saga_id: Option<SagaInstanceId>,
    saga_type: String,
    order: Option<Order>,
    state: SagaState,
    steps: Vec<StepRecord>,
    cancellation_reason: Option<String>,
    failure_reason: Option<String>,
    started_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
}

impl Aggregate for SagaInstance {
    type Event = SagaEvent;

    fn aggregate_type() -> &'static str {
        "OrderFulfillmentSaga"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            SagaEvent::SagaStarted(data) => {
                self.id = Some(data.saga_id.stream_id());
                self.saga_id = Some(data.saga_id);
                self.saga_type = data.saga_type;
                self.order = Some(data.order);
                self.started_at = Some(data.started_at);
                self.state = SagaState::Running;
            }
            SagaEvent::OrderStatusChanged(data) => {
                if let Some(order) = self.order.as_mut() {
                    if let Err(e) = order.transition_at(data.to, data.changed_at) {
                        tracing::warn!(error = %e, "Ignoring journaled status change");
                    }
                }
            }
            SagaEvent::StepCompleted(data) => {
                self.steps.push(StepRecord {
                    step_name: data.step_name,
                    outcome: StepOutcome::Completed(data.outcome),
                });
            }
            SagaEvent::StepFailed(data) => {
                self.steps.push(StepRecord {
                    step_name: data.step_name,
                    outcome: StepOutcome::Failed {
                        attempts: data.attempts,
                        error: data.error,
                    },
                });
            }
            SagaEvent::CancellationReceived(data) => {
                self.cancellation_reason = Some(data.reason);
            }
            SagaEvent::SagaCompleted(data) => {
                self.state = SagaState::Completed;
                self.closed_at = Some(data.completed_at);
            }
            SagaEvent::SagaFailed(data) => {
                self.state = SagaState::Failed;
                self.failure_reason = Some(data.reason);
                self.closed_at = Some(data.failed_at);
            }
        }
    }
}

impl SagaInstance {
    pub fn saga_id(&self) -> Option<SagaInstanceId> {
        self.saga_id
    }

    pub fn saga_type(&self) -> &str {
        &self.saga_type
    }

    /// The order as of the last journaled status change.
    pub fn order(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    pub fn order_status(&self) -> Option<OrderStatus> {
        self.order.as_ref().map(Order::status)
    }

    pub fn state(&self) -> SagaState {
        self.state
    }

    /// Journaled outcome of `step_name`, if the step has finished.
    pub fn step_outcome(&self, step_name: &str) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|record| record.step_name == step_name)
            .map(|record| &record.outcome)
    }

    /// Names of finished steps in the order they finished.
    pub fn finished_steps(&self) -> Vec<&str> {
        self.steps.iter().map(|record| record.step_name.as_str()).collect()
    }

    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// When the saga reached a terminal state.
    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }
}
