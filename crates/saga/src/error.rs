//! Saga error types.

use std::time::Duration;

use common::OrderId;
use domain::OrderError;
use event_store::EventStoreError;
use thiserror::Error;

use crate::state::SagaState;

/// Failure of a single activity attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActivityError {
    /// The attempt exceeded its start-to-close timeout.
    #[error("activity timed out after {0:?}")]
    Timeout(Duration),

    /// Infrastructure failure that may succeed on another attempt.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Failure that no further attempt can fix.
    #[error("non-retryable failure: {0}")]
    NonRetryable(String),
}

impl ActivityError {
    pub fn transient(reason: impl Into<String>) -> Self {
        ActivityError::Transient(reason.into())
    }

    /// Returns true if the retry policy may schedule another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ActivityError::Timeout(_) | ActivityError::Transient(_))
    }
}

/// Errors that can occur during saga operations.
#[derive(Debug, Error)]
pub enum SagaError {
    /// Inventory check exhausted its retries or failed permanently.
    #[error("inventory check failed for order {order_id} after {attempts} attempt(s): {reason}")]
    InventoryCheckFailed {
        order_id: OrderId,
        attempts: u32,
        reason: String,
    },

    /// Inventory check answered that stock is insufficient.
    #[error("insufficient inventory for order {0}")]
    InsufficientInventory(OrderId),

    /// Payment exhausted its retries or failed permanently.
    #[error("payment failed for order {order_id} after {attempts} attempt(s): {reason}")]
    PaymentFailed {
        order_id: OrderId,
        attempts: u32,
        reason: String,
    },

    /// Payment provider declined the charge.
    #[error("payment declined for order {0}")]
    PaymentDeclined(OrderId),

    /// The saga is in an invalid state for the requested operation.
    #[error("Invalid saga state: expected {expected}, actual {actual}")]
    InvalidState { expected: String, actual: SagaState },

    #[error("Activity not registered: {0}")]
    ActivityNotRegistered(&'static str),

    #[error("Unknown activity: {0}")]
    UnknownActivity(String),

    /// A saga is already bound to this order.
    #[error("Saga already started for order {0}")]
    AlreadyStarted(OrderId),

    #[error("Saga not found: {0}")]
    SagaNotFound(String),

    #[error("Invalid saga instance id: {0}")]
    InvalidSagaId(String),

    /// The saga task stopped without reaching a terminal status.
    #[error("Saga {0} stopped before reaching a terminal state")]
    Interrupted(String),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SagaError {
    /// Returns true for failures that end the saga with status `Failed`.
    pub fn is_step_failure(&self) -> bool {
        matches!(
            self,
            SagaError::InventoryCheckFailed { .. }
                | SagaError::InsufficientInventory(_)
                | SagaError::PaymentFailed { .. }
                | SagaError::PaymentDeclined(_)
        )
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ActivityError::Timeout(Duration::from_secs(60)).is_retryable());
        assert!(ActivityError::transient("connection reset").is_retryable());
        assert!(!ActivityError::NonRetryable("card stolen".into()).is_retryable());
    }

    #[test]
    fn test_step_failure_classification() {
        let order_id = OrderId::new();
        assert!(SagaError::InsufficientInventory(order_id).is_step_failure());
        assert!(SagaError::PaymentDeclined(order_id).is_step_failure());
        assert!(
            SagaError::PaymentFailed {
                order_id,
                attempts: 3,
                reason: "timeout".into()
            }
            .is_step_failure()
        );
        assert!(!SagaError::AlreadyStarted(order_id).is_step_failure());
        assert!(!SagaError::SagaNotFound("x".into()).is_step_failure());
    }

    #[test]
    fn test_messages_name_the_order() {
        let order_id = OrderId::new();
        let message = SagaError::PaymentDeclined(order_id).to_string();
        assert!(message.contains("declined"));
        assert!(message.contains(&order_id.to_string()));
    }
}
