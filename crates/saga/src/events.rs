//! Saga journal events.

use chrono::{DateTime, Utc};
use domain::{DomainEvent, Order, OrderStatus};
use serde::{Deserialize, Serialize};

use crate::order_fulfillment::SagaInstanceId;

/// Facts journaled while a saga executes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SagaEvent {
    /// Saga bound to an order. Carries the order as accepted.
    SagaStarted(SagaStartedData),

    /// The order moved to a new status.
    OrderStatusChanged(StatusChangedData),

    /// An activity returned a result.
    StepCompleted(StepCompletedData),

    /// An activity exhausted its retries or failed permanently.
    StepFailed(StepFailedData),

    /// A cancellation signal won the race against payment.
    CancellationReceived(CancellationData),

    /// Saga ended without error. Cancelled orders end here too.
    SagaCompleted(SagaCompletedData),

    /// Saga ended with an inventory or payment error.
    SagaFailed(SagaFailedData),
}

impl DomainEvent for SagaEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SagaEvent::SagaStarted(_) => "SagaStarted",
            SagaEvent::OrderStatusChanged(_) => "OrderStatusChanged",
            SagaEvent::StepCompleted(_) => "StepCompleted",
            SagaEvent::StepFailed(_) => "StepFailed",
            SagaEvent::CancellationReceived(_) => "CancellationReceived",
            SagaEvent::SagaCompleted(_) => "SagaCompleted",
            SagaEvent::SagaFailed(_) => "SagaFailed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaStartedData {
    pub saga_id: SagaInstanceId,
    pub saga_type: String,
    pub order: Order,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangedData {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub changed_at: DateTime<Utc>,
}

/// Data for StepCompleted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepCompletedData {
    pub step_name: String,
    /// Boolean answer of the activity. Always true for notification.
    pub outcome: bool,
    pub attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepFailedData {
    pub step_name: String,
    pub attempts: u32,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationData {
    pub reason: String,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaCompletedData {
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaFailedData {
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

impl SagaEvent {
    pub fn saga_started(saga_id: SagaInstanceId, saga_type: impl Into<String>, order: Order) -> Self {
        SagaEvent::SagaStarted(SagaStartedData {
            saga_id,
            saga_type: saga_type.into(),
            order,
            started_at: Utc::now(),
        })
    }

    pub fn status_changed(from: OrderStatus, to: OrderStatus) -> Self {
        SagaEvent::OrderStatusChanged(StatusChangedData {
            from,
            to,
            changed_at: Utc::now(),
        })
    }

    pub fn step_completed(step_name: impl Into<String>, outcome: bool, attempts: u32) -> Self {
        SagaEvent::StepCompleted(StepCompletedData {
            step_name: step_name.into(),
            outcome,
            attempts,
        })
    }

    pub fn step_failed(step_name: impl Into<String>, attempts: u32, error: impl Into<String>) -> Self {
        SagaEvent::StepFailed(StepFailedData {
            step_name: step_name.into(),
            attempts,
            error: error.into(),
        })
    }

    pub fn cancellation_received(reason: impl Into<String>) -> Self {
        SagaEvent::CancellationReceived(CancellationData {
            reason: reason.into(),
            received_at: Utc::now(),
        })
    }

    pub fn saga_completed() -> Self {
        SagaEvent::SagaCompleted(SagaCompletedData {
            completed_at: Utc::now(),
        })
    }

    pub fn saga_failed(reason: impl Into<String>) -> Self {
        SagaEvent::SagaFailed(SagaFailedData {
            reason: reason.into(),
            failed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderId;
    use domain::{Money, OrderItem};

    #[test]
    fn test_event_types() {
        assert_eq!(
            SagaEvent::status_changed(OrderStatus::Created, OrderStatus::Checking).event_type(),
            "OrderStatusChanged"
        );
        assert_eq!(SagaEvent::step_completed("check_inventory", true, 1).event_type(), "StepCompleted");
        assert_eq!(SagaEvent::cancellation_received("changed my mind").event_type(), "CancellationReceived");
        assert_eq!(SagaEvent::saga_failed("declined").event_type(), "SagaFailed");
    }

    #[test]
    fn test_serialization_is_tagged() {
        let event = SagaEvent::step_failed("process_payment", 3, "timed out");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "StepFailed");
        assert_eq!(json["data"]["step_name"], "process_payment");
        assert_eq!(json["data"]["attempts"], 3);
    }

    #[test]
    fn test_saga_started_carries_order() {
        let order = Order::new("cust-1", vec![OrderItem::new("P1", "Widget", Money::from_dollars(10), 2)]).unwrap();
        let saga_id = SagaInstanceId::for_order(order.order_id());
        let event = SagaEvent::saga_started(saga_id, "OrderFulfillment", order.clone());

        let json = serde_json::to_string(&event).unwrap();
        let restored: SagaEvent = serde_json::from_str(&json).unwrap();
        match restored {
            SagaEvent::SagaStarted(data) => {
                assert_eq!(data.saga_id, saga_id);
                assert_eq!(data.order, order);
                assert_ne!(data.order.order_id(), OrderId::new());
            }
            other => panic!("expected SagaStarted, got {other:?}"),
        }
    }
}
