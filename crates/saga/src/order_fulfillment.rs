//! Names and identifiers of the order fulfillment saga.

use std::fmt;
use std::str::FromStr;

use common::{AggregateId, OrderId};
use serde::{Deserialize, Serialize};

use crate::error::SagaError;

/// Saga type recorded in `SagaStarted`.
pub const SAGA_TYPE: &str = "OrderFulfillment";

/// Prefix of every saga instance id.
pub const SAGA_ID_PREFIX: &str = "order-saga-";

/// Name of the status query exposed by a running saga.
pub const STATUS_QUERY: &str = "GetOrderStatus";

/// Name of the signal that requests cancellation.
pub const CANCEL_SIGNAL: &str = "CancelOrder";

/// Cancellation reason used when the caller gives none.
pub const DEFAULT_CANCEL_REASON: &str = "User requested cancellation";

/// Step names as journaled.
pub mod steps {
    pub const CHECK_INVENTORY: &str = "check_inventory";
    pub const PROCESS_PAYMENT: &str = "process_payment";
    pub const NOTIFY_CUSTOMER: &str = "notify_customer";
}

/// Message sent to the customer when the saga gets past payment.
pub fn success_message(order_id: OrderId) -> String {
    format!("Your order {order_id} processed successfully")
}

/// Identifier of the saga instance bound to one order.
///
/// Renders as `order-saga-<order id>`, so the id is derivable from the order
/// alone and at most one instance can exist per order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SagaInstanceId(OrderId);

impl SagaInstanceId {
    pub fn for_order(order_id: OrderId) -> Self {
        Self(order_id)
    }

    pub fn order_id(&self) -> OrderId {
        self.0
    }

    /// Journal stream holding this instance's events.
    pub fn stream_id(&self) -> AggregateId {
        AggregateId::derived(SAGA_TYPE, self.0.as_uuid())
    }
}

impl fmt::Display for SagaInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SAGA_ID_PREFIX}{}", self.0)
    }
}

impl FromStr for SagaInstanceId {
    type Err = SagaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix(SAGA_ID_PREFIX)
            .and_then(|rest| rest.parse::<OrderId>().ok())
            .map(Self)
            .ok_or_else(|| SagaError::InvalidSagaId(s.to_string()))
    }
}

impl From<SagaInstanceId> for String {
    fn from(id: SagaInstanceId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for SagaInstanceId {
    type Error = SagaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_prefix() {
        let order_id = OrderId::new();
        let saga_id = SagaInstanceId::for_order(order_id);
        assert_eq!(saga_id.to_string(), format!("order-saga-{order_id}"));
    }

    #[test]
    fn test_parse_roundtrip() {
        let saga_id = SagaInstanceId::for_order(OrderId::new());
        let parsed: SagaInstanceId = saga_id.to_string().parse().unwrap();
        assert_eq!(parsed, saga_id);
    }

    #[test]
    fn test_parse_rejects_foreign_ids() {
        assert!("purchase-123".parse::<SagaInstanceId>().is_err());
        assert!("order-saga-not-a-uuid".parse::<SagaInstanceId>().is_err());
        assert!("".parse::<SagaInstanceId>().is_err());
    }

    #[test]
    fn test_stream_id_is_stable_per_order() {
        let order_id = OrderId::new();
        let a = SagaInstanceId::for_order(order_id).stream_id();
        let b = SagaInstanceId::for_order(order_id).stream_id();
        assert_eq!(a, b);
        assert_ne!(a, SagaInstanceId::for_order(OrderId::new()).stream_id());
    }

    #[test]
    fn test_serializes_as_string() {
        let saga_id = SagaInstanceId::for_order(OrderId::new());
        let json = serde_json::to_value(saga_id).unwrap();
        assert_eq!(json, serde_json::Value::String(saga_id.to_string()));
    }

    #[test]
    fn test_success_message() {
        let order_id = OrderId::new();
        assert_eq!(
            success_message(order_id),
            format!("Your order {order_id} processed successfully")
        );
    }
}
