//! Order status state machine.

use serde::{Deserialize, Serialize};

/// Fulfillment status of an order.
///
/// State transitions:
/// ```text
/// Created ──► Checking ──► Processing ──► Notifying ──► Completed
///                │             │
///                │             ├──► Cancelled
///                └─────────────┴──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order accepted, saga not yet running a step.
    #[default]
    Created,

    /// Inventory is being checked.
    Checking,

    /// Payment is in flight; the only status in which cancellation is observed.
    Processing,

    /// Customer notification is being sent.
    Notifying,

    /// Terminal: fulfilled.
    Completed,

    /// Terminal: inventory or payment failed.
    Failed,

    /// Terminal: cancelled while payment was in flight.
    Cancelled,
}

impl OrderStatus {
    /// Returns true if the DAG has an edge from `self` to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Created, Checking)
                | (Checking, Processing)
                | (Checking, Failed)
                | (Processing, Notifying)
                | (Processing, Failed)
                | (Processing, Cancelled)
                | (Notifying, Completed)
        )
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Failed | OrderStatus::Cancelled
        )
    }

    /// Position along the main path. Terminal branches rank after every
    /// in-flight status.
    pub fn rank(&self) -> u8 {
        match self {
            OrderStatus::Created => 0,
            OrderStatus::Checking => 1,
            OrderStatus::Processing => 2,
            OrderStatus::Notifying => 3,
            OrderStatus::Completed | OrderStatus::Failed | OrderStatus::Cancelled => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "Created",
            OrderStatus::Checking => "Checking",
            OrderStatus::Processing => "Processing",
            OrderStatus::Notifying => "Notifying",
            OrderStatus::Completed => "Completed",
            OrderStatus::Failed => "Failed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
