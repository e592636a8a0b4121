//! Activities invoked by the saga and their simulated implementations.

mod chance;
mod inventory;
mod notification;
mod payment;
mod registry;

use std::time::Duration;

pub use chance::{ChanceSource, FailureInjector, FixedChance, ScriptedChance, ThreadRngChance};
pub use inventory::{InventoryActivity, SimulatedInventory};
pub use notification::{NotificationActivity, SimulatedNotification};
pub use payment::{PaymentActivity, SimulatedPayment};
pub use registry::{ActivityKind, ActivityRegistry, ActivityRegistryBuilder};

/// Behaviour of the simulated activities.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivitySettings {
    /// Time each activity spends before answering.
    pub processing_delay: Duration,
    /// Chance, per item, that stock is insufficient.
    pub inventory_shortage_probability: f32,
    pub payment_decline_probability: f32,
    /// Chance that a notification attempt fails (retryable).
    pub notification_failure_probability: f32,
}

impl Default for ActivitySettings {
    fn default() -> Self {
        Self {
            processing_delay: Duration::from_secs(3),
            inventory_shortage_probability: 0.1,
            payment_decline_probability: 0.5,
            notification_failure_probability: 0.0,
        }
    }
}
