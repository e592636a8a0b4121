//! Named activity registry.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::{
    ActivitySettings, FailureInjector, InventoryActivity, NotificationActivity, PaymentActivity,
    SimulatedInventory, SimulatedNotification, SimulatedPayment,
};
use crate::error::SagaError;

/// The activities a saga can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    CheckInventory,
    ProcessPayment,
    NotifyCustomer,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 3] = [
        ActivityKind::CheckInventory,
        ActivityKind::ProcessPayment,
        ActivityKind::NotifyCustomer,
    ];

    /// Name the activity is registered under.
    pub fn name(&self) -> &'static str {
        match self {
            ActivityKind::CheckInventory => "CheckInventoryActivity",
            ActivityKind::ProcessPayment => "ProcessPaymentActivity",
            ActivityKind::NotifyCustomer => "NotifyCustomerActivity",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActivityKind {
    type Err = SagaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| SagaError::UnknownActivity(s.to_string()))
    }
}

/// Implementations of every activity, looked up by kind.
///
/// A registry can only be built with all three activities present, so a
/// saga never starts with a step it cannot run.
#[derive(Clone)]
pub struct ActivityRegistry {
    inventory: Arc<dyn InventoryActivity>,
    payment: Arc<dyn PaymentActivity>,
    notification: Arc<dyn NotificationActivity>,
}

impl fmt::Debug for ActivityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityRegistry")
            .field("activities", &self.names())
            .finish()
    }
}

impl ActivityRegistry {
    pub fn builder() -> ActivityRegistryBuilder {
        ActivityRegistryBuilder::default()
    }

    /// Registry of simulated activities drawing from the thread RNG.
    pub fn simulated(settings: &ActivitySettings) -> Self {
        Self {
            inventory: Arc::new(SimulatedInventory::new(
                settings.processing_delay,
                FailureInjector::random(settings.inventory_shortage_probability),
            )),
            payment: Arc::new(SimulatedPayment::new(
                settings.processing_delay,
                FailureInjector::random(settings.payment_decline_probability),
            )),
            notification: Arc::new(SimulatedNotification::new(
                settings.processing_delay,
                FailureInjector::random(settings.notification_failure_probability),
            )),
        }
    }

    pub fn inventory(&self) -> &Arc<dyn InventoryActivity> {
        &self.inventory
    }

    pub fn payment(&self) -> &Arc<dyn PaymentActivity> {
        &self.payment
    }

    pub fn notification(&self) -> &Arc<dyn NotificationActivity> {
        &self.notification
    }

    /// Registered activity names.
    pub fn names(&self) -> Vec<&'static str> {
        ActivityKind::ALL.iter().map(ActivityKind::name).collect()
    }
}

/// Builder for [`ActivityRegistry`].
#[derive(Default)]
pub struct ActivityRegistryBuilder {
    inventory: Option<Arc<dyn InventoryActivity>>,
    payment: Option<Arc<dyn PaymentActivity>>,
    notification: Option<Arc<dyn NotificationActivity>>,
}

impl ActivityRegistryBuilder {
    pub fn inventory(mut self, activity: Arc<dyn InventoryActivity>) -> Self {
        self.inventory = Some(activity);
        self
    }

    pub fn payment(mut self, activity: Arc<dyn PaymentActivity>) -> Self {
        self.payment = Some(activity);
        self
    }

    pub fn notification(mut self, activity: Arc<dyn NotificationActivity>) -> Self {
        self.notification = Some(activity);
        self
    }

    /// Fails with the name of the first missing activity.
    pub fn build(self) -> Result<ActivityRegistry, SagaError> {
        Ok(ActivityRegistry {
            inventory: self
                .inventory
                .ok_or(SagaError::ActivityNotRegistered(ActivityKind::CheckInventory.name()))?,
            payment: self
                .payment
                .ok_or(SagaError::ActivityNotRegistered(ActivityKind::ProcessPayment.name()))?,
            notification: self
                .notification
                .ok_or(SagaError::ActivityNotRegistered(ActivityKind::NotifyCustomer.name()))?,
        })
    }
}
