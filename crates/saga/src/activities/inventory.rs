//! Inventory check activity.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use domain::OrderItem;

use super::chance::FailureInjector;
use crate::error::ActivityError;

/// Decides whether every item of an order can be fulfilled.
#[async_trait]
pub trait InventoryActivity: Send + Sync {
    /// Returns `Ok(false)` when stock is insufficient.
    async fn check_inventory(&self, items: &[OrderItem]) -> Result<bool, ActivityError>;
}

/// Inventory service that sleeps, then reports a shortage per item with a
/// configured probability.
#[derive(Debug)]
pub struct SimulatedInventory {
    delay: Duration,
    shortage: FailureInjector,
    transient_faults: FailureInjector,
    invocations: AtomicU32,
}

impl SimulatedInventory {
    pub fn new(delay: Duration, shortage: FailureInjector) -> Self {
        Self {
            delay,
            shortage,
            transient_faults: FailureInjector::never(),
            invocations: AtomicU32::new(0),
        }
    }

    /// Makes attempts fail with a retryable error before any item is checked.
    pub fn with_transient_faults(mut self, faults: FailureInjector) -> Self {
        self.transient_faults = faults;
        self
    }

    /// Number of attempts made against this service.
    pub fn invocations(&self) -> u32 {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InventoryActivity for SimulatedInventory {
    async fn check_inventory(&self, items: &[OrderItem]) -> Result<bool, ActivityError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        tracing::info!(item_count = items.len(), "Checking inventory");

        tokio::time::sleep(self.delay).await;

        if self.transient_faults.should_fail() {
            return Err(ActivityError::transient("inventory service unavailable"));
        }

        for item in items {
            if self.shortage.should_fail() {
                tracing::info!(
                    product_id = %item.product_id,
                    quantity = item.quantity,
                    "Insufficient inventory"
                );
                return Ok(false);
            }
        }

        Ok(true)
    }
}
