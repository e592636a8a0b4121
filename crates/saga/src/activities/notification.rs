//! Customer notification activity.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use domain::CustomerId;

use super::chance::FailureInjector;
use crate::error::ActivityError;

/// Delivers a message to a customer.
#[async_trait]
pub trait NotificationActivity: Send + Sync {
    async fn notify_customer(&self, customer_id: &CustomerId, message: &str) -> Result<(), ActivityError>;
}

/// Notification channel that sleeps, then fails delivery with a configured
/// probability. Delivery failures are retryable.
#[derive(Debug)]
pub struct SimulatedNotification {
    delay: Duration,
    delivery_failure: FailureInjector,
    invocations: AtomicU32,
}

impl SimulatedNotification {
    pub fn new(delay: Duration, delivery_failure: FailureInjector) -> Self {
        Self {
            delay,
            delivery_failure,
            invocations: AtomicU32::new(0),
        }
    }

    pub fn invocations(&self) -> u32 {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationActivity for SimulatedNotification {
    async fn notify_customer(&self, customer_id: &CustomerId, message: &str) -> Result<(), ActivityError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        tracing::info!(customer_id = %customer_id, message, "Notifying customer");

        tokio::time::sleep(self.delay).await;

        if self.delivery_failure.should_fail() {
            return Err(ActivityError::transient("notification delivery failed"));
        }

        Ok(())
    }
}
