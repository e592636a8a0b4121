//! Payment activity.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use domain::{CustomerId, Money};

use super::chance::FailureInjector;
use crate::error::ActivityError;

/// Charges a customer for an order total.
#[async_trait]
pub trait PaymentActivity: Send + Sync {
    /// Returns `Ok(false)` when the charge is declined.
    async fn process_payment(&self, customer_id: &CustomerId, amount: Money) -> Result<bool, ActivityError>;
}

/// Payment provider that sleeps, then declines with a configured probability.
#[derive(Debug)]
pub struct SimulatedPayment {
    delay: Duration,
    decline: FailureInjector,
    transient_faults: FailureInjector,
    invocations: AtomicU32,
}

impl SimulatedPayment {
    pub fn new(delay: Duration, decline: FailureInjector) -> Self {
        Self {
            delay,
            decline,
            transient_faults: FailureInjector::never(),
            invocations: AtomicU32::new(0),
        }
    }

    pub fn with_transient_faults(mut self, faults: FailureInjector) -> Self {
        self.transient_faults = faults;
        self
    }

    pub fn invocations(&self) -> u32 {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentActivity for SimulatedPayment {
    async fn process_payment(&self, customer_id: &CustomerId, amount: Money) -> Result<bool, ActivityError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        tracing::info!(customer_id = %customer_id, amount = %amount, "Processing payment");

        tokio::time::sleep(self.delay).await;

        if self.transient_faults.should_fail() {
            return Err(ActivityError::transient("payment provider unavailable"));
        }

        if self.decline.should_fail() {
            tracing::info!(customer_id = %customer_id, amount = %amount, "Payment declined");
            return Ok(false);
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_payment_accepted() {
        let payment = SimulatedPayment::new(Duration::from_secs(3), FailureInjector::never());
        let accepted = payment
            .process_payment(&CustomerId::new("cust-1"), Money::from_dollars(25))
            .await
            .unwrap();
        assert!(accepted);
        assert_eq!(payment.invocations(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_payment_declined() {
        let payment = SimulatedPayment::new(Duration::ZERO, FailureInjector::always());
        let accepted = payment
            .process_payment(&CustomerId::new("cust-1"), Money::from_dollars(25))
            .await
            .unwrap();
        assert!(!accepted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_fault_wins_over_decision() {
        let payment = SimulatedPayment::new(Duration::ZERO, FailureInjector::never())
            .with_transient_faults(FailureInjector::always());
        let result = payment
            .process_payment(&CustomerId::new("cust-1"), Money::from_dollars(25))
            .await;
        assert!(matches!(result, Err(ActivityError::Transient(_))));
    }
}
