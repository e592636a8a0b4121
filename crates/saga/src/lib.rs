//! Order fulfillment saga.
//!
//! The saga drives one order through three steps:
//! 1. Check inventory
//! 2. Process payment, raced against a cancellation signal
//! 3. Notify the customer (best effort)
//!
//! Each step runs under a retry policy with per-attempt timeouts. Every
//! status transition and step result is journaled before the saga moves on,
//! so an interrupted saga can be resumed without repeating finished steps.

pub mod activities;
pub mod aggregate;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod order_fulfillment;
pub mod retry;
pub mod runtime;
pub mod state;

pub use activities::{
    ActivityKind, ActivityRegistry, ActivityRegistryBuilder, ActivitySettings, ChanceSource,
    FailureInjector, FixedChance, InventoryActivity, NotificationActivity, PaymentActivity,
    ScriptedChance, SimulatedInventory, SimulatedNotification, SimulatedPayment, ThreadRngChance,
};
pub use aggregate::{SagaInstance, StepOutcome};
pub use coordinator::{OrderFulfillmentSaga, SagaChannels, SagaOutcome};
pub use error::{ActivityError, SagaError};
pub use events::SagaEvent;
pub use order_fulfillment::SagaInstanceId;
pub use retry::{RetryPolicy, StepFailure, execute_with_retry};
pub use runtime::{SagaExecutionInfo, SagaRuntime};
pub use state::SagaState;
