//! Domain layer for order fulfillment.
//!
//! This crate provides:
//! - the `Order` entity with its frozen items and total
//! - the `OrderStatus` state machine driven by the fulfillment saga
//! - `Aggregate`/`DomainEvent` traits used to rebuild state from a journal

pub mod aggregate;
pub mod order;

pub use aggregate::{Aggregate, DomainEvent};
pub use common::OrderId;
pub use order::{CustomerId, Money, Order, OrderError, OrderItem, OrderStatus, ProductId};
