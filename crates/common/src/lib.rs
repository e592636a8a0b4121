//! Identifier types shared by the journal, the order domain and the saga.

pub mod types;

pub use types::{AggregateId, OrderId};
