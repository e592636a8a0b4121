//! Append-only journal backing durable saga progress.
//!
//! Every saga owns one stream. Events are appended with optimistic
//! concurrency so that two executors can never interleave writes on the
//! same saga, and are read back in version order to rebuild state.

pub mod error;
pub mod event;
pub mod memory;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use memory::InMemoryEventStore;
pub use store::{AppendOptions, EventStore, EventStoreExt};
