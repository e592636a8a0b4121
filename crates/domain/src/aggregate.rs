//! Replay traits for journal-backed state.

use common::AggregateId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// A fact recorded in the journal. Named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Event type name stored alongside the payload.
    fn event_type(&self) -> &'static str;
}

/// State that is rebuilt by folding its journaled events.
///
/// `apply` must be deterministic and infallible: replaying the same events
/// onto a default instance always yields the same state.
pub trait Aggregate: Default + Send + Sync + Sized {
    type Event: DomainEvent;

    /// Stream kind written into each envelope.
    fn aggregate_type() -> &'static str;

    /// Stream identifier, `None` until the first event is applied.
    fn id(&self) -> Option<AggregateId>;

    fn version(&self) -> Version;

    fn set_version(&mut self, version: Version);

    fn apply(&mut self, event: Self::Event);

    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum CounterEvent {
        Opened { id: AggregateId },
        Incremented,
    }

    impl DomainEvent for CounterEvent {
        fn event_type(&self) -> &'static str {
            match self {
                CounterEvent::Opened { .. } => "Opened",
                CounterEvent::Incremented => "Incremented",
            }
        }
    }

    #[derive(Debug, Default)]
    struct Counter {
        id: Option<AggregateId>,
        version: Version,
        count: u32,
    }

    impl Aggregate for Counter {
        type Event = CounterEvent;

        fn aggregate_type() -> &'static str {
            "Counter"
        }

        fn id(&self) -> Option<AggregateId> {
            self.id
        }

        fn version(&self) -> Version {
            self.version
        }

        fn set_version(&mut self, version: Version) {
            self.version = version;
        }

        fn apply(&mut self, event: Self::Event) {
            match event {
                CounterEvent::Opened { id } => self.id = Some(id),
                CounterEvent::Incremented => self.count += 1,
            }
        }
    }

    #[test]
    fn replay_is_deterministic() {
        let id = AggregateId::new();
        let events = vec![
            CounterEvent::Opened { id },
            CounterEvent::Incremented,
            CounterEvent::Incremented,
        ];

        let mut first = Counter::default();
        first.apply_events(events.clone());
        let mut second = Counter::default();
        second.apply_events(events);

        assert_eq!(first.id(), Some(id));
        assert_eq!(first.count, 2);
        assert_eq!(first.count, second.count);
        assert_eq!(Counter::aggregate_type(), "Counter");
        assert_eq!(CounterEvent::Incremented.event_type(), "Incremented");
    }
}
