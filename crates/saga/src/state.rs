//! Saga execution state.

use serde::{Deserialize, Serialize};

/// Execution state of a saga, as recorded in its journal.
///
/// This is distinct from the order status: a cancelled order belongs to a
/// saga that `Completed`, because cancellation is not an error.
///
/// ```text
/// NotStarted ──► Running ──┬──► Completed
///                          └──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SagaState {
    /// No `SagaStarted` event has been journaled.
    #[default]
    NotStarted,

    /// Steps are being executed.
    Running,

    /// Saga ended without error (terminal state).
    Completed,

    /// Saga ended with an inventory or payment error (terminal state).
    Failed,
}

impl SagaState {
    /// Returns true if the saga can execute steps.
    pub fn can_run(&self) -> bool {
        matches!(self, SagaState::Running)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SagaState::Completed | SagaState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SagaState::NotStarted => "NotStarted",
            SagaState::Running => "Running",
            SagaState::Completed => "Completed",
            SagaState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for SagaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_not_started() {
        assert_eq!(SagaState::default(), SagaState::NotStarted);
    }

    #[test]
    fn test_only_running_can_run() {
        assert!(!SagaState::NotStarted.can_run());
        assert!(SagaState::Running.can_run());
        assert!(!SagaState::Completed.can_run());
        assert!(!SagaState::Failed.can_run());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!SagaState::NotStarted.is_terminal());
        assert!(!SagaState::Running.is_terminal());
        assert!(SagaState::Completed.is_terminal());
        assert!(SagaState::Failed.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(SagaState::Running.to_string(), "Running");
        assert_eq!(SagaState::Failed.to_string(), "Failed");
    }
}
