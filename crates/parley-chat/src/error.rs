//! Error types for the conversation core.

use parley_core::error::ParleyError;
use parley_core::types::ChatId;
use parley_gen::error::GenError;
use thiserror::Error;

use crate::state::CycleState;

/// Errors from the conversation core.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The chat does not exist or belongs to a different user.
    /// The two cases are deliberately indistinguishable.
    #[error("Chat not found: {0}")]
    ChatNotFound(ChatId),

    #[error("Text must not be empty")]
    EmptyText,

    #[error("Expected one or two turns per append, got {0}")]
    TurnCount(usize),

    /// A generation cycle is already in flight for this view.
    #[error("Cycle already in flight (state: {0})")]
    CycleBusy(CycleState),

    #[error("Invalid cycle transition: {from} -> {to}")]
    InvalidTransition {
        from: CycleState,
        to: CycleState,
    },

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<ParleyError> for ChatError {
    fn from(err: ParleyError) -> Self {
        match err {
            ParleyError::Generation(msg) => ChatError::Generation(msg),
            other => ChatError::Storage(other.to_string()),
        }
    }
}

impl From<GenError> for ChatError {
    fn from(err: GenError) -> Self {
        ChatError::Generation(err.to_string())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_not_found_display_includes_id() {
        let id = Uuid::new_v4();
        let err = ChatError::ChatNotFound(id);
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn test_from_parley_error_storage() {
        let err: ChatError = ParleyError::Storage("disk full".to_string()).into();
        assert!(matches!(err, ChatError::Storage(_)));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_from_parley_error_generation() {
        let err: ChatError = ParleyError::Generation("upstream 503".to_string()).into();
        assert!(matches!(err, ChatError::Generation(_)));
    }

    #[test]
    fn test_from_gen_error() {
        let err: ChatError = GenError::Sse("dropped".to_string()).into();
        assert!(matches!(err, ChatError::Generation(_)));
        assert!(err.to_string().contains("dropped"));
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = ChatError::InvalidTransition {
            from: CycleState::Idle,
            to: CycleState::Committing,
        };
        assert!(err.to_string().contains("Idle"));
        assert!(err.to_string().contains("Committing"));
    }
}
