//! The generation-service contract consumed by the conversation core.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use parley_core::types::Role;

use crate::error::GenError;

/// One sanitized history turn handed to the generation service.
///
/// Carries text only: image references are attached to the new input,
/// never replayed with prior history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PromptTurn {
    pub role: Role,
    pub text: String,
}

/// The newly submitted input seeding one generation cycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PromptInput {
    pub text: String,
    /// Opaque image-asset reference, attached only to this input.
    pub image: Option<String>,
}

/// A lazy, finite, non-restartable stream of answer text chunks.
///
/// Terminates by running out of items (end signal) or by yielding an
/// `Err` item (error signal). An empty chunk is a valid no-op item.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, GenError>> + Send>>;

/// A service that turns history plus new input into a chunk stream.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Open one token stream seeded with `history` and `input`.
    async fn stream(
        &self,
        history: Vec<PromptTurn>,
        input: PromptInput,
    ) -> Result<ChunkStream, GenError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_turn_serde() {
        let turn = PromptTurn {
            role: Role::User,
            text: "hello".to_string(),
        };
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains("\"user\""));
        let back: PromptTurn = serde_json::from_str(&json).unwrap();
        assert_eq!(back, turn);
    }

    #[test]
    fn test_prompt_input_without_image() {
        let input = PromptInput {
            text: "describe".to_string(),
            image: None,
        };
        let json = serde_json::to_string(&input).unwrap();
        let back: PromptInput = serde_json::from_str(&json).unwrap();
        assert_eq!(back, input);
    }
}
