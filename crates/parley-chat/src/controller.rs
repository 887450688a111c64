//! Chat session controller.
//!
//! Validates and routes every conversation operation to the repository,
//! enforcing ownership on each call. Missing and not-owned chats are
//! reported identically as `ChatNotFound`, so a caller can never probe
//! whether another user's chat exists.

use std::sync::Arc;

use parley_core::types::{derive_title, Chat, ChatId, ChatIndexEntry, Turn};
use parley_storage::repository::ChatRepository;

use crate::error::ChatError;

/// Coordinates chat lifecycle operations against the repository.
pub struct ChatController {
    repo: Arc<ChatRepository>,
}

impl ChatController {
    pub fn new(repo: Arc<ChatRepository>) -> Self {
        Self { repo }
    }

    /// Create a chat for `user_id` seeded with one user turn.
    ///
    /// Derives the index title from the initial text and returns the
    /// store-generated id. Rejects empty or whitespace-only text before
    /// touching the store.
    pub fn create_chat(&self, user_id: &str, initial_text: &str) -> Result<ChatId, ChatError> {
        if initial_text.trim().is_empty() {
            return Err(ChatError::EmptyText);
        }

        let seed = Turn::user(initial_text, None);
        let title = derive_title(initial_text);
        let id = self.repo.create_chat(user_id, &seed, &title)?;
        tracing::info!(chat_id = %id, user_id = %user_id, "Created chat");
        Ok(id)
    }

    /// Append one exchange to an existing chat owned by `user_id`.
    ///
    /// Accepts one turn (a model answer alone) or two (a user turn
    /// followed by a model answer). History is append-only; existing
    /// turns are never rewritten.
    pub fn append_turns(
        &self,
        chat_id: ChatId,
        user_id: &str,
        turns: Vec<Turn>,
    ) -> Result<(), ChatError> {
        if turns.is_empty() || turns.len() > 2 {
            return Err(ChatError::TurnCount(turns.len()));
        }

        if self.repo.append_turns(chat_id, user_id, &turns)? {
            tracing::debug!(chat_id = %chat_id, count = turns.len(), "Appended turns");
            Ok(())
        } else {
            Err(ChatError::ChatNotFound(chat_id))
        }
    }

    /// Fetch one chat with its full history, oldest turn first.
    pub fn get_chat(&self, chat_id: ChatId, user_id: &str) -> Result<Chat, ChatError> {
        self.repo
            .find_chat(chat_id, user_id)?
            .ok_or(ChatError::ChatNotFound(chat_id))
    }

    /// List the user's chat index in insertion order.
    ///
    /// Returns an empty list for a user with no chats yet.
    pub fn list_chats(&self, user_id: &str) -> Result<Vec<ChatIndexEntry>, ChatError> {
        Ok(self.repo.list_index(user_id)?)
    }
}

// =============================================================================
// Tests
// =============================================================================
