//! History reconciliation for chat views.
//!
//! A view never patches its cached history with streamed text. After a
//! cycle commits it invalidates the cache and refetches the full chat,
//! so the view always converges on what the store actually persisted.
//! The chat view also absorbs the create-then-open race with a single
//! delayed retry, and arms the one-shot auto-run for freshly created
//! chats.

use std::sync::Arc;
use std::time::Duration;

use parley_core::types::{Chat, ChatId, ChatIndexEntry, Role};

use crate::controller::ChatController;
use crate::error::ChatError;

const RETRY_DELAY: Duration = Duration::from_millis(200);

/// Reconciled view of one chat's history.
pub struct ChatView {
    controller: Arc<ChatController>,
    chat_id: ChatId,
    user_id: String,
    cached: Option<Chat>,
    auto_run_armed: bool,
    retry_delay: Duration,
}

impl ChatView {
    pub fn new(controller: Arc<ChatController>, chat_id: ChatId, user_id: impl Into<String>) -> Self {
        Self {
            controller,
            chat_id,
            user_id: user_id.into(),
            cached: None,
            auto_run_armed: true,
            retry_delay: RETRY_DELAY,
        }
    }

    /// Override the create-race retry delay (tests use a short one).
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Load the chat, retrying once after a short delay on `ChatNotFound`.
    ///
    /// A view opened immediately after creation can race the store; one
    /// delayed retry absorbs that window. Any second miss propagates.
    pub async fn load(&mut self) -> Result<&Chat, ChatError> {
        let chat = match self.controller.get_chat(self.chat_id, &self.user_id) {
            Ok(chat) => chat,
            Err(ChatError::ChatNotFound(_)) => {
                tracing::debug!(chat_id = %self.chat_id, "Chat not visible yet, retrying once");
                tokio::time::sleep(self.retry_delay).await;
                self.controller.get_chat(self.chat_id, &self.user_id)?
            }
            Err(e) => return Err(e),
        };
        Ok(self.cached.insert(chat))
    }

    /// The cached chat, if any load has succeeded.
    pub fn chat(&self) -> Option<&Chat> {
        self.cached.as_ref()
    }

    /// Take the auto-run trigger, at most once per view.
    ///
    /// Returns the seeding text when the loaded history holds exactly
    /// one non-empty user turn, meaning the chat was just created and
    /// its first answer has not been generated yet. Later calls return
    /// `None` regardless of history shape.
    pub fn take_auto_run(&mut self) -> Option<String> {
        if !self.auto_run_armed {
            return None;
        }
        self.auto_run_armed = false;

        let chat = self.cached.as_ref()?;
        match chat.history.as_slice() {
            [only] if only.role == Role::User && !only.text.is_empty() => Some(only.text.clone()),
            _ => None,
        }
    }

    /// Invalidate the cache and refetch after an acknowledged append.
    pub async fn refresh(&mut self) -> Result<&Chat, ChatError> {
        self.cached = None;
        let chat = self.controller.get_chat(self.chat_id, &self.user_id)?;
        Ok(self.cached.insert(chat))
    }
}

/// Reconciled view of a user's chat index.
pub struct ChatListView {
    controller: Arc<ChatController>,
    user_id: String,
    cached: Option<Vec<ChatIndexEntry>>,
}

impl ChatListView {
    pub fn new(controller: Arc<ChatController>, user_id: impl Into<String>) -> Self {
        Self {
            controller,
            user_id: user_id.into(),
            cached: None,
        }
    }

    /// The index entries, fetching on first use or after invalidation.
    pub fn entries(&mut self) -> Result<&[ChatIndexEntry], ChatError> {
        if self.cached.is_none() {
            self.cached = Some(self.controller.list_chats(&self.user_id)?);
        }
        Ok(self.cached.as_deref().unwrap_or_default())
    }

    /// Drop the cache; the next `entries` call refetches.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

// =============================================================================
// Tests
// =============================================================================
