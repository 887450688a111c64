//! Core data model for persisted conversations.
//!
//! A `Chat` is an append-only ordered history of role-tagged `Turn`s owned
//! by a single user. `ChatIndexEntry` rows form the per-user navigation
//! index, derived once at chat creation and never recomputed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for a chat, generated by the store at creation.
pub type ChatId = Uuid;

/// Maximum number of characters taken from the initial user text when
/// deriving an index title.
pub const TITLE_MAX_CHARS: usize = 40;

/// Who produced a turn. Closed set: sanitization for the generation
/// service is a total mapping over this enum, not a runtime shape check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The human side of the conversation.
    User,
    /// The generation service's answer.
    Model,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Model => write!(f, "model"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "model" => Ok(Role::Model),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// One message within a chat's history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    /// Opaque reference into the image-asset service, if an image was
    /// attached to this turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// Build a user turn with an optional image reference.
    pub fn user(text: impl Into<String>, image: Option<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            image,
            created_at: Utc::now(),
        }
    }

    /// Build a model turn. Model turns never carry images.
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
            image: None,
            created_at: Utc::now(),
        }
    }
}

/// A persisted conversation: immutable owner, append-only history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    /// Ordered, insertion-order-significant, never truncated or reordered.
    pub history: Vec<Turn>,
}

/// One row of a user's chat navigation index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatIndexEntry {
    pub chat_id: ChatId,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Derive an index title from the initial user text: the first
/// [`TITLE_MAX_CHARS`] characters, computed once at creation.
pub fn derive_title(initial_text: &str) -> String {
    initial_text.chars().take(TITLE_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display_round_trip() {
        for role in [Role::User, Role::Model] {
            let parsed: Role = role.to_string().parse().unwrap();
            assert_eq!(parsed, role);
        }
    }

    #[test]
    fn test_role_from_str_rejects_unknown() {
        assert!("assistant".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serde_snake_case() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Role::Model).unwrap(), "\"model\"");
    }

    #[test]
    fn test_turn_constructors() {
        let t = Turn::user("hello", Some("uploads/cat.png".to_string()));
        assert_eq!(t.role, Role::User);
        assert_eq!(t.text, "hello");
        assert_eq!(t.image.as_deref(), Some("uploads/cat.png"));

        let t = Turn::model("answer");
        assert_eq!(t.role, Role::Model);
        assert!(t.image.is_none());
    }

    #[test]
    fn test_turn_serde_omits_missing_image() {
        let t = Turn::model("answer");
        let json = serde_json::to_string(&t).unwrap();
        assert!(!json.contains("image"));
    }

    #[test]
    fn test_derive_title_truncates_to_forty_chars() {
        let title = derive_title(&"a".repeat(100));
        assert_eq!(title, "a".repeat(40));
    }

    #[test]
    fn test_derive_title_short_text_unchanged() {
        assert_eq!(derive_title("Explain photosynthesis"), "Explain photosynthesis");
    }

    #[test]
    fn test_derive_title_counts_chars_not_bytes() {
        let text = "é".repeat(50);
        let title = derive_title(&text);
        assert_eq!(title.chars().count(), 40);
    }

    #[test]
    fn test_derive_title_empty() {
        assert_eq!(derive_title(""), "");
    }
}
