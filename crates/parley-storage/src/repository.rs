//! Repository for chat documents and per-user chat indexes.
//!
//! Operates on the Database struct using raw SQL. The store's contract
//! toward the conversation core: per-call atomic appends, conditional
//! reads (exists + owner match), and a transactional create covering the
//! chat row, seeding turn, and index entry. No guarantee is made about
//! the relative order of two concurrent append calls on the same chat.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use parley_core::error::ParleyError;
use parley_core::types::{Chat, ChatId, ChatIndexEntry, Role, Turn};

use crate::db::Database;

/// Repository for chats and their navigation index.
pub struct ChatRepository {
    db: Arc<Database>,
}

impl ChatRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a new chat seeded with one turn, plus its index entry.
    ///
    /// All three writes happen in one transaction, so a chat can never
    /// exist without its index entry. Returns the store-generated id.
    pub fn create_chat(
        &self,
        user_id: &str,
        seed: &Turn,
        title: &str,
    ) -> Result<ChatId, ParleyError> {
        let id = Uuid::new_v4();
        let now = Utc::now().timestamp_millis();

        self.db.with_txn(|txn| {
            txn.execute(
                "INSERT INTO chats (id, user_id, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![id.to_string(), user_id, now],
            )
            .map_err(|e| ParleyError::Storage(format!("Failed to create chat: {}", e)))?;

            txn.execute(
                "INSERT INTO turns (chat_id, seq, role, text, image, created_at)
                 VALUES (?1, 0, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    id.to_string(),
                    seed.role.to_string(),
                    seed.text,
                    seed.image,
                    seed.created_at.timestamp_millis(),
                ],
            )
            .map_err(|e| ParleyError::Storage(format!("Failed to write seed turn: {}", e)))?;

            let position: i64 = txn
                .query_row(
                    "SELECT COALESCE(MAX(position) + 1, 0) FROM chat_index WHERE user_id = ?1",
                    rusqlite::params![user_id],
                    |row| row.get(0),
                )
                .map_err(|e| ParleyError::Storage(format!("Failed to read index: {}", e)))?;

            txn.execute(
                "INSERT INTO chat_index (user_id, position, chat_id, title, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![user_id, position, id.to_string(), title, now],
            )
            .map_err(|e| ParleyError::Storage(format!("Failed to write index entry: {}", e)))?;

            Ok(id)
        })
    }

    /// Append turns to an existing chat's history, in the given order.
    ///
    /// The append is atomic with respect to any other call: the owner
    /// check, sequence assignment, and inserts share one transaction.
    /// Returns `false` when the chat does not exist or is owned by a
    /// different user (no state is mutated in that case).
    pub fn append_turns(
        &self,
        chat_id: ChatId,
        user_id: &str,
        turns: &[Turn],
    ) -> Result<bool, ParleyError> {
        self.db.with_txn(|txn| {
            let owned: Option<i64> = txn
                .query_row(
                    "SELECT 1 FROM chats WHERE id = ?1 AND user_id = ?2",
                    rusqlite::params![chat_id.to_string(), user_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| ParleyError::Storage(format!("Failed to check owner: {}", e)))?;

            if owned.is_none() {
                return Ok(false);
            }

            let next_seq: i64 = txn
                .query_row(
                    "SELECT COALESCE(MAX(seq) + 1, 0) FROM turns WHERE chat_id = ?1",
                    rusqlite::params![chat_id.to_string()],
                    |row| row.get(0),
                )
                .map_err(|e| ParleyError::Storage(format!("Failed to read sequence: {}", e)))?;

            for (offset, turn) in turns.iter().enumerate() {
                txn.execute(
                    "INSERT INTO turns (chat_id, seq, role, text, image, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    rusqlite::params![
                        chat_id.to_string(),
                        next_seq + offset as i64,
                        turn.role.to_string(),
                        turn.text,
                        turn.image,
                        turn.created_at.timestamp_millis(),
                    ],
                )
                .map_err(|e| ParleyError::Storage(format!("Failed to append turn: {}", e)))?;
            }

            Ok(true)
        })
    }

    /// Fetch a chat with its full ordered history.
    ///
    /// Returns `None` when the chat does not exist or is owned by a
    /// different user.
    pub fn find_chat(&self, chat_id: ChatId, user_id: &str) -> Result<Option<Chat>, ParleyError> {
        self.db.with_conn(|conn| {
            let header: Option<(String, String, i64)> = conn
                .query_row(
                    "SELECT id, user_id, created_at FROM chats WHERE id = ?1 AND user_id = ?2",
                    rusqlite::params![chat_id.to_string(), user_id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()
                .map_err(|e| ParleyError::Storage(format!("Failed to fetch chat: {}", e)))?;

            let Some((id, owner, created_at)) = header else {
                return Ok(None);
            };

            let mut stmt = conn
                .prepare(
                    "SELECT role, text, image, created_at FROM turns
                     WHERE chat_id = ?1 ORDER BY seq ASC",
                )
                .map_err(|e| ParleyError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![chat_id.to_string()], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                })
                .map_err(|e| ParleyError::Storage(e.to_string()))?;

            let mut history = Vec::new();
            for row in rows {
                let (role, text, image, ts) =
                    row.map_err(|e| ParleyError::Storage(e.to_string()))?;
                history.push(Turn {
                    role: parse_role(&role)?,
                    text,
                    image,
                    created_at: millis_to_datetime(ts)?,
                });
            }

            Ok(Some(Chat {
                id: parse_chat_id(&id)?,
                user_id: owner,
                created_at: millis_to_datetime(created_at)?,
                history,
            }))
        })
    }

    /// List a user's chat index in creation order.
    ///
    /// A user with no chats yet gets an empty list, not an error.
    pub fn list_index(&self, user_id: &str) -> Result<Vec<ChatIndexEntry>, ParleyError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT chat_id, title, created_at FROM chat_index
                     WHERE user_id = ?1 ORDER BY position ASC",
                )
                .map_err(|e| ParleyError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![user_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                })
                .map_err(|e| ParleyError::Storage(e.to_string()))?;

            let mut entries = Vec::new();
            for row in rows {
                let (chat_id, title, ts) = row.map_err(|e| ParleyError::Storage(e.to_string()))?;
                entries.push(ChatIndexEntry {
                    chat_id: parse_chat_id(&chat_id)?,
                    title,
                    created_at: millis_to_datetime(ts)?,
                });
            }
            Ok(entries)
        })
    }
}

fn parse_chat_id(raw: &str) -> Result<ChatId, ParleyError> {
    Uuid::parse_str(raw).map_err(|e| ParleyError::Storage(format!("Corrupt chat id: {}", e)))
}

fn parse_role(raw: &str) -> Result<Role, ParleyError> {
    raw.parse()
        .map_err(|e| ParleyError::Storage(format!("Corrupt role: {}", e)))
}

fn millis_to_datetime(ms: i64) -> Result<DateTime<Utc>, ParleyError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| ParleyError::Storage(format!("Corrupt timestamp: {}", ms)))
}

// =============================================================================
// Tests
// =============================================================================
