//! Parley storage crate - SQLite persistence for chats and chat indexes.
//!
//! Provides a WAL-mode SQLite database with migrations and a repository
//! over the two entity kinds: the chat document (owner + ordered turn
//! history) and the per-user chat index. Appends are atomic per call;
//! chat creation writes the chat row, seeding turn, and index entry in
//! one transaction.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::ChatRepository;
