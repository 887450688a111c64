//! Parley core crate - shared domain types, configuration, and errors.
//!
//! Everything the other crates agree on lives here: the chat data model
//! (`Chat`, `Turn`, `Role`, `ChatIndexEntry`), title derivation, the
//! TOML configuration, and the top-level `ParleyError`.

pub mod config;
pub mod error;
pub mod types;

pub use config::ParleyConfig;
pub use error::{ParleyError, Result};
pub use types::*;
