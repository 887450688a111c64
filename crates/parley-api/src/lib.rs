//! Parley API crate - axum HTTP server and route handlers.
//!
//! Provides the REST API for the Parley backend: chat creation, the
//! per-user chat index, chat retrieval, history appends, and health
//! checks, all behind bearer-token authentication.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
