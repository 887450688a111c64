//! Application state shared across all route handlers.
//!
//! AppState holds the controller and shared resources. It is passed to
//! handlers via axum's State extractor.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parley_chat::ChatController;
use parley_core::config::ParleyConfig;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<ParleyConfig>,
    /// Chat session controller over the persistent store.
    pub controller: Arc<ChatController>,
    /// Bearer token to user id mapping.
    pub tokens: Arc<HashMap<String, String>>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState; the token map is taken from the config.
    pub fn new(config: ParleyConfig, controller: Arc<ChatController>) -> Self {
        let tokens = Arc::new(config.auth.tokens.clone());
        Self {
            config: Arc::new(config),
            controller,
            tokens,
            start_time: Instant::now(),
        }
    }
}
