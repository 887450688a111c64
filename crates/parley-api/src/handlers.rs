//! Route handler functions for all API endpoints.
//!
//! Each handler extracts path/body parameters via axum extractors,
//! resolves the caller through the `UserId` extension, and returns JSON
//! responses.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use parley_core::types::{Chat, ChatId, ChatIndexEntry, Turn};

use crate::auth::UserId;
use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request and response types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateChatRequest {
    /// The first question; it seeds the chat and derives its title.
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateChatResponse {
    pub chat_id: ChatId,
}

/// One exchange to append: an optional user question (with optional
/// image reference) followed by the model answer.
#[derive(Debug, Deserialize)]
pub struct AppendRequest {
    pub question: Option<String>,
    pub answer: String,
    pub image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppendResponse {
    pub appended: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

// =============================================================================
// Handler functions
// =============================================================================

/// GET /health - liveness check, no auth required.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// POST /chats - create a chat seeded with the first question.
pub async fn create_chat(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    Json(req): Json<CreateChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let chat_id = state.controller.create_chat(&user_id, &req.text)?;
    Ok((StatusCode::CREATED, Json(CreateChatResponse { chat_id })))
}

/// GET /userchats - the caller's chat index, oldest first.
pub async fn list_chats(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
) -> Result<Json<Vec<ChatIndexEntry>>, ApiError> {
    let entries = state.controller.list_chats(&user_id)?;
    Ok(Json(entries))
}

/// GET /chats/{id} - one chat with its full history.
///
/// Responds 404 both for ids that do not exist and for chats owned by
/// another user; the two are indistinguishable to the caller.
pub async fn get_chat(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path(id): Path<Uuid>,
) -> Result<Json<Chat>, ApiError> {
    let chat = state.controller.get_chat(id, &user_id)?;
    Ok(Json(chat))
}

/// PUT /chats/{id} - append one exchange to a chat's history.
///
/// With a question present, appends a user turn then the model answer;
/// without one (the auto-run of a fresh chat), appends the answer only.
pub async fn append_turns(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path(id): Path<Uuid>,
    Json(req): Json<AppendRequest>,
) -> Result<Json<AppendResponse>, ApiError> {
    if let Some(ref question) = req.question {
        if question.trim().is_empty() {
            return Err(ApiError::BadRequest("Question must not be empty".to_string()));
        }
    }

    let mut turns = Vec::with_capacity(2);
    if let Some(question) = req.question {
        turns.push(Turn::user(question, req.image));
    }
    turns.push(Turn::model(req.answer));

    let appended = turns.len();
    state.controller.append_turns(id, &user_id, turns)?;
    Ok(Json(AppendResponse { appended }))
}
