//! API authentication via bearer tokens.
//!
//! Middleware that validates `Authorization: Bearer <token>` headers on
//! protected endpoints and resolves the token to a user id. Handlers
//! pick up the caller's identity through the `UserId` extension.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::state::AppState;

/// Authenticated caller identity, inserted by the auth middleware.
#[derive(Clone, Debug)]
pub struct UserId(pub String);

/// Middleware that validates Bearer token authentication.
///
/// Extracts the token from `Authorization: Bearer <token>`, looks it up
/// in `AppState.tokens`, and forwards the resolved user id as a request
/// extension. Returns 401 if the header is missing or the token is
/// unknown.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let auth_header = req.headers().get("authorization");

    match auth_header {
        Some(value) => {
            let value_str = match value.to_str() {
                Ok(s) => s,
                Err(_) => {
                    return unauthorized("Invalid Authorization header encoding");
                }
            };

            if let Some(token) = value_str.strip_prefix("Bearer ") {
                if let Some(user_id) = state.tokens.get(token) {
                    req.extensions_mut().insert(UserId(user_id.clone()));
                    return next.run(req).await;
                }
            }

            unauthorized("Invalid bearer token")
        }
        None => unauthorized("Missing Authorization header"),
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "unauthorized",
            "message": message
        })),
    )
        .into_response()
}
