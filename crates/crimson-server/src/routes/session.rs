//! Session endpoints.
//!
//! Every handler starts (or resumes) the caller's session through the
//! shared [`SessionManager`](crimson_session::SessionManager), so responses
//! may carry a `Set-Cookie` header on first contact.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crimson_session::Session;

use crate::error::ServerError;
use crate::state::AppState;

/// Key holding the per-session visit counter.
const VISITS_KEY: &str = "visits";

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Response for the session overview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOverview {
    /// Requests served for this session, including this one.
    pub visits: u64,
    /// Whether this request started the session.
    pub new: bool,
    /// Keys set on the session.
    pub keys: Vec<String>,
}

/// Response for a single key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueResponse {
    /// Requested key.
    pub key: String,
    /// Stored value.
    pub value: Value,
}

/// Response for the live session count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountResponse {
    /// Number of live sessions.
    pub live: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Handler outcome. Response headers written by the manager travel with
/// errors too, so a session created on first contact always reaches the
/// client.
pub type SessionResult<T> = Result<(HeaderMap, T), (HeaderMap, ServerError)>;

/// Start or resume the caller's session, collecting response headers.
fn begin(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<(Session, HeaderMap), (HeaderMap, ServerError)> {
    let mut out = HeaderMap::new();
    match state.manager.start_session(headers, &mut out) {
        Ok(session) => Ok((session, out)),
        Err(e) => Err((out, e.into())),
    }
}

fn key_not_set(key: &str) -> ServerError {
    ServerError::NotFound(format!("Session key '{}' not set", key))
}

/// GET /session - Start or resume the session and count the visit.
pub async fn overview_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> SessionResult<Json<SessionOverview>> {
    let (session, out) = begin(&state, &headers)?;

    let visits = session
        .update(VISITS_KEY, |current| {
            let count = current.and_then(|v| v.as_u64()).unwrap_or(0);
            Value::from(count + 1)
        })
        .and_then(|v| v.as_u64())
        .unwrap_or(0);

    let mut keys = session.keys();
    keys.sort();

    let new = !out.is_empty();
    Ok((out, Json(SessionOverview { visits, new, keys })))
}

/// GET /session/{key} - Read one value.
pub async fn get_value_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> SessionResult<Json<ValueResponse>> {
    let (session, out) = begin(&state, &headers)?;

    match session.get(&key) {
        Some(value) => Ok((out, Json(ValueResponse { key, value }))),
        None => Err((out, key_not_set(&key))),
    }
}

/// PUT /session/{key} - Store one value.
pub async fn put_value_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
    Json(value): Json<Value>,
) -> SessionResult<StatusCode> {
    let (session, out) = begin(&state, &headers)?;

    debug!(session_id = %session.id(), key = %key, "Session value stored");
    session.set(key, value);

    Ok((out, StatusCode::NO_CONTENT))
}

/// DELETE /session/{key} - Remove one value.
pub async fn delete_value_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> SessionResult<StatusCode> {
    let (session, out) = begin(&state, &headers)?;

    match session.delete(&key) {
        Some(_) => Ok((out, StatusCode::NO_CONTENT)),
        None => Err((out, key_not_set(&key))),
    }
}

/// POST /logout - Destroy the session and expire the cookie.
pub async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(HeaderMap, StatusCode), ServerError> {
    let mut out = HeaderMap::new();
    let removed = state.manager.destroy_session(&headers, &mut out)?;
    debug!(removed, "Logout");
    Ok((out, StatusCode::NO_CONTENT))
}

/// GET /sessions/count - Number of live sessions.
pub async fn count_handler(State(state): State<AppState>) -> Json<CountResponse> {
    Json(CountResponse {
        live: state.manager.store().len(),
    })
}

/// Create session routes.
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/session", get(overview_handler))
        .route(
            "/session/{key}",
            get(get_value_handler)
                .put(put_value_handler)
                .delete(delete_value_handler),
        )
        .route("/logout", post(logout_handler))
        .route("/sessions/count", get(count_handler))
}
