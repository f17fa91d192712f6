use axum::{
    Json,
    http::{HeaderMap, StatusCode},
};

use crate::config::AppState;

/// Header carrying the shared editor secret.
pub const EDITOR_KEY_HEADER: &str = "x-journal-key";

/// Rejects the request with 401 unless the editor key header matches the
/// configured secret. Checked before any mutation.
pub fn require_editor_key(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<(), (StatusCode, Json<serde_json::Value>)> {
    let provided = headers
        .get(EDITOR_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    if provided == Some(state.config.editor_key.as_str()) {
        return Ok(());
    }

    Err((
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({"detail": "Missing or invalid editor key"})),
    ))
}
