use axum::{
    Json, Router,
    extract::{Multipart, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use serde::Deserialize;

use crate::config::AppState;
use crate::routes::auth::require_editor_key;
use crate::routes::internal_error;
use crate::routes::papers::PDF_MIME;

pub fn journal_routes() -> Router<AppState> {
    Router::new().route("/journal", post(publish_journal))
}

#[derive(Debug, Deserialize)]
struct JournalQuery {
    title: String,
}

/// Stores a compiled journal issue PDF under its title. Issues have no
/// database row; the file is the record.
async fn publish_journal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<JournalQuery>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    require_editor_key(&state, &headers)?;

    let title = query.title;
    if title.is_empty() || title.contains('/') || title.contains('\\') || title.contains("..") {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({"detail": "Invalid publication title"})),
        ));
    }

    let mut doc: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"detail": e.to_string()})),
        )
    })? {
        if field.name() == Some("doc") {
            let mime = field.content_type().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(|e| {
                (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({"detail": e.to_string()})),
                )
            })?;
            doc = Some((mime, bytes.to_vec()));
        }
    }

    let (mime, bytes) = doc.ok_or((
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(serde_json::json!({"detail": "A journal document is required"})),
    ))?;

    if mime != PDF_MIME {
        return Err((
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Json(serde_json::json!({"detail": "Please upload `.pdf` files only"})),
        ));
    }

    let path = state.config.journal_path(&title);
    if tokio::fs::try_exists(&path).await.map_err(internal_error)? {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({"detail": "A publication with that title already exists"})),
        ));
    }

    tokio::fs::write(&path, &bytes)
        .await
        .map_err(internal_error)?;

    Ok(Json(serde_json::json!({"message": "Journal issue published"})))
}
