use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::config::AppState;
use crate::models::PaperStatus;
use crate::routes::auth::require_editor_key;
use crate::routes::papers::{DOCX_MIME, PDF_MIME};
use crate::routes::{internal_error, not_found};

pub fn documents_routes() -> Router<AppState> {
    Router::new().route("/get/{paper_type}", get(get_document))
}

#[derive(Debug, Deserialize)]
struct GetQuery {
    id: Option<String>,
}

fn file_response(bytes: Vec<u8>, mime: &str, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// Journal issues are addressed by title on the filesystem; keep lookups inside
/// the journals directory.
fn is_safe_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.contains('\\') && !name.contains("..")
}

fn require_id(query: GetQuery) -> Result<String, (StatusCode, Json<serde_json::Value>)> {
    query.id.ok_or((
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(serde_json::json!({"detail": "Query parameter `id` is required"})),
    ))
}

async fn get_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(paper_type): Path<String>,
    Query(query): Query<GetQuery>,
) -> Result<Response, (StatusCode, Json<serde_json::Value>)> {
    match paper_type.as_str() {
        "published" => {
            let id = require_id(query)?;
            serve_paper(&state, &id, PaperStatus::Published).await
        }
        "reviewing" => {
            require_editor_key(&state, &headers)?;
            let id = require_id(query)?;
            serve_paper(&state, &id, PaperStatus::Reviewing).await
        }
        "journal" => {
            let id = require_id(query)?;
            if !is_safe_name(&id) {
                return Err(not_found(
                    "A publication with that id could not be found".to_string(),
                ));
            }
            let bytes = tokio::fs::read(state.config.journal_path(&id))
                .await
                .map_err(|_| {
                    not_found("A publication with that id could not be found".to_string())
                })?;
            Ok(file_response(bytes, PDF_MIME, &id))
        }
        "template" => {
            let bytes = tokio::fs::read(format!("{}/template", state.config.docs_dir))
                .await
                .map_err(internal_error)?;
            Ok(file_response(bytes, DOCX_MIME, "Manuscript Template"))
        }
        "form" => {
            let bytes = tokio::fs::read(format!("{}/form", state.config.docs_dir))
                .await
                .map_err(internal_error)?;
            Ok(file_response(bytes, PDF_MIME, "Application Form"))
        }
        _ => Err(not_found(format!("Unknown paper type `{paper_type}`"))),
    }
}

async fn serve_paper(
    state: &AppState,
    id: &str,
    status: PaperStatus,
) -> Result<Response, (StatusCode, Json<serde_json::Value>)> {
    let row: Option<(String, String)> = sqlx::query_as(
        "SELECT document_name, document_mime FROM papers WHERE code = ? AND status = ?",
    )
    .bind(id)
    .bind(status.as_str())
    .fetch_optional(&state.pool)
    .await
    .map_err(internal_error)?;

    let (document_name, document_mime) = row.ok_or_else(|| {
        not_found(format!(
            "Paper with id `{id}` does not exist in `{}` state",
            status.as_str()
        ))
    })?;

    let bytes = tokio::fs::read(state.config.paper_path(id))
        .await
        .map_err(internal_error)?;

    Ok(file_response(bytes, &document_mime, &document_name))
}
