use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, put},
};
use chrono::Utc;
use serde::Deserialize;

use crate::config::AppState;
use crate::db::fetch_corrections;
use crate::models::{Paper, PaperStatus};
use crate::routes::auth::require_editor_key;
use crate::routes::{internal_error, not_found};

pub fn featured_routes() -> Router<AppState> {
    Router::new()
        .route("/feature", put(feature))
        .route("/unfeature", put(unfeature))
        .route("/features", get(features))
}

#[derive(Debug, Deserialize)]
struct IdQuery {
    id: String,
}

async fn feature(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<IdQuery>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    require_editor_key(&state, &headers)?;
    let id = query.id;

    let row: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM papers WHERE code = ? AND status = ?")
            .bind(&id)
            .bind(PaperStatus::Published.as_str())
            .fetch_optional(&state.pool)
            .await
            .map_err(internal_error)?;

    if row.is_none() {
        return Err(not_found(format!(
            "Document with id `{id}` does not exist in `published` state"
        )));
    }

    sqlx::query("INSERT IGNORE INTO featured (code, featured_at) VALUES (?, ?)")
        .bind(&id)
        .bind(Utc::now())
        .execute(&state.pool)
        .await
        .map_err(internal_error)?;

    Ok(Json(serde_json::json!({"message": "Paper featured"})))
}

async fn unfeature(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<IdQuery>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    require_editor_key(&state, &headers)?;

    sqlx::query("DELETE FROM featured WHERE code = ?")
        .bind(&query.id)
        .execute(&state.pool)
        .await
        .map_err(internal_error)?;

    Ok(Json(serde_json::json!({"message": "Paper unfeatured"})))
}

/// Full records of the editor-picked papers, oldest pick first.
async fn features(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    let papers: Vec<Paper> = sqlx::query_as(
        r#"
        SELECT
            p.code, p.title, p.abstract_text,
            CAST(p.authors_json AS CHAR) AS authors_json,
            p.category,
            CAST(p.references_json AS CHAR) AS references_json,
            CAST(p.cited_by_json AS CHAR) AS cited_by_json,
            p.status, p.submitted_at,
            CAST(p.reviewed_json AS CHAR) AS reviewed_json,
            p.published_at, p.retracted_at, p.document_name, p.document_mime
        FROM papers p
        JOIN featured f ON f.code = p.code
        ORDER BY f.featured_at ASC
        "#,
    )
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;

    let mut out = Vec::with_capacity(papers.len());
    for paper in papers {
        let corrections = fetch_corrections(&state.pool, &paper.code)
            .await
            .map_err(internal_error)?;
        out.push(paper.into_response(corrections));
    }

    Ok(Json(out))
}
