use axum::{
    Json, Router,
    extract::{Multipart, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, patch, post},
};
use chrono::Utc;
use sqlx::{MySql, QueryBuilder};

use crate::config::AppState;
use crate::db::code_in_use;
use crate::ident;
use crate::models::{PaperStatus, author_shorthand, parse_datetime_list_json, parse_string_list_json};
use crate::routes::auth::require_editor_key;
use crate::routes::{internal_error, not_found};

pub const PDF_MIME: &str = "application/pdf";
pub const DOC_MIME: &str = "application/msword";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

pub fn papers_routes() -> Router<AppState> {
    Router::new()
        .route("/submit", post(submit))
        .route("/review", patch(review))
        .route("/publish", patch(publish))
        .route("/reject", delete(reject))
        .route("/retract", patch(retract))
        .route("/remove", delete(remove))
        .route("/correct", post(correct))
}

#[derive(Debug, serde::Deserialize)]
struct IdQuery {
    id: String,
}

/// Accepted manuscript types and their display extensions.
fn extension_for_mime(mime: &str) -> Option<&'static str> {
    match mime {
        DOC_MIME => Some(".doc"),
        DOCX_MIME => Some(".docx"),
        PDF_MIME => Some(".pdf"),
        _ => None,
    }
}

/// Why a publish request was refused.
#[derive(Debug, PartialEq, Eq)]
enum PublishRejection {
    NotReviewing,
    NotPdf,
}

/// A paper leaves review only from `reviewing`, and only with a PDF document on
/// file. Both checks run before any row is touched.
fn check_publishable(status: &str, document_mime: &str) -> Result<(), PublishRejection> {
    let reviewing = PaperStatus::parse(status)
        .is_some_and(|s| s == PaperStatus::Reviewing && s.can_transition(PaperStatus::Published));
    if !reviewing {
        return Err(PublishRejection::NotReviewing);
    }
    if document_mime != PDF_MIME {
        return Err(PublishRejection::NotPdf);
    }
    Ok(())
}

fn bad_request<E: ToString>(error: E) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({"detail": error.to_string()})),
    )
}

/// Collected manuscript fields from a multipart submission.
#[derive(Debug, Default)]
struct ManuscriptForm {
    id: Option<String>,
    title: Option<String>,
    abstract_text: Option<String>,
    authors: Vec<String>,
    category: Option<String>,
    references: Vec<String>,
    description: Option<String>,
    doc: Option<(String, Vec<u8>)>,
}

async fn read_manuscript_form(
    multipart: &mut Multipart,
) -> Result<ManuscriptForm, (StatusCode, Json<serde_json::Value>)> {
    let mut form = ManuscriptForm::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "id" => form.id = Some(field.text().await.map_err(bad_request)?),
            "title" => form.title = Some(field.text().await.map_err(bad_request)?),
            "abstract" => form.abstract_text = Some(field.text().await.map_err(bad_request)?),
            "authors" => form.authors.push(field.text().await.map_err(bad_request)?),
            "category" => form.category = Some(field.text().await.map_err(bad_request)?),
            "references" => form.references.push(field.text().await.map_err(bad_request)?),
            "description" => form.description = Some(field.text().await.map_err(bad_request)?),
            "doc" => {
                let mime = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(bad_request)?;
                form.doc = Some((mime, bytes.to_vec()));
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Allocates an unused code for a new document, probing the papers and
/// corrections tables.
async fn allocate_code(
    state: &AppState,
    content: &[u8],
) -> Result<String, (StatusCode, Json<serde_json::Value>)> {
    let pool = state.pool.clone();
    let exists = |code: String| {
        let pool = pool.clone();
        async move { code_in_use(&pool, &code).await }
    };

    ident::allocate(
        ident::seed_from_bytes(content),
        state.config.id_strategy,
        state.config.id_max_attempts,
        exists,
    )
    .await
    .map_err(internal_error)
}

/// Initialises all paper data and stores it in `reviewing` state. Returns the
/// allocated code.
async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    require_editor_key(&state, &headers)?;

    let form = read_manuscript_form(&mut multipart).await?;

    let (mime, bytes) = form.doc.ok_or((
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(serde_json::json!({"detail": "A manuscript document is required"})),
    ))?;

    let extension = extension_for_mime(&mime).ok_or((
        StatusCode::UNSUPPORTED_MEDIA_TYPE,
        Json(serde_json::json!({
            "detail": format!("Upload `.pdf`, `.doc` or `.docx` files only, not `{mime}`")
        })),
    ))?;

    // Also validates that the author list is non-empty.
    let shorthand = author_shorthand(&form.authors).ok_or((
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(serde_json::json!({"detail": "No authors provided"})),
    ))?;

    let code = allocate_code(&state, &bytes).await?;

    tokio::fs::write(state.config.paper_path(&code), &bytes)
        .await
        .map_err(internal_error)?;

    let authors_json = serde_json::to_string(&form.authors).map_err(internal_error)?;
    let references_json = serde_json::to_string(&form.references).map_err(internal_error)?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO papers (
            code, title, abstract_text, authors_json, category,
            references_json, cited_by_json, status, submitted_at, reviewed_json,
            document_name, document_mime
        ) VALUES (?, ?, ?, ?, ?, ?, '[]', ?, ?, '[]', ?, ?)
        "#,
    )
    .bind(&code)
    .bind(form.title.unwrap_or_default())
    .bind(form.abstract_text.unwrap_or_default())
    .bind(&authors_json)
    .bind(form.category.unwrap_or_default())
    .bind(&references_json)
    .bind(PaperStatus::Reviewing.as_str())
    .bind(Utc::now())
    .bind(format!("{shorthand} DRAFT{extension}"))
    .bind(&mime)
    .execute(&state.pool)
    .await;

    if let Err(error) = inserted {
        // Do not leave a stored document without its metadata row.
        let _ = tokio::fs::remove_file(state.config.paper_path(&code)).await;
        return Err(internal_error(error));
    }

    Ok(Json(code))
}

/// Edits a paper under review; appends a review timestamp when anything changed.
async fn review(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    require_editor_key(&state, &headers)?;

    let form = read_manuscript_form(&mut multipart).await?;
    let id = form.id.ok_or((
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(serde_json::json!({"detail": "Paper id is required"})),
    ))?;

    let row: Option<(String, String, String)> = sqlx::query_as(
        r#"
        SELECT status, CAST(authors_json AS CHAR), CAST(reviewed_json AS CHAR)
        FROM papers WHERE code = ?
        "#,
    )
    .bind(&id)
    .fetch_optional(&state.pool)
    .await
    .map_err(internal_error)?;

    let (_status, authors_json, reviewed_json) = row
        .filter(|(status, _, _)| PaperStatus::parse(status) == Some(PaperStatus::Reviewing))
        .ok_or_else(|| {
            not_found(format!(
                "Document with id `{id}` does not exist in `reviewing` state"
            ))
        })?;

    let mut changed = false;
    let mut builder = QueryBuilder::<MySql>::new("UPDATE papers SET reviewed_json = ");

    let mut reviewed = parse_datetime_list_json(&reviewed_json);
    reviewed.push(Utc::now());
    builder.push_bind(serde_json::to_string(&reviewed).map_err(internal_error)?);

    if let Some((mime, bytes)) = form.doc {
        let extension = extension_for_mime(&mime).ok_or((
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Json(serde_json::json!({"detail": "Upload `.pdf`, `.doc` or `.docx` files only"})),
        ))?;

        tokio::fs::write(state.config.paper_path(&id), &bytes)
            .await
            .map_err(internal_error)?;

        let stored_authors = parse_string_list_json(&authors_json);
        let shorthand = author_shorthand(&stored_authors).unwrap_or_else(|| id.clone());
        builder.push(", document_name = ");
        builder.push_bind(format!("{shorthand} DRAFT{extension}"));
        builder.push(", document_mime = ");
        builder.push_bind(mime);
        changed = true;
    }

    if let Some(title) = form.title.filter(|t| !t.is_empty()) {
        builder.push(", title = ");
        builder.push_bind(title);
        changed = true;
    }
    if let Some(abstract_text) = form.abstract_text.filter(|a| !a.is_empty()) {
        builder.push(", abstract_text = ");
        builder.push_bind(abstract_text);
        changed = true;
    }
    if !form.authors.is_empty() {
        builder.push(", authors_json = ");
        builder.push_bind(serde_json::to_string(&form.authors).map_err(internal_error)?);
        changed = true;
    }
    if let Some(category) = form.category.filter(|c| !c.is_empty()) {
        builder.push(", category = ");
        builder.push_bind(category);
        changed = true;
    }
    if !form.references.is_empty() {
        builder.push(", references_json = ");
        builder.push_bind(serde_json::to_string(&form.references).map_err(internal_error)?);
        changed = true;
    }

    if changed {
        builder.push(" WHERE code = ");
        builder.push_bind(&id);
        builder
            .build()
            .execute(&state.pool)
            .await
            .map_err(internal_error)?;
    }

    Ok(Json(serde_json::json!({"message": "Review recorded"})))
}

/// Moves a paper from `reviewing` to `published`. Requires the stored document
/// to be a PDF; renames it to `<shorthand> (<year>).pdf`.
async fn publish(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<IdQuery>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    require_editor_key(&state, &headers)?;
    let id = query.id;

    let mut tx = state.pool.begin().await.map_err(internal_error)?;

    let row: Option<(String, String, String)> = sqlx::query_as(
        r#"
        SELECT status, CAST(authors_json AS CHAR), document_mime
        FROM papers WHERE code = ? FOR UPDATE
        "#,
    )
    .bind(&id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(internal_error)?;

    let (status, authors_json, document_mime) = row.ok_or_else(|| {
        not_found(format!(
            "Document with id `{id}` does not exist in `reviewing` state"
        ))
    })?;

    match check_publishable(&status, &document_mime) {
        Ok(()) => {}
        Err(PublishRejection::NotReviewing) => {
            return Err(not_found(format!(
                "Document with id `{id}` does not exist in `reviewing` state"
            )));
        }
        Err(PublishRejection::NotPdf) => {
            return Err((
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                Json(
                    serde_json::json!({"detail": "Change paper document to pdf before publication"}),
                ),
            ));
        }
    }

    let authors = parse_string_list_json(&authors_json);
    let shorthand = author_shorthand(&authors).unwrap_or_else(|| id.clone());
    let now = Utc::now();

    sqlx::query(
        "UPDATE papers SET status = ?, published_at = ?, document_name = ? WHERE code = ?",
    )
    .bind(PaperStatus::Published.as_str())
    .bind(now)
    .bind(format!("{shorthand} ({}).pdf", now.format("%Y")))
    .bind(&id)
    .execute(&mut *tx)
    .await
    .map_err(internal_error)?;

    tx.commit().await.map_err(internal_error)?;

    Ok(Json(serde_json::json!({"message": "Paper published"})))
}

/// Rejects a paper under review: row and stored document are deleted outright,
/// so the code becomes available again.
async fn reject(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<IdQuery>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    require_editor_key(&state, &headers)?;
    let id = query.id;

    let row: Option<(String,)> = sqlx::query_as("SELECT status FROM papers WHERE code = ?")
        .bind(&id)
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?;

    let transition_ok = row.as_ref().is_some_and(|(status,)| {
        PaperStatus::parse(status)
            .is_some_and(|s| s == PaperStatus::Reviewing && s.can_transition(PaperStatus::Deleted))
    });
    if !transition_ok {
        return Err(not_found(format!(
            "Document with id `{id}` does not exist in `reviewing` state"
        )));
    }

    sqlx::query("DELETE FROM papers WHERE code = ?")
        .bind(&id)
        .execute(&state.pool)
        .await
        .map_err(internal_error)?;

    let _ = tokio::fs::remove_file(state.config.paper_path(&id)).await;

    Ok(Json(serde_json::json!({"message": "Paper rejected"})))
}

/// Moves a paper from `published` to `retracted`. No data is deleted.
async fn retract(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<IdQuery>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    require_editor_key(&state, &headers)?;
    let id = query.id;

    let mut tx = state.pool.begin().await.map_err(internal_error)?;

    let row: Option<(String,)> =
        sqlx::query_as("SELECT status FROM papers WHERE code = ? FOR UPDATE")
            .bind(&id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(internal_error)?;

    let transition_ok = row.as_ref().is_some_and(|(status,)| {
        PaperStatus::parse(status)
            .is_some_and(|s| s == PaperStatus::Published && s.can_transition(PaperStatus::Retracted))
    });
    if !transition_ok {
        return Err(not_found(format!(
            "Document with id `{id}` does not exist in `published` state"
        )));
    }

    sqlx::query("UPDATE papers SET status = ?, retracted_at = ? WHERE code = ?")
        .bind(PaperStatus::Retracted.as_str())
        .bind(Utc::now())
        .bind(&id)
        .execute(&mut *tx)
        .await
        .map_err(internal_error)?;

    tx.commit().await.map_err(internal_error)?;

    Ok(Json(serde_json::json!({"message": "Paper retracted"})))
}

/// Removes a retracted paper. The row is kept in `deleted` state and the stored
/// bytes (paper and corrections) are truncated, so the codes are never reused.
async fn remove(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<IdQuery>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    require_editor_key(&state, &headers)?;
    let id = query.id;

    let mut tx = state.pool.begin().await.map_err(internal_error)?;

    let row: Option<(String,)> =
        sqlx::query_as("SELECT status FROM papers WHERE code = ? FOR UPDATE")
            .bind(&id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(internal_error)?;

    let transition_ok = row.as_ref().is_some_and(|(status,)| {
        PaperStatus::parse(status)
            .is_some_and(|s| s == PaperStatus::Retracted && s.can_transition(PaperStatus::Deleted))
    });
    if !transition_ok {
        return Err(not_found(format!(
            "Document with id `{id}` does not exist in `retracted` state"
        )));
    }

    sqlx::query("UPDATE papers SET status = ? WHERE code = ?")
        .bind(PaperStatus::Deleted.as_str())
        .bind(&id)
        .execute(&mut *tx)
        .await
        .map_err(internal_error)?;

    let correction_codes: Vec<(String,)> =
        sqlx::query_as("SELECT code FROM corrections WHERE paper_code = ?")
            .bind(&id)
            .fetch_all(&mut *tx)
            .await
            .map_err(internal_error)?;

    tx.commit().await.map_err(internal_error)?;

    // Truncate rather than delete: the empty files keep the codes reserved on
    // the document store as well.
    for (code,) in &correction_codes {
        let _ = tokio::fs::write(state.config.paper_path(code), b"").await;
    }
    let _ = tokio::fs::write(state.config.paper_path(&id), b"").await;

    Ok(Json(serde_json::json!({"message": "Paper removed"})))
}

/// Appends a correction (PDF only) to a published or retracted paper. The
/// correction gets its own code from the shared id space.
async fn correct(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    require_editor_key(&state, &headers)?;

    let form = read_manuscript_form(&mut multipart).await?;
    let id = form.id.ok_or((
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(serde_json::json!({"detail": "Paper id is required"})),
    ))?;
    let description = form.description.unwrap_or_default();

    let (mime, bytes) = form.doc.ok_or((
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(serde_json::json!({"detail": "A correction document is required"})),
    ))?;
    if mime != PDF_MIME {
        return Err((
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Json(serde_json::json!({"detail": "Please upload only `.pdf` files"})),
        ));
    }

    let row: Option<(String, String, Option<chrono::DateTime<Utc>>)> = sqlx::query_as(
        r#"
        SELECT status, CAST(authors_json AS CHAR), published_at
        FROM papers WHERE code = ?
        "#,
    )
    .bind(&id)
    .fetch_optional(&state.pool)
    .await
    .map_err(internal_error)?;

    let (_, authors_json, published_at) = row
        .filter(|(status, _, _)| {
            matches!(
                PaperStatus::parse(status),
                Some(PaperStatus::Published | PaperStatus::Retracted)
            )
        })
        .ok_or_else(|| {
            not_found(format!(
                "Document with id `{id}` does not exist in `published` state"
            ))
        })?;

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM corrections WHERE paper_code = ?")
        .bind(&id)
        .fetch_one(&state.pool)
        .await
        .map_err(internal_error)?;

    let code = allocate_code(&state, &bytes).await?;

    tokio::fs::write(state.config.paper_path(&code), &bytes)
        .await
        .map_err(internal_error)?;

    let authors = parse_string_list_json(&authors_json);
    let shorthand = author_shorthand(&authors).unwrap_or_else(|| id.clone());
    let now = Utc::now();
    let year = published_at.unwrap_or(now).format("%Y");

    let inserted = sqlx::query(
        r#"
        INSERT INTO corrections (code, paper_code, corrected_at, description, document_name, document_mime)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&code)
    .bind(&id)
    .bind(now)
    .bind(&description)
    .bind(format!("{shorthand} ({year}) Correction {}.pdf", count + 1))
    .bind(PDF_MIME)
    .execute(&state.pool)
    .await;

    if let Err(error) = inserted {
        let _ = tokio::fs::remove_file(state.config.paper_path(&code)).await;
        return Err(internal_error(error));
    }

    Ok(Json(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_rejects_non_pdf_documents() {
        assert_eq!(
            check_publishable("reviewing", DOCX_MIME),
            Err(PublishRejection::NotPdf)
        );
        assert_eq!(
            check_publishable("reviewing", DOC_MIME),
            Err(PublishRejection::NotPdf)
        );
        assert_eq!(check_publishable("reviewing", PDF_MIME), Ok(()));
    }

    #[test]
    fn publish_requires_a_paper_under_review() {
        for status in ["published", "retracted", "deleted", "archived"] {
            assert_eq!(
                check_publishable(status, PDF_MIME),
                Err(PublishRejection::NotReviewing)
            );
        }
        // Wrong state wins over wrong document type.
        assert_eq!(
            check_publishable("published", DOCX_MIME),
            Err(PublishRejection::NotReviewing)
        );
    }
}
