use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{MySql, QueryBuilder};

use crate::config::AppState;
use crate::db::fetch_corrections;
use crate::fuzzy::partial_match_score;
use crate::models::{Paper, PaperStatus, parse_string_list_json};
use crate::routes::auth::require_editor_key;
use crate::routes::internal_error;

pub fn search_routes() -> Router<AppState> {
    Router::new()
        .route("/list/{paper_type}", get(list_papers))
        .route("/num-papers", get(num_papers))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    length: Option<u32>,
    start_at_id: Option<String>,
    start_at_date: Option<DateTime<Utc>>,
    end_before_date: Option<DateTime<Utc>>,
    category: Option<String>,
    contains: Option<String>,
    quality_limit: Option<u8>,
    /// Comma-separated author names; every one must match some paper author.
    authors: Option<String>,
}

fn clears_limit(query: &str, field: &str, limit: f64) -> bool {
    partial_match_score(&query.to_lowercase(), &field.to_lowercase()) * 100.0 >= limit
}

/// A paper is included if any searched field clears the quality limit.
fn paper_matches(
    query: &str,
    title: &str,
    abstract_text: &str,
    references: &[String],
    authors: &[String],
    limit: f64,
) -> bool {
    clears_limit(query, title, limit)
        || clears_limit(query, abstract_text, limit)
        || references.iter().any(|r| clears_limit(query, r, limit))
        || authors.iter().any(|a| clears_limit(query, a, limit))
}

/// Every requested author must individually clear the limit against some paper
/// author. One requested author is consumed per paper-author match, popped from
/// the end of the request list, so the check is order-sensitive.
fn authors_satisfied(requested: &[String], paper_authors: &[String], limit: f64) -> bool {
    let mut remaining: Vec<&String> = requested.iter().collect();

    for author in paper_authors {
        if let Some(next) = remaining.last() {
            if clears_limit(next, author, limit) {
                remaining.pop();
            }
        }
    }

    remaining.is_empty()
}

async fn list_papers(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(paper_type): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    let (status, date_column) = match paper_type.as_str() {
        "published" => (Some(PaperStatus::Published), "published_at"),
        "retracted" => (Some(PaperStatus::Retracted), "retracted_at"),
        "reviewing" => {
            require_editor_key(&state, &headers)?;
            (Some(PaperStatus::Reviewing), "submitted_at")
        }
        "all" => {
            require_editor_key(&state, &headers)?;
            (None, "submitted_at")
        }
        _ => {
            return Err((
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"detail": format!("Unknown paper type `{paper_type}`")})),
            ));
        }
    };

    let mut builder = QueryBuilder::<MySql>::new(
        r#"
        SELECT
            code, title, abstract_text,
            CAST(authors_json AS CHAR) AS authors_json,
            category,
            CAST(references_json AS CHAR) AS references_json,
            CAST(cited_by_json AS CHAR) AS cited_by_json,
            status, submitted_at,
            CAST(reviewed_json AS CHAR) AS reviewed_json,
            published_at, retracted_at, document_name, document_mime
        FROM papers
        WHERE 1 = 1
        "#,
    );

    match status {
        Some(status) => {
            builder.push(" AND status = ");
            builder.push_bind(status.as_str());
        }
        None => {
            builder.push(" AND status <> ");
            builder.push_bind(PaperStatus::Deleted.as_str());
        }
    }

    if let Some(ref category) = query.category {
        builder.push(" AND category = ");
        builder.push_bind(category);
    }
    if let Some(ref start_at_id) = query.start_at_id {
        builder.push(" AND code >= ");
        builder.push_bind(start_at_id);
    }
    if let Some(start_at_date) = query.start_at_date {
        builder.push(format!(" AND {date_column} >= "));
        builder.push_bind(start_at_date);
    }
    if let Some(end_before_date) = query.end_before_date {
        builder.push(format!(" AND {date_column} < "));
        builder.push_bind(end_before_date);
    }
    builder.push(format!(" ORDER BY code ASC, {date_column} ASC"));

    let papers: Vec<Paper> = builder
        .build_query_as()
        .fetch_all(&state.pool)
        .await
        .map_err(internal_error)?;

    let length = query.length.unwrap_or(1) as usize;
    let contains = query.contains.unwrap_or_default();
    let quality_limit = f64::from(query.quality_limit.unwrap_or(100).min(100));
    // An empty query vacuously matches every field; the author filter keeps its
    // own threshold.
    let field_limit = if contains.is_empty() { 0.0 } else { quality_limit };

    let requested_authors: Vec<String> = query
        .authors
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();

    let mut out = Vec::new();
    for paper in papers {
        if out.len() >= length {
            break;
        }

        let authors = parse_string_list_json(&paper.authors_json);
        let references = parse_string_list_json(&paper.references_json);

        if !paper_matches(
            &contains,
            &paper.title,
            &paper.abstract_text,
            &references,
            &authors,
            field_limit,
        ) {
            continue;
        }
        if !authors_satisfied(&requested_authors, &authors, quality_limit) {
            continue;
        }

        let corrections = fetch_corrections(&state.pool, &paper.code)
            .await
            .map_err(internal_error)?;
        out.push(paper.into_response(corrections));
    }

    Ok(Json(out))
}

async fn num_papers(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM papers WHERE status = ?")
        .bind(PaperStatus::Published.as_str())
        .fetch_one(&state.pool)
        .await
        .map_err(internal_error)?;

    Ok(Json(total))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn any_field_clearing_the_limit_includes_the_paper() {
        let references = names(&["Smith 2019"]);
        let authors = names(&["Jane Doe"]);

        assert!(paper_matches("smith", "Unrelated", "Unrelated", &references, &authors, 100.0));
        assert!(paper_matches("doe", "Unrelated", "Unrelated", &references, &authors, 100.0));
        assert!(!paper_matches("quantum", "Unrelated", "Unrelated", &references, &authors, 100.0));
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert!(clears_limit("GRAVITY", "On Gravity and Tides", 100.0));
    }

    #[test]
    fn lower_limit_admits_partial_overlap() {
        assert!(!clears_limit("gravity waves", "On Gravity and Tides", 100.0));
        assert!(clears_limit("gravity waves", "On Gravity and Tides", 40.0));
    }

    #[test]
    fn no_requested_authors_is_vacuously_satisfied() {
        assert!(authors_satisfied(&[], &names(&["Anyone"]), 100.0));
        assert!(authors_satisfied(&[], &[], 100.0));
    }

    #[test]
    fn every_requested_author_must_match() {
        let paper_authors = names(&["Bob Carter", "Alice Smith"]);
        assert!(authors_satisfied(&names(&["alice", "bob"]), &paper_authors, 100.0));
        assert!(!authors_satisfied(&names(&["alice", "eve"]), &paper_authors, 100.0));
    }

    #[test]
    fn author_check_pops_in_order() {
        // "bob" sits on top of the stack, so it must be matched by an earlier
        // paper author than "alice".
        let requested = names(&["alice", "bob"]);
        assert!(authors_satisfied(&requested, &names(&["Bob Carter", "Alice Smith"]), 100.0));
        assert!(!authors_satisfied(&requested, &names(&["Alice Smith", "Bob Carter"]), 100.0));
    }

    #[test]
    fn one_paper_author_cannot_satisfy_two_requests() {
        let requested = names(&["ann", "ann"]);
        assert!(!authors_satisfied(&requested, &names(&["Ann Lee"]), 100.0));
        assert!(authors_satisfied(&requested, &names(&["Ann Lee", "Ann Lee"]), 100.0));
    }
}
