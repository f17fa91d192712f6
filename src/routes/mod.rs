pub mod auth;
pub mod documents;
pub mod featured;
pub mod journal;
pub mod papers;
pub mod search;

pub use documents::documents_routes;
pub use featured::featured_routes;
pub use journal::journal_routes;
pub use papers::papers_routes;
pub use search::search_routes;

use axum::{Json, http::StatusCode};

pub(crate) fn internal_error<E: ToString>(error: E) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"detail": error.to_string()})),
    )
}

pub(crate) fn not_found(detail: String) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"detail": detail})),
    )
}
