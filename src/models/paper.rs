use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::{Correction, CorrectionResponse};

/// Lifecycle state of a paper. Stored as a string column; one row per paper
/// regardless of state, so moves are status updates rather than copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperStatus {
    Reviewing,
    Published,
    Retracted,
    /// Removed after retraction. The row is kept so the code is never reused.
    Deleted,
}

impl PaperStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reviewing => "reviewing",
            Self::Published => "published",
            Self::Retracted => "retracted",
            Self::Deleted => "deleted",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "reviewing" => Some(Self::Reviewing),
            "published" => Some(Self::Published),
            "retracted" => Some(Self::Retracted),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }

    /// Legal moves: reviewing → published, reviewing → deleted (reject),
    /// published → retracted, retracted → deleted (remove). Nothing re-enters
    /// reviewing.
    pub fn can_transition(self, next: PaperStatus) -> bool {
        matches!(
            (self, next),
            (Self::Reviewing, Self::Published)
                | (Self::Reviewing, Self::Deleted)
                | (Self::Published, Self::Retracted)
                | (Self::Retracted, Self::Deleted)
        )
    }
}

/// APA-like display shorthand. Also validates that `authors` is non-empty.
pub fn author_shorthand(authors: &[String]) -> Option<String> {
    match authors {
        [] => None,
        [only] => Some(only.clone()),
        [first, second] => Some(format!("{first} & {second}")),
        [first, ..] => Some(format!("{first} et al")),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Paper {
    pub code: String,
    pub title: String,
    pub abstract_text: String,
    pub authors_json: String,
    pub category: String,
    pub references_json: String,
    pub cited_by_json: String,
    pub status: String,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_json: String,
    pub published_at: Option<DateTime<Utc>>,
    pub retracted_at: Option<DateTime<Utc>>,
    pub document_name: String,
    pub document_mime: String,
}

impl Paper {
    pub fn into_response(self, corrections: Vec<Correction>) -> PaperResponse {
        PaperResponse {
            id: self.code,
            title: self.title,
            abstract_text: self.abstract_text,
            authors: parse_string_list_json(&self.authors_json),
            category: self.category,
            references: parse_string_list_json(&self.references_json),
            cited_by: parse_string_list_json(&self.cited_by_json),
            status: self.status,
            submitted: self.submitted_at,
            reviewed: parse_datetime_list_json(&self.reviewed_json),
            published: self.published_at,
            corrected: corrections.into_iter().map(CorrectionResponse::from).collect(),
            retracted: self.retracted_at,
            document_name: self.document_name,
            document_mimetype: self.document_mime,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperResponse {
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub authors: Vec<String>,
    pub category: String,
    pub references: Vec<String>,
    pub cited_by: Vec<String>,
    pub status: String,
    pub submitted: DateTime<Utc>,
    pub reviewed: Vec<DateTime<Utc>>,
    pub published: Option<DateTime<Utc>>,
    pub corrected: Vec<CorrectionResponse>,
    pub retracted: Option<DateTime<Utc>>,
    pub document_name: String,
    pub document_mimetype: String,
}

pub fn parse_string_list_json(raw: &str) -> Vec<String> {
    serde_json::from_str::<Vec<String>>(raw).unwrap_or_default()
}

pub fn parse_datetime_list_json(raw: &str) -> Vec<DateTime<Utc>> {
    serde_json::from_str::<Vec<DateTime<Utc>>>(raw).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn shorthand_follows_author_count() {
        assert_eq!(author_shorthand(&names(&["A"])).as_deref(), Some("A"));
        assert_eq!(author_shorthand(&names(&["A", "B"])).as_deref(), Some("A & B"));
        assert_eq!(
            author_shorthand(&names(&["A", "B", "C"])).as_deref(),
            Some("A et al")
        );
        assert_eq!(author_shorthand(&[]), None);
    }

    #[test]
    fn legal_transitions() {
        use PaperStatus::*;
        assert!(Reviewing.can_transition(Published));
        assert!(Reviewing.can_transition(Deleted));
        assert!(Published.can_transition(Retracted));
        assert!(Retracted.can_transition(Deleted));
    }

    #[test]
    fn published_never_reenters_reviewing() {
        use PaperStatus::*;
        assert!(!Published.can_transition(Reviewing));
        assert!(!Retracted.can_transition(Reviewing));
        assert!(!Published.can_transition(Deleted));
        assert!(!Deleted.can_transition(Reviewing));
        assert!(!Deleted.can_transition(Published));
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            PaperStatus::Reviewing,
            PaperStatus::Published,
            PaperStatus::Retracted,
            PaperStatus::Deleted,
        ] {
            assert_eq!(PaperStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PaperStatus::parse("archived"), None);
    }
}
