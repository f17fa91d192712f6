use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Correction {
    pub code: String,
    pub paper_code: String,
    pub corrected_at: DateTime<Utc>,
    pub description: String,
    pub document_name: String,
    pub document_mime: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionResponse {
    pub id: String,
    pub date: DateTime<Utc>,
    pub description: String,
    pub document_name: String,
}

impl From<Correction> for CorrectionResponse {
    fn from(correction: Correction) -> Self {
        Self {
            id: correction.code,
            date: correction.corrected_at,
            description: correction.description,
            document_name: correction.document_name,
        }
    }
}
