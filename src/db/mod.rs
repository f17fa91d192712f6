use sqlx::{MySqlPool, mysql::MySqlPoolOptions};

use crate::models::Correction;

pub async fn init_db(database_url: &str) -> Result<MySqlPool, sqlx::Error> {
    let pool = MySqlPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS papers (
            code VARCHAR(11) PRIMARY KEY,
            title VARCHAR(512) NOT NULL,
            abstract_text TEXT NOT NULL,
            authors_json JSON NOT NULL,
            category VARCHAR(128) NOT NULL,
            references_json JSON NOT NULL,
            cited_by_json JSON NOT NULL,
            status VARCHAR(16) NOT NULL,
            submitted_at DATETIME(6) NOT NULL,
            reviewed_json JSON NOT NULL,
            published_at DATETIME(6) NULL,
            retracted_at DATETIME(6) NULL,
            document_name VARCHAR(255) NOT NULL,
            document_mime VARCHAR(128) NOT NULL,
            INDEX idx_papers_status_submitted (status, submitted_at),
            INDEX idx_papers_status_published (status, published_at),
            INDEX idx_papers_category (category)
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS corrections (
            code VARCHAR(11) PRIMARY KEY,
            paper_code VARCHAR(11) NOT NULL,
            corrected_at DATETIME(6) NOT NULL,
            description TEXT NOT NULL,
            document_name VARCHAR(255) NOT NULL,
            document_mime VARCHAR(128) NOT NULL,
            INDEX idx_corrections_paper_code (paper_code),
            CONSTRAINT fk_corrections_paper_code FOREIGN KEY (paper_code) REFERENCES papers(code) ON DELETE CASCADE
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS featured (
            code VARCHAR(11) PRIMARY KEY,
            featured_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
            CONSTRAINT fk_featured_code FOREIGN KEY (code) REFERENCES papers(code) ON DELETE CASCADE
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(&pool)
    .await?;

    Ok(pool)
}

/// Existence check backing the identifier allocator. A code is taken if any
/// paper or correction row carries it; deleted papers keep their row, so their
/// codes stay reserved.
pub async fn code_in_use(pool: &MySqlPool, code: &str) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        SELECT 1 FROM papers WHERE code = ?
        UNION ALL
        SELECT 1 FROM corrections WHERE code = ?
        LIMIT 1
        "#,
    )
    .bind(code)
    .bind(code)
    .fetch_optional(pool)
    .await?;

    Ok(row.is_some())
}

pub async fn fetch_corrections(
    pool: &MySqlPool,
    paper_code: &str,
) -> Result<Vec<Correction>, sqlx::Error> {
    sqlx::query_as::<_, Correction>(
        r#"
        SELECT code, paper_code, corrected_at, description, document_name, document_mime
        FROM corrections
        WHERE paper_code = ?
        ORDER BY corrected_at ASC
        "#,
    )
    .bind(paper_code)
    .fetch_all(pool)
    .await
}
