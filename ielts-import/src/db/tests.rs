//! `tests` collection

use super::{to_json, WriteOutcome};
use crate::documents::TestDocument;
use ielts_common::{ids, time, DocId, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

/// Test row as stored
#[derive(Debug, Clone)]
pub struct StoredTest {
    pub id: DocId,
    pub external_slug: String,
    pub title: String,
    pub skill: Option<String>,
    pub total_questions: i64,
    pub section_ids: Vec<DocId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upsert by `external_slug`
///
/// The denormalized `section_ids` list is left alone on update; it is
/// maintained by [`set_section_ids`].
pub async fn upsert_test(pool: &SqlitePool, doc: &TestDocument) -> Result<WriteOutcome> {
    let candidate = DocId::generate();
    let now = time::now_rfc3339();

    let returned: String = sqlx::query_scalar(
        r#"
        INSERT INTO tests (
            guid, external_slug, title, test_type, language, level, skill, series,
            test_number, duration_minutes, total_questions, hashtags, description,
            source_url, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(external_slug) DO UPDATE SET
            title = excluded.title,
            test_type = excluded.test_type,
            language = excluded.language,
            level = excluded.level,
            skill = excluded.skill,
            series = excluded.series,
            test_number = excluded.test_number,
            duration_minutes = excluded.duration_minutes,
            total_questions = excluded.total_questions,
            hashtags = excluded.hashtags,
            description = excluded.description,
            source_url = excluded.source_url,
            updated_at = excluded.updated_at,
            deleted_at = NULL
        RETURNING guid
        "#,
    )
    .bind(candidate.to_string())
    .bind(&doc.external_slug)
    .bind(&doc.title)
    .bind(&doc.test_type)
    .bind(&doc.language)
    .bind(&doc.level)
    .bind(&doc.skill)
    .bind(&doc.series)
    .bind(&doc.test_number)
    .bind(doc.duration_minutes as i64)
    .bind(doc.total_questions as i64)
    .bind(to_json(&doc.hashtags)?)
    .bind(&doc.description)
    .bind(&doc.source_url)
    .bind(&now)
    .bind(&now)
    .fetch_one(pool)
    .await?;

    WriteOutcome::from_returned(candidate, &returned)
}

pub async fn find_test_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<StoredTest>> {
    let row = sqlx::query(
        r#"
        SELECT guid, external_slug, title, skill, total_questions, section_ids,
               created_at, updated_at
        FROM tests
        WHERE external_slug = ? AND deleted_at IS NULL
        "#,
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let guid: String = row.get("guid");
            let section_ids: String = row.get("section_ids");
            let section_ids: Vec<DocId> = serde_json::from_str(&section_ids)?;
            let created_at: String = row.get("created_at");
            let updated_at: String = row.get("updated_at");

            Ok(Some(StoredTest {
                id: ids::parse(&guid)?,
                external_slug: row.get("external_slug"),
                title: row.get("title"),
                skill: row.get("skill"),
                total_questions: row.get("total_questions"),
                section_ids,
                created_at: time::parse_rfc3339(&created_at)?,
                updated_at: time::parse_rfc3339(&updated_at)?,
            }))
        }
        None => Ok(None),
    }
}

/// Replace the denormalized list of owned Section ids
pub async fn set_section_ids(pool: &SqlitePool, test_id: DocId, section_ids: &[DocId]) -> Result<()> {
    let result = sqlx::query("UPDATE tests SET section_ids = ?, updated_at = ? WHERE guid = ?")
        .bind(to_json(&section_ids)?)
        .bind(time::now_rfc3339())
        .bind(test_id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ielts_common::Error::NotFound(format!("test {}", test_id)));
    }
    Ok(())
}
