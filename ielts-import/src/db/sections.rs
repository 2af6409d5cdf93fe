//! `test_sections` collection

use super::{to_json, WriteOutcome};
use crate::documents::SectionDocument;
use ielts_common::{ids, time, DocId, Result};
use sqlx::SqlitePool;

/// Upsert by `(test_id, part_number)`
pub async fn upsert_section(
    pool: &SqlitePool,
    test_id: DocId,
    doc: &SectionDocument,
) -> Result<WriteOutcome> {
    let candidate = DocId::generate();
    let now = time::now_rfc3339();

    let returned: String = sqlx::query_scalar(
        r#"
        INSERT INTO test_sections (
            guid, test_id, section_type, part_number, title, range_start, range_end,
            resources, sort_order, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(test_id, part_number) DO UPDATE SET
            section_type = excluded.section_type,
            title = excluded.title,
            range_start = excluded.range_start,
            range_end = excluded.range_end,
            resources = excluded.resources,
            sort_order = excluded.sort_order,
            updated_at = excluded.updated_at,
            deleted_at = NULL
        RETURNING guid
        "#,
    )
    .bind(candidate.to_string())
    .bind(test_id.to_string())
    .bind(&doc.section_type)
    .bind(doc.part_number as i64)
    .bind(&doc.title)
    .bind(doc.question_range.start as i64)
    .bind(doc.question_range.end as i64)
    .bind(to_json(&doc.resources)?)
    .bind(doc.order as i64)
    .bind(&now)
    .bind(&now)
    .fetch_one(pool)
    .await?;

    WriteOutcome::from_returned(candidate, &returned)
}

/// Section of a Test by part number
pub async fn find_section_id(
    pool: &SqlitePool,
    test_id: DocId,
    part_number: u32,
) -> Result<Option<DocId>> {
    let guid: Option<String> = sqlx::query_scalar(
        "SELECT guid FROM test_sections WHERE test_id = ? AND part_number = ? AND deleted_at IS NULL",
    )
    .bind(test_id.to_string())
    .bind(part_number as i64)
    .fetch_optional(pool)
    .await?;

    guid.as_deref().map(ids::parse).transpose()
}

/// All Sections of a Test, in display order
pub async fn section_ids_for_test(pool: &SqlitePool, test_id: DocId) -> Result<Vec<DocId>> {
    let guids: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT guid FROM test_sections
        WHERE test_id = ? AND deleted_at IS NULL
        ORDER BY sort_order, part_number
        "#,
    )
    .bind(test_id.to_string())
    .fetch_all(pool)
    .await?;

    guids.iter().map(|g| ids::parse(g)).collect()
}
