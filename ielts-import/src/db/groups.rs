//! `question_groups` collection

use super::{to_json, WriteOutcome};
use crate::documents::GroupDocument;
use ielts_common::{time, DocId, Result};
use sqlx::SqlitePool;

/// Upsert by `(section_id, sort_order)`
pub async fn upsert_group(
    pool: &SqlitePool,
    section_id: DocId,
    doc: &GroupDocument,
) -> Result<WriteOutcome> {
    let candidate = DocId::generate();
    let now = time::now_rfc3339();

    let returned: String = sqlx::query_scalar(
        r#"
        INSERT INTO question_groups (
            guid, section_id, group_type, title, instructions, range_start, range_end,
            shared_content, sort_order, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(section_id, sort_order) DO UPDATE SET
            group_type = excluded.group_type,
            title = excluded.title,
            instructions = excluded.instructions,
            range_start = excluded.range_start,
            range_end = excluded.range_end,
            shared_content = excluded.shared_content,
            updated_at = excluded.updated_at,
            deleted_at = NULL
        RETURNING guid
        "#,
    )
    .bind(candidate.to_string())
    .bind(section_id.to_string())
    .bind(doc.group_type.as_str())
    .bind(&doc.title)
    .bind(&doc.instructions)
    .bind(doc.question_range.start as i64)
    .bind(doc.question_range.end as i64)
    .bind(to_json(&doc.shared_content)?)
    .bind(doc.order as i64)
    .bind(&now)
    .bind(&now)
    .fetch_one(pool)
    .await?;

    WriteOutcome::from_returned(candidate, &returned)
}
