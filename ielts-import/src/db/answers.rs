//! `answers` collection

use super::{to_json, WriteOutcome};
use crate::documents::AnswerDocument;
use ielts_common::{time, DocId, Result};
use sqlx::SqlitePool;

/// Upsert by `(test_id, section_id)`
pub async fn upsert_answer(
    pool: &SqlitePool,
    test_id: DocId,
    section_id: DocId,
    doc: &AnswerDocument,
) -> Result<WriteOutcome> {
    let candidate = DocId::generate();
    let now = time::now_rfc3339();

    let returned: String = sqlx::query_scalar(
        r#"
        INSERT INTO answers (
            guid, test_id, section_id, part_number, transcript_html, answer_keys,
            audio_url, source_url, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(test_id, section_id) DO UPDATE SET
            part_number = excluded.part_number,
            transcript_html = excluded.transcript_html,
            answer_keys = excluded.answer_keys,
            audio_url = excluded.audio_url,
            source_url = excluded.source_url,
            updated_at = excluded.updated_at,
            deleted_at = NULL
        RETURNING guid
        "#,
    )
    .bind(candidate.to_string())
    .bind(test_id.to_string())
    .bind(section_id.to_string())
    .bind(doc.part_number as i64)
    .bind(&doc.transcript_html)
    .bind(to_json(&doc.answer_keys)?)
    .bind(&doc.audio_url)
    .bind(&doc.source_url)
    .bind(&now)
    .bind(&now)
    .fetch_one(pool)
    .await?;

    WriteOutcome::from_returned(candidate, &returned)
}
