//! `questions` collection

use super::{to_json, WriteOutcome};
use crate::documents::{CorrectAnswer, QuestionDocument};
use ielts_common::{ids, time, DocId, Result};
use sqlx::{Row, SqlitePool};
use tracing::debug;

/// Question row as stored
#[derive(Debug, Clone)]
pub struct StoredQuestion {
    pub id: DocId,
    pub group_id: DocId,
    pub question_number: i64,
    pub question_type: String,
    pub correct_answer: CorrectAnswer,
    pub word_limit: Option<i64>,
}

/// Upsert by `(group_id, question_number)`
///
/// A question number is unique per Test: a row with the same number under
/// another group of the same Test is removed in the same transaction.
pub async fn upsert_question(
    pool: &SqlitePool,
    group_id: DocId,
    doc: &QuestionDocument,
) -> Result<WriteOutcome> {
    let candidate = DocId::generate();
    let now = time::now_rfc3339();
    let explanation = doc.explanation.as_ref().map(to_json).transpose()?;

    let mut tx = pool.begin().await?;

    let moved = sqlx::query(
        r#"
        DELETE FROM questions
        WHERE question_number = ?
          AND group_id <> ?
          AND group_id IN (
              SELECT g.guid FROM question_groups g
              JOIN test_sections s ON g.section_id = s.guid
              WHERE s.test_id = (
                  SELECT s2.test_id FROM question_groups g2
                  JOIN test_sections s2 ON g2.section_id = s2.guid
                  WHERE g2.guid = ?
              )
          )
        "#,
    )
    .bind(doc.question_number as i64)
    .bind(group_id.to_string())
    .bind(group_id.to_string())
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if moved > 0 {
        debug!(
            question = doc.question_number,
            group = %group_id,
            "Removed question row left in another group"
        );
    }

    let returned: String = sqlx::query_scalar(
        r#"
        INSERT INTO questions (
            guid, group_id, question_number, question_type, question_text, options,
            correct_answer, explanation, points, sort_order, word_limit,
            created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(group_id, question_number) DO UPDATE SET
            question_type = excluded.question_type,
            question_text = excluded.question_text,
            options = excluded.options,
            correct_answer = excluded.correct_answer,
            explanation = COALESCE(excluded.explanation, questions.explanation),
            points = excluded.points,
            sort_order = excluded.sort_order,
            word_limit = excluded.word_limit,
            updated_at = excluded.updated_at,
            deleted_at = NULL
        RETURNING guid
        "#,
    )
    .bind(candidate.to_string())
    .bind(group_id.to_string())
    .bind(doc.question_number as i64)
    .bind(doc.question_type.as_str())
    .bind(&doc.question_text)
    .bind(to_json(&doc.options)?)
    .bind(to_json(&doc.correct_answer)?)
    .bind(explanation)
    .bind(doc.points as i64)
    .bind(doc.order as i64)
    .bind(doc.word_limit.map(|w| w as i64))
    .bind(&now)
    .bind(&now)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    WriteOutcome::from_returned(candidate, &returned)
}

/// Questions of a Group, in question-number order
pub async fn questions_for_group(pool: &SqlitePool, group_id: DocId) -> Result<Vec<StoredQuestion>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, group_id, question_number, question_type, correct_answer, word_limit
        FROM questions
        WHERE group_id = ? AND deleted_at IS NULL
        ORDER BY question_number
        "#,
    )
    .bind(group_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let guid: String = row.get("guid");
            let group: String = row.get("group_id");
            let correct_answer: String = row.get("correct_answer");
            Ok(StoredQuestion {
                id: ids::parse(&guid)?,
                group_id: ids::parse(&group)?,
                question_number: row.get("question_number"),
                question_type: row.get("question_type"),
                correct_answer: serde_json::from_str(&correct_answer)?,
                word_limit: row.get("word_limit"),
            })
        })
        .collect()
}
