//! Shared fixtures for ielts-import integration tests

#![allow(dead_code)]

use ielts_import::builder::DocumentBuilder;
use ielts_import::db::Store;
use ielts_import::documents::DocumentBatches;
use ielts_import::source::SourceTest;
use serde_json::{json, Value};

/// Fresh in-memory store with the full schema
pub async fn setup_store() -> Store {
    Store::in_memory().await.expect("in-memory store")
}

/// Source Test JSON with `parts` parts, `groups` groups per part and
/// `questions` questions per group, numbered 1.. across the whole test,
/// every question answered
pub fn source_json(slug: &str, parts: u32, groups: u32, questions: u32) -> Value {
    let per_part = groups * questions;
    let mut part_values = Vec::new();
    let mut answer_parts = Vec::new();

    for p in 1..=parts {
        let part_start = (p - 1) * per_part + 1;
        let mut blocks = Vec::new();
        let mut answers = Vec::new();

        for g in 0..groups {
            let start = part_start + g * questions;
            let end = start + questions - 1;
            let items: Vec<Value> = (start..=end)
                .map(|n| json!({"questionNumber": n, "questionText": format!("Question {}", n)}))
                .collect();
            answers.extend((start..=end).map(|n| json!({"question": n, "value": format!("answer {}", n)})));

            blocks.push(json!({
                "heading": format!("Questions {}-{}", start, end),
                "instructions": "Write NO MORE THAN TWO WORDS for each answer.",
                "questions": items,
            }));
        }

        part_values.push(json!({
            "partNumber": p,
            "questionRange": [part_start, part_start + per_part - 1],
            "audio": format!("https://cdn.example.com/{}/part{}.mp3", slug, p),
            "questionSections": blocks,
        }));
        answer_parts.push(json!({"part": p, "answers": answers}));
    }

    json!({
        "title": format!("Test {}", slug),
        "skill": "listening",
        "externalSlug": slug,
        "sourceUrl": format!("https://example.com/{}/", slug),
        "parts": part_values,
        "answers": {"parts": answer_parts},
    })
}

pub fn source(slug: &str, parts: u32, groups: u32, questions: u32) -> SourceTest {
    serde_json::from_value(source_json(slug, parts, groups, questions)).expect("valid source")
}

/// Built batches for `tests` Tests of the given shape
pub fn batches(tests: u32, parts: u32, groups: u32, questions: u32) -> DocumentBatches {
    let builder = DocumentBuilder::new();
    let mut all = DocumentBatches::default();
    for t in 1..=tests {
        let built = builder
            .build(&source(&format!("fixture-test-{}", t), parts, groups, questions))
            .expect("fixture builds");
        all.merge(built);
    }
    all
}

/// Rows in one table
pub async fn count(store: &Store, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(store.pool())
        .await
        .expect("count query")
}
