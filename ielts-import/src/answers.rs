//! Answer records from the crawler's `answer.json`
//!
//! Each part of an answer file becomes one [`AnswerDocument`] keyed
//! symbolically by (test slug, part number). The importer links them to
//! their Test and Section either through the reference table of the same
//! run or by looking the parents up in storage.

use crate::collection::Collection;
use crate::documents::{AnswerDocument, AnswerKeyEntry};
use crate::error::{ImportError, ImportResult};
use crate::refs::RefToken;
use crate::slug::{slug_from_url, slugify};
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSource {
    #[serde(default)]
    pub test_slug: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub answers: Vec<AnswerPart>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPart {
    #[serde(default, alias = "part")]
    pub part_number: Option<u32>,
    #[serde(default)]
    pub transcript_html: String,
    #[serde(default)]
    pub answer_keys: Vec<AnswerKeyEntry>,
    #[serde(default)]
    pub audio_url: Option<String>,
}

impl AnswerSource {
    /// Explicit testSlug, else the slug of the source URL
    pub fn slug(&self) -> Option<String> {
        let explicit = self.test_slug.as_deref().map(slugify);
        let from_url = self.source_url.as_deref().map(slug_from_url);
        explicit
            .filter(|s| !s.is_empty())
            .or(from_url)
            .filter(|s| !s.is_empty())
    }
}

/// Answer file holding one object or an array of them
#[derive(Deserialize)]
#[serde(untagged)]
enum AnswerFile {
    Many(Vec<AnswerSource>),
    One(AnswerSource),
}

pub fn load_answer_sources(path: &Path) -> ImportResult<Vec<AnswerSource>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ImportError::Configuration(format!("Cannot read {}: {}", path.display(), e))
    })?;
    parse_answer_sources(&content)
        .map_err(|e| ImportError::Configuration(format!("Invalid answer file {}: {}", path.display(), e)))
}

pub fn parse_answer_sources(content: &str) -> serde_json::Result<Vec<AnswerSource>> {
    Ok(match serde_json::from_str(content)? {
        AnswerFile::Many(v) => v,
        AnswerFile::One(one) => vec![one],
    })
}

/// Answer documents built from answer sources
#[derive(Debug, Default)]
pub struct BuiltAnswers {
    pub documents: Vec<AnswerDocument>,
    /// Parts dropped for a missing slug or part number
    pub malformed: Vec<ImportError>,
}

pub fn build_answer_documents(sources: &[AnswerSource]) -> BuiltAnswers {
    let mut built = BuiltAnswers::default();

    for source in sources {
        let Some(slug) = source.slug() else {
            let err = ImportError::malformed(
                Collection::Answers,
                source.title.clone().unwrap_or_default(),
                "no testSlug or sourceUrl",
            );
            warn!(error = %err, "Skipping answer source");
            built.malformed.push(err);
            continue;
        };
        let test_ref = RefToken::for_test(&slug);

        for (index, part) in source.answers.iter().enumerate() {
            let Some(part_number) = part.part_number.filter(|n| *n > 0) else {
                let err = ImportError::malformed(
                    Collection::Answers,
                    format!("{}[{}]", slug, index),
                    "missing partNumber",
                );
                warn!(error = %err, "Skipping answer part");
                built.malformed.push(err);
                continue;
            };

            built.documents.push(AnswerDocument {
                section_ref: RefToken::for_section(&test_ref, part_number),
                test_ref: test_ref.clone(),
                part_number,
                transcript_html: part.transcript_html.clone(),
                answer_keys: part.answer_keys.clone(),
                audio_url: part.audio_url.clone(),
                source_url: source.source_url.clone(),
            });
        }
    }

    built
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANSWER_JSON: &str = r#"{
        "testSlug": "cambridge-ielts-20-listening-test-1",
        "sourceUrl": "https://example.com/cam-20-listening-test-1/",
        "answers": [
            {"partNumber": 1, "transcriptHtml": "<p>hi</p>",
             "answerKeys": [{"questionNumber": 1, "correctAnswer": "Kelly"}],
             "audioUrl": "https://cdn.example.com/p1.mp3"},
            {"partNumber": 2, "answerKeys": [{"questionNumber": 11, "correctAnswer": ["A", "C"]}]},
            {"transcriptHtml": "orphan"}
        ]
    }"#;

    #[test]
    fn test_build_from_single_object() {
        let sources = parse_answer_sources(ANSWER_JSON).unwrap();
        let built = build_answer_documents(&sources);

        assert_eq!(built.documents.len(), 2);
        assert_eq!(built.malformed.len(), 1);

        let first = &built.documents[0];
        assert_eq!(first.test_ref.as_str(), "cambridge-ielts-20-listening-test-1");
        assert_eq!(first.section_ref.as_str(), "cambridge-ielts-20-listening-test-1-part-1");
        assert_eq!(first.answer_keys[0].correct_answer, vec!["Kelly"]);
        assert_eq!(built.documents[1].answer_keys[0].correct_answer, vec!["A", "C"]);
    }

    #[test]
    fn test_array_and_url_fallback() {
        let sources = parse_answer_sources(
            r#"[{"sourceUrl": "https://example.com/cam-19-reading-test-2/", "answers": [{"part": 3}]}]"#,
        )
        .unwrap();
        let built = build_answer_documents(&sources);
        assert_eq!(built.documents[0].section_ref.as_str(), "cam-19-reading-test-2-part-3");
    }

    #[test]
    fn test_source_without_slug_is_malformed() {
        let sources = parse_answer_sources(r#"{"title": "x", "answers": [{"partNumber": 1}]}"#).unwrap();
        let built = build_answer_documents(&sources);
        assert!(built.documents.is_empty());
        assert!(matches!(
            built.malformed[0],
            ImportError::MalformedDocument { collection: Collection::Answers, .. }
        ));
    }
}
