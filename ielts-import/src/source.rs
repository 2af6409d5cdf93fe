//! Crawler intermediate JSON (one Test per file)
//!
//! Field names follow the crawler's camelCase output. Everything except the
//! title, skill and parts is optional; the builder derives what is missing.

use crate::documents::{QuestionOption, QuestionRange};
use crate::error::{ImportError, ImportResult};
use serde::{Deserialize, Deserializer};
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceTest {
    pub title: String,
    pub skill: String,
    #[serde(default)]
    pub external_slug: Option<String>,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub series: Option<String>,
    #[serde(default)]
    pub test_number: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub total_questions: Option<u32>,
    #[serde(default)]
    pub parts: Vec<SourcePart>,
    #[serde(default)]
    pub answers: AnswerKey,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcePart {
    #[serde(alias = "part")]
    pub part_number: u32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "optional_range")]
    pub question_range: Option<QuestionRange>,
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub passage_html: Option<String>,
    #[serde(default)]
    pub transcript_html: Option<String>,
    #[serde(default)]
    pub transcript_text: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub question_sections: Vec<SourceQuestionSection>,
}

/// A block of questions sharing a heading and instructions
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceQuestionSection {
    #[serde(default)]
    pub heading: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default, deserialize_with = "optional_range")]
    pub question_range: Option<QuestionRange>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub questions: Vec<SourceQuestion>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceQuestion {
    pub question_number: u32,
    #[serde(default)]
    pub question_text: String,
    #[serde(default)]
    pub question_type: Option<String>,
    #[serde(default)]
    pub options: Vec<QuestionOption>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnswerKey {
    #[serde(default)]
    pub parts: Vec<PartAnswers>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartAnswers {
    pub part: u32,
    #[serde(default)]
    pub answers: Vec<AnswerEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerEntry {
    pub question: u32,
    #[serde(default, deserialize_with = "one_or_many")]
    pub value: Vec<String>,
}

impl AnswerKey {
    /// Answers of one part, sorted by question number
    pub fn for_part(&self, part: u32) -> Vec<&AnswerEntry> {
        let mut entries: Vec<&AnswerEntry> = self
            .parts
            .iter()
            .filter(|p| p.part == part)
            .flat_map(|p| p.answers.iter())
            .collect();
        entries.sort_by_key(|e| e.question);
        entries
    }

    /// Answer to a question, preferring its own part and falling back to any
    /// part (crawled keys are sometimes filed under the wrong part)
    pub fn lookup(&self, part: u32, question: u32) -> Option<&[String]> {
        let in_part = self
            .parts
            .iter()
            .filter(|p| p.part == part)
            .flat_map(|p| p.answers.iter())
            .find(|e| e.question == question);

        in_part
            .or_else(|| {
                self.parts
                    .iter()
                    .flat_map(|p| p.answers.iter())
                    .find(|e| e.question == question)
            })
            .map(|e| e.value.as_slice())
    }
}

/// Read one source Test file
pub fn load_source(path: &Path) -> ImportResult<SourceTest> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ImportError::Configuration(format!("Cannot read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        ImportError::Configuration(format!("Invalid source JSON {}: {}", path.display(), e))
    })
}

/// Accept a single string or a list of strings
pub fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
        Missing(()),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) if s.trim().is_empty() => Vec::new(),
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
        OneOrMany::Missing(()) => Vec::new(),
    })
}

/// `[start, end]`, with `[]` or `null` meaning "not given"
fn optional_range<'de, D>(deserializer: D) -> Result<Option<QuestionRange>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<u32>> = Option::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some([]) => Ok(None),
        Some([start, end]) => Ok(Some(QuestionRange::new(*start, *end))),
        Some(other) => Err(serde::de::Error::invalid_length(
            other.len(),
            &"an empty array or [start, end]",
        )),
    }
}
