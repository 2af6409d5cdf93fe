//! Documents emitted by the builder and consumed by the importer
//!
//! Parent links are symbolic ([`RefToken`]) until import. The JSON shape is
//! the batch-file format: camelCase fields, `_ref` for a document's own token,
//! `testRef` / `sectionRef` / `groupRef` for its parent.

use crate::collection::Collection;
use crate::error::{ImportError, ImportResult};
use crate::refs::RefToken;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive question-number range `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct QuestionRange {
    pub start: u32,
    pub end: u32,
}

impl QuestionRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Smallest range covering every number, `None` when empty
    pub fn covering(numbers: impl IntoIterator<Item = u32>) -> Option<Self> {
        numbers.into_iter().fold(None, |acc, n| match acc {
            None => Some(Self::new(n, n)),
            Some(r) => Some(Self::new(r.start.min(n), r.end.max(n))),
        })
    }

    /// Question numbers start at 1 and the range is not inverted
    pub fn is_valid(&self) -> bool {
        self.start >= 1 && self.start <= self.end
    }

    pub fn contains(&self, number: u32) -> bool {
        self.start <= number && number <= self.end
    }

    pub fn contains_range(&self, other: &QuestionRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn numbers(&self) -> std::ops::RangeInclusive<u32> {
        self.start..=self.end
    }
}

impl From<[u32; 2]> for QuestionRange {
    fn from([start, end]: [u32; 2]) -> Self {
        Self { start, end }
    }
}

impl From<QuestionRange> for [u32; 2] {
    fn from(range: QuestionRange) -> Self {
        [range.start, range.end]
    }
}

impl fmt::Display for QuestionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Question kinds recognised by the content backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    MultipleChoiceMultipleAnswers,
    FillInBlank,
    SentenceCompletion,
    TableCompletion,
    DiagramLabeling,
    Matching,
    #[serde(rename = "true_false_notgiven")]
    TrueFalseNotGiven,
    #[serde(rename = "yes_no_notgiven")]
    YesNoNotGiven,
    ShortAnswer,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::MultipleChoiceMultipleAnswers => "multiple_choice_multiple_answers",
            QuestionType::FillInBlank => "fill_in_blank",
            QuestionType::SentenceCompletion => "sentence_completion",
            QuestionType::TableCompletion => "table_completion",
            QuestionType::DiagramLabeling => "diagram_labeling",
            QuestionType::Matching => "matching",
            QuestionType::TrueFalseNotGiven => "true_false_notgiven",
            QuestionType::YesNoNotGiven => "yes_no_notgiven",
            QuestionType::ShortAnswer => "short_answer",
        }
    }

    /// Map a source label (including common crawler spellings) to a type
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let ty = match label.as_str() {
            "multiple_choice" | "multiple_choice_single" | "mcq" => QuestionType::MultipleChoice,
            "multiple_choice_multiple_answers" | "multiple_choice_multiple" => {
                QuestionType::MultipleChoiceMultipleAnswers
            }
            "fill_in_blank" | "gap_fill" | "form_completion" | "note_completion"
            | "summary_completion" => QuestionType::FillInBlank,
            "sentence_completion" => QuestionType::SentenceCompletion,
            "table_completion" => QuestionType::TableCompletion,
            "diagram_labeling" | "diagram_labelling" | "map_labeling" | "map_labelling"
            | "plan_labeling" | "flow_chart_completion" | "flowchart_completion" => {
                QuestionType::DiagramLabeling
            }
            "matching" | "matching_headings" | "matching_information" | "matching_features" => {
                QuestionType::Matching
            }
            "true_false_notgiven" | "true_false_not_given" | "tfng" => {
                QuestionType::TrueFalseNotGiven
            }
            "yes_no_notgiven" | "yes_no_not_given" | "ynng" => QuestionType::YesNoNotGiven,
            "short_answer" => QuestionType::ShortAnswer,
            _ => return None,
        };
        Some(ty)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Layout of a question group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupType {
    SharedPassage,
    SharedInstruction,
    Diagram,
    Table,
    FlowChart,
    Map,
    Plan,
    Form,
    NoteCompletion,
    Matching,
}

impl GroupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupType::SharedPassage => "shared_passage",
            GroupType::SharedInstruction => "shared_instruction",
            GroupType::Diagram => "diagram",
            GroupType::Table => "table",
            GroupType::FlowChart => "flow_chart",
            GroupType::Map => "map",
            GroupType::Plan => "plan",
            GroupType::Form => "form",
            GroupType::NoteCompletion => "note_completion",
            GroupType::Matching => "matching",
        }
    }
}

/// Option of a choice question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawOption")]
pub struct QuestionOption {
    pub key: String,
    pub text: String,
}

impl QuestionOption {
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
        }
    }
}

/// Options arrive either as `{key, text}` objects or as bare strings
#[derive(Deserialize)]
#[serde(untagged)]
enum RawOption {
    Keyed { key: String, text: String },
    Plain(String),
}

impl From<RawOption> for QuestionOption {
    fn from(raw: RawOption) -> Self {
        match raw {
            RawOption::Keyed { key, text } => Self { key, text },
            RawOption::Plain(text) => Self {
                key: text.clone(),
                text,
            },
        }
    }
}

/// Accepted answer plus acceptable variants
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectAnswer {
    #[serde(default)]
    pub value: Vec<String>,
    #[serde(default)]
    pub alternatives: Vec<String>,
}

impl CorrectAnswer {
    pub fn is_empty(&self) -> bool {
        self.value.iter().all(|v| v.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDocument {
    #[serde(rename = "_ref")]
    pub reference: RefToken,
    pub external_slug: String,
    pub title: String,
    #[serde(default = "default_test_type")]
    pub test_type: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub level: Option<String>,
    pub skill: String,
    #[serde(default)]
    pub series: Option<String>,
    #[serde(default)]
    pub test_number: Option<String>,
    pub duration_minutes: u32,
    pub total_questions: u32,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source_url: String,
}

fn default_test_type() -> String {
    "IELTS".to_string()
}

fn default_language() -> String {
    "English".to_string()
}

impl TestDocument {
    pub fn check(&self) -> ImportResult<()> {
        if self.external_slug.trim().is_empty() {
            return Err(ImportError::malformed(
                Collection::Tests,
                self.reference.as_str(),
                "empty externalSlug",
            ));
        }
        if self.title.trim().is_empty() {
            return Err(ImportError::malformed(
                Collection::Tests,
                self.reference.as_str(),
                "empty title",
            ));
        }
        Ok(())
    }
}

/// Media and text attached to a section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionResources {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passage_html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionDocument {
    #[serde(rename = "_ref")]
    pub reference: RefToken,
    pub test_ref: RefToken,
    pub section_type: String,
    pub part_number: u32,
    #[serde(default)]
    pub title: Option<String>,
    pub question_range: QuestionRange,
    #[serde(default)]
    pub resources: SectionResources,
    #[serde(default)]
    pub order: u32,
}

impl SectionDocument {
    pub fn check(&self) -> ImportResult<()> {
        if self.part_number == 0 {
            return Err(ImportError::malformed(
                Collection::Sections,
                self.reference.as_str(),
                "partNumber must be at least 1",
            ));
        }
        if !self.question_range.is_valid() {
            return Err(ImportError::malformed(
                Collection::Sections,
                self.reference.as_str(),
                format!("invalid questionRange {}", self.question_range),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDocument {
    #[serde(rename = "_ref")]
    pub reference: RefToken,
    pub section_ref: RefToken,
    pub group_type: GroupType,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub instructions: String,
    pub question_range: QuestionRange,
    #[serde(default)]
    pub shared_content: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub order: u32,
}

impl GroupDocument {
    pub fn check(&self) -> ImportResult<()> {
        if !self.question_range.is_valid() {
            return Err(ImportError::malformed(
                Collection::Groups,
                self.reference.as_str(),
                format!("invalid questionRange {}", self.question_range),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDocument {
    pub group_ref: RefToken,
    pub question_number: u32,
    pub question_type: QuestionType,
    #[serde(default)]
    pub question_text: String,
    #[serde(default)]
    pub options: Vec<QuestionOption>,
    #[serde(default)]
    pub correct_answer: CorrectAnswer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<serde_json::Value>,
    #[serde(default = "default_points")]
    pub points: u32,
    #[serde(default)]
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_limit: Option<u32>,
}

fn default_points() -> u32 {
    1
}

impl QuestionDocument {
    /// Log/summary label: `{groupRef}#{questionNumber}`
    pub fn subject(&self) -> String {
        format!("{}#{}", self.group_ref, self.question_number)
    }

    pub fn check(&self) -> ImportResult<()> {
        if self.question_number == 0 {
            return Err(ImportError::malformed(
                Collection::Questions,
                self.subject(),
                "questionNumber must be at least 1",
            ));
        }
        Ok(())
    }
}

/// One entry of an answer key: question number plus accepted answers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerKeyEntry {
    pub question_number: u32,
    #[serde(default, deserialize_with = "crate::source::one_or_many")]
    pub correct_answer: Vec<String>,
    #[serde(default)]
    pub alternatives: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDocument {
    pub test_ref: RefToken,
    pub section_ref: RefToken,
    pub part_number: u32,
    #[serde(default)]
    pub transcript_html: String,
    #[serde(default)]
    pub answer_keys: Vec<AnswerKeyEntry>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
}

impl AnswerDocument {
    pub fn subject(&self) -> String {
        self.section_ref.to_string()
    }

    pub fn check(&self) -> ImportResult<()> {
        if self.test_ref.is_empty() {
            return Err(ImportError::malformed(
                Collection::Answers,
                self.subject(),
                "empty testRef",
            ));
        }
        if self.part_number == 0 {
            return Err(ImportError::malformed(
                Collection::Answers,
                self.subject(),
                "partNumber must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Flat per-collection batches, each in emission order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentBatches {
    pub tests: Vec<TestDocument>,
    pub sections: Vec<SectionDocument>,
    pub groups: Vec<GroupDocument>,
    pub questions: Vec<QuestionDocument>,
    #[serde(default)]
    pub answers: Vec<AnswerDocument>,
    /// Batch-file elements that did not deserialize, skipped on import
    #[serde(skip)]
    pub rejected: Vec<RejectedDocument>,
}

/// One element of a batch file that is not a valid document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedDocument {
    pub collection: Collection,
    /// Position in the collection's JSON array
    pub index: usize,
    pub reason: String,
}

impl RejectedDocument {
    /// `questions.json[7]`
    pub fn subject(&self) -> String {
        format!("{}[{}]", self.collection.file_name(), self.index)
    }

    pub fn to_error(&self) -> ImportError {
        ImportError::malformed(self.collection, self.subject(), self.reason.as_str())
    }
}

impl DocumentBatches {
    pub fn count(&self, collection: Collection) -> usize {
        match collection {
            Collection::Tests => self.tests.len(),
            Collection::Sections => self.sections.len(),
            Collection::Groups => self.groups.len(),
            Collection::Questions => self.questions.len(),
            Collection::Answers => self.answers.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        Collection::ALL.iter().all(|c| self.count(*c) == 0)
    }

    /// Append `other`, replacing every document that belongs to a Test
    /// present in both
    pub fn merge(&mut self, other: DocumentBatches) {
        let replaced: Vec<RefToken> = other
            .tests
            .iter()
            .map(|t| t.reference.clone())
            .filter(|r| self.tests.iter().any(|t| &t.reference == r))
            .collect();

        if !replaced.is_empty() {
            self.remove_tests(&replaced);
        }

        self.tests.extend(other.tests);
        self.sections.extend(other.sections);
        self.groups.extend(other.groups);
        self.questions.extend(other.questions);
        self.answers.extend(other.answers);
        self.rejected.extend(other.rejected);
    }

    fn remove_tests(&mut self, tests: &[RefToken]) {
        let sections: Vec<RefToken> = self
            .sections
            .iter()
            .filter(|s| tests.contains(&s.test_ref))
            .map(|s| s.reference.clone())
            .collect();
        let groups: Vec<RefToken> = self
            .groups
            .iter()
            .filter(|g| sections.contains(&g.section_ref))
            .map(|g| g.reference.clone())
            .collect();

        self.tests.retain(|t| !tests.contains(&t.reference));
        self.sections.retain(|s| !tests.contains(&s.test_ref));
        self.groups.retain(|g| !sections.contains(&g.section_ref));
        self.questions.retain(|q| !groups.contains(&q.group_ref));
        self.answers.retain(|a| !tests.contains(&a.test_ref));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_basics() {
        let section = QuestionRange::new(11, 20);
        assert!(section.is_valid());
        assert!(section.contains_range(&QuestionRange::new(14, 18)));
        assert!(!section.contains_range(&QuestionRange::new(21, 25)));
        assert!(!QuestionRange::new(5, 3).is_valid());
        assert!(!QuestionRange::new(0, 0).is_valid());
        assert_eq!(QuestionRange::covering([7, 3, 5]), Some(QuestionRange::new(3, 7)));
        assert_eq!(QuestionRange::covering(Vec::new()), None);
    }

    #[test]
    fn test_range_json_is_pair() {
        let json = serde_json::to_string(&QuestionRange::new(1, 10)).unwrap();
        assert_eq!(json, "[1,10]");
        let back: QuestionRange = serde_json::from_str("[11,20]").unwrap();
        assert_eq!(back, QuestionRange::new(11, 20));
    }

    #[test]
    fn test_question_type_labels() {
        assert_eq!(
            QuestionType::from_label("True-False-Not Given"),
            Some(QuestionType::TrueFalseNotGiven)
        );
        assert_eq!(
            QuestionType::from_label("note_completion"),
            Some(QuestionType::FillInBlank)
        );
        assert_eq!(QuestionType::from_label("essay"), None);
        let json = serde_json::to_string(&QuestionType::YesNoNotGiven).unwrap();
        assert_eq!(json, "\"yes_no_notgiven\"");
    }

    #[test]
    fn test_option_accepts_plain_string() {
        let options: Vec<QuestionOption> =
            serde_json::from_str(r#"[{"key":"A","text":"a car"},"TRUE"]"#).unwrap();
        assert_eq!(options[0], QuestionOption::new("A", "a car"));
        assert_eq!(options[1], QuestionOption::new("TRUE", "TRUE"));
    }

    #[test]
    fn test_test_document_json_shape() {
        let doc = TestDocument {
            reference: RefToken::for_test("t-1"),
            external_slug: "t-1".to_string(),
            title: "T".to_string(),
            test_type: default_test_type(),
            language: default_language(),
            level: None,
            skill: "listening".to_string(),
            series: None,
            test_number: None,
            duration_minutes: 30,
            total_questions: 40,
            hashtags: vec![],
            description: None,
            source_url: String::new(),
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["_ref"], "t-1");
        assert_eq!(value["externalSlug"], "t-1");
        assert_eq!(value["durationMinutes"], 30);
        assert!(doc.check().is_ok());
    }

    #[test]
    fn test_malformed_question_number() {
        let q = QuestionDocument {
            group_ref: RefToken::new("g"),
            question_number: 0,
            question_type: QuestionType::ShortAnswer,
            question_text: String::new(),
            options: vec![],
            correct_answer: CorrectAnswer::default(),
            explanation: None,
            points: 1,
            order: 0,
            word_limit: None,
        };
        assert!(matches!(
            q.check(),
            Err(ImportError::MalformedDocument { collection: Collection::Questions, .. })
        ));
    }
}
