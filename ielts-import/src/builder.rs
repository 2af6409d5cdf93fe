//! Document builder
//!
//! Turns one [`SourceTest`] into flat Test/Section/Group/Question batches
//! whose parent links are deterministic [`RefToken`]s:
//!
//! - Test: `{slug}`
//! - Section: `{slug}-part-{n}`
//! - Group: `{section}-group-{index}`
//!
//! No I/O happens here. A part without question sections gets one default
//! group (index 0) holding every answered question of that part.

use crate::classify::{detect_group_type, detect_question_type, extract_word_limit, standard_options};
use crate::collection::Collection;
use crate::documents::{
    CorrectAnswer, DocumentBatches, GroupDocument, QuestionDocument, QuestionRange, QuestionType,
    SectionDocument, SectionResources, TestDocument,
};
use crate::error::{ImportError, ImportResult};
use crate::refs::RefToken;
use crate::slug::{labels_from_slug, series_number, slug_from_url, slugify, test_slug};
use crate::source::{SourcePart, SourceQuestion, SourceQuestionSection, SourceTest};
use serde_json::Value;

pub const DEFAULT_DURATION_MINUTES: u32 = 60;
pub const DEFAULT_POINTS: u32 = 1;

#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    default_duration_minutes: u32,
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self {
            default_duration_minutes: DEFAULT_DURATION_MINUTES,
        }
    }
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_duration(mut self, minutes: u32) -> Self {
        self.default_duration_minutes = minutes;
        self
    }

    /// Build every document of one Test
    ///
    /// Fails only when no slug can be derived (no externalSlug, sourceUrl or
    /// title).
    pub fn build(&self, source: &SourceTest) -> ImportResult<DocumentBatches> {
        let slug = derive_slug(source);
        if slug.is_empty() {
            return Err(ImportError::malformed(
                Collection::Tests,
                source.title.as_str(),
                "cannot derive externalSlug from externalSlug, sourceUrl or title",
            ));
        }

        let test_ref = RefToken::for_test(&slug);
        let mut batches = DocumentBatches::default();

        for (order, part) in source.parts.iter().enumerate() {
            self.build_part(source, part, order as u32, &test_ref, &mut batches);
        }

        let (slug_series, slug_test_number) = labels_from_slug(&slug);
        let series = source.series.clone().or(slug_series);
        let test_number = source.test_number.clone().or(slug_test_number);

        batches.tests.push(TestDocument {
            reference: test_ref,
            external_slug: slug,
            title: source.title.trim().to_string(),
            test_type: "IELTS".to_string(),
            language: "English".to_string(),
            level: source.level.clone(),
            skill: source.skill.trim().to_lowercase(),
            hashtags: hashtags(series.as_deref(), &source.skill),
            description: Some(format!(
                "{} - practice test with answers",
                source.title.trim()
            )),
            series,
            test_number,
            duration_minutes: source
                .duration_minutes
                .unwrap_or(self.default_duration_minutes),
            total_questions: source
                .total_questions
                .unwrap_or(batches.questions.len() as u32),
            source_url: source.source_url.clone(),
        });

        Ok(batches)
    }

    fn build_part(
        &self,
        source: &SourceTest,
        part: &SourcePart,
        order: u32,
        test_ref: &RefToken,
        batches: &mut DocumentBatches,
    ) {
        let section_ref = RefToken::for_section(test_ref, part.part_number);
        let section_range = part
            .question_range
            .or_else(|| derive_part_range(source, part))
            .unwrap_or(QuestionRange::new(0, 0));

        batches.sections.push(SectionDocument {
            reference: section_ref.clone(),
            test_ref: test_ref.clone(),
            section_type: source.skill.trim().to_lowercase(),
            part_number: part.part_number,
            title: Some(
                part.title
                    .clone()
                    .unwrap_or_else(|| format!("Part {}", part.part_number)),
            ),
            question_range: section_range,
            resources: SectionResources {
                audio: part.audio.clone(),
                passage_html: part.passage_html.clone(),
                transcript_html: part.transcript_html.clone(),
                transcript_text: part.transcript_text.clone(),
                instructions: part.instructions.clone(),
            },
            order,
        });

        if part.question_sections.is_empty() {
            self.build_default_group(source, part, &section_ref, section_range, batches);
        } else {
            for (index, block) in part.question_sections.iter().enumerate() {
                self.build_group(source, part, block, index, &section_ref, batches);
            }
        }
    }

    fn build_group(
        &self,
        source: &SourceTest,
        part: &SourcePart,
        block: &SourceQuestionSection,
        index: usize,
        section_ref: &RefToken,
        batches: &mut DocumentBatches,
    ) {
        let group_ref = RefToken::for_group(section_ref, index);

        let questions: Vec<SourceQuestion> = if block.questions.is_empty() {
            // No itemised questions: one per answered number under the heading
            let numbers = heading_numbers(&block.heading)
                .or(block.question_range)
                .map(|r| r.numbers().collect::<Vec<_>>())
                .unwrap_or_default();
            numbers
                .into_iter()
                .filter(|n| source.answers.lookup(part.part_number, *n).is_some())
                .map(placeholder_question)
                .collect()
        } else {
            block.questions.clone()
        };

        let range = block
            .question_range
            .or_else(|| QuestionRange::covering(questions.iter().map(|q| q.question_number)))
            .or_else(|| heading_numbers(&block.heading))
            .unwrap_or(QuestionRange::new(0, 0));

        let mut shared_content = serde_json::Map::new();
        if let Some(html) = block.html.as_deref().filter(|h| !h.trim().is_empty()) {
            shared_content.insert("contextHtml".to_string(), Value::String(html.to_string()));
        }

        let title = if block.heading.trim().is_empty() {
            format!("Questions {}-{}", range.start, range.end)
        } else {
            block.heading.trim().to_string()
        };

        batches.groups.push(GroupDocument {
            reference: group_ref.clone(),
            section_ref: section_ref.clone(),
            group_type: detect_group_type(&block.instructions),
            title: Some(title),
            instructions: block.instructions.clone(),
            question_range: range,
            shared_content,
            order: index as u32,
        });

        for (order, question) in questions.iter().enumerate() {
            batches.questions.push(build_question(
                source,
                part,
                question,
                &block.instructions,
                &group_ref,
                order as u32,
            ));
        }
    }

    fn build_default_group(
        &self,
        source: &SourceTest,
        part: &SourcePart,
        section_ref: &RefToken,
        section_range: QuestionRange,
        batches: &mut DocumentBatches,
    ) {
        let group_ref = RefToken::for_group(section_ref, 0);
        let numbers: Vec<u32> = source
            .answers
            .for_part(part.part_number)
            .iter()
            .map(|e| e.question)
            .collect();
        let range = QuestionRange::covering(numbers.iter().copied()).unwrap_or(section_range);
        let instructions = part.instructions.clone().unwrap_or_default();

        batches.groups.push(GroupDocument {
            reference: group_ref.clone(),
            section_ref: section_ref.clone(),
            group_type: detect_group_type(&instructions),
            title: Some(format!("Questions {}-{}", range.start, range.end)),
            instructions: instructions.clone(),
            question_range: range,
            shared_content: serde_json::Map::new(),
            order: 0,
        });

        for (order, number) in numbers.into_iter().enumerate() {
            batches.questions.push(build_question(
                source,
                part,
                &placeholder_question(number),
                &instructions,
                &group_ref,
                order as u32,
            ));
        }
    }
}

fn build_question(
    source: &SourceTest,
    part: &SourcePart,
    question: &SourceQuestion,
    instructions: &str,
    group_ref: &RefToken,
    order: u32,
) -> QuestionDocument {
    let answer: Vec<String> = source
        .answers
        .lookup(part.part_number, question.question_number)
        .map(|v| v.to_vec())
        .unwrap_or_default();

    let question_type = question
        .question_type
        .as_deref()
        .and_then(QuestionType::from_label)
        .unwrap_or_else(|| detect_question_type(instructions, &answer));

    let options = if question.options.is_empty() {
        standard_options(question_type)
    } else {
        question.options.clone()
    };

    QuestionDocument {
        group_ref: group_ref.clone(),
        question_number: question.question_number,
        question_type,
        question_text: question.question_text.clone(),
        options,
        correct_answer: CorrectAnswer {
            value: answer,
            alternatives: Vec::new(),
        },
        explanation: None,
        points: DEFAULT_POINTS,
        order,
        word_limit: extract_word_limit(instructions),
    }
}

fn placeholder_question(number: u32) -> SourceQuestion {
    SourceQuestion {
        question_number: number,
        question_text: String::new(),
        question_type: None,
        options: Vec::new(),
    }
}

/// externalSlug → canonical series slug → sourceUrl → title
fn derive_slug(source: &SourceTest) -> String {
    if let Some(slug) = source.external_slug.as_deref().map(slugify) {
        if !slug.is_empty() {
            return slug;
        }
    }

    if let (Some(series), Some(test_label)) = (&source.series, &source.test_number) {
        if let Some(slug) = test_slug(series, &source.skill, test_label) {
            return slug;
        }
    }

    let from_url = if source.source_url.trim().is_empty() {
        String::new()
    } else {
        slug_from_url(&source.source_url)
    };
    if !from_url.is_empty() {
        return from_url;
    }

    slugify(&source.title)
}

/// Range covering every question number a part mentions
fn derive_part_range(source: &SourceTest, part: &SourcePart) -> Option<QuestionRange> {
    let from_blocks = part.question_sections.iter().flat_map(|block| {
        block
            .questions
            .iter()
            .map(|q| q.question_number)
            .chain(block.question_range.into_iter().flat_map(|r| [r.start, r.end]))
            .chain(heading_numbers(&block.heading).into_iter().flat_map(|r| [r.start, r.end]))
    });
    let from_answers = source
        .answers
        .for_part(part.part_number)
        .into_iter()
        .map(|e| e.question);

    QuestionRange::covering(from_blocks.chain(from_answers).filter(|n| *n > 0))
}

/// "Questions 14-18" → [14, 18], "Question 7" → [7, 7]
fn heading_numbers(heading: &str) -> Option<QuestionRange> {
    let numbers: Vec<u32> = heading
        .split(|c: char| !c.is_ascii_digit())
        .filter_map(|s| s.parse().ok())
        .collect();
    QuestionRange::covering(numbers)
}

fn hashtags(series: Option<&str>, skill: &str) -> Vec<String> {
    let mut tags = vec!["ielts".to_string()];
    if let Some(n) = series.and_then(series_number) {
        tags.push(format!("cambridge-ielts-{}", n));
    }
    let skill = slugify(skill);
    if !skill.is_empty() {
        tags.push(skill);
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::GroupType;

    fn source(json: &str) -> SourceTest {
        serde_json::from_str(json).unwrap()
    }

    const READING: &str = r#"{
        "title": "Cambridge IELTS 20 Reading Test 1",
        "skill": "Reading",
        "externalSlug": "cambridge-ielts-20-reading-test-1",
        "sourceUrl": "https://example.com/cam-20-reading-test-1/",
        "parts": [{
            "partNumber": 2,
            "questionRange": [14, 26],
            "passageHtml": "<p>passage</p>",
            "questionSections": [
                {
                    "heading": "Questions 14-18",
                    "instructions": "Do the following statements agree? Write TRUE, FALSE or NOT GIVEN",
                    "questions": [
                        {"questionNumber": 14, "questionText": "Bees sleep."},
                        {"questionNumber": 15, "questionText": "Bees dance."}
                    ]
                },
                {
                    "heading": "Questions 19-20",
                    "instructions": "Complete the notes below. Write ONE WORD ONLY."
                }
            ]
        }],
        "answers": {"parts": [{"part": 2, "answers": [
            {"question": 14, "value": "TRUE"},
            {"question": 15, "value": "NOT GIVEN"},
            {"question": 19, "value": "pollen"},
            {"question": 20, "value": "hive"}
        ]}]}
    }"#;

    #[test]
    fn test_tokens_are_deterministic() {
        let src = source(READING);
        let first = DocumentBuilder::new().build(&src).unwrap();
        let second = DocumentBuilder::new().build(&src).unwrap();
        assert_eq!(first, second);

        assert_eq!(first.tests[0].reference.as_str(), "cambridge-ielts-20-reading-test-1");
        assert_eq!(first.sections[0].reference.as_str(), "cambridge-ielts-20-reading-test-1-part-2");
        assert_eq!(
            first.groups[1].reference.as_str(),
            "cambridge-ielts-20-reading-test-1-part-2-group-1"
        );
    }

    #[test]
    fn test_parent_links() {
        let batches = DocumentBuilder::new().build(&source(READING)).unwrap();
        let test_ref = &batches.tests[0].reference;
        assert!(batches.sections.iter().all(|s| &s.test_ref == test_ref));
        assert!(batches
            .groups
            .iter()
            .all(|g| g.section_ref == batches.sections[0].reference));
        assert_eq!(batches.questions.len(), 4);
        assert_eq!(batches.questions[0].group_ref, batches.groups[0].reference);
        assert_eq!(batches.questions[3].group_ref, batches.groups[1].reference);
    }

    #[test]
    fn test_question_details() {
        let batches = DocumentBuilder::new().build(&source(READING)).unwrap();

        let q14 = &batches.questions[0];
        assert_eq!(q14.question_type, QuestionType::TrueFalseNotGiven);
        assert_eq!(q14.options.len(), 3);
        assert_eq!(q14.correct_answer.value, vec!["TRUE"]);

        // synthesized from the heading of the second block
        let q19 = &batches.questions[2];
        assert_eq!(q19.question_number, 19);
        assert_eq!(q19.word_limit, Some(1));
        assert_eq!(q19.question_type, QuestionType::SentenceCompletion);
        assert_eq!(batches.groups[1].group_type, GroupType::NoteCompletion);
        assert_eq!(batches.groups[1].question_range, QuestionRange::new(19, 20));
    }

    #[test]
    fn test_test_metadata() {
        let batches = DocumentBuilder::new().build(&source(READING)).unwrap();
        let test = &batches.tests[0];
        assert_eq!(test.skill, "reading");
        assert_eq!(test.total_questions, 4);
        assert_eq!(test.duration_minutes, DEFAULT_DURATION_MINUTES);
        assert_eq!(test.series.as_deref(), Some("Cambridge IELTS 20"));
        assert_eq!(test.test_number.as_deref(), Some("Test 1"));
        assert!(test.hashtags.contains(&"cambridge-ielts-20".to_string()));
    }

    #[test]
    fn test_default_group_for_part_without_sections() {
        let src = source(
            r#"{
            "title": "Listening Test 3",
            "skill": "listening",
            "sourceUrl": "https://example.com/cam-19-listening-test-3/",
            "parts": [{"partNumber": 1, "instructions": "Complete the form below."}],
            "answers": {"parts": [{"part": 1, "answers": [
                {"question": 3, "value": "Hilton"},
                {"question": 1, "value": "Kelly"}
            ]}]}
        }"#,
        );
        let batches = DocumentBuilder::new().build(&src).unwrap();

        assert_eq!(batches.tests[0].external_slug, "cam-19-listening-test-3");
        assert_eq!(batches.groups.len(), 1);
        let group = &batches.groups[0];
        assert!(group.reference.as_str().ends_with("-part-1-group-0"));
        assert_eq!(group.question_range, QuestionRange::new(1, 3));
        assert_eq!(group.group_type, GroupType::Form);
        assert_eq!(batches.sections[0].question_range, QuestionRange::new(1, 3));

        let numbers: Vec<u32> = batches.questions.iter().map(|q| q.question_number).collect();
        assert_eq!(numbers, vec![1, 3]);
    }

    #[test]
    fn test_default_group_without_answers_uses_part_range() {
        let src = source(
            r#"{"title": "T", "skill": "listening", "externalSlug": "t",
                "parts": [{"partNumber": 4, "questionRange": [31, 40]}]}"#,
        );
        let batches = DocumentBuilder::new().build(&src).unwrap();
        assert_eq!(batches.groups[0].question_range, QuestionRange::new(31, 40));
        assert!(batches.questions.is_empty());
    }

    #[test]
    fn test_slug_fallbacks() {
        let with_labels = source(
            r#"{"title": "x", "skill": "Listening", "series": "Cambridge IELTS 18",
                "testNumber": "Test 4", "sourceUrl": "https://example.com/other/"}"#,
        );
        assert_eq!(derive_slug(&with_labels), "cambridge-ielts-18-listening-test-4");

        let title_only = source(r#"{"title": "My Practice Test", "skill": "reading"}"#);
        assert_eq!(derive_slug(&title_only), "my-practice-test");
    }

    #[test]
    fn test_default_duration_override() {
        let src = source(r#"{"title": "T", "skill": "reading", "externalSlug": "t"}"#);
        let batches = DocumentBuilder::new().with_default_duration(45).build(&src).unwrap();
        assert_eq!(batches.tests[0].duration_minutes, 45);
        assert_eq!(batches.tests[0].total_questions, 0);
    }

    #[test]
    fn test_no_slug_is_malformed() {
        let src = source(r#"{"title": "   ", "skill": "reading"}"#);
        let result = DocumentBuilder::new().build(&src);
        assert!(matches!(result, Err(ImportError::MalformedDocument { .. })));
    }
}
