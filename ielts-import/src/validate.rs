//! Batch validation
//!
//! Checks built batches before they are written or imported. Nothing here
//! rejects a batch; callers decide what to do with the findings.

use crate::documents::{DocumentBatches, QuestionRange, QuestionType};
use crate::refs::RefToken;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// start < 1 or start > end
    InvalidRange,
    /// Group range not inside its Section's range
    GroupOutsideSection,
    /// Question number not inside its Group's range
    QuestionOutsideGroup,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeViolation {
    pub kind: ViolationKind,
    /// Token of the offending document (`{groupRef}#{n}` for questions)
    pub subject: String,
    pub range: QuestionRange,
    /// Range of the containing document, when one applies
    pub container: Option<QuestionRange>,
}

impl fmt::Display for RangeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.container) {
            (ViolationKind::InvalidRange, _) => {
                write!(f, "{}: invalid range {}", self.subject, self.range)
            }
            (ViolationKind::GroupOutsideSection, Some(container)) => write!(
                f,
                "{}: group range {} outside section range {}",
                self.subject, self.range, container
            ),
            (ViolationKind::QuestionOutsideGroup, Some(container)) => write!(
                f,
                "{}: question outside group range {}",
                self.subject, container
            ),
            (_, None) => write!(f, "{}: range {} out of bounds", self.subject, self.range),
        }
    }
}

/// Range checks across sections, groups and questions
pub fn validate_ranges(batches: &DocumentBatches) -> Vec<RangeViolation> {
    let mut violations = Vec::new();

    let section_ranges: HashMap<&RefToken, QuestionRange> = batches
        .sections
        .iter()
        .map(|s| (&s.reference, s.question_range))
        .collect();
    let group_ranges: HashMap<&RefToken, QuestionRange> = batches
        .groups
        .iter()
        .map(|g| (&g.reference, g.question_range))
        .collect();

    for section in &batches.sections {
        if !section.question_range.is_valid() {
            violations.push(RangeViolation {
                kind: ViolationKind::InvalidRange,
                subject: section.reference.to_string(),
                range: section.question_range,
                container: None,
            });
        }
    }

    for group in &batches.groups {
        if !group.question_range.is_valid() {
            violations.push(RangeViolation {
                kind: ViolationKind::InvalidRange,
                subject: group.reference.to_string(),
                range: group.question_range,
                container: None,
            });
            continue;
        }
        if let Some(section_range) = section_ranges.get(&group.section_ref) {
            if section_range.is_valid() && !section_range.contains_range(&group.question_range) {
                violations.push(RangeViolation {
                    kind: ViolationKind::GroupOutsideSection,
                    subject: group.reference.to_string(),
                    range: group.question_range,
                    container: Some(*section_range),
                });
            }
        }
    }

    for question in &batches.questions {
        if let Some(group_range) = group_ranges.get(&question.group_ref) {
            if group_range.is_valid() && !group_range.contains(question.question_number) {
                violations.push(RangeViolation {
                    kind: ViolationKind::QuestionOutsideGroup,
                    subject: question.subject(),
                    range: QuestionRange::new(question.question_number, question.question_number),
                    container: Some(*group_range),
                });
            }
        }
    }

    violations
}

/// Everything worth flagging in a set of batches
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub range_violations: Vec<RangeViolation>,
    /// (test, question number) appearing more than once
    pub duplicate_questions: Vec<(RefToken, u32)>,
    /// Question numbers in 1..=totalQuestions with no Question document
    pub uncovered_questions: Vec<(RefToken, Vec<u32>)>,
    /// Tests missing title or externalSlug
    pub incomplete_tests: Vec<String>,
    /// Questions without a correct answer
    pub unanswered_questions: Vec<String>,
    /// Parent tokens with no document in the batches
    pub unknown_parents: Vec<String>,
    /// Batch-file elements that are not valid documents
    pub malformed_documents: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.range_violations.is_empty()
            && self.duplicate_questions.is_empty()
            && self.uncovered_questions.is_empty()
            && self.incomplete_tests.is_empty()
            && self.unanswered_questions.is_empty()
            && self.unknown_parents.is_empty()
            && self.malformed_documents.is_empty()
    }

    pub fn issue_count(&self) -> usize {
        self.range_violations.len()
            + self.duplicate_questions.len()
            + self.uncovered_questions.len()
            + self.incomplete_tests.len()
            + self.unanswered_questions.len()
            + self.unknown_parents.len()
            + self.malformed_documents.len()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return writeln!(f, "Validation: no issues");
        }
        writeln!(f, "Validation: {} issue(s)", self.issue_count())?;
        for v in &self.range_violations {
            writeln!(f, "  range: {}", v)?;
        }
        for (test, number) in &self.duplicate_questions {
            writeln!(f, "  duplicate: question {} in {}", number, test)?;
        }
        for (test, numbers) in &self.uncovered_questions {
            writeln!(f, "  uncovered: {} missing {:?}", test, numbers)?;
        }
        for subject in &self.incomplete_tests {
            writeln!(f, "  incomplete test: {}", subject)?;
        }
        for subject in &self.unanswered_questions {
            writeln!(f, "  no answer: {}", subject)?;
        }
        for subject in &self.unknown_parents {
            writeln!(f, "  unknown parent: {}", subject)?;
        }
        for subject in &self.malformed_documents {
            writeln!(f, "  malformed: {}", subject)?;
        }
        Ok(())
    }
}

/// Full validation: ranges, duplicates, coverage, required fields
pub fn validate_batches(batches: &DocumentBatches) -> ValidationReport {
    let mut report = ValidationReport {
        range_violations: validate_ranges(batches),
        malformed_documents: batches
            .rejected
            .iter()
            .map(|r| format!("{}: {}", r.subject(), r.reason))
            .collect(),
        ..Default::default()
    };

    let section_test: HashMap<&RefToken, &RefToken> = batches
        .sections
        .iter()
        .map(|s| (&s.reference, &s.test_ref))
        .collect();
    let group_test: HashMap<&RefToken, &RefToken> = batches
        .groups
        .iter()
        .filter_map(|g| section_test.get(&g.section_ref).map(|t| (&g.reference, *t)))
        .collect();
    let test_refs: BTreeSet<&RefToken> = batches.tests.iter().map(|t| &t.reference).collect();

    for test in &batches.tests {
        if test.check().is_err() {
            report.incomplete_tests.push(test.reference.to_string());
        }
    }

    for section in &batches.sections {
        if !test_refs.contains(&section.test_ref) {
            report
                .unknown_parents
                .push(format!("{} -> {}", section.reference, section.test_ref));
        }
    }
    for group in &batches.groups {
        if !section_test.contains_key(&group.section_ref) {
            report
                .unknown_parents
                .push(format!("{} -> {}", group.reference, group.section_ref));
        }
    }

    let mut numbers_by_test: BTreeMap<&RefToken, Vec<u32>> = BTreeMap::new();
    for question in &batches.questions {
        match group_test.get(&question.group_ref) {
            Some(test) => numbers_by_test
                .entry(*test)
                .or_default()
                .push(question.question_number),
            None => report
                .unknown_parents
                .push(format!("{} -> {}", question.subject(), question.group_ref)),
        }
        if question.correct_answer.is_empty() {
            report.unanswered_questions.push(question.subject());
        }
    }

    for test in &batches.tests {
        let mut numbers = numbers_by_test.remove(&test.reference).unwrap_or_default();
        numbers.sort_unstable();

        let mut duplicates: Vec<u32> = numbers.windows(2).filter(|w| w[0] == w[1]).map(|w| w[0]).collect();
        duplicates.dedup();
        report
            .duplicate_questions
            .extend(duplicates.into_iter().map(|n| (test.reference.clone(), n)));

        let present: BTreeSet<u32> = numbers.into_iter().collect();
        let missing: Vec<u32> = (1..=test.total_questions)
            .filter(|n| !present.contains(n))
            .collect();
        if !missing.is_empty() {
            report.uncovered_questions.push((test.reference.clone(), missing));
        }
    }

    report
}

/// Content statistics printed after a build
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub tests: usize,
    pub sections: usize,
    pub groups: usize,
    pub questions: usize,
    pub answers: usize,
    pub question_types: BTreeMap<QuestionType, usize>,
    pub answered_questions: usize,
    pub choice_questions: usize,
    pub choice_questions_with_options: usize,
    pub sections_with_audio: usize,
    pub sections_with_passage: usize,
}

impl ExportReport {
    pub fn from_batches(batches: &DocumentBatches) -> Self {
        let mut report = ExportReport {
            tests: batches.tests.len(),
            sections: batches.sections.len(),
            groups: batches.groups.len(),
            questions: batches.questions.len(),
            answers: batches.answers.len(),
            ..Default::default()
        };

        for question in &batches.questions {
            *report.question_types.entry(question.question_type).or_default() += 1;
            if !question.correct_answer.is_empty() {
                report.answered_questions += 1;
            }
            if matches!(
                question.question_type,
                QuestionType::MultipleChoice | QuestionType::MultipleChoiceMultipleAnswers
            ) {
                report.choice_questions += 1;
                if !question.options.is_empty() {
                    report.choice_questions_with_options += 1;
                }
            }
        }

        for section in &batches.sections {
            if section.resources.audio.is_some() {
                report.sections_with_audio += 1;
            }
            if section.resources.passage_html.is_some() {
                report.sections_with_passage += 1;
            }
        }

        report
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

impl fmt::Display for ExportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Built {} test(s), {} section(s), {} group(s), {} question(s), {} answer record(s)",
            self.tests, self.sections, self.groups, self.questions, self.answers
        )?;
        for (ty, count) in &self.question_types {
            writeln!(f, "  {:<34} {}", ty.as_str(), count)?;
        }
        writeln!(
            f,
            "  answered: {}/{} ({:.1}%)",
            self.answered_questions,
            self.questions,
            percent(self.answered_questions, self.questions)
        )?;
        writeln!(
            f,
            "  choice questions with options: {}/{}",
            self.choice_questions_with_options, self.choice_questions
        )?;
        writeln!(
            f,
            "  sections with audio: {}, with passage: {}",
            self.sections_with_audio, self.sections_with_passage
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Collection;
    use crate::documents::{
        CorrectAnswer, GroupDocument, GroupType, QuestionDocument, RejectedDocument,
        SectionDocument, SectionResources, TestDocument,
    };

    fn section(range: QuestionRange) -> SectionDocument {
        SectionDocument {
            reference: RefToken::new("t-part-2"),
            test_ref: RefToken::new("t"),
            section_type: "reading".to_string(),
            part_number: 2,
            title: None,
            question_range: range,
            resources: SectionResources::default(),
            order: 0,
        }
    }

    fn group(index: usize, range: QuestionRange) -> GroupDocument {
        GroupDocument {
            reference: RefToken::new(format!("t-part-2-group-{}", index)),
            section_ref: RefToken::new("t-part-2"),
            group_type: GroupType::SharedInstruction,
            title: None,
            instructions: String::new(),
            question_range: range,
            shared_content: Default::default(),
            order: index as u32,
        }
    }

    fn question(group: usize, number: u32, answer: &str) -> QuestionDocument {
        QuestionDocument {
            group_ref: RefToken::new(format!("t-part-2-group-{}", group)),
            question_number: number,
            question_type: QuestionType::ShortAnswer,
            question_text: String::new(),
            options: vec![],
            correct_answer: CorrectAnswer {
                value: vec![answer.to_string()],
                alternatives: vec![],
            },
            explanation: None,
            points: 1,
            order: 0,
            word_limit: None,
        }
    }

    fn test_doc(total: u32) -> TestDocument {
        TestDocument {
            reference: RefToken::new("t"),
            external_slug: "t".to_string(),
            title: "T".to_string(),
            test_type: "IELTS".to_string(),
            language: "English".to_string(),
            level: None,
            skill: "reading".to_string(),
            series: None,
            test_number: None,
            duration_minutes: 60,
            total_questions: total,
            hashtags: vec![],
            description: None,
            source_url: String::new(),
        }
    }

    #[test]
    fn test_group_inside_section_is_valid() {
        let batches = DocumentBatches {
            sections: vec![section(QuestionRange::new(11, 20))],
            groups: vec![group(0, QuestionRange::new(14, 18))],
            ..Default::default()
        };
        assert!(validate_ranges(&batches).is_empty());
    }

    #[test]
    fn test_group_outside_section_is_flagged() {
        let batches = DocumentBatches {
            sections: vec![section(QuestionRange::new(11, 20))],
            groups: vec![group(0, QuestionRange::new(21, 25))],
            ..Default::default()
        };
        let violations = validate_ranges(&batches);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::GroupOutsideSection);
        assert_eq!(violations[0].container, Some(QuestionRange::new(11, 20)));
        assert!(violations[0].to_string().contains("outside section range"));
    }

    #[test]
    fn test_inverted_and_question_ranges() {
        let batches = DocumentBatches {
            sections: vec![section(QuestionRange::new(11, 20))],
            groups: vec![group(0, QuestionRange::new(18, 14)), group(1, QuestionRange::new(11, 13))],
            questions: vec![question(1, 12, "a"), question(1, 19, "b")],
            ..Default::default()
        };
        let kinds: Vec<ViolationKind> = validate_ranges(&batches).iter().map(|v| v.kind).collect();
        assert_eq!(
            kinds,
            vec![ViolationKind::InvalidRange, ViolationKind::QuestionOutsideGroup]
        );
    }

    #[test]
    fn test_report_duplicates_coverage_answers() {
        let batches = DocumentBatches {
            tests: vec![test_doc(4)],
            sections: vec![section(QuestionRange::new(1, 4))],
            groups: vec![group(0, QuestionRange::new(1, 4))],
            questions: vec![
                question(0, 1, "x"),
                question(0, 2, ""),
                question(0, 2, "y"),
            ],
            ..Default::default()
        };
        let report = validate_batches(&batches);
        assert_eq!(report.duplicate_questions, vec![(RefToken::new("t"), 2)]);
        assert_eq!(report.uncovered_questions, vec![(RefToken::new("t"), vec![3, 4])]);
        assert_eq!(report.unanswered_questions, vec!["t-part-2-group-0#2".to_string()]);
        assert!(report.unknown_parents.is_empty());
        assert!(!report.is_clean());
    }

    #[test]
    fn test_report_unknown_parent() {
        let batches = DocumentBatches {
            tests: vec![test_doc(1)],
            sections: vec![section(QuestionRange::new(1, 1))],
            groups: vec![group(0, QuestionRange::new(1, 1))],
            questions: vec![question(0, 1, "x"), question(7, 1, "x")],
            ..Default::default()
        };
        let report = validate_batches(&batches);
        assert_eq!(report.unknown_parents.len(), 1);
        assert!(report.unknown_parents[0].contains("group-7"));
    }

    #[test]
    fn test_report_rejected_elements() {
        let batches = DocumentBatches {
            rejected: vec![RejectedDocument {
                collection: Collection::Questions,
                index: 4,
                reason: "missing field `questionNumber`".to_string(),
            }],
            ..Default::default()
        };
        let report = validate_batches(&batches);
        assert_eq!(report.issue_count(), 1);
        assert!(report.to_string().contains("malformed: questions.json[4]"));
    }

    #[test]
    fn test_export_report_counts() {
        let mut choice = question(0, 2, "B");
        choice.question_type = QuestionType::MultipleChoice;
        let batches = DocumentBatches {
            questions: vec![question(0, 1, "x"), choice],
            ..Default::default()
        };
        let report = ExportReport::from_batches(&batches);
        assert_eq!(report.questions, 2);
        assert_eq!(report.choice_questions, 1);
        assert_eq!(report.choice_questions_with_options, 0);
        assert_eq!(report.question_types.get(&QuestionType::ShortAnswer), Some(&1));
    }
}
