//! Question and group classification from instruction text
//!
//! Instructions are matched as lowercase word sequences, so keywords never
//! fire inside longer words ("form" does not match "information").

use crate::documents::{GroupType, QuestionOption, QuestionType};

/// Instruction text split into lowercase words
struct Instructions {
    words: Vec<String>,
    joined: String,
}

impl Instructions {
    fn new(text: &str) -> Self {
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(|w| w.to_lowercase())
            .collect();
        let joined = format!(" {} ", words.join(" "));
        Self { words, joined }
    }

    fn has_word(&self, word: &str) -> bool {
        self.words.iter().any(|w| w == word)
    }

    fn has_any_word(&self, words: &[&str]) -> bool {
        words.iter().any(|w| self.has_word(w))
    }

    fn has_word_starting(&self, prefix: &str) -> bool {
        self.words.iter().any(|w| w.starts_with(prefix))
    }

    fn has_phrase(&self, phrase: &str) -> bool {
        self.joined.contains(&format!(" {} ", phrase))
    }

    fn has_any_phrase(&self, phrases: &[&str]) -> bool {
        phrases.iter().any(|p| self.has_phrase(p))
    }
}

/// Question type from instructions, falling back to the answer's shape
pub fn detect_question_type(instructions: &str, answer: &[String]) -> QuestionType {
    let inst = Instructions::new(instructions);

    if inst.has_any_phrase(&["choose the correct letter", "circle the correct letter"]) {
        if inst.has_any_phrase(&["choose two", "choose three", "two letters", "three letters"]) {
            return QuestionType::MultipleChoiceMultipleAnswers;
        }
        return QuestionType::MultipleChoice;
    }

    if inst.has_phrase("not given") {
        if inst.has_word("true") && inst.has_word("false") {
            return QuestionType::TrueFalseNotGiven;
        }
        if inst.has_word("yes") && inst.has_word("no") {
            return QuestionType::YesNoNotGiven;
        }
    }

    if inst.has_phrase("complete the") {
        if inst.has_word("table") {
            return QuestionType::TableCompletion;
        }
        if inst.has_any_word(&["flow", "flowchart", "diagram", "plan", "map"]) {
            return QuestionType::DiagramLabeling;
        }
        if inst.has_any_word(&["notes", "summary", "form", "sentences"]) {
            return QuestionType::SentenceCompletion;
        }
        return QuestionType::FillInBlank;
    }

    if inst.has_word_starting("label") && inst.has_any_word(&["diagram", "plan", "map"]) {
        return QuestionType::DiagramLabeling;
    }

    if inst.has_word_starting("match") {
        return QuestionType::Matching;
    }

    if inst.has_any_phrase(&["short answer", "answer the questions"])
        && inst.has_any_phrase(&["no more than", "one word"])
    {
        return QuestionType::ShortAnswer;
    }

    detect_from_answer(answer)
}

fn detect_from_answer(answer: &[String]) -> QuestionType {
    let Some(first) = answer.first().map(|v| v.trim()) else {
        return QuestionType::FillInBlank;
    };

    let is_letter = first.len() == 1 && matches!(first.as_bytes()[0], b'A'..=b'H');
    if is_letter {
        if answer.len() > 1 {
            return QuestionType::MultipleChoiceMultipleAnswers;
        }
        return QuestionType::MultipleChoice;
    }

    match first.to_ascii_uppercase().as_str() {
        "TRUE" | "FALSE" | "NOT GIVEN" => QuestionType::TrueFalseNotGiven,
        "YES" | "NO" => QuestionType::YesNoNotGiven,
        _ => QuestionType::FillInBlank,
    }
}

/// Word limit from phrases like "NO MORE THAN TWO WORDS" or
/// "ONE WORD ONLY"
pub fn extract_word_limit(instructions: &str) -> Option<u32> {
    let inst = Instructions::new(instructions);
    let words = &inst.words;

    let no_more_than = words
        .windows(5)
        .find(|w| w[0] == "no" && w[1] == "more" && w[2] == "than" && is_word_noun(&w[4]));
    if let Some(window) = no_more_than {
        return number_word(&window[3]);
    }

    words
        .windows(3)
        .find(|w| is_word_noun(&w[1]) && w[2] == "only")
        .and_then(|w| number_word(&w[0]))
}

fn is_word_noun(word: &str) -> bool {
    word == "word" || word == "words"
}

fn number_word(word: &str) -> Option<u32> {
    match word {
        "one" | "1" => Some(1),
        "two" | "2" => Some(2),
        "three" | "3" => Some(3),
        "four" | "4" => Some(4),
        _ => None,
    }
}

/// Group layout from instructions
pub fn detect_group_type(instructions: &str) -> GroupType {
    let inst = Instructions::new(instructions);

    if inst.has_word("diagram") {
        GroupType::Diagram
    } else if inst.has_word("table") {
        GroupType::Table
    } else if inst.has_any_word(&["flow", "flowchart"]) {
        GroupType::FlowChart
    } else if inst.has_word("map") {
        GroupType::Map
    } else if inst.has_word("plan") {
        GroupType::Plan
    } else if inst.has_word("form") {
        GroupType::Form
    } else if inst.has_any_word(&["note", "notes", "summary"]) {
        GroupType::NoteCompletion
    } else if inst.has_word_starting("match") {
        GroupType::Matching
    } else if inst.has_word("passage") {
        GroupType::SharedPassage
    } else {
        GroupType::SharedInstruction
    }
}

/// Fixed option list for judgement questions, empty for other types
pub fn standard_options(question_type: QuestionType) -> Vec<QuestionOption> {
    let labels: &[&str] = match question_type {
        QuestionType::TrueFalseNotGiven => &["TRUE", "FALSE", "NOT GIVEN"],
        QuestionType::YesNoNotGiven => &["YES", "NO", "NOT GIVEN"],
        _ => &[],
    };
    labels
        .iter()
        .map(|label| QuestionOption::new(*label, *label))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_multiple_choice_variants() {
        assert_eq!(
            detect_question_type("Choose the correct letter, A, B or C.", &[]),
            QuestionType::MultipleChoice
        );
        assert_eq!(
            detect_question_type("Choose TWO letters, A-E. Choose the correct letter.", &[]),
            QuestionType::MultipleChoiceMultipleAnswers
        );
    }

    #[test]
    fn test_judgement_types() {
        assert_eq!(
            detect_question_type("Write TRUE, FALSE or NOT GIVEN", &[]),
            QuestionType::TrueFalseNotGiven
        );
        assert_eq!(
            detect_question_type("Write YES, NO or NOT GIVEN", &[]),
            QuestionType::YesNoNotGiven
        );
    }

    #[test]
    fn test_completion_types() {
        assert_eq!(
            detect_question_type("Complete the table below.", &[]),
            QuestionType::TableCompletion
        );
        assert_eq!(
            detect_question_type("Complete the flow-chart below.", &[]),
            QuestionType::DiagramLabeling
        );
        assert_eq!(
            detect_question_type("Complete the notes below.", &[]),
            QuestionType::SentenceCompletion
        );
        assert_eq!(
            detect_question_type("Complete the gaps.", &[]),
            QuestionType::FillInBlank
        );
    }

    #[test]
    fn test_labelling_and_matching() {
        assert_eq!(
            detect_question_type("Label the map below.", &[]),
            QuestionType::DiagramLabeling
        );
        assert_eq!(
            detect_question_type("Match each statement with the correct person.", &[]),
            QuestionType::Matching
        );
    }

    #[test]
    fn test_answer_shape_fallback() {
        assert_eq!(detect_question_type("", &answer(&["B"])), QuestionType::MultipleChoice);
        assert_eq!(
            detect_question_type("", &answer(&["A", "D"])),
            QuestionType::MultipleChoiceMultipleAnswers
        );
        assert_eq!(
            detect_question_type("", &answer(&["NOT GIVEN"])),
            QuestionType::TrueFalseNotGiven
        );
        assert_eq!(detect_question_type("", &answer(&["NO"])), QuestionType::YesNoNotGiven);
        assert_eq!(detect_question_type("", &answer(&["library"])), QuestionType::FillInBlank);
        assert_eq!(detect_question_type("", &[]), QuestionType::FillInBlank);
    }

    #[test]
    fn test_word_limit() {
        assert_eq!(extract_word_limit("Write NO MORE THAN TWO WORDS for each answer."), Some(2));
        assert_eq!(extract_word_limit("Write ONE WORD ONLY for each answer."), Some(1));
        assert_eq!(
            extract_word_limit("Write NO MORE THAN THREE WORDS AND/OR A NUMBER"),
            Some(3)
        );
        assert_eq!(extract_word_limit("Choose the correct letter"), None);
    }

    #[test]
    fn test_group_type() {
        assert_eq!(detect_group_type("Label the diagram below."), GroupType::Diagram);
        assert_eq!(detect_group_type("Complete the form below."), GroupType::Form);
        assert_eq!(detect_group_type("Complete the notes below."), GroupType::NoteCompletion);
        assert_eq!(
            detect_group_type("Which paragraph contains the following information?"),
            GroupType::SharedInstruction
        );
        assert_eq!(
            detect_group_type("Read the passage and answer."),
            GroupType::SharedPassage
        );
    }

    #[test]
    fn test_standard_options() {
        let options = standard_options(QuestionType::TrueFalseNotGiven);
        assert_eq!(options.len(), 3);
        assert_eq!(options[2].key, "NOT GIVEN");
        assert!(standard_options(QuestionType::ShortAnswer).is_empty());
    }
}
