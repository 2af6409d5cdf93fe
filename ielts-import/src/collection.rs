//! Named document collections

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the five content collections, in dependency order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Tests,
    Sections,
    Groups,
    Questions,
    Answers,
}

impl Collection {
    /// All collections, parents before children
    pub const ALL: [Collection; 5] = [
        Collection::Tests,
        Collection::Sections,
        Collection::Groups,
        Collection::Questions,
        Collection::Answers,
    ];

    /// Backing SQLite table
    pub fn table_name(&self) -> &'static str {
        match self {
            Collection::Tests => "tests",
            Collection::Sections => "test_sections",
            Collection::Groups => "question_groups",
            Collection::Questions => "questions",
            Collection::Answers => "answers",
        }
    }

    /// Batch file name inside a collections directory
    pub fn file_name(&self) -> &'static str {
        match self {
            Collection::Tests => "tests.json",
            Collection::Sections => "testsections.json",
            Collection::Groups => "questiongroups.json",
            Collection::Questions => "questions.json",
            Collection::Answers => "answers.json",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Collection::Tests => "tests",
            Collection::Sections => "sections",
            Collection::Groups => "groups",
            Collection::Questions => "questions",
            Collection::Answers => "answers",
        };
        f.write_str(name)
    }
}
