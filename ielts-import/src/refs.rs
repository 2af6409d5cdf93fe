//! Symbolic references and the reference table
//!
//! Documents built before anything is persisted point at their parents with
//! a [`RefToken`]. While importing, each persisted document registers its
//! token against the [`DocId`] storage assigned, and children resolve their
//! parent token through the same table.

use ielts_common::DocId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Placeholder for a storage id that does not exist yet
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefToken(String);

impl RefToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Token of a Test: its slug
    pub fn for_test(slug: &str) -> Self {
        Self(slug.to_string())
    }

    /// Token of a Section: `{test}-part-{n}`
    pub fn for_section(test: &RefToken, part_number: u32) -> Self {
        Self(format!("{}-part-{}", test.0, part_number))
    }

    /// Token of a Group: `{section}-group-{index}`
    pub fn for_group(section: &RefToken, index: usize) -> Self {
        Self(format!("{}-group-{}", section.0, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RefToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lookup of a token that was never registered
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No document registered for reference '{0}'")]
pub struct DanglingReference(pub RefToken);

/// In-memory token → storage id map, populated during one import run
#[derive(Debug, Default, Clone)]
pub struct RefTable {
    entries: HashMap<RefToken, DocId>,
}

impl RefTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token; a repeated token keeps the latest id
    pub fn put(&mut self, token: RefToken, id: DocId) -> Option<DocId> {
        let previous = self.entries.insert(token.clone(), id);
        if let Some(old) = previous {
            if old != id {
                debug!(token = %token, old = %old, new = %id, "Reference re-registered");
            }
        }
        previous
    }

    pub fn resolve(&self, token: &RefToken) -> Result<DocId, DanglingReference> {
        self.entries
            .get(token)
            .copied()
            .ok_or_else(|| DanglingReference(token.clone()))
    }

    pub fn contains(&self, token: &RefToken) -> bool {
        self.entries.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_formats() {
        let test = RefToken::for_test("cambridge-ielts-20-listening-test-1");
        let section = RefToken::for_section(&test, 2);
        let group = RefToken::for_group(&section, 0);

        assert_eq!(section.as_str(), "cambridge-ielts-20-listening-test-1-part-2");
        assert_eq!(
            group.as_str(),
            "cambridge-ielts-20-listening-test-1-part-2-group-0"
        );
    }

    #[test]
    fn test_put_then_resolve() {
        let mut table = RefTable::new();
        let token = RefToken::new("a");
        let id = DocId::generate();

        assert!(table.put(token.clone(), id).is_none());
        assert_eq!(table.resolve(&token), Ok(id));
        assert!(table.contains(&token));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_unknown_token_is_dangling() {
        let table = RefTable::new();
        let token = RefToken::new("nowhere-part-3");
        assert_eq!(table.resolve(&token), Err(DanglingReference(token)));
    }

    #[test]
    fn test_latest_put_wins() {
        let mut table = RefTable::new();
        let token = RefToken::new("a");
        let first = DocId::generate();
        let second = DocId::generate();

        table.put(token.clone(), first);
        assert_eq!(table.put(token.clone(), second), Some(first));
        assert_eq!(table.resolve(&token), Ok(second));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_token_serializes_as_string() {
        let json = serde_json::to_string(&RefToken::new("x-part-1")).unwrap();
        assert_eq!(json, "\"x-part-1\"");
    }
}
