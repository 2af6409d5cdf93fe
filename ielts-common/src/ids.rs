//! Storage identifiers
//!
//! Every persisted document gets a UUIDv4 on first insert. The identifier is
//! stored as TEXT and never changes afterwards, even when the document is
//! updated in place by a natural-key upsert.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier assigned by storage to a persisted document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(Uuid);

impl DocId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl From<Uuid> for DocId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for DocId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Parse an identifier read back from a TEXT column
pub fn parse(s: &str) -> crate::Result<DocId> {
    s.parse()
        .map_err(|e| crate::Error::Internal(format!("Invalid document id '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique() {
        assert_ne!(DocId::generate(), DocId::generate());
    }

    #[test]
    fn test_display_parse_roundtrip() {
        let id = DocId::generate();
        assert_eq!(parse(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse("not-a-uuid").is_err());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = DocId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
    }
}
