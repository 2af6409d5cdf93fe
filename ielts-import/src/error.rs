//! Error types for ielts-import
//!
//! Per-document failures (dangling reference, malformed document, storage
//! write failure) are caught by the importer, logged and counted as skips.
//! Only configuration errors abort a run.

use crate::collection::Collection;
use crate::refs::RefToken;
use crate::summary::SkipReason;
use thiserror::Error;

/// Result type for import operations
pub type ImportResult<T> = std::result::Result<T, ImportError>;

/// Import pipeline error
#[derive(Debug, Error)]
pub enum ImportError {
    /// A parent token had no entry in the reference table
    #[error("Dangling reference in {collection}: {token}")]
    DanglingReference {
        collection: Collection,
        token: RefToken,
    },

    /// A document is missing required fields or has an impossible shape
    #[error("Malformed {collection} document {subject}: {reason}")]
    MalformedDocument {
        collection: Collection,
        subject: String,
        reason: String,
    },

    /// Storage rejected the write, or kept failing until attempts ran out
    #[error(
        "Storage write failed for {collection} document {subject} ({}): {message}",
        severity(.transient)
    )]
    StorageWriteFailure {
        collection: Collection,
        subject: String,
        transient: bool,
        message: String,
    },

    /// Missing input files, unreadable config, storage unavailable
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// ielts-common error
    #[error("Common error: {0}")]
    Common(#[from] ielts_common::Error),
}

fn severity(transient: &bool) -> &'static str {
    if *transient {
        "transient"
    } else {
        "permanent"
    }
}

impl ImportError {
    pub fn malformed(
        collection: Collection,
        subject: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ImportError::MalformedDocument {
            collection,
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    /// Skip category for per-document failures, `None` for fatal ones
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            ImportError::DanglingReference { .. } => Some(SkipReason::DanglingReference),
            ImportError::MalformedDocument { .. } => Some(SkipReason::MalformedDocument),
            ImportError::StorageWriteFailure { transient: true, .. } => {
                Some(SkipReason::TransientStorageFailure)
            }
            ImportError::StorageWriteFailure { transient: false, .. } => {
                Some(SkipReason::PermanentStorageFailure)
            }
            ImportError::Configuration(_) | ImportError::Common(_) => None,
        }
    }

    /// True when the whole run must stop
    pub fn is_fatal(&self) -> bool {
        self.skip_reason().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_document_errors_are_not_fatal() {
        let dangling = ImportError::DanglingReference {
            collection: Collection::Questions,
            token: RefToken::new("missing-group"),
        };
        assert!(!dangling.is_fatal());
        assert_eq!(dangling.skip_reason(), Some(SkipReason::DanglingReference));

        let storage = ImportError::StorageWriteFailure {
            collection: Collection::Tests,
            subject: "t".to_string(),
            transient: false,
            message: "CHECK constraint failed".to_string(),
        };
        assert_eq!(storage.skip_reason(), Some(SkipReason::PermanentStorageFailure));
        assert!(storage.to_string().contains("permanent"));
    }

    #[test]
    fn test_configuration_error_is_fatal() {
        let err = ImportError::Configuration("tests.json not found".to_string());
        assert!(err.is_fatal());
        assert!(err.skip_reason().is_none());
    }

    #[test]
    fn test_dangling_message_names_token() {
        let err = ImportError::DanglingReference {
            collection: Collection::Groups,
            token: RefToken::new("cam-20-part-9"),
        };
        assert!(err.to_string().contains("cam-20-part-9"));
    }
}
