//! ielts-import library
//!
//! Turns crawled IELTS practice tests into linked document collections:
//! builds Test/Section/Group/Question documents that point at their parents
//! through symbolic references, then imports them parent-first, resolving
//! each reference to the storage id of a document persisted earlier in the
//! same run.

pub mod answers;
pub mod batch_files;
pub mod builder;
pub mod classify;
pub mod collection;
pub mod db;
pub mod direct;
pub mod documents;
pub mod error;
pub mod importer;
pub mod refs;
pub mod slug;
pub mod source;
pub mod summary;
pub mod utils;
pub mod validate;

pub use crate::collection::Collection;
pub use crate::error::{ImportError, ImportResult};
pub use crate::importer::{ImportOptions, Importer, ParentResolution};
pub use crate::refs::{DanglingReference, RefTable, RefToken};
pub use crate::summary::{ImportSummary, SkipReason};
