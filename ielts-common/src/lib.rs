//! # IELTS Common Library
//!
//! Shared code for the IELTS content tools:
//! - Database initialization and collection schema
//! - Configuration loading and path resolution
//! - Common error type
//! - Identifier and timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod ids;
pub mod time;

pub use error::{Error, Result};
pub use ids::DocId;
