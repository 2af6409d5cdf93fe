//! Collection batch files
//!
//! A collections directory holds one pretty-printed JSON array per
//! collection. `tests.json`, `testsections.json`, `questiongroups.json` and
//! `questions.json` are required for import; `answers.json` is optional.
//!
//! Elements are deserialized one by one. An element that does not fit its
//! document type is kept as a [`RejectedDocument`] and the rest of the file
//! still loads; only a missing file or one that is not a JSON array fails.

use crate::collection::Collection;
use crate::documents::{DocumentBatches, RejectedDocument};
use crate::error::{ImportError, ImportResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

/// Write every batch into `dir`, creating it when needed
///
/// `answers.json` is written only when there are Answer documents.
pub fn write_batches(dir: &Path, batches: &DocumentBatches) -> ImportResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| {
        ImportError::Configuration(format!("Cannot create {}: {}", dir.display(), e))
    })?;

    write_array(dir, Collection::Tests, &batches.tests)?;
    write_array(dir, Collection::Sections, &batches.sections)?;
    write_array(dir, Collection::Groups, &batches.groups)?;
    write_array(dir, Collection::Questions, &batches.questions)?;
    if !batches.answers.is_empty() {
        write_array(dir, Collection::Answers, &batches.answers)?;
    }

    info!(
        dir = %dir.display(),
        tests = batches.tests.len(),
        sections = batches.sections.len(),
        groups = batches.groups.len(),
        questions = batches.questions.len(),
        answers = batches.answers.len(),
        "Wrote collection batch files"
    );
    Ok(())
}

/// Read the batch files of `dir`
///
/// A missing required file, or a file that is not a JSON array, is a
/// configuration error. Invalid elements end up in `rejected`.
pub fn read_batches(dir: &Path) -> ImportResult<DocumentBatches> {
    let mut rejected = Vec::new();
    let tests = read_array(dir, Collection::Tests, &mut rejected)?;
    let sections = read_array(dir, Collection::Sections, &mut rejected)?;
    let groups = read_array(dir, Collection::Groups, &mut rejected)?;
    let questions = read_array(dir, Collection::Questions, &mut rejected)?;
    let answers = read_optional_array(dir, Collection::Answers, &mut rejected)?;

    Ok(DocumentBatches {
        tests,
        sections,
        groups,
        questions,
        answers,
        rejected,
    })
}

/// Read `dir` if it already holds batch files, else start empty
pub fn read_existing(dir: &Path) -> ImportResult<DocumentBatches> {
    if dir.join(Collection::Tests.file_name()).exists() {
        read_batches(dir)
    } else {
        Ok(DocumentBatches::default())
    }
}

/// Write one collection file into an existing directory
pub fn write_collection<T: Serialize>(
    dir: &Path,
    collection: Collection,
    docs: &[T],
) -> ImportResult<()> {
    write_array(dir, collection, docs)
}

fn write_array<T: Serialize>(dir: &Path, collection: Collection, docs: &[T]) -> ImportResult<()> {
    let path = dir.join(collection.file_name());
    let json = serde_json::to_string_pretty(docs).map_err(ielts_common::Error::from)?;
    std::fs::write(&path, json).map_err(|e| {
        ImportError::Configuration(format!("Cannot write {}: {}", path.display(), e))
    })?;
    debug!(file = %path.display(), count = docs.len(), "Wrote batch file");
    Ok(())
}

fn read_array<T: DeserializeOwned>(
    dir: &Path,
    collection: Collection,
    rejected: &mut Vec<RejectedDocument>,
) -> ImportResult<Vec<T>> {
    let path = dir.join(collection.file_name());
    if !path.exists() {
        return Err(ImportError::Configuration(format!(
            "Required batch file not found: {}",
            path.display()
        )));
    }
    parse_file(&path, collection, rejected)
}

fn read_optional_array<T: DeserializeOwned>(
    dir: &Path,
    collection: Collection,
    rejected: &mut Vec<RejectedDocument>,
) -> ImportResult<Vec<T>> {
    let path = dir.join(collection.file_name());
    if !path.exists() {
        debug!(file = %path.display(), "Optional batch file absent");
        return Ok(Vec::new());
    }
    parse_file(&path, collection, rejected)
}

fn parse_file<T: DeserializeOwned>(
    path: &Path,
    collection: Collection,
    rejected: &mut Vec<RejectedDocument>,
) -> ImportResult<Vec<T>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ImportError::Configuration(format!("Cannot read {}: {}", path.display(), e))
    })?;
    let elements: Vec<Value> = serde_json::from_str(&content).map_err(|e| {
        ImportError::Configuration(format!("Invalid batch file {}: {}", path.display(), e))
    })?;

    let mut docs = Vec::with_capacity(elements.len());
    for (index, element) in elements.into_iter().enumerate() {
        match serde_json::from_value(element) {
            Ok(doc) => docs.push(doc),
            Err(e) => {
                warn!(file = %path.display(), index, error = %e, "Invalid document in batch file");
                rejected.push(RejectedDocument {
                    collection,
                    index,
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(docs)
}
