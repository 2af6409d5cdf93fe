//! Import run summary

use crate::collection::Collection;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Why a document was not persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    DanglingReference,
    MalformedDocument,
    TransientStorageFailure,
    PermanentStorageFailure,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::DanglingReference => "dangling reference",
            SkipReason::MalformedDocument => "malformed",
            SkipReason::TransientStorageFailure => "storage (retries exhausted)",
            SkipReason::PermanentStorageFailure => "storage (rejected)",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
}

impl CollectionStats {
    pub fn persisted(&self) -> usize {
        self.inserted + self.updated
    }

    pub fn total_skipped(&self) -> usize {
        self.skipped.values().sum()
    }
}

/// Per-collection outcome counts of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    collections: BTreeMap<Collection, CollectionStats>,
    /// Tests whose `sections` list could not be back-filled
    pub backfill_failures: usize,
}

impl ImportSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_inserted(&mut self, collection: Collection) {
        self.collections.entry(collection).or_default().inserted += 1;
    }

    pub fn record_updated(&mut self, collection: Collection) {
        self.collections.entry(collection).or_default().updated += 1;
    }

    pub fn record_skipped(&mut self, collection: Collection, reason: SkipReason) {
        *self
            .collections
            .entry(collection)
            .or_default()
            .skipped
            .entry(reason)
            .or_default() += 1;
    }

    pub fn stats(&self, collection: Collection) -> CollectionStats {
        self.collections.get(&collection).cloned().unwrap_or_default()
    }

    pub fn skipped(&self, collection: Collection) -> usize {
        self.stats(collection).total_skipped()
    }

    pub fn skipped_for(&self, collection: Collection, reason: SkipReason) -> usize {
        self.collections
            .get(&collection)
            .and_then(|s| s.skipped.get(&reason).copied())
            .unwrap_or(0)
    }

    pub fn total_skipped(&self) -> usize {
        self.collections.values().map(|s| s.total_skipped()).sum()
    }

    pub fn total_persisted(&self) -> usize {
        self.collections.values().map(|s| s.persisted()).sum()
    }

    /// Nothing skipped and every back-fill succeeded
    pub fn is_clean(&self) -> bool {
        self.total_skipped() == 0 && self.backfill_failures == 0
    }

    /// Fold another run's counts into this one
    pub fn absorb(&mut self, other: ImportSummary) {
        for (collection, stats) in other.collections {
            let entry = self.collections.entry(collection).or_default();
            entry.inserted += stats.inserted;
            entry.updated += stats.updated;
            for (reason, count) in stats.skipped {
                *entry.skipped.entry(reason).or_default() += count;
            }
        }
        self.backfill_failures += other.backfill_failures;
    }
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<10} {:>9} {:>9} {:>9}",
            "collection", "inserted", "updated", "skipped"
        )?;
        for collection in Collection::ALL {
            let stats = self.stats(collection);
            writeln!(
                f,
                "{:<10} {:>9} {:>9} {:>9}",
                collection.to_string(),
                stats.inserted,
                stats.updated,
                stats.total_skipped()
            )?;
            for (reason, count) in &stats.skipped {
                writeln!(f, "    {} skipped: {}", reason, count)?;
            }
        }
        if self.backfill_failures > 0 {
            writeln!(f, "section back-fill failed for {} test(s)", self.backfill_failures)?;
        }
        if self.is_clean() {
            write!(f, "Import completed: all documents persisted")
        } else {
            write!(
                f,
                "Import completed WITH SKIPS: {} document(s) not persisted",
                self.total_skipped()
            )
        }
    }
}
