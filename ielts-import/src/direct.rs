//! Single-pass writer
//!
//! Builds one source Test in memory and upserts it with all its Sections,
//! Groups and Questions straight away, without intermediate batch files.
//! Re-running on the same source updates the same rows.

use crate::builder::DocumentBuilder;
use crate::db::Store;
use crate::error::ImportResult;
use crate::importer::{ImportOptions, Importer};
use crate::source::SourceTest;
use crate::summary::ImportSummary;
use tracing::info;

/// Build and persist one Test
pub async fn write_test(
    store: &Store,
    builder: &DocumentBuilder,
    source: &SourceTest,
    max_write_attempts: u32,
) -> ImportResult<ImportSummary> {
    let batches = builder.build(source)?;
    let slug = batches
        .tests
        .first()
        .map(|t| t.external_slug.clone())
        .unwrap_or_default();

    let options = ImportOptions {
        drop_existing: false,
        backfill_sections: true,
        max_write_attempts,
        ..Default::default()
    };
    let summary = Importer::new(store, options).run(&batches).await?;

    info!(
        slug = %slug,
        questions = batches.questions.len(),
        skipped = summary.total_skipped(),
        "Wrote test"
    );
    Ok(summary)
}
