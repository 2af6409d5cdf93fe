//! Dependency-ordered importer
//!
//! Persists batches parent-first (Tests → Sections → Groups → Questions,
//! then Answers). Before each write the document's parent token is resolved
//! through the reference table filled by the previous level; after it, the
//! document's own token is registered against its storage id.
//!
//! A document that cannot be persisted (unknown parent, malformed, storage
//! failure) is logged, counted in the [`ImportSummary`] and skipped. Its
//! children then fail to resolve and are skipped the same way. Only a
//! failure to prepare storage aborts the run.

use crate::collection::Collection;
use crate::db::{answers, groups, questions, sections, tests, Store, WriteOutcome};
use crate::documents::{
    AnswerDocument, DocumentBatches, GroupDocument, QuestionDocument, SectionDocument,
    TestDocument,
};
use crate::error::{ImportError, ImportResult};
use crate::refs::{DanglingReference, RefTable};
use crate::summary::ImportSummary;
use crate::utils::db_retry::{retry_write, WriteFailure};
use ielts_common::config::DEFAULT_MAX_WRITE_ATTEMPTS;
use ielts_common::DocId;
use std::future::Future;
use tracing::{debug, info, warn};

/// How Answer documents find their Test and Section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentResolution {
    /// Tokens registered earlier in the same run
    ReferenceTable,
    /// Test by external slug, then Section by (test, part number)
    Storage,
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Empty every collection before importing
    pub drop_existing: bool,
    /// Rewrite each imported Test's `section_ids` after Sections are in
    pub backfill_sections: bool,
    /// Attempt budget per document write
    pub max_write_attempts: u32,
    pub answer_resolution: ParentResolution,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            drop_existing: false,
            backfill_sections: true,
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
            answer_resolution: ParentResolution::ReferenceTable,
        }
    }
}

/// One import run against a storage session
pub struct Importer<'a> {
    store: &'a Store,
    options: ImportOptions,
    tests: RefTable,
    sections: RefTable,
    groups: RefTable,
    imported_tests: Vec<DocId>,
    summary: ImportSummary,
}

impl<'a> Importer<'a> {
    pub fn new(store: &'a Store, options: ImportOptions) -> Self {
        Self {
            store,
            options,
            tests: RefTable::new(),
            sections: RefTable::new(),
            groups: RefTable::new(),
            imported_tests: Vec::new(),
            summary: ImportSummary::new(),
        }
    }

    /// Import every batch in dependency order
    pub async fn run(mut self, batches: &DocumentBatches) -> ImportResult<ImportSummary> {
        info!(
            tests = batches.tests.len(),
            sections = batches.sections.len(),
            groups = batches.groups.len(),
            questions = batches.questions.len(),
            answers = batches.answers.len(),
            "Starting import"
        );

        if self.options.drop_existing {
            warn!("Dropping existing collections before import");
            self.store.drop_collections().await?;
        }

        for rejected in &batches.rejected {
            self.skip(rejected.collection, &rejected.to_error());
        }

        self.import_tests(&batches.tests).await;
        self.import_sections(&batches.sections).await;
        self.import_groups(&batches.groups).await;
        self.import_questions(&batches.questions).await;
        self.import_answers(&batches.answers).await;

        if self.options.backfill_sections {
            self.backfill_section_ids().await;
        }

        if self.summary.is_clean() {
            info!(persisted = self.summary.total_persisted(), "Import finished");
        } else {
            warn!(
                persisted = self.summary.total_persisted(),
                skipped = self.summary.total_skipped(),
                backfill_failures = self.summary.backfill_failures,
                "Import finished with skipped documents"
            );
        }

        Ok(self.summary)
    }

    pub async fn import_tests(&mut self, docs: &[TestDocument]) {
        let store = self.store;
        for doc in docs {
            if let Err(err) = doc.check() {
                self.skip(Collection::Tests, &err);
                continue;
            }

            let id = self
                .persist(Collection::Tests, doc.reference.to_string(), || {
                    tests::upsert_test(store.pool(), doc)
                })
                .await;

            if let Some(id) = id {
                self.tests.put(doc.reference.clone(), id);
                if !self.imported_tests.contains(&id) {
                    self.imported_tests.push(id);
                }
            }
        }
        self.log_level_done(Collection::Tests, docs.len());
    }

    pub async fn import_sections(&mut self, docs: &[SectionDocument]) {
        let store = self.store;
        for doc in docs {
            if let Err(err) = doc.check() {
                self.skip(Collection::Sections, &err);
                continue;
            }
            let test_id = match self.tests.resolve(&doc.test_ref) {
                Ok(id) => id,
                Err(dangling) => {
                    self.skip(Collection::Sections, &dangling_in(Collection::Sections, dangling));
                    continue;
                }
            };

            let id = self
                .persist(Collection::Sections, doc.reference.to_string(), || {
                    sections::upsert_section(store.pool(), test_id, doc)
                })
                .await;

            if let Some(id) = id {
                self.sections.put(doc.reference.clone(), id);
            }
        }
        self.log_level_done(Collection::Sections, docs.len());
    }

    pub async fn import_groups(&mut self, docs: &[GroupDocument]) {
        let store = self.store;
        for doc in docs {
            if let Err(err) = doc.check() {
                self.skip(Collection::Groups, &err);
                continue;
            }
            let section_id = match self.sections.resolve(&doc.section_ref) {
                Ok(id) => id,
                Err(dangling) => {
                    self.skip(Collection::Groups, &dangling_in(Collection::Groups, dangling));
                    continue;
                }
            };

            let id = self
                .persist(Collection::Groups, doc.reference.to_string(), || {
                    groups::upsert_group(store.pool(), section_id, doc)
                })
                .await;

            if let Some(id) = id {
                self.groups.put(doc.reference.clone(), id);
            }
        }
        self.log_level_done(Collection::Groups, docs.len());
    }

    pub async fn import_questions(&mut self, docs: &[QuestionDocument]) {
        let store = self.store;
        for doc in docs {
            if let Err(err) = doc.check() {
                self.skip(Collection::Questions, &err);
                continue;
            }
            let group_id = match self.groups.resolve(&doc.group_ref) {
                Ok(id) => id,
                Err(dangling) => {
                    self.skip(Collection::Questions, &dangling_in(Collection::Questions, dangling));
                    continue;
                }
            };

            self.persist(Collection::Questions, doc.subject(), || {
                questions::upsert_question(store.pool(), group_id, doc)
            })
            .await;
        }
        self.log_level_done(Collection::Questions, docs.len());
    }

    pub async fn import_answers(&mut self, docs: &[AnswerDocument]) {
        let store = self.store;
        for doc in docs {
            if let Err(err) = doc.check() {
                self.skip(Collection::Answers, &err);
                continue;
            }
            let (test_id, section_id) = match self.resolve_answer_parents(doc).await {
                Ok(ids) => ids,
                Err(err) => {
                    self.skip(Collection::Answers, &err);
                    continue;
                }
            };

            self.persist(Collection::Answers, doc.subject(), || {
                answers::upsert_answer(store.pool(), test_id, section_id, doc)
            })
            .await;
        }
        self.log_level_done(Collection::Answers, docs.len());
    }

    async fn resolve_answer_parents(&self, doc: &AnswerDocument) -> ImportResult<(DocId, DocId)> {
        match self.options.answer_resolution {
            ParentResolution::ReferenceTable => {
                let test_id = self
                    .tests
                    .resolve(&doc.test_ref)
                    .map_err(|d| dangling_in(Collection::Answers, d))?;
                let section_id = self
                    .sections
                    .resolve(&doc.section_ref)
                    .map_err(|d| dangling_in(Collection::Answers, d))?;
                Ok((test_id, section_id))
            }
            ParentResolution::Storage => {
                let pool = self.store.pool();
                let attempts = self.options.max_write_attempts;
                let lookup_failed = |failure: WriteFailure| ImportError::StorageWriteFailure {
                    collection: Collection::Answers,
                    subject: doc.subject(),
                    transient: failure.transient,
                    message: format!(
                        "parent lookup failed: {} (after {} attempt(s))",
                        failure.source, failure.attempts
                    ),
                };

                let test = retry_write("find test by slug", attempts, || {
                    tests::find_test_by_slug(pool, doc.test_ref.as_str())
                })
                .await
                .map_err(lookup_failed)?
                .ok_or_else(|| ImportError::DanglingReference {
                    collection: Collection::Answers,
                    token: doc.test_ref.clone(),
                })?;
                let section_id = retry_write("find section", attempts, || {
                    sections::find_section_id(pool, test.id, doc.part_number)
                })
                .await
                .map_err(lookup_failed)?
                .ok_or_else(|| ImportError::DanglingReference {
                    collection: Collection::Answers,
                    token: doc.section_ref.clone(),
                })?;
                Ok((test.id, section_id))
            }
        }
    }

    /// Rewrite `section_ids` of every Test imported in this run
    ///
    /// Failures are logged and counted, never raised.
    pub async fn backfill_section_ids(&mut self) {
        let pool = self.store.pool();
        for test_id in &self.imported_tests {
            let result = async {
                let ids = sections::section_ids_for_test(pool, *test_id).await?;
                tests::set_section_ids(pool, *test_id, &ids).await?;
                Ok::<usize, ielts_common::Error>(ids.len())
            }
            .await;

            match result {
                Ok(count) => debug!(test = %test_id, sections = count, "Back-filled section ids"),
                Err(e) => {
                    warn!(test = %test_id, error = %e, "Section back-fill failed");
                    self.summary.backfill_failures += 1;
                }
            }
        }
    }

    /// Upsert with bounded retry; records the outcome
    async fn persist<F, Fut>(&mut self, collection: Collection, subject: String, write: F) -> Option<DocId>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ielts_common::Result<WriteOutcome>>,
    {
        let operation = format!("upsert {}", collection);
        match retry_write(&operation, self.options.max_write_attempts, write).await {
            Ok(outcome) => {
                if outcome.is_insert() {
                    self.summary.record_inserted(collection);
                } else {
                    self.summary.record_updated(collection);
                }
                debug!(%collection, subject = %subject, id = %outcome.id(), inserted = outcome.is_insert(), "Persisted");
                Some(outcome.id())
            }
            Err(failure) => {
                let err = ImportError::StorageWriteFailure {
                    collection,
                    subject,
                    transient: failure.transient,
                    message: format!("{} (after {} attempt(s))", failure.source, failure.attempts),
                };
                self.skip(collection, &err);
                None
            }
        }
    }

    fn skip(&mut self, collection: Collection, err: &ImportError) {
        warn!(%collection, error = %err, "Skipping document");
        if let Some(reason) = err.skip_reason() {
            self.summary.record_skipped(collection, reason);
        }
    }

    fn log_level_done(&self, collection: Collection, total: usize) {
        let stats = self.summary.stats(collection);
        info!(
            %collection,
            total,
            inserted = stats.inserted,
            updated = stats.updated,
            skipped = stats.total_skipped(),
            "Collection imported"
        );
    }

    pub fn test_refs(&self) -> &RefTable {
        &self.tests
    }

    pub fn section_refs(&self) -> &RefTable {
        &self.sections
    }

    pub fn group_refs(&self) -> &RefTable {
        &self.groups
    }

    pub fn summary(&self) -> &ImportSummary {
        &self.summary
    }

    pub fn into_summary(self) -> ImportSummary {
        self.summary
    }
}

fn dangling_in(collection: Collection, dangling: DanglingReference) -> ImportError {
    ImportError::DanglingReference {
        collection,
        token: dangling.0,
    }
}
