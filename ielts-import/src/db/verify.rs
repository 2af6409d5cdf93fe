//! Post-import verification
//!
//! Counts documents per collection and documents whose parent id does not
//! exist. With foreign keys enforced the orphan counts stay at zero; they
//! catch databases written with enforcement off.

use crate::collection::Collection;
use ielts_common::Result;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub counts: BTreeMap<Collection, i64>,
    pub orphans: BTreeMap<Collection, i64>,
}

impl VerifyReport {
    pub fn total_orphans(&self) -> i64 {
        self.orphans.values().sum()
    }

    pub fn is_consistent(&self) -> bool {
        self.total_orphans() == 0
    }
}

impl fmt::Display for VerifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for collection in Collection::ALL {
            writeln!(
                f,
                "{:<10} {:>7} documents, {:>4} orphaned",
                collection.to_string(),
                self.counts.get(&collection).copied().unwrap_or(0),
                self.orphans.get(&collection).copied().unwrap_or(0)
            )?;
        }
        if self.is_consistent() {
            write!(f, "All parent references resolve")
        } else {
            write!(f, "{} orphaned document(s) found", self.total_orphans())
        }
    }
}

fn orphan_query(collection: Collection) -> &'static str {
    match collection {
        // section_ids entries that point at no Section
        Collection::Tests => {
            r#"
            SELECT COUNT(*) FROM tests t, json_each(t.section_ids) j
            WHERE j.value NOT IN (SELECT guid FROM test_sections)
            "#
        }
        Collection::Sections => {
            r#"
            SELECT COUNT(*) FROM test_sections s
            LEFT JOIN tests t ON s.test_id = t.guid
            WHERE t.guid IS NULL
            "#
        }
        Collection::Groups => {
            r#"
            SELECT COUNT(*) FROM question_groups g
            LEFT JOIN test_sections s ON g.section_id = s.guid
            WHERE s.guid IS NULL
            "#
        }
        Collection::Questions => {
            r#"
            SELECT COUNT(*) FROM questions q
            LEFT JOIN question_groups g ON q.group_id = g.guid
            WHERE g.guid IS NULL
            "#
        }
        Collection::Answers => {
            r#"
            SELECT COUNT(*) FROM answers a
            LEFT JOIN tests t ON a.test_id = t.guid
            LEFT JOIN test_sections s ON a.section_id = s.guid
            WHERE t.guid IS NULL OR s.guid IS NULL
            "#
        }
    }
}

pub async fn verify_store(pool: &SqlitePool) -> Result<VerifyReport> {
    let mut report = VerifyReport::default();

    for collection in Collection::ALL {
        let count = ielts_common::db::count_documents(pool, collection.table_name()).await?;
        let orphans: i64 = sqlx::query_scalar(orphan_query(collection))
            .fetch_one(pool)
            .await?;

        if orphans > 0 {
            tracing::warn!(%collection, orphans, "Orphaned documents");
        }
        report.counts.insert(collection, count);
        report.orphans.insert(collection, orphans);
    }

    Ok(report)
}
