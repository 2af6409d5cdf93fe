//! Document storage for ielts-import
//!
//! One module per collection. Every write is a natural-key upsert
//! (`INSERT ... ON CONFLICT(<key>) DO UPDATE ... RETURNING guid`): the stored
//! id of an existing row is kept and `created_at` is never overwritten.

pub mod answers;
pub mod groups;
pub mod questions;
pub mod sections;
pub mod tests;
pub mod verify;

use crate::collection::Collection;
use ielts_common::{db, DocId, Result};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::debug;

/// Result of one upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Inserted(DocId),
    Updated(DocId),
}

impl WriteOutcome {
    pub fn id(&self) -> DocId {
        match self {
            WriteOutcome::Inserted(id) | WriteOutcome::Updated(id) => *id,
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, WriteOutcome::Inserted(_))
    }

    /// Compare the id storage returned with the one offered for insert
    pub(crate) fn from_returned(candidate: DocId, returned: &str) -> Result<Self> {
        let stored = ielts_common::ids::parse(returned)?;
        if stored == candidate {
            Ok(WriteOutcome::Inserted(stored))
        } else {
            Ok(WriteOutcome::Updated(stored))
        }
    }
}

/// Storage session for one run
///
/// Owns the connection pool. Call [`Store::close`] when the run ends.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (or create) the database file
    pub async fn open(db_path: &Path) -> Result<Self> {
        let pool = db::init_database(db_path).await?;
        Ok(Self { pool })
    }

    /// Private in-memory database with the full schema
    pub async fn in_memory() -> Result<Self> {
        let pool = db::init_in_memory().await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Empty all five collections
    pub async fn drop_collections(&self) -> Result<()> {
        db::drop_collections(&self.pool).await
    }

    pub async fn count(&self, collection: Collection) -> Result<i64> {
        db::count_documents(&self.pool, collection.table_name()).await
    }

    /// Close the pool, waiting for in-flight queries
    pub async fn close(self) {
        self.pool.close().await;
        debug!("Storage session closed");
    }
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}
