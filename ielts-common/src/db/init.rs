//! Database initialization
//!
//! Creates the database file on first run and the five content collections
//! (`tests`, `test_sections`, `question_groups`, `questions`, `answers`).
//! Every `CREATE` is idempotent, so opening an existing database is safe.
//!
//! Each collection has a UNIQUE constraint on its natural key. The upsert
//! layer targets these constraints with `ON CONFLICT ... DO UPDATE`.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::{debug, info};

/// Current schema version recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Collection tables in dependency order (parents first)
pub const COLLECTIONS: [&str; 5] = [
    "tests",
    "test_sections",
    "question_groups",
    "questions",
    "answers",
];

/// Open (or create) the database file and ensure the schema exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    apply_connection_pragmas(&pool).await?;
    create_schema(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// Uses a single connection: every SQLite `:memory:` connection is a separate
/// database, so a larger pool would not see its own tables.
pub async fn init_in_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .connect("sqlite::memory:")
        .await?;

    apply_connection_pragmas(&pool).await?;
    create_schema(&pool).await?;

    Ok(pool)
}

async fn apply_connection_pragmas(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;
    Ok(())
}

/// Create all collection tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_tests_table(pool).await?;
    create_test_sections_table(pool).await?;
    create_question_groups_table(pool).await?;
    create_questions_table(pool).await?;
    create_answers_table(pool).await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    debug!("Schema ready (version {})", SCHEMA_VERSION);
    Ok(())
}

/// Drop every collection (children first) and recreate empty tables
pub async fn drop_collections(pool: &SqlitePool) -> Result<()> {
    for table in COLLECTIONS.iter().rev() {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await?;
    }
    info!("Dropped existing collections");

    create_schema(pool).await
}

/// Row count for one collection
pub async fn count_documents(pool: &SqlitePool, table: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await?;
    Ok(count)
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_tests_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tests (
            guid TEXT PRIMARY KEY,
            external_slug TEXT NOT NULL UNIQUE CHECK (external_slug <> ''),
            title TEXT NOT NULL,
            test_type TEXT NOT NULL DEFAULT 'IELTS',
            language TEXT NOT NULL DEFAULT 'English',
            level TEXT,
            skill TEXT,
            series TEXT,
            test_number TEXT,
            duration_minutes INTEGER NOT NULL DEFAULT 60,
            total_questions INTEGER NOT NULL DEFAULT 0,
            hashtags TEXT NOT NULL DEFAULT '[]',
            description TEXT,
            source_url TEXT,
            section_ids TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_test_sections_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS test_sections (
            guid TEXT PRIMARY KEY,
            test_id TEXT NOT NULL REFERENCES tests(guid) ON DELETE CASCADE,
            section_type TEXT NOT NULL,
            part_number INTEGER NOT NULL,
            title TEXT,
            range_start INTEGER NOT NULL,
            range_end INTEGER NOT NULL,
            resources TEXT NOT NULL DEFAULT '{}',
            sort_order INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT,
            UNIQUE (test_id, part_number)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_question_groups_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS question_groups (
            guid TEXT PRIMARY KEY,
            section_id TEXT NOT NULL REFERENCES test_sections(guid) ON DELETE CASCADE,
            group_type TEXT NOT NULL,
            title TEXT,
            instructions TEXT NOT NULL DEFAULT '',
            range_start INTEGER NOT NULL,
            range_end INTEGER NOT NULL,
            shared_content TEXT NOT NULL DEFAULT '{}',
            sort_order INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT,
            UNIQUE (section_id, sort_order)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_questions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS questions (
            guid TEXT PRIMARY KEY,
            group_id TEXT NOT NULL REFERENCES question_groups(guid) ON DELETE CASCADE,
            question_number INTEGER NOT NULL CHECK (question_number > 0),
            question_type TEXT NOT NULL,
            question_text TEXT NOT NULL DEFAULT '',
            options TEXT NOT NULL DEFAULT '[]',
            correct_answer TEXT NOT NULL DEFAULT '{}',
            explanation TEXT,
            points INTEGER NOT NULL DEFAULT 1 CHECK (points >= 0),
            sort_order INTEGER NOT NULL DEFAULT 0,
            word_limit INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT,
            UNIQUE (group_id, question_number)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_answers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS answers (
            guid TEXT PRIMARY KEY,
            test_id TEXT NOT NULL REFERENCES tests(guid) ON DELETE CASCADE,
            section_id TEXT NOT NULL REFERENCES test_sections(guid) ON DELETE CASCADE,
            part_number INTEGER NOT NULL,
            transcript_html TEXT NOT NULL DEFAULT '',
            answer_keys TEXT NOT NULL DEFAULT '[]',
            audio_url TEXT,
            source_url TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT,
            UNIQUE (test_id, section_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
