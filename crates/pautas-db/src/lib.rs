use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;

pub mod merge;
pub mod rows;
pub mod store;
pub mod summary;

pub use merge::{merge, sort_rows, Dataset, MergeOutcome, PostRegistry};
pub use rows::{CommentRecord, DerivedTime, PostRecord};
pub use store::{load_dataset, save_dataset};
pub use summary::{platform_stats, summarize_posts, PlatformStats, PostSummary};

// Path relative to crates/pautas-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("failed to serialize campaign metadata: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid row {key} in {table}: {reason}")]
    InvalidRow {
        table: &'static str,
        key: String,
        reason: String,
    },
}

/// Opens (creating if needed) the SQLite store at `path` and applies
/// pending migrations.
///
/// The pool holds a single connection: the store has exactly one writer.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the file cannot be opened, or
/// [`DbError::Migration`] if a migration fails.
pub async fn connect_store(path: &Path) -> Result<SqlitePool, DbError> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    open(options).await
}

/// An empty, migrated in-memory store.
///
/// # Errors
///
/// Returns [`DbError`] if the database cannot be created or migrated.
pub async fn connect_in_memory() -> Result<SqlitePool, DbError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    open(options).await
}

async fn open(options: SqliteConnectOptions) -> Result<SqlitePool, DbError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    MIGRATOR.run(&pool).await?;
    Ok(pool)
}
