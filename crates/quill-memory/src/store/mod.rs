//! SQLite-backed persistent store.
//!
//! Split into focused submodules:
//! - `fragments` — deduplicated typing fragments, upsert and absorption
//! - `schedules` — schedule rows and the atomic firing claim
//! - `memories` — the append-only memory sink
//! - `actions` — user action decisions (read as dispatcher context)
//! - `stats` — usage counters behind the `InsightSink` trait

pub mod actions;
pub mod fragments;
pub mod memories;
pub mod schedules;
pub mod stats;

use quill_core::{config::MemoryConfig, error::QuillError, shellexpand};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

/// Persistent store backed by SQLite.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Create a new store, running migrations on first use.
    ///
    /// `db_path = ":memory:"` opens a private in-memory database on a
    /// single connection (used by tests).
    pub async fn new(config: &MemoryConfig) -> Result<Self, QuillError> {
        let db_path = shellexpand(&config.db_path);
        let in_memory = db_path == ":memory:";

        let opts = if in_memory {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| QuillError::Storage(format!("invalid db path: {e}")))?
        } else {
            // Ensure parent directory exists.
            if let Some(parent) = std::path::Path::new(&db_path).parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| QuillError::Storage(format!("failed to create data dir: {e}")))?;
            }
            SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
                .map_err(|e| QuillError::Storage(format!("invalid db path: {e}")))?
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        };
        let opts = opts.create_if_missing(true);

        // In-memory databases are per-connection, so the pool must not
        // hand out a second one.
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 4 })
            .connect_with(opts)
            .await
            .map_err(|e| QuillError::Storage(format!("failed to connect to sqlite: {e}")))?;

        Self::run_migrations(&pool).await?;

        info!("Store initialized at {db_path}");

        Ok(Self { pool })
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run SQL migrations, tracking which have already been applied.
    async fn run_migrations(pool: &SqlitePool) -> Result<(), QuillError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .execute(pool)
        .await
        .map_err(|e| QuillError::Storage(format!("failed to create migrations table: {e}")))?;

        let migrations: &[(&str, &str)] =
            &[("001_init", include_str!("../../migrations/001_init.sql"))];

        for (name, sql) in migrations {
            let applied: Option<(String,)> =
                sqlx::query_as("SELECT name FROM _migrations WHERE name = ?")
                    .bind(name)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| {
                        QuillError::Storage(format!("failed to check migration {name}: {e}"))
                    })?;

            if applied.is_some() {
                continue;
            }

            sqlx::raw_sql(sql)
                .execute(pool)
                .await
                .map_err(|e| QuillError::Storage(format!("migration {name} failed: {e}")))?;

            sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
                .bind(name)
                .execute(pool)
                .await
                .map_err(|e| {
                    QuillError::Storage(format!("failed to record migration {name}: {e}"))
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
