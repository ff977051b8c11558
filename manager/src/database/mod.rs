//! Database layer for the fleet manager.
//!
//! SQLite persistence for:
//! - Chainshot records (immutable once stored)
//! - Chain registry (chains the manager knows about)
//! - Health records (consistency check history per chain)
//! - Operations (chainshot/thaw/create runs and their outcome)
//!
//! Submodules:
//! - `records` - record types
//! - `chainshots`, `chains`, `health`, `operations` - queries per table

mod chains;
mod chainshots;
mod health;
mod operations;
mod records;

pub use records::*;

use anyhow::Result;
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite, SqlitePool};
use std::path::Path;
use tracing::{debug, error, info, warn};

pub struct Database {
    pool: Pool<Sqlite>,
}

const SCHEMA: &[(&str, &str)] = &[
    (
        "chainshots",
        r#"
        CREATE TABLE IF NOT EXISTS chainshots (
            name TEXT PRIMARY KEY,
            chain_name TEXT,
            node_count INTEGER NOT NULL,
            record TEXT NOT NULL,
            created_at DATETIME NOT NULL
        )
        "#,
    ),
    (
        "chains",
        r#"
        CREATE TABLE IF NOT EXISTS chains (
            name TEXT PRIMARY KEY,
            chain TEXT NOT NULL,
            origin TEXT NOT NULL,
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL
        )
        "#,
    ),
    (
        "health_records",
        r#"
        CREATE TABLE IF NOT EXISTS health_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            chain_name TEXT NOT NULL,
            is_alive BOOLEAN NOT NULL,
            height INTEGER,
            max_height INTEGER,
            error_message TEXT,
            details TEXT,
            timestamp DATETIME NOT NULL
        )
        "#,
    ),
    (
        "idx_health_chain_timestamp",
        "CREATE INDEX IF NOT EXISTS idx_health_chain_timestamp ON health_records(chain_name, timestamp DESC)",
    ),
    (
        "operations",
        r#"
        CREATE TABLE IF NOT EXISTS operations (
            id TEXT PRIMARY KEY,
            operation_type TEXT NOT NULL,
            target_name TEXT NOT NULL,
            status TEXT NOT NULL,
            started_at DATETIME NOT NULL,
            completed_at DATETIME,
            error_message TEXT,
            details TEXT
        )
        "#,
    ),
    (
        "idx_operations_started",
        "CREATE INDEX IF NOT EXISTS idx_operations_started ON operations(started_at DESC)",
    ),
];

impl Database {
    /// Expose pool for integration test queries
    #[allow(dead_code)]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Open (or create) the database at `database_path`; `:memory:` gives a
    /// private in-memory database
    pub async fn new(database_path: &str) -> Result<Self> {
        info!("Database path: {}", database_path);

        let pool = if database_path == ":memory:" {
            // every connection would otherwise get its own empty database
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect("sqlite::memory:")
                .await?
        } else {
            if let Some(parent) = Path::new(database_path).parent() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    error!("Failed to create parent directory {:?}: {}", parent, e);
                    return Err(e.into());
                }
            }
            let database_url = format!("sqlite:{}?mode=rwc", database_path);
            match SqlitePool::connect(&database_url).await {
                Ok(pool) => pool,
                Err(e) => {
                    error!("Failed to connect to database {}: {}", database_url, e);
                    return Err(e.into());
                }
            }
        };

        let database = Self { pool };
        database.initialize_tables().await?;

        match database.cleanup_stuck_operations().await {
            Ok(0) => debug!("No stuck operations found"),
            Ok(cleaned) => warn!("Marked {} stuck operations as failed on startup", cleaned),
            Err(e) => warn!("Failed to clean up stuck operations, continuing: {}", e),
        }

        info!("Database initialized");
        Ok(database)
    }

    async fn initialize_tables(&self) -> Result<()> {
        for (name, sql) in SCHEMA {
            if let Err(e) = sqlx::query(sql).execute(&self.pool).await {
                error!("Failed to create {}: {}", name, e);
                return Err(e.into());
            }
            debug!("{} ready", name);
        }
        Ok(())
    }

    /// Operations still marked running belong to a previous process
    async fn cleanup_stuck_operations(&self) -> Result<u32> {
        let rows = sqlx::query(
            r#"
            SELECT id, operation_type, target_name
            FROM operations
            WHERE status = 'running'
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut cleaned = 0u32;
        let cleanup_time = Utc::now();
        for row in &rows {
            let operation_id: String = row.try_get("id")?;
            let operation_type: String = row.try_get("operation_type")?;
            let target_name: String = row.try_get("target_name")?;
            warn!(
                "Operation {} ({}) on {} was interrupted by a restart",
                operation_id, operation_type, target_name
            );

            sqlx::query(
                r#"
                UPDATE operations
                SET status = 'failed',
                    completed_at = ?,
                    error_message = 'Interrupted by manager restart'
                WHERE id = ?
                "#,
            )
            .bind(cleanup_time)
            .bind(&operation_id)
            .execute(&self.pool)
            .await?;
            cleaned += 1;
        }
        Ok(cleaned)
    }
}
