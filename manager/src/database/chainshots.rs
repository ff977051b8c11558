//! Chainshot record storage. Records are never updated once written.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::Row;
use tracing::debug;

use super::records::{ChainshotSummary, StoredChainshot};
use super::Database;
use crate::errors::OperationError;
use crate::snapshot::ChainshotRecord;

impl Database {
    pub async fn store_chainshot(
        &self,
        record: &ChainshotRecord,
        chain_name: Option<&str>,
    ) -> Result<()> {
        debug!("Storing chainshot: {}", record.chainshot_name);

        let exists: Option<String> =
            sqlx::query_scalar("SELECT name FROM chainshots WHERE name = ?")
                .bind(&record.chainshot_name)
                .fetch_optional(&self.pool)
                .await?;
        if exists.is_some() {
            return Err(OperationError::DuplicateChainshot {
                name: record.chainshot_name.clone(),
            }
            .into());
        }

        sqlx::query(
            r#"
            INSERT INTO chainshots (name, chain_name, node_count, record, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.chainshot_name)
        .bind(chain_name)
        .bind(record.instances.len() as i64)
        .bind(serde_json::to_string(record)?)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn chainshot_exists(&self, name: &str) -> Result<bool> {
        let exists: Option<String> =
            sqlx::query_scalar("SELECT name FROM chainshots WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(exists.is_some())
    }

    pub async fn get_chainshot(&self, name: &str) -> Result<Option<StoredChainshot>> {
        let row = sqlx::query(
            r#"
            SELECT name, chain_name, record, created_at
            FROM chainshots
            WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            debug!("No chainshot named {}", name);
            return Ok(None);
        };

        let record_json: String = row.try_get("record")?;
        Ok(Some(StoredChainshot {
            name: row.try_get("name")?,
            chain_name: row.try_get("chain_name")?,
            created_at: row.try_get("created_at")?,
            record: ChainshotRecord::from_json(&record_json)
                .with_context(|| format!("Stored chainshot {} is corrupt", name))?,
        }))
    }

    pub async fn list_chainshots(&self) -> Result<Vec<ChainshotSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT name, chain_name, node_count, created_at
            FROM chainshots
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            summaries.push(ChainshotSummary {
                name: row.try_get("name")?,
                chain_name: row.try_get("chain_name")?,
                node_count: row.try_get("node_count")?,
                created_at: row.try_get("created_at")?,
            });
        }
        Ok(summaries)
    }
}
