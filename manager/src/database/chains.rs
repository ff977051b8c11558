//! Chain registry.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

use super::records::{ChainOrigin, ChainRecord};
use super::Database;
use crate::node::Chain;

fn chain_from_row(row: &SqliteRow) -> Result<ChainRecord> {
    let name: String = row.try_get("name")?;
    let chain_json: String = row.try_get("chain")?;
    let origin: String = row.try_get("origin")?;
    let chain: Chain = serde_json::from_str(&chain_json)
        .with_context(|| format!("Stored chain {} is corrupt", name))?;

    Ok(ChainRecord {
        name,
        chain,
        origin: ChainOrigin::parse(&origin),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl Database {
    /// Insert or replace a chain; the chain's own name is set to `name`
    pub async fn upsert_chain(&self, name: &str, chain: &Chain, origin: ChainOrigin) -> Result<()> {
        debug!("Storing chain: {}", name);
        let mut chain = chain.clone();
        chain.name = Some(name.to_string());
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO chains (name, chain, origin, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                chain = excluded.chain,
                origin = excluded.origin,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(name)
        .bind(serde_json::to_string(&chain)?)
        .bind(origin.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_chain(&self, name: &str) -> Result<Option<ChainRecord>> {
        let row = sqlx::query(
            "SELECT name, chain, origin, created_at, updated_at FROM chains WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(chain_from_row).transpose()
    }

    pub async fn list_chains(&self) -> Result<Vec<ChainRecord>> {
        let rows = sqlx::query(
            "SELECT name, chain, origin, created_at, updated_at FROM chains ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(chain_from_row).collect()
    }

    pub async fn delete_chain(&self, name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM chains WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
