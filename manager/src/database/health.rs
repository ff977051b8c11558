//! Health record database operations.

use anyhow::Result;
use chrono::{Duration, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{debug, error};

use super::records::HealthRecord;
use super::Database;

fn health_from_row(row: &SqliteRow) -> Result<HealthRecord> {
    Ok(HealthRecord {
        chain_name: row.try_get("chain_name")?,
        is_alive: row.try_get("is_alive")?,
        height: row.try_get("height")?,
        max_height: row.try_get("max_height")?,
        error_message: row.try_get("error_message")?,
        details: row.try_get("details")?,
        timestamp: row.try_get("timestamp")?,
    })
}

impl Database {
    pub async fn store_health_record(&self, record: &HealthRecord) -> Result<()> {
        debug!("Storing health record for: {}", record.chain_name);

        match sqlx::query(
            r#"
            INSERT INTO health_records (
                chain_name, is_alive, height, max_height, error_message, details, timestamp
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.chain_name)
        .bind(record.is_alive)
        .bind(record.height)
        .bind(record.max_height)
        .bind(&record.error_message)
        .bind(&record.details)
        .bind(record.timestamp)
        .execute(&self.pool)
        .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                error!(
                    "Failed to store health record for {}: {}",
                    record.chain_name, e
                );
                Err(e.into())
            }
        }
    }

    pub async fn get_latest_health_record(&self, chain_name: &str) -> Result<Option<HealthRecord>> {
        let row = sqlx::query(
            r#"
            SELECT chain_name, is_alive, height, max_height, error_message, details, timestamp
            FROM health_records
            WHERE chain_name = ?
            ORDER BY timestamp DESC
            LIMIT 1
            "#,
        )
        .bind(chain_name)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(health_from_row).transpose()
    }

    pub async fn get_health_history(&self, chain_name: &str, limit: i64) -> Result<Vec<HealthRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT chain_name, is_alive, height, max_height, error_message, details, timestamp
            FROM health_records
            WHERE chain_name = ?
            ORDER BY timestamp DESC
            LIMIT ?
            "#,
        )
        .bind(chain_name)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(health_from_row).collect()
    }

    pub async fn cleanup_old_health_records(&self, keep_days: i64) -> Result<u64> {
        let cutoff = Utc::now() - Duration::days(keep_days);
        let result = sqlx::query("DELETE FROM health_records WHERE timestamp < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
