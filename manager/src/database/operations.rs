//! Operation log.

use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

use super::records::OperationRecord;
use super::Database;

fn operation_from_row(row: &SqliteRow) -> Result<OperationRecord> {
    Ok(OperationRecord {
        id: row.try_get("id")?,
        operation_type: row.try_get("operation_type")?,
        target_name: row.try_get("target_name")?,
        status: row.try_get("status")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        error_message: row.try_get("error_message")?,
        details: row.try_get("details")?,
    })
}

impl Database {
    pub async fn store_operation(&self, operation: &OperationRecord) -> Result<()> {
        debug!("Storing operation: {} ({})", operation.id, operation.status);

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO operations (
                id, operation_type, target_name, status, started_at,
                completed_at, error_message, details
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&operation.id)
        .bind(&operation.operation_type)
        .bind(&operation.target_name)
        .bind(&operation.status)
        .bind(operation.started_at)
        .bind(operation.completed_at)
        .bind(&operation.error_message)
        .bind(&operation.details)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_operation_by_id(&self, operation_id: &str) -> Result<Option<OperationRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, operation_type, target_name, status, started_at,
                   completed_at, error_message, details
            FROM operations
            WHERE id = ?
            "#,
        )
        .bind(operation_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(operation_from_row).transpose()
    }

    pub async fn list_recent_operations(&self, limit: i64) -> Result<Vec<OperationRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, operation_type, target_name, status, started_at,
                   completed_at, error_message, details
            FROM operations
            ORDER BY started_at DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(operation_from_row).collect()
    }
}
