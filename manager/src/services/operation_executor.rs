// File: manager/src/services/operation_executor.rs
//
// Background execution of chain operations with node reservation and an operation log
//
use crate::database::{Database, OperationRecord};
use crate::operation_tracker::OperationTracker;
use anyhow::Result;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

pub const STATUS_RUNNING: &str = "running";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_FAILED: &str = "failed";

#[derive(Clone)]
pub struct OperationExecutor {
    database: Arc<Database>,
    tracker: OperationTracker,
}

impl OperationExecutor {
    pub fn new(database: Arc<Database>, tracker: OperationTracker) -> Self {
        Self { database, tracker }
    }

    pub fn tracker(&self) -> &OperationTracker {
        &self.tracker
    }

    /// Run `operation_fn` in the background.
    ///
    /// `targets` are reserved in the tracker before anything is spawned, so a
    /// busy node fails the call immediately with `NodeBusy`. The returned id
    /// identifies the operation record; the record's `details` receive the
    /// operation's output on success.
    pub async fn execute_async<F, Fut>(
        &self,
        operation_type: &str,
        target_name: &str,
        targets: Vec<String>,
        operation_fn: F,
    ) -> Result<String>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        self.tracker
            .try_start_operation(&targets, operation_type, None)
            .await?;

        let operation_id = Uuid::new_v4().to_string();
        info!(
            "Starting {} for {} (operation_id: {})",
            operation_type, target_name, operation_id
        );

        let operation = OperationRecord {
            id: operation_id.clone(),
            operation_type: operation_type.to_string(),
            target_name: target_name.to_string(),
            status: STATUS_RUNNING.to_string(),
            started_at: Utc::now(),
            completed_at: None,
            error_message: None,
            details: None,
        };

        if let Err(e) = self.database.store_operation(&operation).await {
            self.tracker.finish_operation(&targets).await;
            return Err(e);
        }

        let database = self.database.clone();
        let tracker = self.tracker.clone();

        tokio::spawn(async move {
            let result = operation_fn().await;
            tracker.finish_operation(&targets).await;

            let mut finished = operation;
            finished.completed_at = Some(Utc::now());
            match result {
                Ok(details) => {
                    finished.status = STATUS_COMPLETED.to_string();
                    finished.details = Some(details);
                    info!(
                        "{} completed successfully for {} (operation_id: {})",
                        finished.operation_type, finished.target_name, finished.id
                    );
                }
                Err(e) => {
                    finished.status = STATUS_FAILED.to_string();
                    finished.error_message = Some(format!("{:#}", e));
                    error!(
                        "{} failed for {} (operation_id: {}): {:#}",
                        finished.operation_type, finished.target_name, finished.id, e
                    );
                }
            }

            if let Err(e) = database.store_operation(&finished).await {
                error!("Failed to update operation status: {}", e);
            }
        });

        Ok(operation_id)
    }
}
