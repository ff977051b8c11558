//! Operation tracking for long-running chain operations
//!
//! A chainshot halts every node of a chain and a thaw restores into freshly
//! launched nodes, so two operations touching the same node must never
//! overlap. The tracker reserves all of an operation's nodes at once or none
//! of them.
//!
//! ```ignore
//! let targets = chain.nodes.iter().map(Node::target_key).collect::<Vec<_>>();
//! tracker.try_start_operation(&targets, "chainshot", None).await?;
//! // ... run the chainshot ...
//! tracker.finish_operation(&targets).await;
//! ```

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::errors::OperationError;

#[derive(Debug, Clone, Serialize)]
pub struct ActiveOperation {
    pub operation_type: String,
    pub target_name: String,
    pub started_at: DateTime<Utc>,
    pub user_info: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationStatus {
    pub busy_nodes: HashMap<String, ActiveOperation>,
    pub total_active: usize,
}

#[derive(Clone, Default)]
pub struct OperationTracker {
    // target key ("region/instance") -> operation holding it
    active_operations: Arc<RwLock<HashMap<String, ActiveOperation>>>,
}

impl OperationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve every target for `operation_type`. Fails with `NodeBusy` on
    /// the first target already held, leaving nothing reserved.
    #[instrument(skip(self, targets), fields(operation = %operation_type, count = targets.len()))]
    pub async fn try_start_operation(
        &self,
        targets: &[String],
        operation_type: &str,
        user_info: Option<String>,
    ) -> Result<()> {
        let mut active = self.active_operations.write().await;

        if let Some((target, current)) = targets
            .iter()
            .find_map(|t| active.get(t).map(|op| (t, op)))
        {
            let duration = Utc::now().signed_duration_since(current.started_at);
            warn!(
                "{} is busy with '{}' for {}m, refusing '{}'",
                target,
                current.operation_type,
                duration.num_minutes(),
                operation_type
            );
            return Err(OperationError::NodeBusy {
                target: target.clone(),
                current_operation: current.operation_type.clone(),
            }
            .into());
        }

        let started_at = Utc::now();
        for target in targets {
            active.insert(
                target.clone(),
                ActiveOperation {
                    operation_type: operation_type.to_string(),
                    target_name: target.clone(),
                    started_at,
                    user_info: user_info.clone(),
                },
            );
        }
        info!(
            "Started operation '{}' on {} node(s)",
            operation_type,
            targets.len()
        );
        Ok(())
    }

    /// Release the targets of a finished operation
    #[instrument(skip(self, targets), fields(count = targets.len()))]
    pub async fn finish_operation(&self, targets: &[String]) {
        let mut active = self.active_operations.write().await;
        for target in targets {
            if let Some(op) = active.remove(target) {
                let duration = Utc::now().signed_duration_since(op.started_at);
                info!(
                    "Finished operation '{}' on {} (took {}s)",
                    op.operation_type,
                    target,
                    duration.num_seconds()
                );
            }
        }
    }

    /// Force release of a single target
    pub async fn cancel_operation(&self, target_name: &str) -> Result<()> {
        let mut active = self.active_operations.write().await;
        match active.remove(target_name) {
            Some(op) => {
                warn!(
                    "Cancelled operation '{}' on {} (was running for {}m)",
                    op.operation_type,
                    target_name,
                    Utc::now().signed_duration_since(op.started_at).num_minutes()
                );
                Ok(())
            }
            None => Err(anyhow::anyhow!(
                "No active operation found on {}",
                target_name
            )),
        }
    }

    pub async fn get_operation_status(&self) -> OperationStatus {
        let active = self.active_operations.read().await;
        OperationStatus {
            busy_nodes: active.clone(),
            total_active: active.len(),
        }
    }

    pub async fn is_busy(&self, target_name: &str) -> bool {
        self.active_operations.read().await.contains_key(target_name)
    }

    pub async fn get_active_operation(&self, target_name: &str) -> Option<ActiveOperation> {
        self.active_operations.read().await.get(target_name).cloned()
    }

    /// Drop reservations older than `max_hours`
    pub async fn cleanup_old_operations(&self, max_hours: i64) -> u32 {
        let mut active = self.active_operations.write().await;
        let cutoff = Utc::now() - chrono::Duration::hours(max_hours);
        let initial_count = active.len();

        active.retain(|target_name, operation| {
            let keep = operation.started_at > cutoff;
            if !keep {
                warn!(
                    "Cleaned up stuck operation '{}' on {} (was running for {}h)",
                    operation.operation_type,
                    target_name,
                    Utc::now()
                        .signed_duration_since(operation.started_at)
                        .num_hours()
                );
            }
            keep
        });

        (initial_count - active.len()) as u32
    }
}
