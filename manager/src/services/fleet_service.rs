// File: manager/src/services/fleet_service.rs
//
// Chain registry, chainshot/thaw operations and health history on top of the fleet components
//
use crate::database::{
    ChainOrigin, ChainRecord, ChainshotSummary, Database, HealthRecord, OperationRecord,
    StoredChainshot,
};
use crate::errors::{ChainError, OperationError};
use crate::fleet::Fleet;
use crate::health::{AliveReport, ChainStatus};
use crate::network::NetworkRequest;
use crate::node::{Chain, Node};
use crate::roster::{build_roster, RosterEntry};
use crate::services::operation_executor::OperationExecutor;
use crate::snapshot::ChainshotRecord;
use anyhow::Result;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub struct FleetService {
    fleet: Fleet,
    database: Arc<Database>,
    executor: OperationExecutor,
}

/// `<prefix>-<UTC timestamp>`
pub fn timestamped_name(prefix: &str) -> String {
    format!("{}-{}", prefix, Utc::now().format("%Y%m%d-%H%M%S"))
}

fn targets_of(chain: &Chain) -> Vec<String> {
    chain.nodes.iter().map(Node::target_key).collect()
}

/// Tracker key reserving a chainshot name while its chainshot runs
pub fn chainshot_target(name: &str) -> String {
    format!("chainshot:{}", name)
}

impl FleetService {
    pub fn new(fleet: Fleet, database: Arc<Database>, executor: OperationExecutor) -> Self {
        Self {
            fleet,
            database,
            executor,
        }
    }

    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    pub fn executor(&self) -> &OperationExecutor {
        &self.executor
    }

    // === Chain registry ===

    /// Register an existing set of nodes under `name`. Every node must exist.
    pub async fn register_chain(&self, name: &str, chain: &Chain) -> Result<ChainRecord> {
        for node in &chain.nodes {
            if !self.fleet.directory.exists(node).await? {
                return Err(ChainError::NodeNotFound {
                    region: node.region.clone(),
                    instance_id: node.instance_id.clone(),
                }
                .into());
            }
        }
        self.database
            .upsert_chain(name, chain, ChainOrigin::Registered)
            .await?;
        info!("Registered chain {} with {} nodes", name, chain.len());
        self.get_chain(name).await
    }

    pub async fn get_chain(&self, name: &str) -> Result<ChainRecord> {
        self.database
            .get_chain(name)
            .await?
            .ok_or_else(|| {
                OperationError::UnknownChain {
                    name: name.to_string(),
                }
                .into()
            })
    }

    pub async fn list_chains(&self) -> Result<Vec<ChainRecord>> {
        self.database.list_chains().await
    }

    pub async fn remove_chain(&self, name: &str) -> Result<()> {
        if !self.database.delete_chain(name).await? {
            return Err(OperationError::UnknownChain {
                name: name.to_string(),
            }
            .into());
        }
        info!("Removed chain {} from the registry", name);
        Ok(())
    }

    // === Status ===

    pub async fn chain_status(&self, name: &str) -> Result<ChainStatus> {
        let record = self.get_chain(name).await?;
        self.fleet.monitor.get_status(&record.chain).await
    }

    pub async fn chain_isalive(&self, name: &str) -> Result<AliveReport> {
        let record = self.get_chain(name).await?;
        self.fleet.monitor.isalive(&record.chain).await
    }

    /// Check every registered chain once and store the outcome
    pub async fn check_all_chains(&self) -> Result<usize> {
        let chains = self.database.list_chains().await?;
        for record in &chains {
            let health = match self.fleet.monitor.get_status(&record.chain).await {
                Ok(status) => HealthRecord {
                    chain_name: record.name.clone(),
                    is_alive: status.is_alive,
                    height: Some(status.height as i64),
                    max_height: Some(status.max_height as i64),
                    error_message: None,
                    details: serde_json::to_string(&status).ok(),
                    timestamp: Utc::now(),
                },
                Err(e) => {
                    warn!("Health check of {} failed: {:#}", record.name, e);
                    HealthRecord {
                        chain_name: record.name.clone(),
                        is_alive: false,
                        height: None,
                        max_height: None,
                        error_message: Some(format!("{:#}", e)),
                        details: None,
                        timestamp: Utc::now(),
                    }
                }
            };

            if !health.is_alive {
                warn!("Chain {} is not alive", record.name);
            }
            if let Err(e) = self.database.store_health_record(&health).await {
                error!("Failed to store health record for {}: {}", record.name, e);
            }
        }
        debug!("Checked {} chains", chains.len());
        Ok(chains.len())
    }

    pub async fn health_history(&self, name: &str, limit: i64) -> Result<Vec<HealthRecord>> {
        self.database.get_health_history(name, limit).await
    }

    // === Chainshot ===

    /// Start a chainshot of a registered chain. Returns the operation id.
    pub async fn start_chainshot(
        &self,
        chain_name: &str,
        chainshot_name: Option<String>,
    ) -> Result<String> {
        let record = self.get_chain(chain_name).await?;
        let chainshot_name = chainshot_name.unwrap_or_else(|| timestamped_name(chain_name));
        if self.database.chainshot_exists(&chainshot_name).await? {
            return Err(OperationError::DuplicateChainshot {
                name: chainshot_name,
            }
            .into());
        }

        // the name is held alongside the nodes until the record is stored
        let mut targets = targets_of(&record.chain);
        targets.push(chainshot_target(&chainshot_name));

        let snapshots = self.fleet.snapshots.clone();
        let database = self.database.clone();
        let chain_name_owned = chain_name.to_string();

        self.executor
            .execute_async(
                "chainshot",
                chain_name,
                targets,
                move || async move {
                    if database.chainshot_exists(&chainshot_name).await? {
                        return Err(OperationError::DuplicateChainshot {
                            name: chainshot_name,
                        }
                        .into());
                    }
                    let shot = snapshots.chainshot(&chainshot_name, &record.chain).await?;
                    database
                        .store_chainshot(&shot, Some(&chain_name_owned))
                        .await?;
                    Ok(format!(
                        "chainshot {} with {} snapshots",
                        shot.chainshot_name,
                        shot.instances.len()
                    ))
                },
            )
            .await
    }

    pub async fn get_chainshot(&self, name: &str) -> Result<StoredChainshot> {
        self.database
            .get_chainshot(name)
            .await?
            .ok_or_else(|| {
                OperationError::UnknownChainshot {
                    name: name.to_string(),
                }
                .into()
            })
    }

    pub async fn list_chainshots(&self) -> Result<Vec<ChainshotSummary>> {
        self.database.list_chainshots().await
    }

    /// Chainshot record in its JSON exchange format
    pub async fn export_chainshot(&self, name: &str) -> Result<String> {
        self.get_chainshot(name).await?.record.to_json()
    }

    /// Store a record produced elsewhere
    pub async fn import_chainshot(&self, json: &str) -> Result<ChainshotSummary> {
        let record = ChainshotRecord::from_json(json)?;
        self.database.store_chainshot(&record, None).await?;
        info!(
            "Imported chainshot {} ({} instances)",
            record.chainshot_name,
            record.instances.len()
        );
        Ok(ChainshotSummary {
            name: record.chainshot_name,
            chain_name: None,
            node_count: record.instances.len() as i64,
            created_at: Utc::now(),
        })
    }

    // === Thaw ===

    /// Thaw a stored chainshot into a new registered chain. Returns the
    /// operation id.
    pub async fn start_thaw(&self, chainshot_name: &str, chain_name: Option<String>) -> Result<String> {
        let stored = self.get_chainshot(chainshot_name).await?;
        let chain_name = chain_name.unwrap_or_else(|| {
            format!("{}-thaw-{}", chainshot_name, &Uuid::new_v4().simple().to_string()[..8])
        });

        let restore = self.fleet.restore.clone();
        let database = self.database.clone();
        let chain_type = match &stored.chain_name {
            Some(source) => database
                .get_chain(source)
                .await?
                .map(|r| r.chain.chain_type)
                .unwrap_or_default(),
            None => Default::default(),
        };

        self.executor
            .execute_async("thaw", chainshot_name, Vec::new(), move || async move {
                let mut chain = restore.thaw(&stored.record).await?;
                chain.chain_type = chain_type;
                database
                    .upsert_chain(&chain_name, &chain, ChainOrigin::Thawed)
                    .await?;
                Ok(format!("chain {} with {} nodes", chain_name, chain.len()))
            })
            .await
    }

    // === Fleet creation ===

    pub async fn start_create_network(&self, chain_name: &str, request: NetworkRequest) -> Result<String> {
        // fail fast on a bad request instead of in the background
        self.fleet.networks.plan(&request)?;

        let networks = self.fleet.networks.clone();
        let database = self.database.clone();
        let chain_name_owned = chain_name.to_string();

        self.executor
            .execute_async("create", chain_name, Vec::new(), move || async move {
                let chain = networks.create_network(&request).await?;
                database
                    .upsert_chain(&chain_name_owned, &chain, ChainOrigin::Created)
                    .await?;
                Ok(format!("chain {} with {} nodes", chain_name_owned, chain.len()))
            })
            .await
    }

    // === Roster ===

    pub async fn roster(&self, chain_names: &[String]) -> Result<BTreeMap<String, RosterEntry>> {
        let mut chains = Vec::with_capacity(chain_names.len());
        for name in chain_names {
            chains.push(self.get_chain(name).await?.chain);
        }
        build_roster(&self.fleet.directory, &chains, &self.fleet.config.ssh_user).await
    }

    // === Operations ===

    pub async fn get_operation(&self, operation_id: &str) -> Result<Option<OperationRecord>> {
        self.database.get_operation_by_id(operation_id).await
    }

    pub async fn list_operations(&self, limit: i64) -> Result<Vec<OperationRecord>> {
        self.database.list_recent_operations(limit).await
    }
}
