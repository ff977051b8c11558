use super::record::{ChainshotEntry, ChainshotRecord};
use crate::cloud::waiters::wait_for_volume_available;
use crate::cloud::{CloudProvider, VolumeRequest, WaitPolicy};
use crate::constants::{scripts, volume};
use crate::errors::ChainError;
use crate::node::directory::sentinel_tag;
use crate::node::{Chain, ChainType, Node, NodeDirectory};
use crate::provisioner::{InstanceProvisioner, InstanceSpec};
use crate::remote::ChainProcess;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Resources created so far by one thaw call
#[derive(Default)]
struct Created {
    instances: Vec<Node>,
    volumes: Vec<(String, String)>,
}

/// Rebuilds a chain from a chainshot record.
///
/// The record is only read. Thawing the same record twice gives two
/// independent chains backed by fresh volumes.
#[derive(Clone)]
pub struct RestoreCoordinator {
    provider: Arc<dyn CloudProvider>,
    directory: NodeDirectory,
    provisioner: InstanceProvisioner,
    process: ChainProcess,
    wait: WaitPolicy,
    teardown_on_failure: bool,
}

impl RestoreCoordinator {
    pub fn new(
        provider: Arc<dyn CloudProvider>,
        directory: NodeDirectory,
        provisioner: InstanceProvisioner,
        process: ChainProcess,
        wait: WaitPolicy,
    ) -> Self {
        Self {
            provider,
            directory,
            provisioner,
            process,
            wait,
            teardown_on_failure: false,
        }
    }

    /// Terminate and delete whatever a failed thaw already created
    pub fn with_teardown_on_failure(mut self, enabled: bool) -> Self {
        self.teardown_on_failure = enabled;
        self
    }

    #[instrument(skip(self, record), fields(chainshot = %record.chainshot_name))]
    pub async fn thaw(&self, record: &ChainshotRecord) -> Result<Chain> {
        let mut created = Created::default();

        match self.rebuild(record, &mut created).await {
            Ok(nodes) => {
                info!(
                    "Thawed '{}' into {} nodes",
                    record.chainshot_name,
                    nodes.len()
                );
                Ok(Chain::new(None, ChainType::default(), nodes))
            }
            Err(e) => {
                error!("Thaw of '{}' failed: {:#}", record.chainshot_name, e);
                let torn_down = self.teardown_on_failure && self.teardown(&created).await;
                Err(ChainError::ThawFailed {
                    chainshot_name: record.chainshot_name.clone(),
                    reason: format!("{:#}", e),
                    created_instances: created
                        .instances
                        .iter()
                        .map(|n| n.instance_id.clone())
                        .collect(),
                    created_volumes: created.volumes.into_iter().map(|(_, id)| id).collect(),
                    torn_down,
                }
                .into())
            }
        }
    }

    async fn rebuild(&self, record: &ChainshotRecord, created: &mut Created) -> Result<Vec<Node>> {
        let mut nodes = Vec::with_capacity(record.instances.len());
        for entry in &record.instances {
            nodes.push(self.restore_entry(entry, created).await?);
        }

        self.process.start(&nodes).await?;
        Ok(nodes)
    }

    async fn restore_entry(&self, entry: &ChainshotEntry, created: &mut Created) -> Result<Node> {
        let spec = InstanceSpec::from_metadata(&entry.instance);
        let node = self.provisioner.launch(&spec).await?;
        created.instances.push(node.clone());
        info!(
            "Created new instance {} from AMI {} for {}",
            node, spec.image_id, entry.instance.id
        );
        self.provisioner.wait_running(&node).await?;

        let zone = self.directory.attributes(&node).await?.availability_zone;
        let volume_id = self
            .provider
            .create_volume(
                &node.region,
                &VolumeRequest::from_snapshot(&zone, &entry.snapshot.id),
            )
            .await
            .with_context(|| format!("Failed to create volume from {}", entry.snapshot.id))?;
        created.volumes.push((node.region.clone(), volume_id.clone()));

        // Tagged like a fresh data volume so the thawed chain can be chainshot again
        self.provider
            .create_tags(&node.region, &volume_id, &[sentinel_tag()])
            .await?;
        wait_for_volume_available(self.provider.as_ref(), self.wait, &node.region, &volume_id)
            .await?;

        self.provider
            .attach_volume(&node.region, &volume_id, &node.instance_id, volume::DEFAULT_DEVICE)
            .await
            .with_context(|| format!("Failed to attach {} to {}", volume_id, node))?;
        info!(
            "Attached volume {} containing snapshot {} to instance {}",
            volume_id, entry.snapshot.id, node
        );

        self.process
            .executor()
            .run(scripts::MOUNT_SNAPSHOT, &node, &[])
            .await?;
        info!("Snapshot mounted on {}", node);
        Ok(node)
    }

    async fn teardown(&self, created: &Created) -> bool {
        warn!(
            "Tearing down {} instances and {} volumes",
            created.instances.len(),
            created.volumes.len()
        );
        match self
            .provisioner
            .teardown(&created.instances, &created.volumes)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                error!("{}", e);
                false
            }
        }
    }
}
