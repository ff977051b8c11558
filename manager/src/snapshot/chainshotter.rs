use super::record::{ChainshotEntry, ChainshotRecord, InstanceMetadata, SnapshotWindow};
use crate::cloud::waiters::wait_for_snapshot_completed;
use crate::cloud::{CloudProvider, VolumeDescription, WaitPolicy};
use crate::constants::volume;
use crate::errors::ChainError;
use crate::node::{Chain, NodeDirectory};
use crate::remote::ChainProcess;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, instrument};

/// Captures a consistent snapshot of every node of a chain.
///
/// The whole chain is halted before the first snapshot is taken so no node
/// can advance past the others, and restarted seed-first afterwards.
#[derive(Clone)]
pub struct SnapshotCoordinator {
    provider: Arc<dyn CloudProvider>,
    directory: NodeDirectory,
    process: ChainProcess,
    wait: WaitPolicy,
}

impl SnapshotCoordinator {
    pub fn new(
        provider: Arc<dyn CloudProvider>,
        directory: NodeDirectory,
        process: ChainProcess,
        wait: WaitPolicy,
    ) -> Self {
        Self {
            provider,
            directory,
            process,
            wait,
        }
    }

    /// Every node must exist and have exactly one data volume before the
    /// chain is touched.
    async fn admit(&self, chain: &Chain) -> Result<Vec<VolumeDescription>> {
        let mut volumes = Vec::with_capacity(chain.len());
        for node in &chain.nodes {
            if !self.directory.exists(node).await? {
                return Err(ChainError::NodeNotFound {
                    region: node.region.clone(),
                    instance_id: node.instance_id.clone(),
                }
                .into());
            }
            volumes.push(self.directory.data_volume(node).await?);
        }
        Ok(volumes)
    }

    #[instrument(skip(self, chain), fields(nodes = chain.len()))]
    pub async fn chainshot(&self, name: &str, chain: &Chain) -> Result<ChainshotRecord> {
        let volumes = self.admit(chain).await?;
        info!("Chainshot '{}': {} nodes admitted, halting chain", name, chain.len());

        self.process.halt(&chain.nodes).await?;

        let mut instances = Vec::with_capacity(chain.len());
        for (node, data_volume) in chain.nodes.iter().zip(&volumes) {
            info!(
                "Creating snapshot of volume {} of instance {}",
                data_volume.id, node
            );
            let snapshot_id = self
                .provider
                .create_snapshot(&node.region, &data_volume.id, volume::SNAPSHOT_DESCRIPTION)
                .await
                .with_context(|| format!("Failed to snapshot {} of {}", data_volume.id, node))?;

            let snapshot =
                wait_for_snapshot_completed(self.provider.as_ref(), self.wait, &node.region, &snapshot_id)
                    .await?;
            let completed_at = snapshot.completion_time.unwrap_or(snapshot.start_time);
            info!("Snapshot {} of {} completed at {}", snapshot_id, node, completed_at);

            let attributes = self.directory.attributes(node).await?;
            instances.push(ChainshotEntry {
                instance: InstanceMetadata {
                    id: attributes.instance_id,
                    region: attributes.region,
                    availability_zone: attributes.availability_zone,
                    image_id: attributes.image_id,
                    tags: attributes.tags,
                    vpc_id: attributes.vpc_id,
                    security_groups: attributes.security_groups,
                    key_name: attributes.key_name,
                },
                snapshot: SnapshotWindow {
                    id: snapshot_id,
                    from: attributes.launch_time,
                    to: completed_at,
                },
            });
        }

        self.process.start(&chain.nodes).await?;
        info!("Chainshot '{}' finished, chain resumed", name);

        Ok(ChainshotRecord {
            chainshot_name: name.to_string(),
            instances,
        })
    }
}
