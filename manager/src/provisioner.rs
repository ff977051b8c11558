//! Instance provisioning
//!
//! Launches instances from a declarative [`InstanceSpec`] and optionally gives
//! them a fresh data volume. Used by fleet creation and by thaw.

use crate::cloud::waiters::{wait_for_instance_running, wait_for_volume_available};
use crate::cloud::{CloudProvider, InstanceRequest, Tag, VolumeRequest, WaitPolicy};
use crate::config::Config;
use crate::constants::{scripts, volume};
use crate::node::directory::sentinel_tag;
use crate::node::{Node, NodeDirectory};
use crate::remote::RemoteExecutor;
use crate::snapshot::InstanceMetadata;
use anyhow::{anyhow, Context, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceSpec {
    pub region: String,
    pub image_id: String,
    /// Falls back to the region's configured instance type
    #[serde(default)]
    pub instance_type: Option<String>,
    #[serde(default)]
    pub availability_zone: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub security_groups: Vec<String>,
    pub key_name: String,
    /// Create, tag, attach and mount a blank data volume
    #[serde(default)]
    pub add_volume: bool,
}

impl InstanceSpec {
    /// Spec for an instance equivalent to one captured in a chainshot
    pub fn from_metadata(metadata: &InstanceMetadata) -> Self {
        Self {
            region: metadata.region.clone(),
            image_id: metadata.image_id.clone(),
            instance_type: None,
            availability_zone: Some(metadata.availability_zone.clone())
                .filter(|zone| !zone.is_empty()),
            tags: metadata.tags.clone(),
            security_groups: metadata.security_groups.clone(),
            key_name: metadata.key_name.clone(),
            add_volume: false,
        }
    }
}

#[derive(Clone)]
pub struct InstanceProvisioner {
    provider: Arc<dyn CloudProvider>,
    directory: NodeDirectory,
    executor: RemoteExecutor,
    config: Arc<Config>,
    wait: WaitPolicy,
}

impl InstanceProvisioner {
    pub fn new(
        provider: Arc<dyn CloudProvider>,
        directory: NodeDirectory,
        executor: RemoteExecutor,
        config: Arc<Config>,
    ) -> Self {
        let wait = WaitPolicy::from_config(&config);
        Self {
            provider,
            directory,
            executor,
            config,
            wait,
        }
    }

    /// Launch one instance, wait until it runs with a public address and
    /// optionally give it a data volume
    #[instrument(skip(self, spec), fields(region = %spec.region, ami = %spec.image_id))]
    pub async fn create(&self, spec: &InstanceSpec) -> Result<Node> {
        let node = self.launch(spec).await?;
        self.wait_running(&node).await?;

        if spec.add_volume {
            let size_gb = self.config.region(&spec.region).volume_size_gb;
            if let Err(e) = self.add_volume(&node, size_gb).await {
                error!("Data volume setup failed on {}: {}", node, e);
                return Err(e.context(format!(
                    "Instance {} was created but its data volume could not be set up",
                    node
                )));
            }
        }

        Ok(node)
    }

    /// Request the instance without waiting for it
    pub async fn launch(&self, spec: &InstanceSpec) -> Result<Node> {
        let region_config = self.config.region(&spec.region);
        let request = InstanceRequest {
            image_id: spec.image_id.clone(),
            instance_type: spec
                .instance_type
                .clone()
                .unwrap_or(region_config.instance_type),
            availability_zone: spec.availability_zone.clone(),
            security_groups: spec.security_groups.clone(),
            key_name: spec.key_name.clone(),
            tags: spec.tags.clone(),
        };

        let instance_id = self.provider.run_instance(&spec.region, &request).await?;
        Ok(Node::new(spec.region.clone(), instance_id))
    }

    pub async fn wait_running(&self, node: &Node) -> Result<String> {
        let address =
            wait_for_instance_running(self.provider.as_ref(), self.wait, &node.region, &node.instance_id)
                .await?;
        info!("Instance {} running at {}", node, address);
        Ok(address)
    }

    /// Create, tag, attach and mount a blank data volume on `node`
    pub async fn add_volume(&self, node: &Node, size_gb: u32) -> Result<String> {
        let attributes = self.directory.attributes(node).await?;
        let volume_id = self
            .provider
            .create_volume(
                &node.region,
                &VolumeRequest::blank(&attributes.availability_zone, size_gb),
            )
            .await?;
        self.provider
            .create_tags(&node.region, &volume_id, &[sentinel_tag()])
            .await?;
        wait_for_volume_available(self.provider.as_ref(), self.wait, &node.region, &volume_id)
            .await?;

        self.provider
            .attach_volume(&node.region, &volume_id, &node.instance_id, volume::DEFAULT_DEVICE)
            .await
            .with_context(|| format!("Failed to attach {} to {}", volume_id, node))?;
        info!("Attached volume {} to instance {}", volume_id, node);

        self.executor
            .run(scripts::MOUNT_NEW_VOLUME, node, &[])
            .await?;
        info!("New volume mounted on {}", node);
        Ok(volume_id)
    }

    /// Launch several instances, at most `provisioning_parallelism` at a time.
    /// Results keep the order of `specs`.
    pub async fn create_many(&self, specs: &[InstanceSpec]) -> Result<Vec<Node>> {
        let parallelism = self.config.provisioning_parallelism.max(1);
        stream::iter(specs.to_vec())
            .map(|spec| {
                let provisioner = self.clone();
                async move { provisioner.create(&spec).await }
            })
            .buffered(parallelism)
            .try_collect()
            .await
    }

    /// Terminate instances, then delete volumes. Keeps going past failures and
    /// reports all of them at the end.
    pub async fn teardown(&self, instances: &[Node], volumes: &[(String, String)]) -> Result<()> {
        let mut failures = Vec::new();

        for node in instances {
            match self
                .provider
                .terminate_instance(&node.region, &node.instance_id)
                .await
            {
                Ok(()) => info!("Terminated {}", node),
                Err(e) => {
                    warn!("Failed to terminate {}: {}", node, e);
                    failures.push(format!("{}: {}", node, e));
                }
            }
        }

        for (region, volume_id) in volumes {
            match self.provider.delete_volume(region, volume_id).await {
                Ok(()) => info!("Deleted volume {} in {}", volume_id, region),
                Err(e) => {
                    warn!("Failed to delete volume {}: {}", volume_id, e);
                    failures.push(format!("{}: {}", volume_id, e));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("Teardown incomplete: {}", failures.join("; ")))
        }
    }
}
