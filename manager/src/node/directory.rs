use super::Node;
use crate::cloud::{
    BlockDeviceMapping, CloudProvider, InstanceDescription, InstanceState, Tag, VolumeDescription,
};
use crate::constants::volume;
use crate::errors::ChainError;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Live view of an instance, as the provider reports it right now
#[derive(Debug, Clone, Serialize)]
pub struct NodeAttributes {
    pub instance_id: String,
    pub region: String,
    pub public_address: Option<String>,
    pub availability_zone: String,
    pub image_id: String,
    pub key_name: String,
    pub tags: Vec<Tag>,
    pub security_groups: Vec<String>,
    pub vpc_id: Option<String>,
    pub launch_time: DateTime<Utc>,
    pub block_device_mappings: Vec<BlockDeviceMapping>,
    pub volumes: Vec<VolumeDescription>,
}

impl NodeAttributes {
    /// `Name` tag, or `Node_<id>` for untagged instances
    pub fn name(&self) -> String {
        instance_name(&self.instance_id, &self.tags)
    }
}

fn instance_name(instance_id: &str, tags: &[Tag]) -> String {
    tags.iter()
        .find(|t| t.key == "Name")
        .map(|t| t.value.clone())
        .unwrap_or_else(|| format!("Node_{}", instance_id))
}

pub fn sentinel_tag() -> Tag {
    Tag::new(volume::SENTINEL_TAG_KEY, volume::SENTINEL_TAG_VALUE)
}

/// Resolves nodes against the provider. Nothing is cached: every call
/// re-queries, so a node that disappears is noticed on the next access.
#[derive(Clone)]
pub struct NodeDirectory {
    provider: Arc<dyn CloudProvider>,
}

impl NodeDirectory {
    pub fn new(provider: Arc<dyn CloudProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn CloudProvider> {
        &self.provider
    }

    async fn describe(&self, node: &Node) -> Result<InstanceDescription> {
        match self
            .provider
            .describe_instance(&node.region, &node.instance_id)
            .await?
        {
            Some(instance) if instance.state != InstanceState::Terminated => Ok(instance),
            _ => Err(ChainError::NodeNotFound {
                region: node.region.clone(),
                instance_id: node.instance_id.clone(),
            }
            .into()),
        }
    }

    pub async fn exists(&self, node: &Node) -> Result<bool> {
        match self.describe(node).await {
            Ok(_) => Ok(true),
            Err(e) if matches!(e.downcast_ref::<ChainError>(), Some(ChainError::NodeNotFound { .. })) => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn attributes(&self, node: &Node) -> Result<NodeAttributes> {
        let instance = self.describe(node).await?;
        let volumes = self
            .provider
            .describe_instance_volumes(&node.region, &node.instance_id)
            .await?;

        Ok(NodeAttributes {
            instance_id: instance.id,
            region: node.region.clone(),
            public_address: instance.public_ip,
            availability_zone: instance.availability_zone,
            image_id: instance.image_id,
            key_name: instance.key_name,
            tags: instance.tags,
            security_groups: instance.security_groups,
            vpc_id: instance.vpc_id,
            launch_time: instance.launch_time,
            block_device_mappings: instance.block_device_mappings,
            volumes,
        })
    }

    pub async fn public_address(&self, node: &Node) -> Result<String> {
        self.describe(node)
            .await?
            .public_ip
            .ok_or_else(|| anyhow!("Instance {} has no public address", node))
    }

    pub async fn key_name(&self, node: &Node) -> Result<String> {
        Ok(self.describe(node).await?.key_name)
    }

    pub async fn instance_name(&self, node: &Node) -> Result<String> {
        let instance = self.describe(node).await?;
        Ok(instance_name(&instance.id, &instance.tags))
    }

    /// Attached volumes, optionally only those carrying `filter`
    pub async fn volumes(&self, node: &Node, filter: Option<&Tag>) -> Result<Vec<VolumeDescription>> {
        self.describe(node).await?;
        let volumes = self
            .provider
            .describe_instance_volumes(&node.region, &node.instance_id)
            .await?;
        Ok(match filter {
            Some(tag) => volumes.into_iter().filter(|v| v.has_tag(tag)).collect(),
            None => volumes,
        })
    }

    /// The node's single sentinel-tagged data volume
    pub async fn data_volume(&self, node: &Node) -> Result<VolumeDescription> {
        let mut matching = self.volumes(node, Some(&sentinel_tag())).await?;
        debug!("{} has {} data volume(s)", node, matching.len());
        if matching.len() != 1 {
            return Err(ChainError::VolumeSelection {
                region: node.region.clone(),
                instance_id: node.instance_id.clone(),
                found: matching.len(),
            }
            .into());
        }
        Ok(matching.remove(0))
    }
}
