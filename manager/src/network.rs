//! Fleet creation
//!
//! One node per requested region entry, each with a fresh sentinel-tagged
//! data volume. The chain is started seed-first and, when a version is
//! requested, every node must report it through `get_ethermint_version.sh`.

use crate::cloud::Tag;
use crate::config::Config;
use crate::constants::{defaults, scripts};
use crate::errors::{ChainError, ConfigError};
use crate::node::{Chain, ChainType};
use crate::provisioner::{InstanceProvisioner, InstanceSpec};
use crate::remote::ChainProcess;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkRequest {
    /// One node per entry; a region may appear more than once
    pub regions: Vec<String>,
    /// Image per region, falling back to the region's `default_ami`
    #[serde(default)]
    pub images: HashMap<String, String>,
    /// Security groups per region
    #[serde(default)]
    pub security_groups: HashMap<String, Vec<String>>,
    pub key_name: String,
    #[serde(default)]
    pub chain_type: ChainType,
    /// Version every node must report once started
    #[serde(default)]
    pub expected_version: Option<String>,
}

#[derive(Clone)]
pub struct NetworkBuilder {
    provisioner: InstanceProvisioner,
    process: ChainProcess,
    config: Arc<Config>,
}

impl NetworkBuilder {
    pub fn new(provisioner: InstanceProvisioner, process: ChainProcess, config: Arc<Config>) -> Self {
        Self {
            provisioner,
            process,
            config,
        }
    }

    /// Instance specs for `request`, in region order
    pub fn plan(&self, request: &NetworkRequest) -> Result<Vec<InstanceSpec>> {
        if request.regions.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "regions".to_string(),
            }
            .into());
        }

        request
            .regions
            .iter()
            .enumerate()
            .map(|(i, region)| -> Result<InstanceSpec> {
                let image_id = request
                    .images
                    .get(region)
                    .cloned()
                    .or_else(|| self.config.region(region).default_ami)
                    .ok_or_else(|| ConfigError::MissingRequired {
                        field: format!("images.{}", region),
                    })?;

                Ok(InstanceSpec {
                    region: region.clone(),
                    tags: vec![Tag::new(
                        "Name",
                        format!("{}{}{}", defaults::INSTANCE_NAME_PREFIX, image_id, i),
                    )],
                    image_id,
                    instance_type: None,
                    availability_zone: None,
                    security_groups: request
                        .security_groups
                        .get(region)
                        .cloned()
                        .unwrap_or_default(),
                    key_name: request.key_name.clone(),
                    add_volume: true,
                })
            })
            .collect()
    }

    #[instrument(skip(self, request), fields(nodes = request.regions.len()))]
    pub async fn create_network(&self, request: &NetworkRequest) -> Result<Chain> {
        let specs = self.plan(request)?;
        let nodes = self.provisioner.create_many(&specs).await?;
        info!("All {} instances running", nodes.len());

        let chain = Chain::new(None, request.chain_type, nodes);
        self.process.start_chain(&chain).await?;

        if let Some(expected) = &request.expected_version {
            for node in &chain.nodes {
                info!("Checking ethermint version {} on {}", expected, node);
                let actual = self
                    .process
                    .executor()
                    .run(scripts::GET_VERSION, node, &[])
                    .await?;
                let actual = actual.trim();
                if actual != expected.as_str() {
                    return Err(ChainError::VersionMismatch {
                        instance_id: node.instance_id.clone(),
                        expected: expected.clone(),
                        actual: actual.to_string(),
                    }
                    .into());
                }
            }
        }

        for node in &chain.nodes {
            info!("Ethermint instance {} ready", node);
        }
        Ok(chain)
    }
}
