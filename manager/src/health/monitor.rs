use super::ethermint::{cross_check, fetch_block_by_number};
use super::tendermint::fetch_latest_block;
use super::types::{AliveReport, ChainStatus, LatestBlock, NodeStatus};
use crate::config::Config;
use crate::node::{Chain, Node, NodeDirectory};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client as HttpClient;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// A block is live if it was produced within `threshold` of `now`
pub fn is_block_alive(block_time: DateTime<Utc>, now: DateTime<Utc>, threshold: ChronoDuration) -> bool {
    now.signed_duration_since(block_time) <= threshold
}

/// Polls both block-producing layers of every node and checks they agree
#[derive(Clone)]
pub struct ConsistencyMonitor {
    directory: NodeDirectory,
    client: HttpClient,
    consensus_port: u16,
    application_port: u16,
    rpc_timeout: Duration,
    liveness_threshold: ChronoDuration,
}

impl ConsistencyMonitor {
    pub fn new(directory: NodeDirectory, config: &Config) -> Result<Self> {
        let rpc_timeout = Duration::from_secs(config.rpc_timeout_seconds);
        let client = HttpClient::builder()
            .timeout(rpc_timeout)
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            directory,
            client,
            consensus_port: config.consensus_rpc_port,
            application_port: config.application_rpc_port,
            rpc_timeout,
            liveness_threshold: ChronoDuration::seconds(config.liveness_threshold_seconds),
        })
    }

    /// Latest consensus block of `node`, cross-checked against the
    /// application layer when the chain has one
    pub async fn latest_block(&self, node: &Node, chain: &Chain, address: &str) -> Result<LatestBlock> {
        let consensus_url = format!("http://{}:{}", address, self.consensus_port);
        let block = fetch_latest_block(&self.client, &consensus_url, self.rpc_timeout)
            .await
            .with_context(|| format!("Consensus layer of {} unreachable", node))?;

        if !chain.chain_type.has_application_layer() {
            return Ok(block);
        }
        if block.height == 0 {
            debug!("{} has no blocks yet, skipping cross-check", node);
            return Ok(block);
        }

        let application_url = format!("http://{}:{}", address, self.application_port);
        let application = fetch_block_by_number(
            &self.client,
            &application_url,
            block.height - 1,
            self.rpc_timeout,
        )
        .await
        .with_context(|| format!("Application layer of {} unreachable", node))?;

        cross_check(node, &block, &application)?;
        Ok(block)
    }

    #[instrument(skip(self, chain), fields(chain = %chain.display_name()))]
    pub async fn get_status(&self, chain: &Chain) -> Result<ChainStatus> {
        let now = Utc::now();
        let mut nodes = Vec::with_capacity(chain.len());

        for node in &chain.nodes {
            let attributes = self.directory.attributes(node).await?;
            let address = attributes
                .public_address
                .clone()
                .ok_or_else(|| anyhow!("Instance {} has no public address", node))?;
            let block = self.latest_block(node, chain, &address).await?;
            let is_alive = is_block_alive(block.time, now, self.liveness_threshold);
            if !is_alive {
                warn!("{} last produced a block at {}", node, block.time);
            }

            nodes.push(NodeStatus {
                instance_id: node.instance_id.clone(),
                instance_region: node.region.clone(),
                name: attributes.name(),
                height: block.height,
                last_block_hash: block.hash,
                last_block_time: block.time,
                is_alive,
            });
        }

        let heights: Vec<u64> = nodes.iter().map(|n| n.height).collect();
        let height = heights.iter().copied().min().unwrap_or(0);
        let max_height = heights.iter().copied().max().unwrap_or(0);
        let mean_height = if heights.is_empty() {
            0.0
        } else {
            heights.iter().sum::<u64>() as f64 / heights.len() as f64
        };
        let is_alive = nodes.iter().all(|n| n.is_alive);

        info!(
            "Chain {} alive={} height={} (max {})",
            chain.display_name(),
            is_alive,
            height,
            max_height
        );

        Ok(ChainStatus {
            chain_name: chain.name.clone(),
            chain_type: chain.chain_type,
            is_alive,
            height,
            max_height,
            mean_height,
            nodes,
            checked_at: now,
        })
    }

    pub async fn isalive(&self, chain: &Chain) -> Result<AliveReport> {
        let status = self.get_status(chain).await?;
        Ok(AliveReport::from(&status))
    }
}
