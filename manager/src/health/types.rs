//! Consistency monitoring types and RPC response structures

use crate::node::ChainType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest block as reported by the consensus layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestBlock {
    pub hash: String,
    pub height: u64,
    pub time: DateTime<Utc>,
}

/// Block as reported by the application layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationBlock {
    pub hash: String,
    pub number: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStatus {
    pub instance_id: String,
    pub instance_region: String,
    pub name: String,
    pub height: u64,
    pub last_block_hash: String,
    pub last_block_time: DateTime<Utc>,
    pub is_alive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainStatus {
    pub chain_name: Option<String>,
    pub chain_type: ChainType,
    pub is_alive: bool,
    /// Height every node has reached
    pub height: u64,
    pub max_height: u64,
    pub mean_height: f64,
    pub nodes: Vec<NodeStatus>,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaleNode {
    pub name: String,
    pub last_block_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliveReport {
    pub is_alive: bool,
    pub stale_nodes: Vec<StaleNode>,
}

impl From<&ChainStatus> for AliveReport {
    fn from(status: &ChainStatus) -> Self {
        AliveReport {
            is_alive: status.is_alive,
            stale_nodes: status
                .nodes
                .iter()
                .filter(|n| !n.is_alive)
                .map(|n| StaleNode {
                    name: n.name.clone(),
                    last_block_time: n.last_block_time,
                })
                .collect(),
        }
    }
}

/// JSON-RPC envelope shared by both layers
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// Fields of `eth_getBlockByNumber` the monitor reads; numbers are hex strings
#[derive(Debug, Clone, Deserialize)]
pub struct EthBlockResult {
    pub hash: String,
    pub number: String,
}
