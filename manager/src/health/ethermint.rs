//! Application layer queries and the cross-layer check

use super::types::{ApplicationBlock, EthBlockResult, LatestBlock, RpcResponse};
use crate::errors::ChainError;
use crate::node::Node;
use anyhow::{anyhow, Result};
use reqwest::Client as HttpClient;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::timeout;

static REQUEST_ID: AtomicU64 = AtomicU64::new(0);

/// `eth_getBlockByNumber` for a specific height, without transactions
pub async fn fetch_block_by_number(
    client: &HttpClient,
    url: &str,
    number: u64,
    rpc_timeout: Duration,
) -> Result<ApplicationBlock> {
    let request_body = serde_json::json!({
        "jsonrpc": "2.0",
        "method": "eth_getBlockByNumber",
        "params": [format!("0x{:x}", number), false],
        "id": REQUEST_ID.fetch_add(1, Ordering::Relaxed)
    });

    let response = timeout(rpc_timeout, client.post(url).json(&request_body).send())
        .await
        .map_err(|_| anyhow!("RPC request timeout: {}", url))?
        .map_err(|e| anyhow!("HTTP request failed: {}", e))?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "HTTP error {}: {}",
            response.status(),
            response.text().await.unwrap_or_default()
        ));
    }

    let rpc: RpcResponse<EthBlockResult> = response
        .json()
        .await
        .map_err(|e| anyhow!("Failed to parse JSON response: {}", e))?;

    if let Some(error) = rpc.error {
        return Err(anyhow!("RPC Error: {}", error.message));
    }
    let block = rpc
        .result
        .ok_or_else(|| anyhow!("Block {} unknown to the application layer", number))?;

    Ok(ApplicationBlock {
        number: parse_hex_quantity(&block.number)?,
        hash: block.hash,
    })
}

pub fn parse_hex_quantity(value: &str) -> Result<u64> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u64::from_str_radix(digits, 16).map_err(|e| anyhow!("Invalid hex quantity '{}': {}", value, e))
}

fn normalize_hash(hash: &str) -> String {
    let trimmed = hash.trim();
    trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
        .to_ascii_lowercase()
}

pub fn hashes_match(a: &str, b: &str) -> bool {
    normalize_hash(a) == normalize_hash(b)
}

/// The consensus layer's latest block at height `H` carries the hash of the
/// application block `H - 1`.
pub fn cross_check(node: &Node, consensus: &LatestBlock, application: &ApplicationBlock) -> Result<()> {
    let expected = consensus.height.saturating_sub(1);
    let out_of_sync = |reason: String| -> anyhow::Error {
        ChainError::OutOfSync {
            region: node.region.clone(),
            instance_id: node.instance_id.clone(),
            reason,
        }
        .into()
    };

    if application.number != expected {
        return Err(out_of_sync(format!(
            "application returned block {} for height {}",
            application.number, expected
        )));
    }
    if !hashes_match(&consensus.hash, &application.hash) {
        return Err(out_of_sync(format!(
            "consensus hash {} at height {} but application block {} has hash {}",
            consensus.hash, consensus.height, application.number, application.hash
        )));
    }
    Ok(())
}
