//! Consensus layer queries

use super::types::{LatestBlock, RpcResponse};
use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::time::Duration;
use tokio::time::timeout;

/// `GET <base>/status` and extract the latest block
pub async fn fetch_latest_block(
    client: &HttpClient,
    base_url: &str,
    rpc_timeout: Duration,
) -> Result<LatestBlock> {
    let url = format!("{}/status", base_url);
    let response = timeout(rpc_timeout, client.get(&url).send())
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

    let rpc: RpcResponse<Value> = response
        .json()
        .await
        .map_err(|e| anyhow!("Failed to parse JSON response: {}", e))?;

    if let Some(error) = rpc.error {
        return Err(anyhow!("RPC Error: {}", error.message));
    }
    let result = rpc
        .result
        .ok_or_else(|| anyhow!("Unknown RPC response format"))?;
    parse_status(&result)
}

/// Accepts both the `{"sync_info": {...}}` result and the older
/// `[type, {...}]` tuple form
pub fn parse_status(result: &Value) -> Result<LatestBlock> {
    static NULL: Value = Value::Null;
    let info = match result {
        Value::Array(items) => items.get(1).unwrap_or(&NULL),
        Value::Object(map) => map.get("sync_info").unwrap_or(result),
        _ => &NULL,
    };

    let hash = info
        .get("latest_block_hash")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("status response has no latest_block_hash"))?
        .to_string();
    let height = info
        .get("latest_block_height")
        .and_then(value_as_u64)
        .ok_or_else(|| anyhow!("status response has no latest_block_height"))?;
    let time = info
        .get("latest_block_time")
        .and_then(value_as_time)
        .ok_or_else(|| anyhow!("status response has no valid latest_block_time"))?;

    Ok(LatestBlock { hash, height, time })
}

fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// RFC 3339 strings, or nanoseconds since the epoch
fn value_as_time(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<i64>().ok().map(|nanos| Utc.timestamp_nanos(nanos))),
        Value::Number(n) => n.as_i64().map(|nanos| Utc.timestamp_nanos(nanos)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_sync_info_status() {
        let block = parse_status(&json!({
            "node_info": {"moniker": "seed"},
            "sync_info": {
                "latest_block_hash": "ABCDEF",
                "latest_block_height": "42",
                "latest_block_time": "2024-03-01T10:00:00.123456789Z"
            }
        }))
        .unwrap();

        assert_eq!(block.hash, "ABCDEF");
        assert_eq!(block.height, 42);
        assert_eq!(block.time.timestamp(), 1709287200);
    }

    #[test]
    fn test_parse_tuple_status_with_nanosecond_time() {
        let block = parse_status(&json!([
            "status",
            {
                "latest_block_hash": "ABCDEF",
                "latest_block_height": 7,
                "latest_block_time": 1709287200000000000i64
            }
        ]))
        .unwrap();

        assert_eq!(block.height, 7);
        assert_eq!(block.time.timestamp(), 1709287200);
    }

    #[test]
    fn test_parse_status_missing_fields() {
        assert!(parse_status(&json!({"sync_info": {"latest_block_hash": "AB"}})).is_err());
    }
}
