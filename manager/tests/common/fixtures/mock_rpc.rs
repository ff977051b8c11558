//! Mock chain node for consistency monitoring tests
//!
//! One server answers both layers: `GET /status` is the consensus layer and
//! JSON-RPC `POST /` is the application layer. Point both configured RPC
//! ports at [`MockChainNode::port`] and the node's address at 127.0.0.1.

use chrono::{DateTime, Utc};
use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

pub struct MockChainNode {
    pub server: MockServer,
}

impl MockChainNode {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn port(&self) -> u16 {
        self.server.address().port()
    }

    /// Consensus layer reports `height` with hash `hash` produced at `time`
    pub async fn mock_consensus_status(&self, height: u64, hash: &str, time: DateTime<Utc>) {
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": "",
                "result": {
                    "node_info": {"moniker": "test-node"},
                    "sync_info": {
                        "latest_block_hash": hash,
                        "latest_block_height": height.to_string(),
                        "latest_block_time": time.to_rfc3339()
                    }
                }
            })))
            .mount(&self.server)
            .await;
    }

    /// Application layer answers `eth_getBlockByNumber` with block `number`
    pub async fn mock_application_block(&self, number: u64, hash: &str) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "eth_getBlockByNumber"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 0,
                "result": {
                    "number": format!("0x{:x}", number),
                    "hash": format!("0x{}", hash.to_lowercase())
                }
            })))
            .mount(&self.server)
            .await;
    }

    /// Healthy node at `height` whose layers agree
    pub async fn mock_in_sync(&self, height: u64, hash: &str, time: DateTime<Utc>) {
        self.mock_consensus_status(height, hash, time).await;
        self.mock_application_block(height - 1, hash).await;
    }

    /// Both layers fail
    pub async fn mock_unhealthy(&self) {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&self.server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&self.server)
            .await;
    }
}
