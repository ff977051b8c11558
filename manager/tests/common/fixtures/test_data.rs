//! Common test data and constants

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a unique chainshot name for testing
pub fn random_chainshot_name() -> String {
    format!("shot-{}", &Uuid::new_v4().simple().to_string()[..8])
}

/// Get current timestamp for testing
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Common test regions
pub mod regions {
    pub const US_WEST: &str = "us-west-1";
    pub const EU_WEST: &str = "eu-west-1";
    pub const AP_SOUTH: &str = "ap-south-1";
}

/// Common key pair and image names
pub mod keys {
    pub const KEY_NAME: &str = "fleet";
    pub const IMAGE: &str = "ami-d1180894";
}

/// Common block hashes
pub mod hashes {
    pub const BLOCK_A: &str = "6E6BA4C1B0B7C0A8D7E3A4F50E6A1C3F2B9D8E7F6A5B4C3D2E1F0A9B8C7D6E5F";
    pub const BLOCK_B: &str = "0000000000000000000000000000000000000000000000000000000000000001";
}

/// Common operation types
pub mod operations {
    pub const CHAINSHOT: &str = "chainshot";
    pub const THAW: &str = "thaw";
    pub const CREATE: &str = "create";
}

/// A chainshot record document in the exchange format, one entry per
/// `(region, instance_id, snapshot_id)`
pub fn chainshot_json(name: &str, entries: &[(&str, &str, &str)]) -> String {
    let instances: Vec<serde_json::Value> = entries
        .iter()
        .enumerate()
        .map(|(i, (region, instance_id, snapshot_id))| {
            serde_json::json!({
                "instance": {
                    "id": instance_id,
                    "region": region,
                    "availability_zone": format!("{}a", region),
                    "ami": keys::IMAGE,
                    "tags": [{"Key": "Name", "Value": format!("test-ethermint-{}", i)}],
                    "vpc_id": null,
                    "security_groups": ["ethermint-network"],
                    "key_name": keys::KEY_NAME
                },
                "snapshot": {
                    "id": snapshot_id,
                    "from": "2024-03-01T10:00:00Z",
                    "to": "2024-03-02T10:00:00Z"
                }
            })
        })
        .collect();

    serde_json::json!({
        "chainshot_name": name,
        "instances": instances
    })
    .to_string()
}
