//! Database record types.

use crate::node::Chain;
use crate::snapshot::ChainshotRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChainshot {
    pub name: String,
    /// Registered chain the chainshot was taken from, if any
    pub chain_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub record: ChainshotRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainshotSummary {
    pub name: String,
    pub chain_name: Option<String>,
    pub node_count: i64,
    pub created_at: DateTime<Utc>,
}

/// How a chain came to be registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainOrigin {
    /// Registered by hand from an existing fleet
    Registered,
    /// Provisioned by fleet creation
    Created,
    /// Rebuilt from a chainshot
    Thawed,
}

impl ChainOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainOrigin::Registered => "registered",
            ChainOrigin::Created => "created",
            ChainOrigin::Thawed => "thawed",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "created" => ChainOrigin::Created,
            "thawed" => ChainOrigin::Thawed,
            _ => ChainOrigin::Registered,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainRecord {
    pub name: String,
    pub chain: Chain,
    pub origin: ChainOrigin,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthRecord {
    pub chain_name: String,
    pub is_alive: bool,
    pub height: Option<i64>,
    pub max_height: Option<i64>,
    pub error_message: Option<String>,
    /// Full status as JSON
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRecord {
    pub id: String,
    pub operation_type: String,
    pub target_name: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub details: Option<String>,
}
