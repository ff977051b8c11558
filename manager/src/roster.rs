//! salt-ssh roster for a group of chains

use crate::node::{Chain, NodeDirectory};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub host: String,
    pub user: String,
    pub sudo: bool,
}

/// Minion id for a node: `chain{idx}_{region}_{instance_id}`
pub fn minion_id(chain_idx: usize, region: &str, instance_id: &str) -> String {
    format!("chain{}_{}_{}", chain_idx, region, instance_id)
}

/// One roster entry per node of every chain, keyed by minion id
pub async fn build_roster(
    directory: &NodeDirectory,
    chains: &[Chain],
    user: &str,
) -> Result<BTreeMap<String, RosterEntry>> {
    let mut roster = BTreeMap::new();
    for (chain_idx, chain) in chains.iter().enumerate() {
        for node in &chain.nodes {
            let host = directory.public_address(node).await?;
            roster.insert(
                minion_id(chain_idx, &node.region, &node.instance_id),
                RosterEntry {
                    host,
                    user: user.to_string(),
                    sudo: true,
                },
            );
        }
    }
    Ok(roster)
}
