//! Nodes and chains
//!
//! A [`Node`] is only a lookup key. Everything else about it is fetched live
//! through [`NodeDirectory`] whenever it is needed.

pub mod directory;

pub use directory::{NodeAttributes, NodeDirectory};

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "id")]
    pub instance_id: String,
    pub region: String,
}

impl Node {
    pub fn new(region: impl Into<String>, instance_id: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            instance_id: instance_id.into(),
        }
    }

    /// Key used by the operation tracker
    pub fn target_key(&self) -> String {
        format!("{}/{}", self.region, self.instance_id)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.instance_id, self.region)
    }
}

/// Which block-producing layers a chain runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainType {
    /// Consensus layer plus the EVM application layer
    #[default]
    Ethermint,
    /// Consensus layer only
    Tendermint,
}

impl ChainType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainType::Ethermint => "ethermint",
            ChainType::Tendermint => "tendermint",
        }
    }

    pub fn has_application_layer(&self) -> bool {
        matches!(self, ChainType::Ethermint)
    }
}

/// Ordered set of nodes; index 0 is the seed every other node peers with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ChainDocument", into = "ChainDocument")]
pub struct Chain {
    pub name: Option<String>,
    pub chain_type: ChainType,
    pub nodes: Vec<Node>,
}

impl Chain {
    pub fn new(name: Option<String>, chain_type: ChainType, nodes: Vec<Node>) -> Self {
        Self {
            name,
            chain_type,
            nodes,
        }
    }

    pub fn seed(&self) -> Option<&Node> {
        self.nodes.first()
    }

    pub fn peers(&self) -> &[Node] {
        self.nodes.get(1..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }
}

#[derive(Serialize, Deserialize)]
struct NodeEntry {
    instance: Node,
}

#[derive(Serialize, Deserialize)]
struct ChainDocument {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type", default)]
    chain_type: ChainType,
    instances: Vec<NodeEntry>,
}

impl From<ChainDocument> for Chain {
    fn from(doc: ChainDocument) -> Self {
        Chain {
            name: doc.name,
            chain_type: doc.chain_type,
            nodes: doc.instances.into_iter().map(|e| e.instance).collect(),
        }
    }
}

impl From<Chain> for ChainDocument {
    fn from(chain: Chain) -> Self {
        ChainDocument {
            name: chain.name,
            chain_type: chain.chain_type,
            instances: chain
                .nodes
                .into_iter()
                .map(|instance| NodeEntry { instance })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chain_document_shape() {
        let chain = Chain::new(
            Some("testnet".to_string()),
            ChainType::Ethermint,
            vec![Node::new("us-west-1", "i-0"), Node::new("eu-west-1", "i-1")],
        );

        let value = serde_json::to_value(&chain).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "testnet",
                "type": "ethermint",
                "instances": [
                    {"instance": {"id": "i-0", "region": "us-west-1"}},
                    {"instance": {"id": "i-1", "region": "eu-west-1"}}
                ]
            })
        );
    }

    #[test]
    fn test_chain_type_defaults_to_ethermint() {
        let chain: Chain = serde_json::from_value(json!({
            "instances": [{"instance": {"id": "i-0", "region": "us-west-1"}}]
        }))
        .unwrap();

        assert_eq!(chain.chain_type, ChainType::Ethermint);
        assert_eq!(chain.name, None);
        assert_eq!(chain.seed(), Some(&Node::new("us-west-1", "i-0")));
        assert!(chain.peers().is_empty());
    }
}
