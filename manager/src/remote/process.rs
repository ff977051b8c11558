//! Starting and stopping the chain software across a chain
//!
//! Both directions walk the chain strictly in order. On start the seed comes
//! up first with no peer argument; every later node is pointed at the seed's
//! p2p endpoint.

use super::RemoteExecutor;
use crate::constants::scripts;
use crate::node::{Chain, Node, NodeDirectory};
use anyhow::{Context, Result};
use tracing::info;

#[derive(Clone)]
pub struct ChainProcess {
    executor: RemoteExecutor,
    directory: NodeDirectory,
    p2p_port: u16,
}

impl ChainProcess {
    pub fn new(executor: RemoteExecutor, directory: NodeDirectory, p2p_port: u16) -> Self {
        Self {
            executor,
            directory,
            p2p_port,
        }
    }

    pub fn executor(&self) -> &RemoteExecutor {
        &self.executor
    }

    pub async fn halt(&self, nodes: &[Node]) -> Result<()> {
        for node in nodes {
            self.executor
                .run(scripts::HALT, node, &[])
                .await
                .with_context(|| format!("Failed to halt {}", node))?;
        }
        Ok(())
    }

    /// Start `nodes[0]` as seed, then the rest as its peers
    pub async fn start(&self, nodes: &[Node]) -> Result<()> {
        let Some(seed) = nodes.first() else {
            return Ok(());
        };

        self.executor
            .run(scripts::RUN, seed, &[])
            .await
            .with_context(|| format!("Failed to start seed {}", seed))?;

        if nodes.len() == 1 {
            return Ok(());
        }

        let seed_address = self.directory.public_address(seed).await?;
        let peer_arg = format!("{}:{}", seed_address, self.p2p_port);
        info!("Seed {} is up, peers join via {}", seed, peer_arg);

        for node in &nodes[1..] {
            self.executor
                .run(scripts::RUN, node, std::slice::from_ref(&peer_arg))
                .await
                .with_context(|| format!("Failed to start {}", node))?;
        }
        Ok(())
    }

    pub async fn halt_chain(&self, chain: &Chain) -> Result<()> {
        self.halt(&chain.nodes).await
    }

    pub async fn start_chain(&self, chain: &Chain) -> Result<()> {
        self.start(&chain.nodes).await
    }
}
