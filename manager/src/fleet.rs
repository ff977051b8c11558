//! Component wiring
//!
//! Everything shares one provider handle and one node directory, so a
//! [`Fleet`] is built once per process (or per test) and cloned freely.

use crate::cloud::{CloudProvider, WaitPolicy};
use crate::config::Config;
use crate::health::ConsistencyMonitor;
use crate::network::NetworkBuilder;
use crate::node::NodeDirectory;
use crate::provisioner::InstanceProvisioner;
use crate::remote::{ChainProcess, CommandTransport, RemoteExecutor};
use crate::snapshot::{RestoreCoordinator, SnapshotCoordinator};
use anyhow::Result;
use std::sync::Arc;

#[derive(Clone)]
pub struct Fleet {
    pub config: Arc<Config>,
    pub provider: Arc<dyn CloudProvider>,
    pub directory: NodeDirectory,
    pub executor: RemoteExecutor,
    pub process: ChainProcess,
    pub provisioner: InstanceProvisioner,
    pub snapshots: SnapshotCoordinator,
    pub restore: RestoreCoordinator,
    pub networks: NetworkBuilder,
    pub monitor: ConsistencyMonitor,
}

impl Fleet {
    pub fn new(
        config: Arc<Config>,
        provider: Arc<dyn CloudProvider>,
        transport: Arc<dyn CommandTransport>,
    ) -> Result<Self> {
        let wait = WaitPolicy::from_config(&config);
        let directory = NodeDirectory::new(provider.clone());
        let executor = RemoteExecutor::new(directory.clone(), transport, &config);
        let process = ChainProcess::new(executor.clone(), directory.clone(), config.p2p_port);
        let provisioner = InstanceProvisioner::new(
            provider.clone(),
            directory.clone(),
            executor.clone(),
            config.clone(),
        );

        let snapshots =
            SnapshotCoordinator::new(provider.clone(), directory.clone(), process.clone(), wait);
        let restore = RestoreCoordinator::new(
            provider.clone(),
            directory.clone(),
            provisioner.clone(),
            process.clone(),
            wait,
        )
        .with_teardown_on_failure(config.thaw_teardown_on_failure);
        let networks = NetworkBuilder::new(provisioner.clone(), process.clone(), config.clone());
        let monitor = ConsistencyMonitor::new(directory.clone(), &config)?;

        Ok(Self {
            config,
            provider,
            directory,
            executor,
            process,
            provisioner,
            snapshots,
            restore,
            networks,
            monitor,
        })
    }
}
