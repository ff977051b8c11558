//! Remote script execution on fleet nodes
//!
//! Scripts live in the local `scripts_dir` and are streamed to the node over
//! ssh (`bash -s`), so nodes need nothing installed beyond the chain software.
//! Every run gets a fixed number of attempts with a fixed pause in between.

pub mod process;
pub mod ssh;

pub use process::ChainProcess;
pub use ssh::SshTransport;

use crate::config::Config;
use crate::errors::ChainError;
use crate::node::{Node, NodeDirectory};
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// One fully resolved script invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    pub script: String,
    pub script_path: PathBuf,
    pub key_file: PathBuf,
    pub user: String,
    pub address: String,
    pub args: Vec<String>,
}

impl RemoteCommand {
    pub fn target(&self) -> String {
        format!("{}@{}", self.user, self.address)
    }
}

/// Carries a command to a node and returns its stdout
#[async_trait]
pub trait CommandTransport: Send + Sync {
    async fn execute(&self, command: &RemoteCommand) -> Result<String>;
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.max_remote_attempts.max(1),
            backoff: config.remote_backoff(),
        }
    }
}

#[derive(Clone)]
pub struct RemoteExecutor {
    directory: NodeDirectory,
    transport: Arc<dyn CommandTransport>,
    scripts_dir: PathBuf,
    key_dir: PathBuf,
    user: String,
    retry: RetryPolicy,
}

impl RemoteExecutor {
    pub fn new(
        directory: NodeDirectory,
        transport: Arc<dyn CommandTransport>,
        config: &Config,
    ) -> Self {
        Self {
            directory,
            transport,
            scripts_dir: PathBuf::from(&config.scripts_dir),
            key_dir: PathBuf::from(&config.key_dir),
            user: config.ssh_user.clone(),
            retry: RetryPolicy::from_config(config),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Resolve address and key for `node`. Resolution failures are not retried.
    async fn resolve(&self, script: &str, node: &Node, args: &[String]) -> Result<RemoteCommand> {
        let attributes = self.directory.attributes(node).await?;
        let address = attributes
            .public_address
            .ok_or_else(|| anyhow::anyhow!("Instance {} has no public address", node))?;

        let key_file = self.key_dir.join(format!("{}.pem", attributes.key_name));
        if !tokio::fs::try_exists(&key_file).await.unwrap_or(false) {
            return Err(ChainError::KeyFileMissing {
                path: key_file.display().to_string(),
            }
            .into());
        }

        Ok(RemoteCommand {
            script: script.to_string(),
            script_path: self.scripts_dir.join(script),
            key_file,
            user: self.user.clone(),
            address,
            args: args.to_vec(),
        })
    }

    /// Run `script` on `node` and return its stdout.
    ///
    /// Makes exactly `max_attempts` attempts with `max_attempts - 1` pauses
    /// between them, then fails with [`ChainError::RemoteExecution`].
    #[instrument(skip(self, args), fields(node = %node))]
    pub async fn run(&self, script: &str, node: &Node, args: &[String]) -> Result<String> {
        let command = self.resolve(script, node, args).await?;
        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            debug!(
                "Running {} on {} (attempt {}/{})",
                script,
                command.target(),
                attempt,
                max_attempts
            );
            match self.transport.execute(&command).await {
                Ok(stdout) => {
                    info!("{} succeeded on {}", script, command.target());
                    return Ok(stdout);
                }
                Err(e) => {
                    warn!(
                        "{} failed on {} (attempt {}/{}): {}",
                        script,
                        command.target(),
                        attempt,
                        max_attempts,
                        e
                    );
                    last_error = e.to_string();
                    if attempt < max_attempts {
                        sleep(self.retry.backoff).await;
                    }
                }
            }
        }

        Err(ChainError::RemoteExecution {
            script: script.to_string(),
            target: command.target(),
            attempts: max_attempts,
            reason: last_error,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::{CloudProvider, InstanceRequest, SandboxCloud};
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    struct FailingFirst {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl CommandTransport for FailingFirst {
        async fn execute(&self, command: &RemoteCommand) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                anyhow::bail!("exit status 255");
            }
            Ok(format!("ran {}", command.script))
        }
    }

    async fn setup(keys: &TempDir, transport: Arc<FailingFirst>) -> (RemoteExecutor, Node) {
        let cloud = Arc::new(SandboxCloud::new());
        let id = cloud
            .run_instance(
                "us-west-1",
                &InstanceRequest {
                    image_id: "ami-1".to_string(),
                    instance_type: "t2.micro".to_string(),
                    availability_zone: None,
                    security_groups: vec![],
                    key_name: "fleet".to_string(),
                    tags: vec![],
                },
            )
            .await
            .unwrap();

        let config = Config {
            key_dir: keys.path().display().to_string(),
            ..Config::default()
        };
        let executor = RemoteExecutor::new(NodeDirectory::new(cloud), transport, &config)
            .with_retry(RetryPolicy {
                max_attempts: 3,
                backoff: Duration::from_secs(5),
            });
        (executor, Node::new("us-west-1", id))
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_within_attempt_budget() {
        let keys = TempDir::new().unwrap();
        std::fs::write(keys.path().join("fleet.pem"), "key").unwrap();
        let transport = Arc::new(FailingFirst {
            failures: 2,
            calls: AtomicU32::new(0),
        });
        let (executor, node) = setup(&keys, transport.clone()).await;

        let started = tokio::time::Instant::now();
        let out = executor.run("halt_ethermint.sh", &node, &[]).await.unwrap();
        assert_eq!(out, "ran halt_ethermint.sh");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
        // two pauses between three attempts
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(10) && waited < Duration::from_secs(15));
    }

    #[tokio::test]
    async fn test_missing_key_file_is_not_retried() {
        let keys = TempDir::new().unwrap();
        let transport = Arc::new(FailingFirst {
            failures: 0,
            calls: AtomicU32::new(0),
        });
        let (executor, node) = setup(&keys, transport.clone()).await;

        let err = executor.run("halt_ethermint.sh", &node, &[]).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChainError>(),
            Some(ChainError::KeyFileMissing { .. })
        ));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }
}
