//! Polling waits on provider resource state
//!
//! Every wait is bounded by [`WaitPolicy::timeout`]. A resource that reaches a
//! state it cannot leave (`error`, terminated) fails immediately instead of
//! running the clock out.

use super::{CloudProvider, InstanceState, SnapshotDescription, SnapshotState, VolumeState};
use crate::config::Config;
use crate::errors::ChainError;
use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl WaitPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.resource_wait_timeout(),
            poll_interval: config.resource_poll_interval(),
        }
    }
}

enum Probe<T> {
    Ready(T),
    Pending(String),
    Failed(String),
}

async fn poll_until<T, F, Fut>(
    policy: WaitPolicy,
    kind: &str,
    resource_id: &str,
    expected: &str,
    mut probe: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Probe<T>>>,
{
    let deadline = Instant::now() + policy.timeout;
    loop {
        match probe().await? {
            Probe::Ready(value) => return Ok(value),
            Probe::Failed(actual) => {
                return Err(ChainError::ResourceState {
                    kind: kind.to_string(),
                    resource_id: resource_id.to_string(),
                    expected: expected.to_string(),
                    actual,
                }
                .into())
            }
            Probe::Pending(actual) => {
                if Instant::now() >= deadline {
                    return Err(ChainError::ResourceTimeout {
                        kind: kind.to_string(),
                        resource_id: resource_id.to_string(),
                        expected: expected.to_string(),
                        waited_seconds: policy.timeout.as_secs(),
                    }
                    .into());
                }
                debug!("{} {} is '{}', waiting for '{}'", kind, resource_id, actual, expected);
                sleep(policy.poll_interval).await;
            }
        }
    }
}

/// Wait for a snapshot to complete; returns its final description
pub async fn wait_for_snapshot_completed(
    provider: &dyn CloudProvider,
    policy: WaitPolicy,
    region: &str,
    snapshot_id: &str,
) -> Result<SnapshotDescription> {
    poll_until(policy, "snapshot", snapshot_id, "completed", move || async move {
        Ok(match provider.describe_snapshot(region, snapshot_id).await? {
            None => Probe::Failed("missing".to_string()),
            Some(snapshot) => match snapshot.state {
                SnapshotState::Completed => Probe::Ready(snapshot),
                SnapshotState::Pending => Probe::Pending(snapshot.state.as_str().to_string()),
                SnapshotState::Error => Probe::Failed(snapshot.state.as_str().to_string()),
            },
        })
    })
    .await
}

pub async fn wait_for_volume_available(
    provider: &dyn CloudProvider,
    policy: WaitPolicy,
    region: &str,
    volume_id: &str,
) -> Result<()> {
    poll_until(policy, "volume", volume_id, "available", move || async move {
        Ok(match provider.describe_volume(region, volume_id).await? {
            None => Probe::Failed("missing".to_string()),
            Some(volume) => match volume.state {
                VolumeState::Available => Probe::Ready(()),
                VolumeState::Creating => Probe::Pending(volume.state.as_str().to_string()),
                other => Probe::Failed(other.as_str().to_string()),
            },
        })
    })
    .await
}

/// Wait for an instance to run and return its public address
pub async fn wait_for_instance_running(
    provider: &dyn CloudProvider,
    policy: WaitPolicy,
    region: &str,
    instance_id: &str,
) -> Result<String> {
    poll_until(policy, "instance", instance_id, "running", move || async move {
        Ok(match provider.describe_instance(region, instance_id).await? {
            None => Probe::Failed("missing".to_string()),
            Some(instance) => match (instance.state, instance.public_ip) {
                (InstanceState::Running, Some(ip)) => Probe::Ready(ip),
                (InstanceState::Terminated, _) => Probe::Failed("terminated".to_string()),
                (InstanceState::Running, None) => Probe::Pending("running without address".to_string()),
                (InstanceState::Pending, _) => Probe::Pending("pending".to_string()),
            },
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::{SandboxCloud, VolumeRequest};

    fn quick() -> WaitPolicy {
        WaitPolicy {
            timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_volume_wait_follows_transitions() {
        let cloud = SandboxCloud::new();
        cloud.set_pending_polls(3).await;
        let id = cloud
            .create_volume("us-west-1", &VolumeRequest::blank("us-west-1a", 10))
            .await
            .unwrap();

        wait_for_volume_available(&cloud, quick(), "us-west-1", &id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let cloud = SandboxCloud::new();
        cloud.set_pending_polls(u32::MAX).await;
        let id = cloud
            .create_volume("us-west-1", &VolumeRequest::blank("us-west-1a", 10))
            .await
            .unwrap();

        let err = wait_for_volume_available(&cloud, quick(), "us-west-1", &id)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChainError>(),
            Some(ChainError::ResourceTimeout { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_snapshot_fails_fast() {
        let cloud = SandboxCloud::new();
        let volume = cloud
            .create_volume("us-west-1", &VolumeRequest::blank("us-west-1a", 10))
            .await
            .unwrap();
        cloud.fail_snapshots_of(&volume).await;
        let snapshot = cloud
            .create_snapshot("us-west-1", &volume, "ethermint-backup")
            .await
            .unwrap();

        let err = wait_for_snapshot_completed(&cloud, quick(), "us-west-1", &snapshot)
            .await
            .unwrap_err();
        match err.downcast_ref::<ChainError>() {
            Some(ChainError::ResourceState { actual, .. }) => assert_eq!(actual, "error"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
