//! Cloud provider boundary
//!
//! Everything the fleet manager knows about instances, volumes and snapshots
//! comes through [`CloudProvider`]. A provider is passed explicitly to every
//! component that needs one and every call names its region, so there is no
//! ambient client or default region anywhere in the crate.
//!
//! The only backend shipped with the manager is [`SandboxCloud`], an
//! in-process provider used by the test suite and by `provider = "sandbox"`.

pub mod sandbox;
pub mod types;
pub mod waiters;

pub use sandbox::SandboxCloud;
pub use types::*;
pub use waiters::WaitPolicy;

use anyhow::Result;
use async_trait::async_trait;

/// Provider API consumed by the directory, provisioner and coordinators.
///
/// `describe_*` calls return `Ok(None)` for resources that do not exist;
/// transport or permission failures are errors.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    async fn describe_instance(
        &self,
        region: &str,
        instance_id: &str,
    ) -> Result<Option<InstanceDescription>>;

    async fn run_instance(&self, region: &str, request: &InstanceRequest) -> Result<String>;

    async fn terminate_instance(&self, region: &str, instance_id: &str) -> Result<()>;

    async fn create_tags(&self, region: &str, resource_id: &str, tags: &[Tag]) -> Result<()>;

    /// Volumes currently attached to an instance
    async fn describe_instance_volumes(
        &self,
        region: &str,
        instance_id: &str,
    ) -> Result<Vec<VolumeDescription>>;

    async fn describe_volume(
        &self,
        region: &str,
        volume_id: &str,
    ) -> Result<Option<VolumeDescription>>;

    async fn create_volume(&self, region: &str, request: &VolumeRequest) -> Result<String>;

    async fn attach_volume(
        &self,
        region: &str,
        volume_id: &str,
        instance_id: &str,
        device: &str,
    ) -> Result<()>;

    async fn delete_volume(&self, region: &str, volume_id: &str) -> Result<()>;

    async fn create_snapshot(
        &self,
        region: &str,
        volume_id: &str,
        description: &str,
    ) -> Result<String>;

    async fn describe_snapshot(
        &self,
        region: &str,
        snapshot_id: &str,
    ) -> Result<Option<SnapshotDescription>>;
}

/// Availability zones are a region name plus a trailing letter
/// (`us-west-1b`); general provider calls want the bare region.
pub fn canonical_region(region_or_zone: &str) -> &str {
    match region_or_zone.chars().last() {
        Some(last) if last.is_ascii_alphabetic() => {
            &region_or_zone[..region_or_zone.len() - last.len_utf8()]
        }
        _ => region_or_zone,
    }
}
