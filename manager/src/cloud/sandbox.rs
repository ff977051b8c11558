//! In-process cloud provider
//!
//! Keeps instances, volumes and snapshots in memory and walks them through the
//! same state transitions a real provider reports: resources start out
//! `pending`/`creating` and settle after a configurable number of describe
//! calls. Failures can be injected per volume so error paths of the chainshot
//! and thaw protocols can be exercised without a real account.

use super::{
    canonical_region, BlockDeviceMapping, CloudProvider, InstanceDescription, InstanceRequest,
    InstanceState, SnapshotDescription, SnapshotState, Tag, VolumeAttachment, VolumeDescription,
    VolumeRequest, VolumeState,
};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

struct Tracked<T> {
    region: String,
    polls_left: u32,
    resource: T,
}

#[derive(Default)]
struct SandboxState {
    instances: HashMap<String, Tracked<InstanceDescription>>,
    volumes: HashMap<String, Tracked<VolumeDescription>>,
    snapshots: HashMap<String, Tracked<SnapshotDescription>>,
    pending_polls: u32,
    failing_snapshot_volumes: HashSet<String>,
    fail_volume_creation: bool,
    next_address: u32,
    snapshot_requests: Vec<String>,
}

pub struct SandboxCloud {
    state: Mutex<SandboxState>,
}

impl Default for SandboxCloud {
    fn default() -> Self {
        Self::new()
    }
}

fn new_id(prefix: &str) -> String {
    format!("{}-{}", prefix, &Uuid::new_v4().simple().to_string()[..17])
}

impl SandboxCloud {
    /// Resources settle on their first describe call
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SandboxState::default()),
        }
    }

    /// Number of describe calls a new resource stays in its transitional state
    pub async fn set_pending_polls(&self, polls: u32) {
        self.state.lock().await.pending_polls = polls;
    }

    /// Snapshots of this volume end up in `error`
    pub async fn fail_snapshots_of(&self, volume_id: &str) {
        self.state
            .lock()
            .await
            .failing_snapshot_volumes
            .insert(volume_id.to_string());
    }

    /// Make every subsequent `create_volume` call fail
    pub async fn fail_volume_creation(&self, fail: bool) {
        self.state.lock().await.fail_volume_creation = fail;
    }

    /// Override the address reported for an instance
    pub async fn set_public_ip(&self, instance_id: &str, ip: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let instance = state
            .instances
            .get_mut(instance_id)
            .ok_or_else(|| anyhow!("No instance {}", instance_id))?;
        instance.resource.public_ip = Some(ip.to_string());
        Ok(())
    }

    /// Volume ids passed to `create_snapshot`, in call order
    pub async fn snapshot_requests(&self) -> Vec<String> {
        self.state.lock().await.snapshot_requests.clone()
    }

    pub async fn instance_ids(&self, region: &str) -> Vec<String> {
        let state = self.state.lock().await;
        let mut ids: Vec<(chrono::DateTime<Utc>, String)> = state
            .instances
            .iter()
            .filter(|(_, i)| i.region == region)
            .map(|(id, i)| (i.resource.launch_time, id.clone()))
            .collect();
        ids.sort();
        ids.into_iter().map(|(_, id)| id).collect()
    }

    pub async fn snapshot_ids(&self) -> Vec<String> {
        self.state.lock().await.snapshots.keys().cloned().collect()
    }

    /// Current state of any volume, without advancing transitions
    pub async fn peek_volume(&self, volume_id: &str) -> Option<VolumeDescription> {
        let state = self.state.lock().await;
        state.volumes.get(volume_id).map(|v| v.resource.clone())
    }

    pub async fn peek_snapshot(&self, snapshot_id: &str) -> Option<SnapshotDescription> {
        let state = self.state.lock().await;
        state.snapshots.get(snapshot_id).map(|s| s.resource.clone())
    }

    pub async fn peek_instance(&self, instance_id: &str) -> Option<InstanceDescription> {
        let state = self.state.lock().await;
        state.instances.get(instance_id).map(|i| i.resource.clone())
    }
}

impl SandboxState {
    fn next_ip(&mut self) -> String {
        self.next_address += 1;
        format!(
            "10.{}.{}.{}",
            (self.next_address >> 16) & 0xff,
            (self.next_address >> 8) & 0xff,
            self.next_address & 0xff
        )
    }

    fn advance_instance(&mut self, instance_id: &str) {
        let Some(tracked) = self.instances.get_mut(instance_id) else {
            return;
        };
        if tracked.resource.state != InstanceState::Pending {
            return;
        }
        if tracked.polls_left > 0 {
            tracked.polls_left -= 1;
            return;
        }
        tracked.resource.state = InstanceState::Running;
        if tracked.resource.public_ip.is_none() {
            let ip = self.next_ip();
            if let Some(tracked) = self.instances.get_mut(instance_id) {
                tracked.resource.public_ip = Some(ip);
            }
        }
    }

    fn advance_volume(&mut self, volume_id: &str) {
        let Some(tracked) = self.volumes.get_mut(volume_id) else {
            return;
        };
        if tracked.resource.state != VolumeState::Creating {
            return;
        }
        if tracked.polls_left > 0 {
            tracked.polls_left -= 1;
            return;
        }
        tracked.resource.state = VolumeState::Available;
    }

    fn advance_snapshot(&mut self, snapshot_id: &str) {
        let failing = match self.snapshots.get(snapshot_id) {
            Some(tracked) => self
                .failing_snapshot_volumes
                .contains(&tracked.resource.volume_id),
            None => return,
        };
        let Some(tracked) = self.snapshots.get_mut(snapshot_id) else {
            return;
        };
        if tracked.resource.state != SnapshotState::Pending {
            return;
        }
        if tracked.polls_left > 0 {
            tracked.polls_left -= 1;
            return;
        }
        if failing {
            tracked.resource.state = SnapshotState::Error;
        } else {
            tracked.resource.state = SnapshotState::Completed;
            tracked.resource.completion_time = Some(Utc::now());
        }
    }

    fn instance_in(&mut self, region: &str, instance_id: &str) -> Result<&mut InstanceDescription> {
        match self.instances.get_mut(instance_id) {
            Some(tracked) if tracked.region == region => Ok(&mut tracked.resource),
            _ => bail!("InvalidInstanceID.NotFound: {} in {}", instance_id, region),
        }
    }

    fn volume_in(&mut self, region: &str, volume_id: &str) -> Result<&mut VolumeDescription> {
        match self.volumes.get_mut(volume_id) {
            Some(tracked) if tracked.region == region => Ok(&mut tracked.resource),
            _ => bail!("InvalidVolume.NotFound: {} in {}", volume_id, region),
        }
    }
}

#[async_trait]
impl CloudProvider for SandboxCloud {
    async fn describe_instance(
        &self,
        region: &str,
        instance_id: &str,
    ) -> Result<Option<InstanceDescription>> {
        let mut state = self.state.lock().await;
        state.advance_instance(instance_id);
        Ok(state
            .instances
            .get(instance_id)
            .filter(|i| i.region == region)
            .map(|i| i.resource.clone()))
    }

    async fn run_instance(&self, region: &str, request: &InstanceRequest) -> Result<String> {
        let mut state = self.state.lock().await;
        let availability_zone = match &request.availability_zone {
            Some(zone) if canonical_region(zone) != region => {
                bail!("Availability zone {} is not in region {}", zone, region)
            }
            Some(zone) => zone.clone(),
            None => format!("{}a", region),
        };

        let id = new_id("i");
        let instance = InstanceDescription {
            id: id.clone(),
            availability_zone,
            image_id: request.image_id.clone(),
            instance_type: request.instance_type.clone(),
            public_ip: None,
            key_name: request.key_name.clone(),
            tags: request.tags.clone(),
            security_groups: request.security_groups.clone(),
            vpc_id: Some(format!("vpc-{}", region)),
            launch_time: Utc::now(),
            state: InstanceState::Pending,
            block_device_mappings: Vec::new(),
        };
        let polls_left = state.pending_polls;
        state.instances.insert(
            id.clone(),
            Tracked {
                region: region.to_string(),
                polls_left,
                resource: instance,
            },
        );
        debug!("sandbox: launched {} in {}", id, region);
        Ok(id)
    }

    async fn terminate_instance(&self, region: &str, instance_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let instance = state.instance_in(region, instance_id)?;
        instance.state = InstanceState::Terminated;
        instance.public_ip = None;
        let attached: Vec<String> = instance
            .block_device_mappings
            .drain(..)
            .map(|m| m.volume_id)
            .collect();

        for volume_id in attached {
            if let Some(tracked) = state.volumes.get_mut(&volume_id) {
                tracked.resource.attachments.clear();
                tracked.resource.state = VolumeState::Available;
            }
        }
        Ok(())
    }

    async fn create_tags(&self, region: &str, resource_id: &str, tags: &[Tag]) -> Result<()> {
        let mut state = self.state.lock().await;
        let existing = if resource_id.starts_with("i-") {
            &mut state.instance_in(region, resource_id)?.tags
        } else if resource_id.starts_with("vol-") {
            &mut state.volume_in(region, resource_id)?.tags
        } else {
            bail!("Cannot tag resource {}", resource_id)
        };
        for tag in tags {
            existing.retain(|t| t.key != tag.key);
            existing.push(tag.clone());
        }
        Ok(())
    }

    async fn describe_instance_volumes(
        &self,
        region: &str,
        instance_id: &str,
    ) -> Result<Vec<VolumeDescription>> {
        let state = self.state.lock().await;
        let mut volumes: Vec<VolumeDescription> = state
            .volumes
            .values()
            .filter(|v| v.region == region)
            .filter(|v| {
                v.resource
                    .attachments
                    .iter()
                    .any(|a| a.instance_id == instance_id)
            })
            .map(|v| v.resource.clone())
            .collect();
        volumes.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(volumes)
    }

    async fn describe_volume(
        &self,
        region: &str,
        volume_id: &str,
    ) -> Result<Option<VolumeDescription>> {
        let mut state = self.state.lock().await;
        state.advance_volume(volume_id);
        Ok(state
            .volumes
            .get(volume_id)
            .filter(|v| v.region == region && v.resource.state != VolumeState::Deleted)
            .map(|v| v.resource.clone()))
    }

    async fn create_volume(&self, region: &str, request: &VolumeRequest) -> Result<String> {
        let mut state = self.state.lock().await;
        if state.fail_volume_creation {
            bail!("VolumeLimitExceeded: cannot create volume in {}", region);
        }
        if canonical_region(&request.availability_zone) != region {
            bail!(
                "Availability zone {} is not in region {}",
                request.availability_zone,
                region
            );
        }

        let size_gb = match (&request.snapshot_id, request.size_gb) {
            (Some(snapshot_id), size) => {
                let snapshot = state
                    .snapshots
                    .get(snapshot_id)
                    .filter(|s| s.region == region)
                    .ok_or_else(|| anyhow!("InvalidSnapshot.NotFound: {}", snapshot_id))?;
                if snapshot.resource.state != SnapshotState::Completed {
                    bail!(
                        "Snapshot {} is {}",
                        snapshot_id,
                        snapshot.resource.state.as_str()
                    );
                }
                let source_size = state
                    .volumes
                    .get(&snapshot.resource.volume_id)
                    .map(|v| v.resource.size_gb)
                    .unwrap_or(crate::constants::volume::DEFAULT_SIZE_GB);
                size.unwrap_or(source_size).max(source_size)
            }
            (None, Some(size)) => size,
            (None, None) => bail!("Volume request needs a size or a snapshot"),
        };

        let id = new_id("vol");
        let polls_left = state.pending_polls;
        state.volumes.insert(
            id.clone(),
            Tracked {
                region: region.to_string(),
                polls_left,
                resource: VolumeDescription {
                    id: id.clone(),
                    availability_zone: request.availability_zone.clone(),
                    size_gb,
                    snapshot_id: request.snapshot_id.clone(),
                    state: VolumeState::Creating,
                    tags: Vec::new(),
                    attachments: Vec::new(),
                },
            },
        );
        Ok(id)
    }

    async fn attach_volume(
        &self,
        region: &str,
        volume_id: &str,
        instance_id: &str,
        device: &str,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let instance_zone = {
            let instance = state.instance_in(region, instance_id)?;
            if instance.state == InstanceState::Terminated {
                bail!("IncorrectInstanceState: {} is terminated", instance_id);
            }
            if instance
                .block_device_mappings
                .iter()
                .any(|m| m.device_name == device)
            {
                bail!("InvalidParameterValue: {} already in use on {}", device, instance_id);
            }
            instance.availability_zone.clone()
        };

        let volume = state.volume_in(region, volume_id)?;
        if volume.state != VolumeState::Available {
            bail!(
                "IncorrectState: volume {} is {}",
                volume_id,
                volume.state.as_str()
            );
        }
        if volume.availability_zone != instance_zone {
            bail!(
                "InvalidVolume.ZoneMismatch: {} is in {}, instance in {}",
                volume_id,
                volume.availability_zone,
                instance_zone
            );
        }
        volume.state = VolumeState::InUse;
        volume.attachments.push(VolumeAttachment {
            instance_id: instance_id.to_string(),
            device: device.to_string(),
        });

        state
            .instance_in(region, instance_id)?
            .block_device_mappings
            .push(BlockDeviceMapping {
                device_name: device.to_string(),
                volume_id: volume_id.to_string(),
            });
        Ok(())
    }

    async fn delete_volume(&self, region: &str, volume_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let volume = state.volume_in(region, volume_id)?;
        if volume.state == VolumeState::InUse {
            bail!("VolumeInUse: {}", volume_id);
        }
        volume.state = VolumeState::Deleted;
        Ok(())
    }

    async fn create_snapshot(
        &self,
        region: &str,
        volume_id: &str,
        description: &str,
    ) -> Result<String> {
        let mut state = self.state.lock().await;
        state.volume_in(region, volume_id)?;
        state.snapshot_requests.push(volume_id.to_string());

        let id = new_id("snap");
        let polls_left = state.pending_polls;
        state.snapshots.insert(
            id.clone(),
            Tracked {
                region: region.to_string(),
                polls_left,
                resource: SnapshotDescription {
                    id: id.clone(),
                    volume_id: volume_id.to_string(),
                    description: description.to_string(),
                    state: SnapshotState::Pending,
                    start_time: Utc::now(),
                    completion_time: None,
                },
            },
        );
        Ok(id)
    }

    async fn describe_snapshot(
        &self,
        region: &str,
        snapshot_id: &str,
    ) -> Result<Option<SnapshotDescription>> {
        let mut state = self.state.lock().await;
        state.advance_snapshot(snapshot_id);
        Ok(state
            .snapshots
            .get(snapshot_id)
            .filter(|s| s.region == region)
            .map(|s| s.resource.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(zone: Option<&str>) -> InstanceRequest {
        InstanceRequest {
            image_id: "ami-1".to_string(),
            instance_type: "t2.micro".to_string(),
            availability_zone: zone.map(str::to_string),
            security_groups: vec!["sg-1".to_string()],
            key_name: "fleet".to_string(),
            tags: vec![Tag::new("Name", "node")],
        }
    }

    #[tokio::test]
    async fn test_instance_becomes_running_with_address() {
        let cloud = SandboxCloud::new();
        cloud.set_pending_polls(1).await;
        let id = cloud.run_instance("us-west-1", &request(None)).await.unwrap();

        let first = cloud.describe_instance("us-west-1", &id).await.unwrap().unwrap();
        assert_eq!(first.state, InstanceState::Pending);
        assert!(first.public_ip.is_none());

        let second = cloud.describe_instance("us-west-1", &id).await.unwrap().unwrap();
        assert_eq!(second.state, InstanceState::Running);
        assert_eq!(second.availability_zone, "us-west-1a");
        assert!(second.public_ip.is_some());
    }

    #[tokio::test]
    async fn test_instance_not_visible_from_other_region() {
        let cloud = SandboxCloud::new();
        let id = cloud.run_instance("us-west-1", &request(None)).await.unwrap();
        assert!(cloud.describe_instance("eu-west-1", &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_attach_requires_same_zone() {
        let cloud = SandboxCloud::new();
        let id = cloud
            .run_instance("us-west-1", &request(Some("us-west-1b")))
            .await
            .unwrap();
        let volume = cloud
            .create_volume("us-west-1", &VolumeRequest::blank("us-west-1c", 10))
            .await
            .unwrap();
        cloud.describe_volume("us-west-1", &volume).await.unwrap();

        let err = cloud
            .attach_volume("us-west-1", &volume, &id, "/dev/sdh")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ZoneMismatch"));
    }

    #[tokio::test]
    async fn test_restore_from_snapshot_and_terminate_detaches() {
        let cloud = SandboxCloud::new();
        let id = cloud.run_instance("us-west-1", &request(None)).await.unwrap();
        let source = cloud
            .create_volume("us-west-1", &VolumeRequest::blank("us-west-1a", 10))
            .await
            .unwrap();
        cloud.describe_volume("us-west-1", &source).await.unwrap();

        let snapshot = cloud
            .create_snapshot("us-west-1", &source, "ethermint-backup")
            .await
            .unwrap();
        let described = cloud
            .describe_snapshot("us-west-1", &snapshot)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(described.state, SnapshotState::Completed);
        assert!(described.completion_time.is_some());

        let restored = cloud
            .create_volume(
                "us-west-1",
                &VolumeRequest::from_snapshot("us-west-1a", &snapshot),
            )
            .await
            .unwrap();
        cloud.describe_volume("us-west-1", &restored).await.unwrap();
        cloud
            .attach_volume("us-west-1", &restored, &id, "/dev/sdh")
            .await
            .unwrap();

        let attached = cloud.describe_instance_volumes("us-west-1", &id).await.unwrap();
        assert_eq!(attached.len(), 1);
        assert_eq!(attached[0].snapshot_id.as_deref(), Some(snapshot.as_str()));
        assert_eq!(attached[0].size_gb, 10);

        cloud.terminate_instance("us-west-1", &id).await.unwrap();
        let volume = cloud.peek_volume(&restored).await.unwrap();
        assert_eq!(volume.state, VolumeState::Available);
        cloud.delete_volume("us-west-1", &restored).await.unwrap();
        assert!(cloud.describe_volume("us-west-1", &restored).await.unwrap().is_none());
    }
}
