//! Provider resource descriptions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provider tag; serialized with the provider's capitalized field names
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value")]
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, other: &Tag) -> bool {
        self.key == other.key && self.value == other.value
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceState {
    Pending,
    Running,
    Terminated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDeviceMapping {
    pub device_name: String,
    pub volume_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceDescription {
    pub id: String,
    pub availability_zone: String,
    pub image_id: String,
    pub instance_type: String,
    pub public_ip: Option<String>,
    pub key_name: String,
    pub tags: Vec<Tag>,
    pub security_groups: Vec<String>,
    pub vpc_id: Option<String>,
    pub launch_time: DateTime<Utc>,
    pub state: InstanceState,
    pub block_device_mappings: Vec<BlockDeviceMapping>,
}

/// Input of `run_instance`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceRequest {
    pub image_id: String,
    pub instance_type: String,
    pub availability_zone: Option<String>,
    pub security_groups: Vec<String>,
    pub key_name: String,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VolumeState {
    Creating,
    Available,
    InUse,
    Deleted,
    Error,
}

impl VolumeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeState::Creating => "creating",
            VolumeState::Available => "available",
            VolumeState::InUse => "in-use",
            VolumeState::Deleted => "deleted",
            VolumeState::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeAttachment {
    pub instance_id: String,
    pub device: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeDescription {
    pub id: String,
    pub availability_zone: String,
    pub size_gb: u32,
    pub snapshot_id: Option<String>,
    pub state: VolumeState,
    pub tags: Vec<Tag>,
    pub attachments: Vec<VolumeAttachment>,
}

impl VolumeDescription {
    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.tags.iter().any(|t| t.matches(tag))
    }
}

/// Input of `create_volume`: either a blank volume or one restored from a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeRequest {
    pub availability_zone: String,
    pub size_gb: Option<u32>,
    pub snapshot_id: Option<String>,
}

impl VolumeRequest {
    pub fn blank(availability_zone: &str, size_gb: u32) -> Self {
        Self {
            availability_zone: availability_zone.to_string(),
            size_gb: Some(size_gb),
            snapshot_id: None,
        }
    }

    pub fn from_snapshot(availability_zone: &str, snapshot_id: &str) -> Self {
        Self {
            availability_zone: availability_zone.to_string(),
            size_gb: None,
            snapshot_id: Some(snapshot_id.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotState {
    Pending,
    Completed,
    Error,
}

impl SnapshotState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotState::Pending => "pending",
            SnapshotState::Completed => "completed",
            SnapshotState::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDescription {
    pub id: String,
    pub volume_id: String,
    pub description: String,
    pub state: SnapshotState,
    pub start_time: DateTime<Utc>,
    /// Set once the snapshot reaches `completed`
    pub completion_time: Option<DateTime<Utc>>,
}
