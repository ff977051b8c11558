use crate::cloud::{canonical_region, Tag};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What is needed to launch an equivalent instance later
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceMetadata {
    pub id: String,
    pub region: String,
    // Older records carry the misspelled key
    #[serde(alias = "availablility_zone")]
    pub availability_zone: String,
    #[serde(rename = "ami")]
    pub image_id: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub security_groups: Vec<String>,
    pub key_name: String,
}

/// Snapshot id plus the span of chain history it covers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotWindow {
    pub id: String,
    /// Launch time of the source instance
    pub from: DateTime<Utc>,
    /// Snapshot completion time
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainshotEntry {
    pub instance: InstanceMetadata,
    pub snapshot: SnapshotWindow,
}

/// Result of one chainshot; entries are in chain order, seed first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainshotRecord {
    pub chainshot_name: String,
    pub instances: Vec<ChainshotEntry>,
}

impl ChainshotRecord {
    pub fn from_json(content: &str) -> Result<Self> {
        let mut record: ChainshotRecord =
            serde_json::from_str(content).context("Failed to parse chainshot record")?;
        record.normalize();
        Ok(record)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize chainshot record")
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&content)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, self.to_json()?)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn snapshot_ids(&self) -> Vec<&str> {
        self.instances.iter().map(|e| e.snapshot.id.as_str()).collect()
    }

    /// Records written by older tooling put the availability zone in `region`
    fn normalize(&mut self) {
        for entry in &mut self.instances {
            let region = canonical_region(&entry.instance.region).to_string();
            if region != entry.instance.region {
                if entry.instance.availability_zone.is_empty() {
                    entry.instance.availability_zone = entry.instance.region.clone();
                }
                entry.instance.region = region;
            }
        }
    }
}
