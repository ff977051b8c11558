// File: manager/src/config/mod.rs
pub mod manager;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
pub use manager::ConfigManager;

use crate::constants::{defaults, ports, remote, volume, waits};
use crate::errors::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u64,
    #[serde(default = "default_rpc_timeout")]
    pub rpc_timeout_seconds: u64,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default)]
    pub provider: ProviderKind,
    // Remote execution
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: String,
    #[serde(default = "default_key_dir")]
    pub key_dir: String,
    #[serde(default = "default_ssh_user")]
    pub ssh_user: String,
    #[serde(default = "default_max_remote_attempts")]
    pub max_remote_attempts: u32,
    #[serde(default = "default_remote_backoff")]
    pub remote_backoff_ms: u64,
    // Provider waits
    #[serde(default = "default_resource_wait_timeout")]
    pub resource_wait_timeout_seconds: u64,
    #[serde(default = "default_resource_poll_interval")]
    pub resource_poll_interval_ms: u64,
    // Chain protocol
    #[serde(default = "default_liveness_threshold")]
    pub liveness_threshold_seconds: i64,
    #[serde(default = "default_p2p_port")]
    pub p2p_port: u16,
    #[serde(default = "default_consensus_rpc_port")]
    pub consensus_rpc_port: u16,
    #[serde(default = "default_application_rpc_port")]
    pub application_rpc_port: u16,
    // Fleet creation
    #[serde(default = "default_parallelism")]
    pub provisioning_parallelism: usize,
    #[serde(default)]
    pub thaw_teardown_on_failure: bool,
    #[serde(default)]
    pub schedules: Vec<ChainshotSchedule>,
    // Populated from individual region config files
    #[serde(skip)]
    pub regions: HashMap<String, RegionConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// In-process provider, state lives as long as the manager process
    #[default]
    Sandbox,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainshotSchedule {
    pub chain: String,
    /// 6-field cron expression (sec min hour day month dow)
    pub schedule: String,
    pub name_prefix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfigFile {
    pub region: RegionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    // Taken from the file name
    #[serde(default)]
    pub name: String,
    pub default_ami: Option<String>,
    #[serde(default = "default_instance_type")]
    pub instance_type: String,
    #[serde(default = "default_volume_size")]
    pub volume_size_gb: u32,
}

impl Config {
    pub fn remote_backoff(&self) -> Duration {
        Duration::from_millis(self.remote_backoff_ms)
    }

    pub fn resource_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.resource_wait_timeout_seconds)
    }

    pub fn resource_poll_interval(&self) -> Duration {
        Duration::from_millis(self.resource_poll_interval_ms)
    }

    /// Region settings, falling back to defaults for regions without a file
    pub fn region(&self, name: &str) -> RegionConfig {
        self.regions.get(name).cloned().unwrap_or_else(|| RegionConfig {
            name: name.to_string(),
            default_ami: None,
            instance_type: default_instance_type(),
            volume_size_gb: default_volume_size(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_remote_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_remote_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.provisioning_parallelism == 0 {
            return Err(ConfigError::InvalidValue {
                field: "provisioning_parallelism".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.liveness_threshold_seconds <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "liveness_threshold_seconds".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.check_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "check_interval_seconds".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.resource_poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "resource_poll_interval_ms".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        for schedule in &self.schedules {
            if schedule.chain.trim().is_empty() {
                return Err(ConfigError::MissingRequired {
                    field: "schedules.chain".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            check_interval_seconds: default_check_interval(),
            rpc_timeout_seconds: default_rpc_timeout(),
            database_path: default_database_path(),
            provider: ProviderKind::default(),
            scripts_dir: default_scripts_dir(),
            key_dir: default_key_dir(),
            ssh_user: default_ssh_user(),
            max_remote_attempts: default_max_remote_attempts(),
            remote_backoff_ms: default_remote_backoff(),
            resource_wait_timeout_seconds: default_resource_wait_timeout(),
            resource_poll_interval_ms: default_resource_poll_interval(),
            liveness_threshold_seconds: default_liveness_threshold(),
            p2p_port: default_p2p_port(),
            consensus_rpc_port: default_consensus_rpc_port(),
            application_rpc_port: default_application_rpc_port(),
            provisioning_parallelism: default_parallelism(),
            thaw_teardown_on_failure: false,
            schedules: Vec::new(),
            regions: HashMap::new(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8095
}

fn default_check_interval() -> u64 {
    defaults::HEALTH_CHECK_INTERVAL_SECONDS
}

fn default_rpc_timeout() -> u64 {
    defaults::RPC_TIMEOUT_SECONDS
}

fn default_database_path() -> String {
    "data/fleet.db".to_string()
}

fn default_scripts_dir() -> String {
    "shell_scripts".to_string()
}

fn default_key_dir() -> String {
    "files".to_string()
}

fn default_ssh_user() -> String {
    remote::SSH_USER.to_string()
}

fn default_max_remote_attempts() -> u32 {
    remote::MAX_ATTEMPTS
}

fn default_remote_backoff() -> u64 {
    remote::BACKOFF.as_millis() as u64
}

fn default_resource_wait_timeout() -> u64 {
    waits::RESOURCE_TIMEOUT_SECONDS
}

fn default_resource_poll_interval() -> u64 {
    waits::POLL_INTERVAL.as_millis() as u64
}

fn default_liveness_threshold() -> i64 {
    defaults::LIVENESS_THRESHOLD_SECONDS
}

fn default_p2p_port() -> u16 {
    ports::P2P
}

fn default_consensus_rpc_port() -> u16 {
    ports::CONSENSUS_RPC
}

fn default_application_rpc_port() -> u16 {
    ports::APPLICATION_RPC
}

fn default_parallelism() -> usize {
    1 // sequential unless the operator opts in
}

fn default_instance_type() -> String {
    defaults::INSTANCE_TYPE.to_string()
}

fn default_volume_size() -> u32 {
    volume::DEFAULT_SIZE_GB
}
