//! Central repository for protocol constants and default configuration values
//!
//! Constants are grouped by the concern that depends on them. Anything an
//! operator may want to tune also has a matching field in `config/main.toml`
//! whose default comes from here.

use std::time::Duration;

/// Data volume conventions shared by provisioning, chainshot and thaw
pub mod volume {
    /// Block device path every data volume is attached at
    pub const DEFAULT_DEVICE: &str = "/dev/sdh";

    /// Tag key used to find the data volume among an instance's volumes
    pub const SENTINEL_TAG_KEY: &str = "Name";

    /// Tag value used to find the data volume among an instance's volumes
    pub const SENTINEL_TAG_VALUE: &str = "ethermint_volume";

    /// Size of a freshly allocated data volume
    pub const DEFAULT_SIZE_GB: u32 = 10;

    /// Description attached to every chainshot snapshot
    pub const SNAPSHOT_DESCRIPTION: &str = "ethermint-backup";
}

/// Remote script names, resolved against `scripts_dir`
pub mod scripts {
    pub const HALT: &str = "halt_ethermint.sh";
    pub const RUN: &str = "run_ethermint.sh";
    pub const MOUNT_NEW_VOLUME: &str = "mount_new_volume.sh";
    pub const MOUNT_SNAPSHOT: &str = "mount_snapshot.sh";
    pub const GET_VERSION: &str = "get_ethermint_version.sh";
}

/// Remote execution
pub mod remote {
    use super::Duration;

    /// Maximum attempts for a single remote script run
    pub const MAX_ATTEMPTS: u32 = 5;

    /// Fixed pause between two attempts
    pub const BACKOFF: Duration = Duration::from_secs(5);

    /// Login user on every node image
    pub const SSH_USER: &str = "ubuntu";

    /// Upper bound for one script run over ssh
    pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(300);
}

/// Block producer network ports
pub mod ports {
    /// Peer-to-peer port the seed is reached on
    pub const P2P: u16 = 46656;

    /// Consensus layer RPC port
    pub const CONSENSUS_RPC: u16 = 46657;

    /// Application layer JSON-RPC port
    pub const APPLICATION_RPC: u16 = 8545;
}

/// Provider resource waits
pub mod waits {
    use super::Duration;

    /// Interval between two provider state polls
    pub const POLL_INTERVAL: Duration = Duration::from_secs(3);

    /// Upper bound for any single snapshot/volume/instance wait
    pub const RESOURCE_TIMEOUT_SECONDS: u64 = 600;
}

/// Cleanup and maintenance constants
pub mod cleanup {
    /// Hours after which stuck operations are cleaned up
    pub const OPERATION_CLEANUP_HOURS: i64 = 24;

    /// Cleanup interval in seconds
    pub const CLEANUP_INTERVAL_SECONDS: u64 = 3600;

    /// Days of chain health history kept
    pub const HEALTH_RECORD_RETENTION_DAYS: i64 = 30;
}

/// Default configuration values
pub mod defaults {
    /// Default health check interval in seconds
    pub const HEALTH_CHECK_INTERVAL_SECONDS: u64 = 90;

    /// Default RPC timeout in seconds
    pub const RPC_TIMEOUT_SECONDS: u64 = 10;

    /// A node whose latest block is older than this is stale
    pub const LIVENESS_THRESHOLD_SECONDS: i64 = 60;

    /// Instance type used when a region file does not name one
    pub const INSTANCE_TYPE: &str = "t2.micro";

    /// Name prefix for instances created by fleet creation
    pub const INSTANCE_NAME_PREFIX: &str = "test-ethermint-";
}
