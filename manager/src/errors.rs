//! Custom error types for the fleet manager
//!
//! Components propagate `anyhow::Error`; the variants below are the structured
//! roots of those chains so callers (and tests) can tell failure categories
//! apart with `downcast_ref`.

use std::fmt;

/// Top-level error type of the fleet manager
#[derive(Debug)]
pub enum ManagerError {
    Chain(ChainError),
    Config(ConfigError),
    Operation(OperationError),
    /// Anything else, with its context chain flattened
    Other(String),
}

/// Chainshot, thaw, remote execution and consistency failures
#[derive(Debug, Clone, PartialEq)]
pub enum ChainError {
    /// Instance does not exist in the region the node claims
    NodeNotFound { region: String, instance_id: String },

    /// Zero or several sentinel-tagged data volumes on one instance
    VolumeSelection {
        region: String,
        instance_id: String,
        found: usize,
    },

    /// Remote script kept failing until the attempt budget ran out
    RemoteExecution {
        script: String,
        target: String,
        attempts: u32,
        reason: String,
    },

    /// Key file for a key pair is missing from the key directory
    KeyFileMissing { path: String },

    /// Provider resource reached a state it can never leave
    ResourceState {
        kind: String,
        resource_id: String,
        expected: String,
        actual: String,
    },

    /// Provider resource did not reach the expected state in time
    ResourceTimeout {
        kind: String,
        resource_id: String,
        expected: String,
        waited_seconds: u64,
    },

    /// Consensus and application layers disagree on a node
    OutOfSync {
        region: String,
        instance_id: String,
        reason: String,
    },

    /// Node reports a different chain software version than requested
    VersionMismatch {
        instance_id: String,
        expected: String,
        actual: String,
    },

    /// Thaw aborted; lists what was already created for manual teardown
    ThawFailed {
        chainshot_name: String,
        reason: String,
        created_instances: Vec<String>,
        created_volumes: Vec<String>,
        torn_down: bool,
    },
}

/// Configuration error variants
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to load configuration file
    LoadFailed { path: String, reason: String },

    /// Invalid configuration value
    InvalidValue { field: String, reason: String },

    /// Missing required configuration
    MissingRequired { field: String },
}

/// Service-level operation errors
#[derive(Debug)]
pub enum OperationError {
    /// Node is busy with another operation
    NodeBusy {
        target: String,
        current_operation: String,
    },

    /// No registered chain with that name
    UnknownChain { name: String },

    /// No stored chainshot record with that name
    UnknownChainshot { name: String },

    /// A chainshot with that name already exists
    DuplicateChainshot { name: String },
}

impl fmt::Display for ManagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagerError::Chain(e) => write!(f, "Chain error: {}", e),
            ManagerError::Config(e) => write!(f, "Configuration error: {}", e),
            ManagerError::Operation(e) => write!(f, "Operation error: {}", e),
            ManagerError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainError::NodeNotFound {
                region,
                instance_id,
            } => {
                write!(f, "Instance {} not found in region {}", instance_id, region)
            }
            ChainError::VolumeSelection {
                region,
                instance_id,
                found,
            } => {
                write!(
                    f,
                    "Expected exactly one data volume on instance {} in {}, found {}",
                    instance_id, region, found
                )
            }
            ChainError::RemoteExecution {
                script,
                target,
                attempts,
                reason,
            } => {
                write!(
                    f,
                    "Unable to run {} on {} after {} attempts: {}",
                    script, target, attempts, reason
                )
            }
            ChainError::KeyFileMissing { path } => write!(f, "Key file {} missing", path),
            ChainError::ResourceState {
                kind,
                resource_id,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "{} {} is '{}' and will never become '{}'",
                    kind, resource_id, actual, expected
                )
            }
            ChainError::ResourceTimeout {
                kind,
                resource_id,
                expected,
                waited_seconds,
            } => {
                write!(
                    f,
                    "{} {} did not become '{}' within {}s",
                    kind, resource_id, expected, waited_seconds
                )
            }
            ChainError::OutOfSync {
                region,
                instance_id,
                reason,
            } => {
                write!(
                    f,
                    "Consensus and application layers not in sync on instance {} in {}: {}",
                    instance_id, region, reason
                )
            }
            ChainError::VersionMismatch {
                instance_id,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Instance {} appears to be running ethermint {} instead of {}",
                    instance_id, actual, expected
                )
            }
            ChainError::ThawFailed {
                chainshot_name,
                reason,
                created_instances,
                created_volumes,
                torn_down,
            } => {
                write!(
                    f,
                    "Thaw of '{}' failed: {} (instances: [{}], volumes: [{}], {})",
                    chainshot_name,
                    reason,
                    created_instances.join(", "),
                    created_volumes.join(", "),
                    if *torn_down {
                        "torn down"
                    } else {
                        "left for manual cleanup"
                    }
                )
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::LoadFailed { path, reason } => {
                write!(f, "Failed to load config from '{}': {}", path, reason)
            }
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
            ConfigError::MissingRequired { field } => {
                write!(f, "Missing required field: {}", field)
            }
        }
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationError::NodeBusy {
                target,
                current_operation,
            } => {
                write!(f, "Target '{}' is busy with: {}", target, current_operation)
            }
            OperationError::UnknownChain { name } => write!(f, "Chain '{}' not found", name),
            OperationError::UnknownChainshot { name } => {
                write!(f, "Chainshot '{}' not found", name)
            }
            OperationError::DuplicateChainshot { name } => {
                write!(f, "Chainshot '{}' already exists", name)
            }
        }
    }
}

impl std::error::Error for ManagerError {}
impl std::error::Error for ChainError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for OperationError {}

/// Recovers the structured root of an `anyhow` chain, if there is one
impl From<anyhow::Error> for ManagerError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(e) = err.downcast_ref::<ChainError>() {
            return ManagerError::Chain(e.clone());
        }
        match err.downcast::<OperationError>() {
            Ok(e) => ManagerError::Operation(e),
            Err(err) => match err.downcast::<ConfigError>() {
                Ok(e) => ManagerError::Config(e),
                Err(err) => ManagerError::Other(format!("{:#}", err)),
            },
        }
    }
}

impl From<ChainError> for ManagerError {
    fn from(err: ChainError) -> Self {
        ManagerError::Chain(err)
    }
}

impl From<ConfigError> for ManagerError {
    fn from(err: ConfigError) -> Self {
        ManagerError::Config(err)
    }
}

impl From<OperationError> for ManagerError {
    fn from(err: OperationError) -> Self {
        ManagerError::Operation(err)
    }
}
