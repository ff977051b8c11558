pub mod cloud;
pub mod config;
pub mod constants;
pub mod database;
pub mod errors;
pub mod fleet;
pub mod health;
pub mod network;
pub mod node;
pub mod operation_tracker;
pub mod provisioner;
pub mod remote;
pub mod roster;
pub mod scheduler;
pub mod services;
pub mod snapshot;
pub mod web;

// Re-export commonly used types
pub use cloud::{CloudProvider, SandboxCloud};
pub use config::{Config, ConfigManager};
pub use database::Database;
pub use errors::{ChainError, ManagerError, OperationError};
pub use fleet::Fleet;
pub use health::ConsistencyMonitor;
pub use node::{Chain, ChainType, Node, NodeDirectory};
pub use operation_tracker::OperationTracker;
pub use remote::RemoteExecutor;
pub use services::FleetService;
pub use snapshot::{ChainshotRecord, RestoreCoordinator, SnapshotCoordinator};
