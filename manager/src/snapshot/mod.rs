//! Chainshot and thaw
//!
//! A chainshot is a point-in-time copy of every node's data volume, taken
//! while the whole chain is halted. Thaw rebuilds an equivalent chain on new
//! instances from the stored record.
//!
//! # Chainshot
//!
//! 1. Check every node exists and has exactly one data volume
//! 2. Halt all nodes, in chain order
//! 3. Snapshot each data volume and wait for completion
//! 4. Restart the chain, seed first
//!
//! # Thaw
//!
//! 1. Launch an instance per record entry from its captured metadata
//! 2. Restore the snapshot into a new volume in the instance's zone
//! 3. Attach it at the data device and mount it
//! 4. Start the chain, seed first, in record order

pub mod chainshotter;
pub mod record;
pub mod thaw;

pub use chainshotter::SnapshotCoordinator;
pub use record::{ChainshotEntry, ChainshotRecord, InstanceMetadata, SnapshotWindow};
pub use thaw::RestoreCoordinator;
