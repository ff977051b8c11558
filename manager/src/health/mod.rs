//! Chain consistency monitoring
//!
//! Each node runs a consensus layer and, for ethermint chains, an EVM
//! application layer. The monitor reads the latest block from the consensus
//! layer and checks that the application layer's block one below it carries
//! the same hash.

pub mod ethermint;
pub mod monitor;
pub mod tendermint;
pub mod types;

pub use monitor::{is_block_alive, ConsistencyMonitor};
pub use types::{AliveReport, ChainStatus, NodeStatus, StaleNode};
