//! Cron-based chainshot scheduling
//!
//! Each `[[schedules]]` entry of `config/main.toml` chainshots one registered
//! chain under a timestamped name:
//!
//! ```toml
//! [[schedules]]
//! chain = "testnet"
//! schedule = "0 0 3 * * *"  # Daily at 3 AM
//! name_prefix = "testnet-nightly"
//! ```
//!
//! Schedules use 6-field cron expressions (sec min hour day month dow). A
//! scheduled run whose chain is still busy with another operation is skipped.

pub mod operations;
pub use operations::{validate_6_field_cron, ChainshotScheduler};
