//! This module provides reusable test utilities:
//! - Mock chain node RPC endpoints
//! - A recording command transport in place of ssh
//! - Test configuration builders
//! - A sandbox-backed fleet with fast waits
//! - Common test data

// Allow unused code in test fixtures - not every test binary uses every helper
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod mock_rpc;
pub mod recording_transport;
pub mod test_config;
pub mod test_data;
pub mod test_fleet;

// Re-export commonly used items
pub use mock_rpc::MockChainNode;
pub use recording_transport::{RecordedCall, RecordingTransport};
pub use test_config::TestConfigBuilder;
pub use test_data::*;
pub use test_fleet::{wait_for_operation, TestFleet};
