//! HTTP request handlers for the fleet manager API.
//!
//! This module is organized by domain:
//! - `common` - Shared response types, query structs and error mapping
//! - `chains` - Chain registry, status, fleet creation and roster
//! - `chainshots` - Chainshot records, chainshot and thaw operations
//! - `operations` - Operation log and node reservations

pub mod chains;
pub mod chainshots;
pub mod common;
pub mod operations;

pub use chains::*;
pub use chainshots::*;
pub use operations::*;
