// File: manager/src/services/mod.rs

pub mod fleet_service;
pub mod operation_executor;

pub use fleet_service::FleetService;
pub use operation_executor::OperationExecutor;
