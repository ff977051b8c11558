// File: manager/src/web/mod.rs
pub mod handlers;
pub mod server;

pub use server::{create_router, start_web_server};

use std::sync::Arc;

use crate::config::Config;
use crate::services::FleetService;

// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub service: Arc<FleetService>,
}

impl AppState {
    pub fn new(config: Arc<Config>, service: Arc<FleetService>) -> Self {
        Self { config, service }
    }
}
