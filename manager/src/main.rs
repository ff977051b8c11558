// File: manager/src/main.rs
use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use fleet_manager::cloud::{CloudProvider, SandboxCloud};
use fleet_manager::config::{ConfigManager, ProviderKind};
use fleet_manager::constants::{cleanup, remote};
use fleet_manager::database::Database;
use fleet_manager::fleet::Fleet;
use fleet_manager::operation_tracker::OperationTracker;
use fleet_manager::remote::SshTransport;
use fleet_manager::scheduler::ChainshotScheduler;
use fleet_manager::services::{FleetService, OperationExecutor};
use fleet_manager::web::start_web_server;

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::from_default_env()
        .add_directive("fleet_manager=info".parse()?)
        .add_directive("tower_http=warn".parse()?)
        .add_directive("tokio_cron_scheduler=warn".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("sqlx=warn".parse()?);

    fmt().with_env_filter(env_filter).init();

    info!("Starting chain fleet manager");

    // Load configuration
    let config_manager = ConfigManager::new("config".to_string()).await?;
    let config = config_manager.get_current_config();
    info!(
        "Configuration loaded: {} regions, {} chainshot schedules",
        config.regions.len(),
        config.schedules.len()
    );

    let database = Arc::new(Database::new(&config.database_path).await?);
    info!("Database initialized");

    let provider: Arc<dyn CloudProvider> = match config.provider {
        ProviderKind::Sandbox => {
            warn!("Using the in-process sandbox provider; resources vanish with the process");
            Arc::new(SandboxCloud::new())
        }
    };
    let transport = Arc::new(SshTransport::new(remote::COMMAND_TIMEOUT));
    let fleet = Fleet::new(config.clone(), provider, transport)?;
    info!("Fleet components initialized");

    let operation_tracker = OperationTracker::new();
    let operation_executor = OperationExecutor::new(database.clone(), operation_tracker.clone());
    let service = Arc::new(FleetService::new(
        fleet,
        database.clone(),
        operation_executor,
    ));

    // Periodic consistency checks of every registered chain
    let health_service = service.clone();
    let check_interval = config.check_interval_seconds;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(check_interval));
        loop {
            interval.tick().await;
            if let Err(e) = health_service.check_all_chains().await {
                error!("Health monitoring error: {}", e);
            }
        }
    });

    // Periodic cleanup of stuck reservations and old health records
    let cleanup_tracker = operation_tracker.clone();
    let cleanup_database = database.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(
            cleanup::CLEANUP_INTERVAL_SECONDS,
        ));
        loop {
            interval.tick().await;
            let cleaned = cleanup_tracker
                .cleanup_old_operations(cleanup::OPERATION_CLEANUP_HOURS)
                .await;
            if cleaned > 0 {
                warn!(
                    "Cleaned up {} stuck operations older than {} hours",
                    cleaned,
                    cleanup::OPERATION_CLEANUP_HOURS
                );
            }
            match cleanup_database
                .cleanup_old_health_records(cleanup::HEALTH_RECORD_RETENTION_DAYS)
                .await
            {
                Ok(0) => {}
                Ok(removed) => info!("Removed {} old health records", removed),
                Err(e) => warn!("Health record cleanup failed: {}", e),
            }
        }
    });

    info!(
        "Background tasks started with {}s health check interval",
        check_interval
    );

    let scheduler = ChainshotScheduler::new(service.clone(), config.schedules.clone()).await?;
    scheduler.start().await?;

    start_web_server(config, service).await?;

    Ok(())
}
