// File: manager/src/web/server.rs
use crate::config::Config;
use crate::services::FleetService;
use crate::web::{handlers, AppState};
use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub async fn start_web_server(config: Arc<Config>, service: Arc<FleetService>) -> Result<()> {
    let state = AppState::new(config, service);
    let app = create_router(state.clone());
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // === CHAIN REGISTRY ROUTES ===
        .route(
            "/api/chains",
            get(handlers::list_chains).post(handlers::register_chain),
        )
        .route("/api/chains/create", post(handlers::create_network))
        .route(
            "/api/chains/{chain_name}",
            get(handlers::get_chain).delete(handlers::delete_chain),
        )
        // === STATUS ROUTES ===
        .route(
            "/api/chains/{chain_name}/status",
            get(handlers::get_chain_status),
        )
        .route(
            "/api/chains/{chain_name}/isalive",
            get(handlers::get_chain_isalive),
        )
        .route(
            "/api/chains/{chain_name}/health",
            get(handlers::get_chain_health_history),
        )
        .route("/api/roster", post(handlers::build_roster))
        // === CHAINSHOT ROUTES ===
        .route(
            "/api/chains/{chain_name}/chainshot",
            post(handlers::start_chainshot),
        )
        .route("/api/chainshots", get(handlers::list_chainshots))
        .route("/api/chainshots/import", post(handlers::import_chainshot))
        .route(
            "/api/chainshots/{chainshot_name}",
            get(handlers::get_chainshot),
        )
        .route(
            "/api/chainshots/{chainshot_name}/export",
            get(handlers::export_chainshot),
        )
        .route(
            "/api/chainshots/{chainshot_name}/thaw",
            post(handlers::start_thaw),
        )
        // === OPERATION ROUTES ===
        .route("/api/operations", get(handlers::list_operations))
        .route(
            "/api/operations/active",
            get(handlers::get_active_operations),
        )
        .route("/api/operations/cancel", post(handlers::cancel_operation))
        .route(
            "/api/operations/emergency-cleanup",
            post(handlers::emergency_cleanup_operations),
        )
        .route(
            "/api/operations/{operation_id}",
            get(handlers::get_operation),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
