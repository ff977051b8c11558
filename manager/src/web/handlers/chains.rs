// Chain registry, status and fleet creation endpoints

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::info;

use super::common::{api_error, ApiResponse, ApiResult, LimitQuery, OperationStarted};
use crate::database::{ChainRecord, HealthRecord};
use crate::health::{AliveReport, ChainStatus};
use crate::network::NetworkRequest;
use crate::node::Chain;
use crate::roster::RosterEntry;
use crate::web::AppState;

#[derive(Deserialize)]
pub struct RegisterChainRequest {
    pub name: String,
    pub chain: Chain,
}

#[derive(Deserialize)]
pub struct CreateNetworkRequest {
    pub name: String,
    #[serde(flatten)]
    pub network: NetworkRequest,
}

#[derive(Deserialize)]
pub struct RosterRequest {
    pub chains: Vec<String>,
}

pub async fn list_chains(State(state): State<AppState>) -> ApiResult<Vec<ChainRecord>> {
    state
        .service
        .list_chains()
        .await
        .map(|chains| Json(ApiResponse::success(chains)))
        .map_err(|e| api_error("Failed to list chains", e))
}

pub async fn register_chain(
    State(state): State<AppState>,
    Json(request): Json<RegisterChainRequest>,
) -> ApiResult<ChainRecord> {
    info!("Registering chain {}", request.name);
    state
        .service
        .register_chain(&request.name, &request.chain)
        .await
        .map(|record| Json(ApiResponse::success(record)))
        .map_err(|e| api_error("Failed to register chain", e))
}

pub async fn get_chain(
    Path(chain_name): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<ChainRecord> {
    state
        .service
        .get_chain(&chain_name)
        .await
        .map(|record| Json(ApiResponse::success(record)))
        .map_err(|e| api_error("Failed to get chain", e))
}

pub async fn delete_chain(
    Path(chain_name): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Value> {
    state
        .service
        .remove_chain(&chain_name)
        .await
        .map_err(|e| api_error("Failed to remove chain", e))?;
    Ok(Json(ApiResponse::success(json!({
        "message": format!("Chain {} removed from the registry", chain_name)
    }))))
}

pub async fn get_chain_status(
    Path(chain_name): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<ChainStatus> {
    state
        .service
        .chain_status(&chain_name)
        .await
        .map(|status| Json(ApiResponse::success(status)))
        .map_err(|e| api_error("Failed to get chain status", e))
}

pub async fn get_chain_isalive(
    Path(chain_name): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<AliveReport> {
    state
        .service
        .chain_isalive(&chain_name)
        .await
        .map(|report| Json(ApiResponse::success(report)))
        .map_err(|e| api_error("Failed to check chain liveness", e))
}

pub async fn get_chain_health_history(
    Path(chain_name): Path<String>,
    Query(query): Query<LimitQuery>,
    State(state): State<AppState>,
) -> ApiResult<Vec<HealthRecord>> {
    state
        .service
        .health_history(&chain_name, query.limit)
        .await
        .map(|records| Json(ApiResponse::success(records)))
        .map_err(|e| api_error("Failed to get health history", e))
}

pub async fn create_network(
    State(state): State<AppState>,
    Json(request): Json<CreateNetworkRequest>,
) -> ApiResult<OperationStarted> {
    info!(
        "Fleet creation requested for {} ({} nodes)",
        request.name,
        request.network.regions.len()
    );
    state
        .service
        .start_create_network(&request.name, request.network)
        .await
        .map(|operation_id| Json(ApiResponse::success(OperationStarted { operation_id })))
        .map_err(|e| api_error("Failed to start fleet creation", e))
}

pub async fn build_roster(
    State(state): State<AppState>,
    Json(request): Json<RosterRequest>,
) -> ApiResult<BTreeMap<String, RosterEntry>> {
    state
        .service
        .roster(&request.chains)
        .await
        .map(|roster| Json(ApiResponse::success(roster)))
        .map_err(|e| api_error("Failed to build roster", e))
}
