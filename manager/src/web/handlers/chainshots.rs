// Chainshot records, chainshot and thaw endpoints

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use tracing::info;

use super::common::{api_error, ApiError, ApiResponse, ApiResult, OperationStarted};
use crate::database::{ChainshotSummary, StoredChainshot};
use crate::web::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ChainshotRequest {
    /// Defaults to `<chain>-<timestamp>`
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ThawRequest {
    /// Registry name of the thawed chain
    #[serde(default)]
    pub chain_name: Option<String>,
}

pub async fn start_chainshot(
    Path(chain_name): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<ChainshotRequest>,
) -> ApiResult<OperationStarted> {
    info!("Chainshot requested for {}", chain_name);
    state
        .service
        .start_chainshot(&chain_name, request.name)
        .await
        .map(|operation_id| Json(ApiResponse::success(OperationStarted { operation_id })))
        .map_err(|e| api_error("Failed to start chainshot", e))
}

pub async fn list_chainshots(State(state): State<AppState>) -> ApiResult<Vec<ChainshotSummary>> {
    state
        .service
        .list_chainshots()
        .await
        .map(|summaries| Json(ApiResponse::success(summaries)))
        .map_err(|e| api_error("Failed to list chainshots", e))
}

pub async fn get_chainshot(
    Path(chainshot_name): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<StoredChainshot> {
    state
        .service
        .get_chainshot(&chainshot_name)
        .await
        .map(|stored| Json(ApiResponse::success(stored)))
        .map_err(|e| api_error("Failed to get chainshot", e))
}

/// The bare record, as a downloadable JSON file
pub async fn export_chainshot(
    Path(chainshot_name): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let json = state
        .service
        .export_chainshot(&chainshot_name)
        .await
        .map_err(|e| api_error("Failed to export chainshot", e))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.json\"", chainshot_name),
            ),
        ],
        json,
    )
        .into_response())
}

/// Body is a chainshot record in its JSON exchange format
pub async fn import_chainshot(
    State(state): State<AppState>,
    body: String,
) -> ApiResult<ChainshotSummary> {
    state
        .service
        .import_chainshot(&body)
        .await
        .map(|summary| Json(ApiResponse::success(summary)))
        .map_err(|e| api_error("Failed to import chainshot", e))
}

pub async fn start_thaw(
    Path(chainshot_name): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<ThawRequest>,
) -> ApiResult<OperationStarted> {
    info!("Thaw requested for chainshot {}", chainshot_name);
    state
        .service
        .start_thaw(&chainshot_name, request.chain_name)
        .await
        .map(|operation_id| Json(ApiResponse::success(OperationStarted { operation_id })))
        .map_err(|e| api_error("Failed to start thaw", e))
}
