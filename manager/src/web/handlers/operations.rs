// Operation log and node reservation endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use tracing::{error, info};

use super::common::{
    api_error, ApiResponse, ApiResult, EmergencyCleanupQuery, LimitQuery, TargetQuery,
};
use crate::database::OperationRecord;
use crate::operation_tracker::OperationStatus;
use crate::web::AppState;

/// Recent operations, newest first
pub async fn list_operations(
    Query(query): Query<LimitQuery>,
    State(state): State<AppState>,
) -> ApiResult<Vec<OperationRecord>> {
    state
        .service
        .list_operations(query.limit)
        .await
        .map(|operations| Json(ApiResponse::success(operations)))
        .map_err(|e| api_error("Failed to list operations", e))
}

pub async fn get_operation(
    Path(operation_id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<OperationRecord> {
    match state.service.get_operation(&operation_id).await {
        Ok(Some(operation)) => Ok(Json(ApiResponse::success(operation))),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!(
                "Operation {} not found",
                operation_id
            ))),
        )),
        Err(e) => Err(api_error("Failed to get operation", e)),
    }
}

/// Nodes currently reserved by running operations
pub async fn get_active_operations(State(state): State<AppState>) -> ApiResult<OperationStatus> {
    let status = state
        .service
        .executor()
        .tracker()
        .get_operation_status()
        .await;
    Ok(Json(ApiResponse::success(status)))
}

/// Release a node reservation by hand
pub async fn cancel_operation(
    Query(query): Query<TargetQuery>,
    State(state): State<AppState>,
) -> ApiResult<Value> {
    info!("Operation cancellation requested for: {}", query.target);

    match state
        .service
        .executor()
        .tracker()
        .cancel_operation(&query.target)
        .await
    {
        Ok(()) => Ok(Json(ApiResponse::success(json!({
            "message": format!("Operation cancelled for {}", query.target)
        })))),
        Err(e) => {
            error!("Failed to cancel operation for {}: {}", query.target, e);
            Err((StatusCode::NOT_FOUND, Json(ApiResponse::error(e.to_string()))))
        }
    }
}

/// Emergency cleanup of stuck reservations
pub async fn emergency_cleanup_operations(
    Query(query): Query<EmergencyCleanupQuery>,
    State(state): State<AppState>,
) -> ApiResult<Value> {
    info!(
        "Emergency cleanup requested for operations older than {} hours",
        query.max_hours
    );

    let cleaned_count = state
        .service
        .executor()
        .tracker()
        .cleanup_old_operations(query.max_hours)
        .await;

    Ok(Json(ApiResponse::success(json!({
        "message": format!("Emergency cleanup completed: {} operations removed", cleaned_count),
        "cleaned_count": cleaned_count
    }))))
}
