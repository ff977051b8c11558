// Common types and utilities for API handlers

use axum::{http::StatusCode, response::Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::errors::{ChainError, ManagerError, OperationError};

// Helper type for API responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;
pub type ApiError = (StatusCode, Json<ApiResponse<()>>);

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// HTTP status for a manager error
pub fn status_for(err: &ManagerError) -> StatusCode {
    match err {
        ManagerError::Operation(OperationError::NodeBusy { .. })
        | ManagerError::Operation(OperationError::DuplicateChainshot { .. }) => StatusCode::CONFLICT,
        ManagerError::Operation(OperationError::UnknownChain { .. })
        | ManagerError::Operation(OperationError::UnknownChainshot { .. })
        | ManagerError::Chain(ChainError::NodeNotFound { .. }) => StatusCode::NOT_FOUND,
        ManagerError::Config(_) => StatusCode::BAD_REQUEST,
        ManagerError::Chain(ChainError::VolumeSelection { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
        ManagerError::Chain(ChainError::OutOfSync { .. })
        | ManagerError::Chain(ChainError::RemoteExecution { .. })
        | ManagerError::Chain(ChainError::VersionMismatch { .. })
        | ManagerError::Chain(ChainError::ResourceState { .. })
        | ManagerError::Chain(ChainError::ResourceTimeout { .. }) => StatusCode::BAD_GATEWAY,
        ManagerError::Chain(_) | ManagerError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Map a failed service call to an API error response
pub fn api_error(context: &str, err: anyhow::Error) -> ApiError {
    let err = ManagerError::from(err);
    let status = status_for(&err);
    if status.is_server_error() {
        error!("{}: {}", context, err);
    }
    (status, Json(ApiResponse::error(err.to_string())))
}

// Query parameters
#[derive(Deserialize)]
pub struct LimitQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Deserialize)]
pub struct EmergencyCleanupQuery {
    #[serde(default = "default_max_hours")]
    pub max_hours: i64,
}

fn default_max_hours() -> i64 {
    12
}

#[derive(Deserialize)]
pub struct TargetQuery {
    /// Tracker key, `region/instance_id`
    pub target: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OperationStarted {
    pub operation_id: String,
}
