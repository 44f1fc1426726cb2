//! Error types for the coordinator: `CoordinatorError` names the kinds the
//! rest of the crate needs to match on (spec §7's abstract error kinds);
//! `ApiError` is the HTTP-facing wrapper every handler returns through.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("invalid node name: {0}")]
    InvalidNode(String),
    #[error("validation failed: {0}")]
    ValidationError(String),
    #[error("master is down")]
    MasterDown,
    #[error("failed to verify master write for app_id {0}")]
    MasterWriteFailed(catalog_sql::AppId),
}

impl CoordinatorError {
    fn status(&self) -> StatusCode {
        match self {
            CoordinatorError::InvalidNode(_) => StatusCode::BAD_REQUEST,
            CoordinatorError::ValidationError(_) => StatusCode::BAD_REQUEST,
            CoordinatorError::MasterDown => StatusCode::SERVICE_UNAVAILABLE,
            CoordinatorError::MasterWriteFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Wraps an `anyhow::Error` with the HTTP status it should be reported as,
/// following the upstream control plane's `ApiError` (minus the OpenAPI
/// schema derive machinery, which this service has no use for).
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: anyhow::Error,
}

impl ApiError {
    pub fn new(status: StatusCode, error: anyhow::Error) -> Self {
        ApiError { status, error }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "status: {}, error: {:#}", self.status, self.error)
    }
}

impl std::error::Error for ApiError {}

impl From<CoordinatorError> for ApiError {
    fn from(error: CoordinatorError) -> Self {
        let status = error.status();
        ApiError::new(status, error.into())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> Self {
        tracing::error!(?error, "API responding with database error");
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            anyhow::anyhow!("database error, please retry the request"),
        )
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(error: validator::ValidationErrors) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, error.into())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": format!("{:#}", self.error) });
        (self.status, Json(body)).into_response()
    }
}
