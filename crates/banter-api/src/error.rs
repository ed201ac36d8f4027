use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use banter_core::ForumError;

/// Wraps the service error so it can carry an HTTP response mapping.
pub struct ApiError(pub ForumError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<ForumError> for ApiError {
    fn from(err: ForumError) -> Self {
        Self(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self(ForumError::Internal(err))
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        error!("spawn_blocking join error: {}", err);
        Self(ForumError::Internal(anyhow::anyhow!("background task failed")))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            ForumError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ForumError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ForumError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            ForumError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            ForumError::Expired => (StatusCode::GONE, "This link has expired".to_string()),
            ForumError::Internal(err) => {
                error!("Internal error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}
