//! Error types for the server
//!
//! Provides unified error handling using thiserror. The cache itself has
//! no error paths; these cover the requests around it.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::drive::DriveError;

// == App Error Enum ==
/// Unified error type for the HTTP API.
#[derive(Error, Debug)]
pub enum AppError {
    /// No usable credential on a protected route
    #[error("Authentication required")]
    Unauthorized,

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The remote store failed the operation
    #[error("Drive request failed: {0}")]
    Drive(#[from] DriveError),
}

// == IntoResponse Implementation ==
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Drive(DriveError::Unauthorized) => StatusCode::UNAUTHORIZED,
            AppError::Drive(DriveError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Drive(DriveError::Forbidden(_)) => StatusCode::FORBIDDEN,
            AppError::Drive(DriveError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Drive(_) => StatusCode::BAD_GATEWAY,
        };

        let body = Json(json!({
            "success": false,
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the server.
pub type Result<T> = std::result::Result<T, AppError>;
