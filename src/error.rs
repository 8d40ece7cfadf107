use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::models::ErrorKind;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Identity mismatch: {0}")]
    IdentityMismatch(String),

    #[error("No active session")]
    NoActiveSession,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound(ref msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::IdentityMismatch(ref msg) => {
                (StatusCode::CONFLICT, "IDENTITY_MISMATCH", msg.clone())
            }
            AppError::NoActiveSession => (
                StatusCode::UNAUTHORIZED,
                "NO_ACTIVE_SESSION",
                "Connect a wallet before saving progress".to_string(),
            ),
            AppError::Redis(ref e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CACHE_ERROR",
                e.to_string(),
            ),
            AppError::Serialization(ref e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
                e.to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            success: false,
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        });

        (status, body).into_response()
    }
}

/// HTTP status for a `Failed` action outcome.
pub fn status_for_failure(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::AlreadyInFlight => StatusCode::CONFLICT,
        ErrorKind::Cooldown => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::CallReverted => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::MalformedResponse => StatusCode::BAD_GATEWAY,
        ErrorKind::ProviderUnreachable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
