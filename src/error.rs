use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::storage::StorageError;

/// Application-level error type.
/// Handlers return `Result<T, AppError>`; the response body never carries
/// internal detail, which is logged server-side instead.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Too many requests")]
    TooManyRequests,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AppError::Database(_)
            | AppError::Storage(_)
            | AppError::OAuth(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, message) = match &self {
            AppError::Validation(msg) => ("BAD_REQUEST", msg.clone()),
            AppError::NotFound(msg) => ("NOT_FOUND", msg.clone()),
            AppError::Unauthorized => ("UNAUTHORIZED", "Please login".to_string()),
            AppError::Forbidden => (
                "FORBIDDEN",
                "You do not have permission to perform this action".to_string(),
            ),
            AppError::TooManyRequests => (
                "TOO_MANY_REQUESTS",
                "Too many requests, please try again later.".to_string(),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                ("INTERNAL_SERVER_ERROR", "A database error occurred".to_string())
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {e}");
                ("INTERNAL_SERVER_ERROR", "Upload failed".to_string())
            }
            AppError::OAuth(msg) => {
                tracing::error!("OAuth error: {msg}");
                ("INTERNAL_SERVER_ERROR", "GitHub OAuth callback failed".to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    "INTERNAL_SERVER_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (self.status(), body).into_response()
    }
}
