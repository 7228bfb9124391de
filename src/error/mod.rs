//! Unified error handling for CarStore Core

use thiserror::Error;
use tonic::Status;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Insufficient stock for car {car_id}: requested {requested}")]
    InsufficientStock { car_id: String, requested: i64 },

    #[error("Transient error: {0}")]
    Transient(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Storage or bus I/O failures that may succeed on redelivery.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Transient(_) | AppError::Database(_) | AppError::Redis(_)
        )
    }
}

impl From<AppError> for Status {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound(msg) => Status::not_found(msg),
            AppError::BadRequest(msg) | AppError::Validation(msg) => {
                Status::invalid_argument(msg)
            }
            AppError::Unauthenticated(msg) => Status::unauthenticated(msg),
            AppError::PermissionDenied(msg) => Status::permission_denied(msg),
            AppError::InsufficientStock { .. } => {
                Status::failed_precondition("insufficient stock")
            }
            AppError::Transient(msg) => {
                tracing::error!("Transient error: {}", msg);
                Status::unavailable("Service temporarily unavailable")
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                Status::unavailable("A database error occurred")
            }
            AppError::Redis(e) => {
                tracing::error!("Redis error: {:?}", e);
                Status::unavailable("A message bus error occurred")
            }
            AppError::Jwt(e) => {
                tracing::debug!("JWT error: {:?}", e);
                Status::unauthenticated("invalid token")
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                Status::internal("An internal error occurred")
            }
        }
    }
}

// Conversion from validation errors
impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}
