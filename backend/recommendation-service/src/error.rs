use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// System of record or cache unreachable or returned malformed data
    #[error("Data access error: {0}")]
    DataAccess(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Entity missing from a trained model's mapping
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Channel {channel} failed: {reason}")]
    ChannelFailure {
        channel: &'static str,
        reason: String,
    },

    #[error("Recommendation pipeline failed: {0}")]
    PipelineFailure(String),

    /// Serialized model rejected by the codec
    #[error("Model format error: {0}")]
    ModelFormat(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Errors that are handled like an unreachable dependency
    pub fn is_data_access(&self) -> bool {
        matches!(self, AppError::DataAccess(_) | AppError::Timeout(_))
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: String,
    pub code: u16,
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let code = self.status_code();
        // Internal details stay in the logs
        let message = match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::DataAccess(_) | AppError::Timeout(_) => {
                "Service temporarily unavailable".to_string()
            }
            _ => "Internal server error".to_string(),
        };

        HttpResponse::build(code).json(ErrorResponse {
            status: "error",
            error: message,
            code: code.as_u16(),
        })
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::DataAccess(_) | AppError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DataAccess(err.to_string())
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::DataAccess(err.to_string())
    }
}

impl From<bincode::Error> for AppError {
    fn from(err: bincode::Error) -> Self {
        AppError::ModelFormat(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Background task failed: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
