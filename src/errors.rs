// src/errors.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::account::AccountType;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("This contact is already registered as a {existing}")]
    AccountTypeConflict { existing: AccountType },

    #[error("No user or partner account found")]
    AccountNotFound,

    #[error("Invalid or expired OTP")]
    InvalidOrExpiredOtp,

    #[error("OTP delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] mongodb::error::Error),

    #[error("Invalid ObjectId: {0}")]
    InvalidObjectId(String),

    #[error("{0} not found")]
    DocumentNotFound(&'static str),

    #[error("Authentication error")]
    AuthError,

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Service error: {0}")]
    ServiceError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AccountTypeConflict { .. } => StatusCode::CONFLICT,
            AppError::AccountNotFound => StatusCode::NOT_FOUND,
            AppError::InvalidOrExpiredOtp => StatusCode::BAD_REQUEST,
            AppError::DeliveryFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::StorageUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidObjectId(_) => StatusCode::BAD_REQUEST,
            AppError::DocumentNotFound(_) => StatusCode::NOT_FOUND,
            AppError::AuthError => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized => StatusCode::FORBIDDEN,
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::TokenError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ExternalApi(_) => StatusCode::BAD_GATEWAY,
            AppError::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ServiceError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code clients can branch on.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AccountTypeConflict { .. } => "ACCOUNT_TYPE_CONFLICT",
            AppError::AccountNotFound => "ACCOUNT_NOT_FOUND",
            AppError::InvalidOrExpiredOtp => "INVALID_OR_EXPIRED_OTP",
            AppError::DeliveryFailed(_) => "DELIVERY_FAILED",
            AppError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            AppError::InvalidObjectId(_) => "INVALID_ID",
            AppError::DocumentNotFound(_) => "NOT_FOUND",
            AppError::AuthError => "UNAUTHENTICATED",
            AppError::Unauthorized => "FORBIDDEN",
            AppError::RateLimitExceeded => "RATE_LIMITED",
            AppError::TokenError(_) => "TOKEN_ERROR",
            AppError::ExternalApi(_) => "EXTERNAL_API_ERROR",
            AppError::ConfigurationError(_) => "CONFIGURATION_ERROR",
            AppError::ServiceError(_) => "SERVICE_ERROR",
        }
    }

    // Internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            AppError::StorageUnavailable(_) => "Database error".to_string(),
            AppError::TokenError(_) => "Failed to issue session token".to_string(),
            AppError::ConfigurationError(_) => "Configuration error".to_string(),
            AppError::ServiceError(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(code = self.code(), "request failed: {}", self);
        } else {
            tracing::debug!(code = self.code(), "request rejected: {}", self);
        }

        let mut body = json!({
            "success": false,
            "error": status.canonical_reason().unwrap_or("Error"),
            "message": self.public_message(),
            "code": self.code(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        if let AppError::AccountTypeConflict { existing } = &self {
            body["existingAccountType"] = json!(existing);
        }

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<mongodb::bson::oid::Error> for AppError {
    fn from(err: mongodb::bson::oid::Error) -> Self {
        AppError::InvalidObjectId(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalApi(format!("HTTP request failed: {}", err))
    }
}

// Helper conversion functions
impl AppError {
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        AppError::ConfigurationError(msg.into())
    }

    pub fn service(msg: impl Into<String>) -> Self {
        AppError::ServiceError(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
