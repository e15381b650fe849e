//! Error types for R-kive services
//!
//! Provides a single error enum with:
//! - Distinct variants for different failure modes
//! - HTTP status code mapping
//! - Structured JSON error responses
//! - Machine-readable error codes

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    InvalidThreshold,
    SelfCitation,

    // Authentication errors (2xxx)
    Unauthorized,
    InvalidToken,
    ExpiredToken,

    // Authorization errors (3xxx)
    Forbidden,

    // Resource errors (4xxx)
    NotFound,
    PaperNotFound,
    CitationNotFound,

    // Conflict errors (5xxx)
    DuplicateCitation,

    // Rate limiting (6xxx)
    RateLimited,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,

    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidThreshold => 1002,
            ErrorCode::SelfCitation => 1003,

            ErrorCode::Unauthorized => 2001,
            ErrorCode::InvalidToken => 2002,
            ErrorCode::ExpiredToken => 2003,

            ErrorCode::Forbidden => 3001,

            ErrorCode::NotFound => 4001,
            ErrorCode::PaperNotFound => 4002,
            ErrorCode::CitationNotFound => 4003,

            ErrorCode::DuplicateCitation => 5001,

            ErrorCode::RateLimited => 6001,

            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,

            ErrorCode::ServiceUnavailable => 9999,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Similarity threshold must be within [0, 1], got {value}")]
    InvalidThreshold { value: f64 },

    #[error("A paper cannot cite itself: {paper_id}")]
    SelfCitation { paper_id: String },

    // Authentication errors
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Invalid access token")]
    InvalidToken,

    #[error("Access token expired")]
    ExpiredToken,

    // Authorization errors
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Paper not found: {id}")]
    PaperNotFound { id: String },

    #[error("Citation not found: {id}")]
    CitationNotFound { id: String },

    // Conflict errors
    #[error("Citation already exists: {citing} -> {cited}")]
    DuplicateCitation { citing: String, cited: String },

    // Rate limiting
    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidThreshold { .. } => ErrorCode::InvalidThreshold,
            AppError::SelfCitation { .. } => ErrorCode::SelfCitation,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::InvalidToken => ErrorCode::InvalidToken,
            AppError::ExpiredToken => ErrorCode::ExpiredToken,
            AppError::Forbidden { .. } => ErrorCode::Forbidden,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::PaperNotFound { .. } => ErrorCode::PaperNotFound,
            AppError::CitationNotFound { .. } => ErrorCode::CitationNotFound,
            AppError::DuplicateCitation { .. } => ErrorCode::DuplicateCitation,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::ServiceUnavailable { .. } => ErrorCode::ServiceUnavailable,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. }
            | AppError::InvalidThreshold { .. }
            | AppError::SelfCitation { .. } => StatusCode::BAD_REQUEST,

            AppError::Unauthorized { .. } | AppError::InvalidToken | AppError::ExpiredToken => {
                StatusCode::UNAUTHORIZED
            }

            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,

            AppError::NotFound { .. }
            | AppError::PaperNotFound { .. }
            | AppError::CitationNotFound { .. } => StatusCode::NOT_FOUND,

            AppError::DuplicateCitation { .. } => StatusCode::CONFLICT,

            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            AppError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub numeric_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let field = match &self {
            AppError::Validation { field, .. } => field.clone(),
            AppError::InvalidThreshold { .. } => Some("threshold".to_string()),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                numeric_code: code.as_code(),
                message,
                field,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        let field = err.field_errors().keys().next().map(|f| f.to_string());
        AppError::Validation {
            message: err.to_string(),
            field,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}
