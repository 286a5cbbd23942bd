//! Error types for persona-analyzer
//!
//! [`AnalysisError`] is the pipeline taxonomy; [`ApiError`] maps it onto HTTP
//! status codes and the `{detail, code}` error body.

use crate::fetcher::FetchError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Analysis pipeline errors
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("Profile {0} is private")]
    PrivateProfile(String),

    #[error("Rate limited by upstream, try again later")]
    RateLimited,

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Analysis timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Scoring failed: {0}")]
    InternalScoring(String),

    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<FetchError> for AnalysisError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotFound(handle) => AnalysisError::NotFound(handle),
            FetchError::PrivateProfile(handle) => AnalysisError::PrivateProfile(handle),
            FetchError::RateLimited => AnalysisError::RateLimited,
            FetchError::Config(msg) => AnalysisError::Config(msg),
            other @ (FetchError::Network(_) | FetchError::Upstream(..) | FetchError::Parse(_)) => {
                AnalysisError::Upstream(other.to_string())
            }
        }
    }
}

impl From<persona_common::Error> for AnalysisError {
    fn from(err: persona_common::Error) -> Self {
        match err {
            persona_common::Error::InvalidInput(msg) => AnalysisError::InvalidInput(msg),
            other => AnalysisError::Config(other.to_string()),
        }
    }
}

impl AnalysisError {
    /// HTTP status and machine-readable code
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AnalysisError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            AnalysisError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AnalysisError::PrivateProfile(_) => (StatusCode::FORBIDDEN, "PRIVATE_PROFILE"),
            AnalysisError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            AnalysisError::InsufficientData(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_DATA")
            }
            AnalysisError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
            AnalysisError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            AnalysisError::InternalScoring(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "SCORING_FAILED")
            }
            AnalysisError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// Malformed request body (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Analysis(err) => err.status_and_code(),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(json!({
            "detail": self.to_string(),
            "code": code,
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
