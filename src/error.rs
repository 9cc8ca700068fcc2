use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::upstream::UpstreamError;

/// Errors surfaced to HTTP callers.
///
/// Every variant renders the same `{ error, code, timestamp }` envelope.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("Request timeout. Please try again with shorter code.")]
    Timeout,

    // Missing credential; logged as a configuration fault
    #[error("AI service configuration error")]
    Configuration,

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub code: &'static str,
    pub timestamp: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::Configuration | Self::Upstream(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::RateLimited(_) => "RATE_LIMIT_ERROR",
            Self::Timeout => "TIMEOUT_ERROR",
            Self::Configuration => "CONFIGURATION_ERROR",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Client errors are expected traffic and logged at warn, the rest at error.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::RateLimited(_))
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::MissingCredential => Self::Configuration,
            UpstreamError::Timeout { .. } => Self::Timeout,
            UpstreamError::Status { status, .. } => Self::Upstream(match status {
                429 => "AI service rate limit exceeded. Please try again later.".to_string(),
                401 => "AI service authentication failed".to_string(),
                500.. => "AI service temporarily unavailable".to_string(),
                other => format!("AI service error: {other}"),
            }),
            UpstreamError::EmptyResponse => {
                Self::Upstream("AI service returned empty response".to_string())
            }
            UpstreamError::Network(_) | UpstreamError::MalformedBody(_) => {
                Self::Upstream("AI service unreachable. Please try again later.".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = ErrorEnvelope {
            error: self.to_string(),
            code: self.code(),
            timestamp: crate::models::timestamp_now(),
        };
        (self.status(), Json(envelope)).into_response()
    }
}
