mod analyze;
mod comment;
mod health;
mod metrics;

pub use analyze::analyze_handler;
pub use comment::comment_handler;
pub use health::health_handler;
pub use metrics::metrics_handler;

use axum::{
    Router,
    extract::{ConnectInfo, FromRequestParts},
    http::{StatusCode, header, request::Parts},
    response::IntoResponse,
    routing::{get, post},
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::error::ApiError;
use crate::state::AppState;

//creating the router with routes
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/analyze", post(analyze_handler).options(preflight))
        .route("/comment", post(comment_handler).options(preflight))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Caller identity used for rate limiting.
///
/// The socket peer by default. With `trust_forwarded_for` set, the first
/// `X-Forwarded-For` hop or `X-Real-IP` takes precedence. Never rejects;
/// an unidentifiable caller is `"unknown"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl FromRequestParts<Arc<AppState>> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(ClientIp(client_ip(parts, state.settings.trust_forwarded_for)))
    }
}

fn client_ip(parts: &Parts, trust_forwarded_for: bool) -> String {
    let header_value = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    let forwarded = trust_forwarded_for
        .then(|| {
            header_value("x-forwarded-for")
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .or_else(|| header_value("x-real-ip"))
        })
        .flatten();

    forwarded
        .map(str::to_string)
        .or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

// CORS preflight for the POST endpoints
pub async fn preflight() -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type, Authorization"),
            (header::ACCESS_CONTROL_MAX_AGE, "86400"),
        ],
    )
}

fn log_outcome<T>(endpoint: &str, client_ip: &str, started: Instant, result: &Result<T, ApiError>) {
    let duration_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(_) => tracing::info!(endpoint, client_ip, duration_ms, "Request completed successfully"),
        Err(e) if e.is_client_error() => tracing::warn!(
            endpoint,
            client_ip,
            duration_ms,
            code = e.code(),
            error = %e,
            "Request rejected"
        ),
        Err(e) => tracing::error!(
            endpoint,
            client_ip,
            duration_ms,
            code = e.code(),
            error = %e,
            "Request failed"
        ),
    }
}
