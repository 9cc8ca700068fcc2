use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;

use crate::datastore::ProbeStatus;
use crate::models::timestamp_now;
use crate::state::AppState;

// health handler, also pings the datastore
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    let started = Instant::now();
    let database = state.datastore.ping().await;
    let response_time = started.elapsed().as_millis() as u64;

    let (status, overall, database_service) = match database {
        ProbeStatus::Pass => (StatusCode::OK, "healthy", "healthy"),
        ProbeStatus::Skip => (StatusCode::OK, "healthy", "not_configured"),
        ProbeStatus::Fail => (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unhealthy"),
    };

    tracing::info!(
        status = overall,
        database = ?database,
        response_time_ms = response_time,
        "Health check completed"
    );

    let body = serde_json::json!({
        "status": overall,
        "timestamp": timestamp_now(),
        "version": env!("CARGO_PKG_VERSION"),
        "uptime": state.started_at.elapsed().as_secs(),
        "responseTime": response_time,
        "services": {
            "database": database_service,
            "api": "healthy"
        },
        "checks": {
            "database": {
                "status": database,
                "responseTime": response_time
            }
        },
        "cache": {
            "entries": state.cache.len()
        },
        "rateLimiter": {
            "trackedClients": state.rate_limiter.tracked()
        }
    });

    (
        status,
        [(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")],
        Json(body),
    )
        .into_response()
}
