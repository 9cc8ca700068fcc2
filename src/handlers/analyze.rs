use axum::{Json, body::Bytes, extract::State};
use std::sync::Arc;
use std::time::Instant;

use super::{ClientIp, log_outcome};
use crate::error::ApiError;
use crate::guide::split_steps;
use crate::metrics::{RATE_LIMITED, REQUEST_LATENCY, REQUEST_TOTAL};
use crate::models::{AnalyzeRequest, AnalyzeResponse, FieldRules, validate_field};
use crate::parser;
use crate::pipeline::generate_artifacts;
use crate::state::AppState;

const SCOPE: &str = "analyze";

const CODE_RULES: FieldRules = FieldRules {
    required: true,
    min_length: Some(10),
    max_length: Some(50_000),
};

// optional context the caller may already have
const CONTEXT_RULES: FieldRules = FieldRules {
    required: false,
    min_length: None,
    max_length: Some(50_000),
};

pub async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    ClientIp(client_ip): ClientIp,
    body: Bytes,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    //track request
    REQUEST_TOTAL.with_label_values(&[SCOPE]).inc();
    let timer = REQUEST_LATENCY.with_label_values(&[SCOPE]).start_timer();
    let started = Instant::now();
    tracing::info!(client_ip = %client_ip, "Analysis request started");

    let result = analyze(&state, &client_ip, &body).await;

    timer.observe_duration();
    log_outcome(SCOPE, &client_ip, started, &result);
    result.map(Json)
}

async fn analyze(state: &AppState, client_ip: &str, body: &[u8]) -> Result<AnalyzeResponse, ApiError> {
    let limit = state.settings.analyze_limit;
    if !state
        .rate_limiter
        .is_allowed(SCOPE, client_ip, limit.max_requests, limit.window)
    {
        RATE_LIMITED.with_label_values(&[SCOPE]).inc();
        return Err(ApiError::RateLimited(
            "Too many analysis requests. Please wait before trying again.".to_string(),
        ));
    }

    let request: AnalyzeRequest = serde_json::from_slice(body)
        .map_err(|_| ApiError::Validation("Invalid JSON in request body".to_string()))?;

    let code = request.code.as_deref();
    if let Some(message) = validate_field(code, CODE_RULES) {
        return Err(ApiError::Validation(format!("Code validation failed: {message}")));
    }
    if let Some(message) = validate_field(request.dockerfile.as_deref(), CONTEXT_RULES) {
        return Err(ApiError::Validation(format!(
            "Dockerfile validation failed: {message}"
        )));
    }
    if let Some(message) = validate_field(request.jenkinsfile.as_deref(), CONTEXT_RULES) {
        return Err(ApiError::Validation(format!(
            "Jenkinsfile validation failed: {message}"
        )));
    }
    // validate_field rejects a missing required field
    let code = code.unwrap_or_default();

    let generation = generate_artifacts(state, code).await?;
    let parsed = parser::parse(&generation.raw);
    let guide_outline = split_steps(&parsed.result.guide);

    tracing::info!(
        client_ip,
        source = ?generation.source,
        response_length = generation.raw.chars().count(),
        fallbacks = parsed.fallbacks.len(),
        steps = guide_outline.steps.len(),
        "Analysis produced artifacts"
    );

    Ok(AnalyzeResponse {
        response: generation.raw,
        artifacts: parsed.result,
        guide_outline,
    })
}
