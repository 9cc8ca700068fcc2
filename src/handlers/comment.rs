use axum::{Json, body::Bytes, extract::State};
use std::sync::Arc;
use std::time::Instant;

use super::{ClientIp, log_outcome};
use crate::error::ApiError;
use crate::metrics::{RATE_LIMITED, REQUEST_LATENCY, REQUEST_TOTAL};
use crate::models::{
    CommentMetadata, CommentRequest, CommentResponse, FieldRules, timestamp_now, validate_field,
};
use crate::parser::first_code_block;
use crate::prompts::{comment_request, detect_language};
use crate::state::AppState;
use crate::upstream::{CallPolicy, UpstreamError};

const SCOPE: &str = "comment";

const CODE_RULES: FieldRules = FieldRules {
    required: true,
    min_length: Some(5),
    max_length: Some(20_000),
};

pub async fn comment_handler(
    State(state): State<Arc<AppState>>,
    ClientIp(client_ip): ClientIp,
    body: Bytes,
) -> Result<Json<CommentResponse>, ApiError> {
    REQUEST_TOTAL.with_label_values(&[SCOPE]).inc();
    let timer = REQUEST_LATENCY.with_label_values(&[SCOPE]).start_timer();
    let started = Instant::now();
    tracing::info!(client_ip = %client_ip, "Code commenting request started");

    let result = comment(&state, &client_ip, &body, started).await;

    timer.observe_duration();
    log_outcome(SCOPE, &client_ip, started, &result);
    result.map(Json)
}

async fn comment(
    state: &AppState,
    client_ip: &str,
    body: &[u8],
    started: Instant,
) -> Result<CommentResponse, ApiError> {
    let limit = state.settings.comment_limit;
    if !state
        .rate_limiter
        .is_allowed(SCOPE, client_ip, limit.max_requests, limit.window)
    {
        RATE_LIMITED.with_label_values(&[SCOPE]).inc();
        return Err(ApiError::RateLimited(
            "Too many commenting requests. Please wait before trying again.".to_string(),
        ));
    }

    let request: CommentRequest = serde_json::from_slice(body)
        .map_err(|_| ApiError::Validation("Invalid JSON in request body".to_string()))?;

    let code = request.code.as_deref();
    if let Some(message) = validate_field(code, CODE_RULES) {
        return Err(ApiError::Validation(format!("Code validation failed: {message}")));
    }
    let code = code.unwrap_or_default();

    state.upstream.ensure_configured()?;

    let language = detect_language(code);
    let model = state.settings.comment_model.as_str();
    let prompt = comment_request(model, language, code);

    let content = state
        .upstream
        .generate(&prompt, CallPolicy::COMMENT)
        .await
        .map_err(comment_error)?;

    let duration = started.elapsed().as_millis() as u64;
    tracing::info!(
        client_ip,
        duration_ms = duration,
        language,
        content_length = content.chars().count(),
        "Code commenting completed"
    );

    Ok(CommentResponse {
        commented_code: first_code_block(&content),
        response: content,
        metadata: CommentMetadata {
            duration,
            language: language.to_string(),
            model: model.to_string(),
            timestamp: timestamp_now(),
        },
    })
}

// Upstream quota is reported to the caller as a rate limit here
fn comment_error(err: UpstreamError) -> ApiError {
    match err {
        UpstreamError::Status { status: 429, .. } => ApiError::RateLimited(
            "AI service rate limit exceeded. Please try again later.".to_string(),
        ),
        other => other.into(),
    }
}
