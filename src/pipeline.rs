//! Analysis flow: cache lookup, primary call, one optional simplified
//! escalation, cache store.

use tracing::{info, warn};

use crate::cache::fingerprint;
use crate::error::ApiError;
use crate::metrics::SIMPLIFIED_RETRIES;
use crate::prompts;
use crate::sections::{SectionReport, needs_simplification};
use crate::state::AppState;
use crate::upstream::CallPolicy;

/// Where the returned text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Primary,
    Simplified,
}

#[derive(Debug)]
pub struct Generation {
    pub raw: String,
    pub source: Source,
}

/// Produces raw model text for `code`.
///
/// At most one simplified request is issued, and only when the primary
/// response is both incomplete and short.
pub async fn generate_artifacts(state: &AppState, code: &str) -> Result<Generation, ApiError> {
    state.upstream.ensure_configured()?;

    let cache_key = fingerprint(code);
    if let Some(raw) = state.cache.get(&cache_key) {
        info!(cache_key = %cache_key, "Using cached analysis result");
        return Ok(Generation {
            raw,
            source: Source::Cache,
        });
    }

    let primary = prompts::analysis_request(&state.settings.analysis_model, code);
    info!(
        model = %primary.model,
        code_length = code.chars().count(),
        "Requesting analysis from upstream"
    );
    let content = state.upstream.generate(&primary, CallPolicy::ANALYSIS).await?;

    let report = SectionReport::inspect(&content);
    if !report.is_complete() {
        warn!(
            has_dockerfile = report.has_dockerfile,
            has_jenkinsfile = report.has_jenkinsfile,
            has_guide = report.has_guide,
            content_length = content.chars().count(),
            "AI response missing required sections"
        );
    }

    let generation = if needs_simplification(&report, &content) {
        SIMPLIFIED_RETRIES.inc();
        info!("Attempting retry with simplified prompt");
        let simplified = prompts::simplified_request(&primary, code);
        match state.upstream.generate(&simplified, CallPolicy::SIMPLIFIED).await {
            Ok(raw) => {
                info!("Retry successful, using simplified response");
                Generation {
                    raw,
                    source: Source::Simplified,
                }
            }
            Err(e) => {
                warn!(error = %e, "Simplified retry failed, keeping primary response");
                Generation {
                    raw: content,
                    source: Source::Primary,
                }
            }
        }
    } else {
        Generation {
            raw: content,
            source: Source::Primary,
        }
    };

    state.cache.put(cache_key.clone(), generation.raw.clone());
    info!(cache_key = %cache_key, "Cached analysis result");
    Ok(generation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiKey;
    use crate::datastore::DatastoreProbe;
    use crate::state::Settings;
    use crate::upstream::UpstreamClient;
    use crate::upstream::testing::{ScriptedTransport, Step, completion};
    use std::sync::Arc;
    use std::time::Instant;

    const CODE: &str = "print('hello world')";
    const COMPLETE: &str = "```dockerfile\nFROM python:3\n```\n```groovy\npipeline {}\n```\nGuide: Step 1: run";

    fn state(transport: &Arc<ScriptedTransport>) -> AppState {
        AppState::new(
            Settings::default(),
            UpstreamClient::new(transport.clone(), Some(ApiKey::new("sk-test"))),
            DatastoreProbe::disabled(),
        )
    }

    #[tokio::test]
    async fn second_identical_request_is_served_from_cache() {
        let transport = ScriptedTransport::new(vec![Step::Reply(200, completion(COMPLETE))]);
        let state = state(&transport);

        let first = generate_artifacts(&state, CODE).await.unwrap();
        let second = generate_artifacts(&state, CODE).await.unwrap();

        assert_eq!(first.source, Source::Primary);
        assert_eq!(second.source, Source::Cache);
        assert_eq!(first.raw, second.raw);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn changed_whitespace_misses_the_cache() {
        let transport = ScriptedTransport::new(vec![
            Step::Reply(200, completion(COMPLETE)),
            Step::Reply(200, completion(COMPLETE)),
        ]);
        let state = state(&transport);

        generate_artifacts(&state, CODE).await.unwrap();
        generate_artifacts(&state, &format!("{CODE}\n")).await.unwrap();
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn expired_entry_triggers_a_new_call() {
        let transport = ScriptedTransport::new(vec![
            Step::Reply(200, completion(COMPLETE)),
            Step::Reply(200, completion("Dockerfile: a Jenkinsfile: b Guide: newer")),
        ]);
        let state = state(&transport);

        generate_artifacts(&state, CODE).await.unwrap();
        // read past the TTL so the entry is purged
        let later = Instant::now() + state.cache.ttl() + std::time::Duration::from_secs(1);
        assert!(state.cache.get_at(&fingerprint(CODE), later).is_none());

        let again = generate_artifacts(&state, CODE).await.unwrap();
        assert_eq!(again.source, Source::Primary);
        assert_eq!(again.raw, "Dockerfile: a Jenkinsfile: b Guide: newer");
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn short_incomplete_response_is_replaced_by_simplified_one() {
        let transport = ScriptedTransport::new(vec![
            Step::Reply(200, completion("I only wrote a Dockerfile: FROM alpine")),
            Step::Reply(200, completion("short but final")),
        ]);
        let state = state(&transport);

        let generation = generate_artifacts(&state, CODE).await.unwrap();

        assert_eq!(generation.source, Source::Simplified);
        // used verbatim even though it is still incomplete
        assert_eq!(generation.raw, "short but final");
        assert_eq!(transport.calls(), 2);
        let requests = transport.requests();
        assert_eq!(requests[1].messages.len(), 1);
        assert!(requests[1].messages[0].content.starts_with("Generate a Dockerfile"));

        // the simplified text is cached like a primary one and served next time
        assert_eq!(state.cache.len(), 1);
        let again = generate_artifacts(&state, CODE).await.unwrap();
        assert_eq!(again.source, Source::Cache);
        assert_eq!(again.raw, "short but final");
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn failed_simplified_retry_keeps_primary_response() {
        let transport = ScriptedTransport::new(vec![
            Step::Reply(200, completion("nothing useful")),
            Step::Reply(503, "{}".into()),
        ]);
        let state = state(&transport);

        let generation = generate_artifacts(&state, CODE).await.unwrap();
        assert_eq!(generation.source, Source::Primary);
        assert_eq!(generation.raw, "nothing useful");
        // one escalation only, no retry of the simplified call
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn long_incomplete_response_is_not_escalated() {
        let long = format!("Dockerfile: {}", "RUN echo hi\n".repeat(60));
        let transport = ScriptedTransport::new(vec![Step::Reply(200, completion(&long))]);
        let state = state(&transport);

        let generation = generate_artifacts(&state, CODE).await.unwrap();
        assert_eq!(generation.source, Source::Primary);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn missing_credential_fails_before_cache_and_upstream() {
        let transport = ScriptedTransport::new(vec![]);
        let state = AppState::new(
            Settings::default(),
            UpstreamClient::new(transport.clone(), None),
            DatastoreProbe::disabled(),
        );
        state.cache.put(fingerprint(CODE), COMPLETE.to_string());

        let err = generate_artifacts(&state, CODE).await.unwrap_err();
        assert!(matches!(err, ApiError::Configuration));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn upstream_failure_is_not_cached() {
        let transport = ScriptedTransport::new(vec![
            Step::Reply(400, "{}".into()),
            Step::Reply(200, completion(COMPLETE)),
        ]);
        let state = state(&transport);

        assert!(generate_artifacts(&state, CODE).await.is_err());
        assert_eq!(state.cache.len(), 0);
        assert!(generate_artifacts(&state, CODE).await.is_ok());
    }
}
