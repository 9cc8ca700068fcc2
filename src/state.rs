use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::ResponseCache;
use crate::config::Args;
use crate::datastore::DatastoreProbe;
use crate::rate_limit::RateLimiter;
use crate::upstream::{HttpTransport, UpstreamClient};

#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub max_requests: u32,
    pub window: Duration,
}

// Tunables resolved from the CLI / environment
#[derive(Debug, Clone)]
pub struct Settings {
    pub analysis_model: String,
    pub comment_model: String,
    pub analyze_limit: RateLimit,
    pub comment_limit: RateLimit,
    pub cache_ttl: Duration,
    // honour X-Forwarded-For / X-Real-IP for client identity
    pub trust_forwarded_for: bool,
}

impl Settings {
    pub fn from_args(args: &Args) -> Self {
        Self {
            analysis_model: args.analysis_model.clone(),
            comment_model: args.comment_model.clone(),
            analyze_limit: RateLimit {
                max_requests: args.analyze_rate_limit,
                window: args.rate_window(),
            },
            comment_limit: RateLimit {
                max_requests: args.comment_rate_limit,
                window: args.rate_window(),
            },
            cache_ttl: args.cache_ttl(),
            trust_forwarded_for: args.trust_forwarded_for,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            analysis_model: "qwen/qwen3-30b-a3b:free".to_string(),
            comment_model: "mistralai/mistral-7b-instruct:free".to_string(),
            analyze_limit: RateLimit {
                max_requests: 10,
                window: Duration::from_secs(60),
            },
            comment_limit: RateLimit {
                max_requests: 15,
                window: Duration::from_secs(60),
            },
            cache_ttl: Duration::from_secs(30 * 60),
            trust_forwarded_for: false,
        }
    }
}

// app's shared state
pub struct AppState {
    pub settings: Settings,
    pub upstream: UpstreamClient,
    pub cache: ResponseCache,
    pub rate_limiter: RateLimiter,
    pub datastore: DatastoreProbe,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(settings: Settings, upstream: UpstreamClient, datastore: DatastoreProbe) -> Self {
        Self {
            cache: ResponseCache::new(settings.cache_ttl),
            rate_limiter: RateLimiter::new(),
            settings,
            upstream,
            datastore,
            started_at: Instant::now(),
        }
    }

    pub fn from_args(args: &Args) -> Self {
        let client = reqwest::Client::new();
        let transport = HttpTransport::new(
            client.clone(),
            args.api_url.clone(),
            args.site_url.clone(),
            args.app_title.clone(),
        );
        let upstream = UpstreamClient::new(Arc::new(transport), args.api_key.clone());
        let datastore =
            DatastoreProbe::new(client, args.datastore_url.clone(), args.datastore_key.clone());

        Self::new(Settings::from_args(args), upstream, datastore)
    }
}
