use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, HistogramVec, register_counter, register_counter_vec,
    register_gauge, register_histogram_vec,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: CounterVec = register_counter_vec!(
        "gateway_requests_total",
        "Total number of requests",
        &["endpoint"]
    )
    .expect("gateway_requests_total registers once");
    pub static ref REQUEST_LATENCY: HistogramVec = register_histogram_vec!(
        "gateway_request_latency_seconds",
        "Request latency in seconds",
        &["endpoint"]
    )
    .expect("gateway_request_latency_seconds registers once");
    pub static ref RATE_LIMITED: CounterVec = register_counter_vec!(
        "gateway_rate_limited_total",
        "Requests rejected by the rate limiter",
        &["endpoint"]
    )
    .expect("gateway_rate_limited_total registers once");
    pub static ref CACHE_HITS: Counter =
        register_counter!("gateway_cache_hits_total", "Total cache hits")
            .expect("gateway_cache_hits_total registers once");
    pub static ref CACHE_MISSES: Counter =
        register_counter!("gateway_cache_misses_total", "Total cache misses")
            .expect("gateway_cache_misses_total registers once");
    pub static ref CACHE_SIZE: Gauge =
        register_gauge!("gateway_cache_size", "Current number of items in cache")
            .expect("gateway_cache_size registers once");
    pub static ref UPSTREAM_ATTEMPTS: CounterVec = register_counter_vec!(
        "gateway_upstream_attempts_total",
        "Upstream chat-completion attempts by outcome",
        &["outcome"]
    )
    .expect("gateway_upstream_attempts_total registers once");
    pub static ref SIMPLIFIED_RETRIES: Counter = register_counter!(
        "gateway_simplified_retries_total",
        "Simplified-prompt escalations issued"
    )
    .expect("gateway_simplified_retries_total registers once");
    pub static ref PARSE_FALLBACKS: CounterVec = register_counter_vec!(
        "gateway_parse_fallbacks_total",
        "Artifacts replaced by the default template",
        &["artifact"]
    )
    .expect("gateway_parse_fallbacks_total registers once");
}
