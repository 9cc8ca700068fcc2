use clap::Parser;
use std::fmt;
use std::time::Duration;

// CLI argument structure, every option can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "devops-gateway")]
#[command(about = "Generates Dockerfiles, Jenkinsfiles and deployment guides from source code")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    // Chat-completion endpoint
    #[arg(
        long,
        env = "UPSTREAM_API_URL",
        default_value = "https://openrouter.ai/api/v1/chat/completions"
    )]
    pub api_url: String,

    // Bearer credential for the upstream API (checked per request, not at startup)
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    pub api_key: Option<ApiKey>,

    // Sent upstream as HTTP-Referer
    #[arg(long, env = "SITE_URL", default_value = "http://localhost:3000")]
    pub site_url: String,

    // Sent upstream as X-Title
    #[arg(long, env = "APP_TITLE", default_value = "DevOps Gateway")]
    pub app_title: String,

    #[arg(long, env = "ANALYSIS_MODEL", default_value = "qwen/qwen3-30b-a3b:free")]
    pub analysis_model: String,

    #[arg(long, env = "COMMENT_MODEL", default_value = "mistralai/mistral-7b-instruct:free")]
    pub comment_model: String,

    // Cache TTL in seconds
    #[arg(short, long, default_value_t = 1800)]
    pub cache_ttl: u64,

    // Max /analyze requests per window per client
    #[arg(long, default_value_t = 10)]
    pub analyze_rate_limit: u32,

    // Max /comment requests per window per client
    #[arg(long, default_value_t = 15)]
    pub comment_rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, default_value_t = 60)]
    pub rate_window: u64,

    // Take the caller from X-Forwarded-For / X-Real-IP; only safe behind a proxy that sets them
    #[arg(long, env = "TRUST_FORWARDED_FOR")]
    pub trust_forwarded_for: bool,

    // Hosted datastore base URL pinged by /health
    #[arg(long, env = "DATASTORE_URL")]
    pub datastore_url: Option<String>,

    #[arg(long, env = "DATASTORE_API_KEY", hide_env_values = true)]
    pub datastore_key: Option<ApiKey>,

    // Default filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl Args {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window)
    }
}

/// Credential that never shows up in `Debug` or `Display` output.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([redacted])")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[redacted]")
    }
}

impl std::str::FromStr for ApiKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_is_redacted_in_output() {
        let key = ApiKey::new("sk-or-very-secret");
        assert!(!format!("{key:?}").contains("very-secret"));
        assert!(!format!("{key}").contains("very-secret"));
        assert_eq!(key.expose(), "sk-or-very-secret");
    }

    #[test]
    fn defaults_match_documented_limits() {
        let args = Args::try_parse_from(["devops-gateway"]).expect("defaults parse");
        assert_eq!(args.analyze_rate_limit, 10);
        assert_eq!(args.comment_rate_limit, 15);
        assert_eq!(args.rate_window(), Duration::from_secs(60));
        assert_eq!(args.cache_ttl(), Duration::from_secs(30 * 60));
        assert_eq!(args.log_format, LogFormat::Text);
        assert!(!args.trust_forwarded_for);
    }

    #[test]
    fn api_key_flag_is_parsed() {
        let args = Args::try_parse_from(["devops-gateway", "--api-key", "abc", "--port", "9000"])
            .expect("flags parse");
        assert_eq!(args.api_key.as_ref().map(ApiKey::expose), Some("abc"));
        assert_eq!(args.port, 9000);
    }

    #[test]
    fn forwarded_headers_are_opt_in() {
        let args = Args::try_parse_from(["devops-gateway", "--trust-forwarded-for"])
            .expect("flags parse");
        assert!(args.trust_forwarded_for);
    }
}
