//! Backoff policy for upstream attempts.
//!
//! Failures are classified first; the class alone decides whether to retry
//! and the base delay, which is scaled by the 1-based attempt number.

use std::time::Duration;

/// What went wrong on a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// HTTP 429 from the upstream API
    RateLimited,
    /// HTTP 5xx
    ServerError,
    /// The per-attempt timeout fired
    Timeout,
    /// Connection or transport failure before a status arrived
    Network,
    /// Any other non-2xx status
    Rejected,
}

impl FailureClass {
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            500.. => Self::ServerError,
            _ => Self::Rejected,
        }
    }

    /// Base delay per class; `None` means terminal.
    pub fn base_delay(self) -> Option<Duration> {
        match self {
            Self::RateLimited => Some(Duration::from_millis(2000)),
            Self::ServerError => Some(Duration::from_millis(1000)),
            Self::Timeout => Some(Duration::from_millis(2000)),
            Self::Network => Some(Duration::from_millis(1000)),
            Self::Rejected => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::Rejected => "rejected",
        }
    }
}

/// Delay before the next attempt, or `None` when the caller should stop.
pub fn backoff(class: FailureClass, attempt: u32, max_attempts: u32) -> Option<Duration> {
    if attempt >= max_attempts {
        return None;
    }
    class.base_delay().map(|base| base * attempt)
}
