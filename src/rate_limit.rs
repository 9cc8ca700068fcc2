use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Every this many checks, windows with no live timestamps are dropped.
pub const SWEEP_INTERVAL: u64 = 256;

struct Window {
    span: Duration,
    hits: VecDeque<Instant>,
}

impl Window {
    // drop timestamps that slid out of the window
    fn prune(&mut self, now: Instant) {
        while let Some(oldest) = self.hits.front() {
            if now.saturating_duration_since(*oldest) < self.span {
                break;
            }
            self.hits.pop_front();
        }
    }
}

/// Sliding-window admission control, one window per `(scope, identity)`.
///
/// Each window keeps the timestamps of admitted requests. A request is
/// admitted when fewer than `max_requests` timestamps fall inside the
/// trailing `window`; only admitted requests are recorded. Windows that
/// prune down to nothing are removed, so idle identities are not retained.
#[derive(Default)]
pub struct RateLimiter {
    windows: DashMap<(&'static str, String), Window>,
    checks: AtomicU64,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_allowed(
        &self,
        scope: &'static str,
        identity: &str,
        max_requests: u32,
        window: Duration,
    ) -> bool {
        self.is_allowed_at(scope, identity, max_requests, window, Instant::now())
    }

    /// Same as [`RateLimiter::is_allowed`] with an explicit clock reading.
    pub fn is_allowed_at(
        &self,
        scope: &'static str,
        identity: &str,
        max_requests: u32,
        window: Duration,
        now: Instant,
    ) -> bool {
        let key = (scope, identity.to_string());
        let allowed = {
            let mut entry = self.windows.entry(key.clone()).or_insert_with(|| Window {
                span: window,
                hits: VecDeque::new(),
            });
            entry.span = window;
            entry.prune(now);

            if entry.hits.len() >= max_requests as usize {
                tracing::warn!(
                    scope,
                    identity,
                    requests = entry.hits.len(),
                    "Rate limit exceeded"
                );
                false
            } else {
                entry.hits.push_back(now);
                true
            }
        };

        // the entry guard is released above; these take shard locks again
        if !allowed {
            self.windows.remove_if(&key, |_, w| w.hits.is_empty());
        }
        if self.checks.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            self.sweep_at(now);
        }

        allowed
    }

    /// Prunes every window and removes the ones left empty.
    pub fn sweep_at(&self, now: Instant) {
        let before = self.windows.len();
        self.windows.retain(|_, w| {
            w.prune(now);
            !w.hits.is_empty()
        });
        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            tracing::debug!(removed, tracked = self.windows.len(), "Swept idle rate-limit windows");
        }
    }

    // Number of identities with a window, across all scopes
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn rejects_request_over_the_limit_inside_window() {
        let limiter = RateLimiter::new();
        let start = Instant::now();

        for i in 0..3 {
            let at = start + Duration::from_millis(i * 10);
            assert!(limiter.is_allowed_at("analyze", "10.0.0.1", 3, MINUTE, at));
        }
        assert!(!limiter.is_allowed_at(
            "analyze",
            "10.0.0.1",
            3,
            MINUTE,
            start + Duration::from_secs(59)
        ));
    }

    #[test]
    fn admits_again_once_the_window_has_elapsed() {
        let limiter = RateLimiter::new();
        let start = Instant::now();

        for _ in 0..3 {
            assert!(limiter.is_allowed_at("analyze", "10.0.0.1", 3, MINUTE, start));
        }
        assert!(limiter.is_allowed_at("analyze", "10.0.0.1", 3, MINUTE, start + MINUTE));
    }

    #[test]
    fn rejection_is_not_recorded() {
        let limiter = RateLimiter::new();
        let start = Instant::now();
        let window = Duration::from_secs(10);

        assert!(limiter.is_allowed_at("comment", "a", 1, window, start));
        // rejected at t=5s; if this were recorded it would block t=10s
        assert!(!limiter.is_allowed_at("comment", "a", 1, window, start + Duration::from_secs(5)));
        assert!(limiter.is_allowed_at("comment", "a", 1, window, start + window));
    }

    #[test]
    fn identities_and_scopes_have_independent_windows() {
        let limiter = RateLimiter::new();
        let now = Instant::now();

        assert!(limiter.is_allowed_at("analyze", "a", 1, MINUTE, now));
        assert!(!limiter.is_allowed_at("analyze", "a", 1, MINUTE, now));
        assert!(limiter.is_allowed_at("analyze", "b", 1, MINUTE, now));
        assert!(limiter.is_allowed_at("comment", "a", 1, MINUTE, now));
        assert_eq!(limiter.tracked(), 3);
    }

    #[test]
    fn decisions_are_deterministic_for_a_fixed_clock() {
        let run = || {
            let limiter = RateLimiter::new();
            let start = Instant::now();
            (0..6)
                .map(|i| {
                    limiter.is_allowed_at("analyze", "x", 2, MINUTE, start + Duration::from_secs(i * 20))
                })
                .collect::<Vec<_>>()
        };
        let first = run();
        assert_eq!(first, run());
        assert_eq!(first, vec![true, true, false, true, true, false]);
    }

    #[test]
    fn idle_windows_are_swept() {
        let limiter = RateLimiter::new();
        let start = Instant::now();

        for i in 0..3 {
            assert!(limiter.is_allowed_at("analyze", &format!("10.0.0.{i}"), 10, MINUTE, start));
        }
        assert_eq!(limiter.tracked(), 3);

        limiter.sweep_at(start + Duration::from_secs(30));
        assert_eq!(limiter.tracked(), 3);

        limiter.sweep_at(start + MINUTE);
        assert_eq!(limiter.tracked(), 0);
    }

    #[test]
    fn sweep_runs_periodically_during_checks() {
        let limiter = RateLimiter::new();
        let start = Instant::now();

        for i in 0..SWEEP_INTERVAL {
            limiter.is_allowed_at("analyze", &format!("client-{i}"), 10, MINUTE, start);
        }
        // the sweep on the last check above found every window still live
        assert_eq!(limiter.tracked(), SWEEP_INTERVAL as usize);

        for _ in 0..SWEEP_INTERVAL {
            limiter.is_allowed_at("analyze", "late", u32::MAX, MINUTE, start + MINUTE);
        }
        assert_eq!(limiter.tracked(), 1);
    }

    #[test]
    fn zero_budget_does_not_retain_a_window() {
        let limiter = RateLimiter::new();
        assert!(!limiter.is_allowed_at("comment", "a", 0, MINUTE, Instant::now()));
        assert_eq!(limiter.tracked(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_checks_never_exceed_the_budget() {
        let limiter = std::sync::Arc::new(RateLimiter::new());

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    let mut admitted = 0;
                    for _ in 0..25 {
                        if limiter.is_allowed("analyze", "shared", 50, MINUTE) {
                            admitted += 1;
                        }
                        tokio::task::yield_now().await;
                    }
                    admitted
                })
            })
            .collect();

        let mut admitted = 0;
        for task in tasks {
            admitted += task.await.unwrap();
        }
        assert_eq!(admitted, 50);
    }
}
