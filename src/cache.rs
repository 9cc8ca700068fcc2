use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

use crate::metrics::{CACHE_HITS, CACHE_MISSES, CACHE_SIZE};

// Cache entry with timestamp
#[derive(Clone)]
pub struct CacheEntry {
    pub response: String,
    pub created_at: Instant,
}

// Create a cache key (hash of the exact submitted code, whitespace included)
pub fn fingerprint(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Process-wide store of raw model output keyed by code fingerprint.
///
/// Expired entries are treated as absent and removed by the lookup that
/// finds them; there is no background sweep.
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&self, key: &str, now: Instant) -> Option<String> {
        // `remove_if` holds the shard lock, so a concurrent fresh `put` is never evicted
        let expired = self
            .entries
            .remove_if(key, |_, entry| {
                now.saturating_duration_since(entry.created_at) >= self.ttl
            })
            .is_some();

        if expired {
            CACHE_SIZE.set(self.entries.len() as f64);
            tracing::debug!(cache_key = key, "Evicted expired cache entry");
        }

        match self.entries.get(key) {
            Some(entry) => {
                CACHE_HITS.inc();
                Some(entry.response.clone())
            }
            None => {
                CACHE_MISSES.inc();
                None
            }
        }
    }

    // Last put wins
    pub fn put(&self, key: String, response: String) {
        self.entries.insert(
            key,
            CacheEntry {
                response,
                created_at: Instant::now(),
            },
        );
        CACHE_SIZE.set(self.entries.len() as f64);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(30 * 60);

    #[test]
    fn fingerprint_is_stable_and_whitespace_sensitive() {
        let a = fingerprint("fn main() {}");
        assert_eq!(a, fingerprint("fn main() {}"));
        assert_ne!(a, fingerprint("fn main() {} "));
        assert_ne!(a, fingerprint("fn  main() {}"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn returns_stored_value_within_ttl() {
        let cache = ResponseCache::new(TTL);
        let key = fingerprint("print('hi')");
        cache.put(key.clone(), "artifacts".to_string());

        assert_eq!(cache.get(&key).as_deref(), Some("artifacts"));
        assert_eq!(
            cache.get_at(&key, Instant::now() + Duration::from_secs(29 * 60)).as_deref(),
            Some("artifacts")
        );
    }

    #[test]
    fn expired_entry_is_absent_and_purged() {
        let cache = ResponseCache::new(TTL);
        let key = fingerprint("print('hi')");
        cache.put(key.clone(), "artifacts".to_string());
        assert_eq!(cache.len(), 1);

        assert!(cache.get_at(&key, Instant::now() + TTL + Duration::from_secs(1)).is_none());
        assert_eq!(cache.len(), 0);
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn last_put_wins() {
        let cache = ResponseCache::new(TTL);
        cache.put("k".to_string(), "first".to_string());
        cache.put("k".to_string(), "second".to_string());
        assert_eq!(cache.get("k").as_deref(), Some("second"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn miss_for_unknown_key() {
        let cache = ResponseCache::new(TTL);
        assert!(cache.get("missing").is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_puts_and_gets_on_one_key() {
        let cache = std::sync::Arc::new(ResponseCache::new(TTL));
        let values: Vec<String> = (0..8).map(|i| format!("response-{i}")).collect();

        let tasks: Vec<_> = values
            .iter()
            .cloned()
            .map(|value| {
                let cache = cache.clone();
                let values = values.clone();
                tokio::spawn(async move {
                    for _ in 0..200 {
                        cache.put("shared".to_string(), value.clone());
                        let seen = cache.get("shared").expect("entry is never expired here");
                        assert!(values.contains(&seen));
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(cache.len(), 1);
        assert!(values.contains(&cache.get("shared").unwrap()));
    }
}
