//! Rate limiter for throttling repeated failed logins

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::info;

/// Rate limiter configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimiterConfig {
    /// Failed attempts allowed inside one window
    pub max_attempts: u32,
    /// Time window in seconds
    pub window_seconds: u64,
    /// Ban duration in seconds
    pub ban_duration_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 300,       // 5 minutes
            ban_duration_seconds: 900, // 15 minutes
        }
    }
}

/// Rate limiter entry
#[derive(Debug)]
struct RateLimiterEntry {
    /// Number of failed attempts in the current window
    attempts: u32,
    /// Last failed attempt time
    last_attempt: Instant,
    /// Ban expiration time
    ban_expires: Option<Instant>,
}

/// Rate limiter keyed by an arbitrary string (the normalized login email)
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Rate limiter configuration
    config: RateLimiterConfig,
    /// Rate limiter entries
    entries: Arc<Mutex<HashMap<String, RateLimiterEntry>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Drop entries whose ban has lapsed or whose window has passed without a ban
    fn prune(&self, entries: &mut HashMap<String, RateLimiterEntry>, now: Instant) {
        let window = Duration::from_secs(self.config.window_seconds);
        entries.retain(|_, entry| match entry.ban_expires {
            Some(ban_expires) => now < ban_expires,
            None => now.duration_since(entry.last_attempt) < window,
        });
    }

    /// Whether the key may attempt a login right now
    pub async fn is_allowed(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        self.prune(&mut entries, Instant::now());

        !entries
            .get(key)
            .is_some_and(|entry| entry.ban_expires.is_some())
    }

    /// Count a failed attempt, banning the key once it reaches the limit
    pub async fn record_failure(&self, key: &str) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        self.prune(&mut entries, now);

        let entry = entries.entry(key.to_string()).or_insert(RateLimiterEntry {
            attempts: 0,
            last_attempt: now,
            ban_expires: None,
        });

        entry.attempts += 1;
        entry.last_attempt = now;

        if entry.attempts >= self.config.max_attempts {
            entry.ban_expires = Some(now + Duration::from_secs(self.config.ban_duration_seconds));
            info!(
                "Banned key {} for {} seconds",
                key, self.config.ban_duration_seconds
            );
        }
    }

    /// Forget the key after a successful login
    pub async fn reset(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_attempts: u32, ban_duration_seconds: u64) -> RateLimiter {
        RateLimiter::new(RateLimiterConfig {
            max_attempts,
            window_seconds: 300,
            ban_duration_seconds,
        })
    }

    #[tokio::test]
    async fn test_bans_after_max_failures() {
        let limiter = limiter(3, 60);
        for _ in 0..2 {
            limiter.record_failure("a@example.com").await;
            assert!(limiter.is_allowed("a@example.com").await);
        }
        limiter.record_failure("a@example.com").await;
        assert!(!limiter.is_allowed("a@example.com").await);
        assert!(limiter.is_allowed("b@example.com").await);
    }

    #[tokio::test]
    async fn test_reset_clears_failures() {
        let limiter = limiter(2, 60);
        limiter.record_failure("a@example.com").await;
        limiter.reset("a@example.com").await;
        limiter.record_failure("a@example.com").await;
        assert!(limiter.is_allowed("a@example.com").await);
    }

    #[tokio::test]
    async fn test_ban_expires() {
        let limiter = limiter(1, 0);
        limiter.record_failure("a@example.com").await;
        assert!(limiter.is_allowed("a@example.com").await);
    }

    #[tokio::test]
    async fn test_stale_entries_are_dropped() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_attempts: 5,
            window_seconds: 0,
            ban_duration_seconds: 60,
        });
        for i in 0..100 {
            limiter.record_failure(&format!("user{}@example.com", i)).await;
        }
        assert!(limiter.is_allowed("user0@example.com").await);
        assert!(limiter.entries.lock().await.is_empty());
    }
}
