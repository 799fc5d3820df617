//! In-memory login throttling keyed by email.
//!
//! Every attempt is reserved up front. After `max_failures` unsuccessful
//! attempts inside `window`, further attempts for that email are refused
//! until the window that started with the first one has passed. A
//! successful login clears the entry.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const DEFAULT_MAX_FAILURES: u32 = 5;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, Copy)]
struct Failures {
    count: u32,
    first_at: Instant,
}

pub struct LoginThrottle {
    failures: DashMap<String, Failures>,
    max_failures: u32,
    window: Duration,
}

impl Default for LoginThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FAILURES, DEFAULT_WINDOW)
    }
}

impl LoginThrottle {
    pub fn new(max_failures: u32, window: Duration) -> Self {
        Self {
            failures: DashMap::new(),
            max_failures: max_failures.max(1),
            window,
        }
    }

    /// Reserve one login attempt for `key`, counted as a failure until
    /// `reset` is called. `Err(retry_after)` when the key is locked out.
    ///
    /// The lockout check and the increment happen under one shard lock.
    pub fn begin_attempt(&self, key: &str) -> Result<(), Duration> {
        let now = Instant::now();
        let mut entry = self.failures.entry(key.to_string()).or_insert(Failures {
            count: 0,
            first_at: now,
        });
        let elapsed = now.duration_since(entry.first_at);
        if elapsed >= self.window {
            *entry = Failures { count: 0, first_at: now };
        } else if entry.count >= self.max_failures {
            return Err(self.window - elapsed);
        }
        entry.count += 1;
        if entry.count == self.max_failures {
            warn!(attempts = entry.count, "Login locked after repeated failures");
        }
        Ok(())
    }

    pub fn reset(&self, key: &str) {
        self.failures.remove(key);
    }

    /// Drop entries whose window has passed.
    pub fn purge_expired(&self) -> usize {
        let before = self.failures.len();
        self.failures.retain(|_, f| f.first_at.elapsed() < self.window);
        before - self.failures.len()
    }

    pub fn tracked(&self) -> usize {
        self.failures.len()
    }
}

/// Purge expired entries every minute.
pub fn spawn_throttle_cleanup(throttle: Arc<LoginThrottle>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let purged = throttle.purge_expired();
            if purged > 0 {
                debug!(purged, "Purged expired login throttle entries");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locks_after_max_failures() {
        let throttle = LoginThrottle::new(3, Duration::from_secs(60));
        for _ in 0..3 {
            assert!(throttle.begin_attempt("a@x.com").is_ok());
        }
        let retry = throttle.begin_attempt("a@x.com").unwrap_err();
        assert!(retry <= Duration::from_secs(60));
        assert!(throttle.begin_attempt("b@x.com").is_ok());
    }

    #[test]
    fn test_reset_clears_lock() {
        let throttle = LoginThrottle::new(1, Duration::from_secs(60));
        assert!(throttle.begin_attempt("a").is_ok());
        assert!(throttle.begin_attempt("a").is_err());
        throttle.reset("a");
        assert!(throttle.begin_attempt("a").is_ok());
    }

    #[test]
    fn test_window_expiry_unlocks_and_purges() {
        let throttle = LoginThrottle::new(1, Duration::from_millis(20));
        assert!(throttle.begin_attempt("a").is_ok());
        assert!(throttle.begin_attempt("a").is_err());
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(throttle.purge_expired(), 1);
        assert_eq!(throttle.tracked(), 0);
        assert!(throttle.begin_attempt("a").is_ok());
    }

    #[test]
    fn test_concurrent_attempts_respect_limit() {
        let throttle = Arc::new(LoginThrottle::new(5, Duration::from_secs(60)));
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let throttle = Arc::clone(&throttle);
                std::thread::spawn(move || throttle.begin_attempt("burst@x.com").is_ok())
            })
            .collect();
        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(admitted, 5);
    }
}
