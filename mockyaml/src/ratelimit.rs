//! Token-bucket rate limiter store.
//!
//! Buckets are keyed concurrently in a [`dashmap::DashMap`], mirroring the
//! per-key concurrent state pattern used elsewhere for connection tracking.
//! A background task evicts buckets that have gone idle past a configured
//! TTL; the store owns a `CancellationToken` so the loop can be stopped
//! before process exit.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

struct Bucket {
    tokens: f64,
    rate: f64,
    burst: u32,
    last_refill: Instant,
    last_used: Instant,
}

impl Bucket {
    fn new(rate: f64, burst: u32) -> Self {
        let now = Instant::now();
        Bucket {
            tokens: f64::from(burst),
            rate,
            burst,
            last_refill: now,
            last_used: now,
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(f64::from(self.burst));
        self.last_refill = now;
    }

    fn try_acquire(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn update(&mut self, rate: f64, burst: u32) {
        if self.rate != rate || self.burst != burst {
            self.rate = rate;
            self.burst = burst;
            self.tokens = self.tokens.min(f64::from(burst));
        }
    }
}

/// A concurrent store of per-key token buckets.
pub struct RateLimiterStore {
    buckets: DashMap<String, Mutex<Bucket>>,
    ttl: Duration,
    cancel: CancellationToken,
}

impl RateLimiterStore {
    /// Creates a store whose eviction loop (once started) removes buckets
    /// idle for longer than `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            buckets: DashMap::new(),
            ttl,
            cancel: CancellationToken::new(),
        }
    }

    /// Attempts to acquire one token for `key`, creating or updating its
    /// bucket as needed. Updating `rate`/`burst` on an existing bucket
    /// never resets its accumulated token count.
    pub fn allow(&self, key: &str, rate: f64, burst: u32) -> bool {
        let entry = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| Mutex::new(Bucket::new(rate, burst)));
        let mut bucket = entry.lock().expect("rate limiter mutex poisoned");
        bucket.update(rate, burst);
        let allowed = bucket.try_acquire();
        bucket.last_used = Instant::now();
        allowed
    }

    /// Removes buckets that have been idle past the configured TTL.
    pub fn evict_idle(&self) {
        let ttl = self.ttl;
        self.buckets.retain(|_, bucket| {
            let guard = bucket.lock().expect("rate limiter mutex poisoned");
            guard.last_used.elapsed() < ttl
        });
    }

    /// Spawns the background eviction loop. Wakes every `ttl / 2`
    /// (minimum 1 second) and removes idle buckets until `stop()` is called.
    pub fn spawn_eviction_loop(self: std::sync::Arc<Self>) -> tokio::task::JoinHandle<()> {
        let interval = (self.ttl / 2).max(Duration::from_secs(1));
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => self.evict_idle(),
                }
            }
        })
    }

    /// Terminates the eviction loop.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Default for RateLimiterStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_request_allowed_second_denied_with_burst_one() {
        let store = RateLimiterStore::new(Duration::from_secs(600));
        assert!(store.allow("k", 1.0, 1));
        assert!(!store.allow("k", 1.0, 1));
    }

    #[test]
    fn rate_burst_update_preserves_tokens() {
        let store = RateLimiterStore::new(Duration::from_secs(600));
        // Burst of 5, consume 3, leaving 2 tokens.
        assert!(store.allow("k", 0.0, 5));
        assert!(store.allow("k", 0.0, 5));
        assert!(store.allow("k", 0.0, 5));
        // Update burst to 10 in place; remaining ~2 tokens should still be
        // available rather than reset to the new burst.
        assert!(store.allow("k", 0.0, 10));
        assert!(store.allow("k", 0.0, 10));
        assert!(!store.allow("k", 0.0, 10));
    }

    #[test]
    fn evict_idle_removes_stale_buckets() {
        let store = RateLimiterStore::new(Duration::from_millis(1));
        store.allow("k", 1.0, 1);
        std::thread::sleep(Duration::from_millis(5));
        store.evict_idle();
        assert_eq!(store.buckets.len(), 0);
    }
}
