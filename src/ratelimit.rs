//! wirefront/src/ratelimit.rs
//! Keyed admission control shared by every connection.

use dashmap::{DashMap, mapref::entry::Entry};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};
use std::{
    hash::Hash,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

/// Attempts between two automatic sweeps of idle keys.
pub const CLEANUP_INTERVAL: u64 = 1024;

/// Decides whether `key` may proceed right now. Implementations never fail and
/// must tolerate concurrent calls for different keys.
pub trait Ratelimiter<K: ?Sized>: Send + Sync {
    /// true to allow, false to rate-limit.
    fn attempt(&self, key: &K) -> bool;

    /// Forget keys that would be admitted as if never seen.
    fn cleanup(&self) {}
}

/// Which algorithm backs the command limiter.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum RatelimiterKind {
    #[default]
    TokenBucket,
    Window,
}

// Fires once every CLEANUP_INTERVAL ticks.
#[derive(Debug, Default)]
struct CleanupTicker(AtomicU64);

impl CleanupTicker {
    fn tick(&self) -> bool {
        (self.0.fetch_add(1, Ordering::Relaxed) + 1) % CLEANUP_INTERVAL == 0
    }
}

/// Admits everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRatelimiter;

impl<K: ?Sized> Ratelimiter<K> for NoopRatelimiter {
    fn attempt(&self, _key: &K) -> bool {
        true
    }
}

/// Token bucket per key, backed by governor's keyed limiter. Keys whose bucket
/// refilled are swept every [`CLEANUP_INTERVAL`] attempts.
pub struct GovernorRatelimiter<K: Hash + Eq + Clone> {
    limiter: DefaultKeyedRateLimiter<K>,
    ticker: CleanupTicker,
}

impl<K: Hash + Eq + Clone> GovernorRatelimiter<K> {
    pub fn new(quota: Quota) -> Self {
        Self {
            limiter: RateLimiter::keyed(quota),
            ticker: CleanupTicker::default(),
        }
    }

    /// One admission per `period`, no burst. `None` for a zero period.
    pub fn with_period(period: Duration) -> Option<Self> {
        Quota::with_period(period).map(|quota| Self::new(quota.allow_burst(nonzero!(1u32))))
    }

    pub fn tracked_keys(&self) -> usize {
        self.limiter.len()
    }
}

impl<K: Hash + Eq + Clone + Send + Sync> Ratelimiter<K> for GovernorRatelimiter<K> {
    fn attempt(&self, key: &K) -> bool {
        let admitted = self.limiter.check_key(key).is_ok();
        if self.ticker.tick() {
            self.cleanup();
        }
        admitted
    }

    fn cleanup(&self) {
        self.limiter.retain_recent();
    }
}

/// Fixed window per key: a key is admitted once, then again only after
/// `period` has passed since its last admission.
pub struct WindowRatelimiter<K: Hash + Eq> {
    last_admitted: DashMap<K, Instant>,
    period: Duration,
    ticker: CleanupTicker,
}

impl<K: Hash + Eq + Clone> WindowRatelimiter<K> {
    pub fn new(period: Duration) -> Self {
        Self {
            last_admitted: DashMap::new(),
            period,
            ticker: CleanupTicker::default(),
        }
    }

    // Drop keys whose window already closed
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        let period = self.period;
        self.last_admitted
            .retain(|_, last| now.duration_since(*last) < period);
    }

    pub fn tracked_keys(&self) -> usize {
        self.last_admitted.len()
    }
}

impl<K: Hash + Eq + Clone + Send + Sync> Ratelimiter<K> for WindowRatelimiter<K> {
    fn attempt(&self, key: &K) -> bool {
        let now = Instant::now();
        // The entry guard holds a shard lock; it must be gone before sweeping.
        let admitted = match self.last_admitted.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                if now.duration_since(*entry.get()) >= self.period {
                    entry.insert(now);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        };
        if self.ticker.tick() {
            self.cleanup_expired();
        }
        admitted
    }

    fn cleanup(&self) {
        self.cleanup_expired();
    }
}
