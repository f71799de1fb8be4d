use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use storage::repository::StorageError;

use crate::Clock;
use crate::error::RateLimitError;

//
// ─── STORE ─────────────────────────────────────────────────────────────────────
//

/// Request counter keyed by caller identity.
///
/// `hit` records one request and returns how many the current window has
/// seen, resetting the count whenever `window_start` moves. Injected at
/// limiter construction so a shared store can stand in for the in-memory one.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Count one request for `key` within the window starting at
    /// `window_start`, returning the new total.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the backing store is unavailable.
    async fn hit(&self, key: &str, window_start: DateTime<Utc>) -> Result<u32, StorageError>;
}

/// Process-local store, one counter per key.
#[derive(Default)]
pub struct InMemoryRateLimitStore {
    windows: Mutex<HashMap<String, (DateTime<Utc>, u32)>>,
}

impl InMemoryRateLimitStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn hit(&self, key: &str, window_start: DateTime<Utc>) -> Result<u32, StorageError> {
        let mut guard = self
            .windows
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let entry = guard.entry(key.to_owned()).or_insert((window_start, 0));
        if entry.0 != window_start {
            *entry = (window_start, 0);
        }
        entry.1 = entry.1.saturating_add(1);
        Ok(entry.1)
    }
}

//
// ─── LIMITER ───────────────────────────────────────────────────────────────────
//

/// Outcome of one rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited { retry_after_secs: u32 },
}

impl RateLimitDecision {
    #[must_use]
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Fixed-window rate limiter: at most `max_requests` per key per window.
///
/// Windows are aligned to multiples of the window length since the epoch, so
/// every process using the same store agrees on the boundaries. Rejected
/// requests still count; a caller hammering a closed window stays closed.
#[derive(Clone)]
pub struct RateLimiter {
    clock: Clock,
    store: Arc<dyn RateLimitStore>,
    max_requests: u32,
    window_secs: u32,
}

impl RateLimiter {
    #[must_use]
    pub fn new(
        clock: Clock,
        store: Arc<dyn RateLimitStore>,
        max_requests: u32,
        window_secs: u32,
    ) -> Self {
        Self {
            clock,
            store,
            max_requests,
            window_secs: window_secs.max(1),
        }
    }

    /// Count a request for `key` and decide whether it may proceed.
    ///
    /// # Errors
    ///
    /// Returns `RateLimitError::Storage` when the store is unavailable.
    pub async fn check(&self, key: &str) -> Result<RateLimitDecision, RateLimitError> {
        let now = self.clock.now();
        let window_start = self.window_start(now);
        let count = self.store.hit(key, window_start).await?;

        if count <= self.max_requests {
            return Ok(RateLimitDecision::Allowed {
                remaining: self.max_requests - count,
            });
        }

        let window_end = window_start + Duration::seconds(i64::from(self.window_secs));
        let retry_secs = (window_end - now).num_seconds().max(0);
        Ok(RateLimitDecision::Limited {
            retry_after_secs: u32::try_from(retry_secs).unwrap_or(u32::MAX),
        })
    }

    fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let secs = i64::from(self.window_secs);
        let start = now.timestamp() - now.timestamp().rem_euclid(secs);
        Utc.timestamp_opt(start, 0).single().unwrap_or(now)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
