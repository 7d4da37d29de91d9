// ── Cooldown / result cache ──
//
// Single slot holding the last successful backend fetch and when it
// happened. Within the cooldown window the slot answers instead of the
// backend. Writers swap the slot atomically; concurrent fresh fetches
// race and the last writer wins.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};

use sma_api::ChannelValues;

/// A successful fetch and its timestamp.
#[derive(Debug)]
pub struct CachedResult {
    pub fetched_at: DateTime<Utc>,
    pub readings: Arc<Vec<ChannelValues>>,
}

/// Outcome of a cooldown check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownCheck {
    /// `true` iff a previous fetch exists and the window has not elapsed.
    pub serve: bool,
    /// Whole seconds until a fresh fetch is allowed, floored, never negative.
    pub remaining_secs: u64,
}

/// A cached result that is still inside its window.
#[derive(Debug, Clone)]
pub struct CooldownHit {
    pub result: Arc<CachedResult>,
    pub remaining_secs: u64,
}

pub struct CooldownCache {
    cooldown: Duration,
    slot: ArcSwapOption<CachedResult>,
}

impl CooldownCache {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            slot: ArcSwapOption::const_empty(),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Time of the last successful fetch, if any.
    pub fn last_query_time(&self) -> Option<DateTime<Utc>> {
        self.slot.load_full().map(|r| r.fetched_at)
    }

    /// Whether a query at `now` should be answered from the slot.
    pub fn should_serve_cached(&self, now: DateTime<Utc>) -> CooldownCheck {
        match self.slot.load_full() {
            Some(result) => self.check(&result, now),
            None => CooldownCheck {
                serve: false,
                remaining_secs: 0,
            },
        }
    }

    /// The cached result, if a query at `now` falls inside its window.
    ///
    /// Check and read use a single load, so a concurrent `store` cannot
    /// pair one fetch's timestamp with another fetch's readings.
    pub fn lookup(&self, now: DateTime<Utc>) -> Option<CooldownHit> {
        let result = self.slot.load_full()?;
        let check = self.check(&result, now);
        check.serve.then_some(CooldownHit {
            result,
            remaining_secs: check.remaining_secs,
        })
    }

    /// Overwrite the slot with a fresh fetch made at `now`.
    pub fn store(&self, readings: Vec<ChannelValues>, now: DateTime<Utc>) -> Arc<CachedResult> {
        let result = Arc::new(CachedResult {
            fetched_at: now,
            readings: Arc::new(readings),
        });
        self.slot.store(Some(Arc::clone(&result)));
        result
    }

    fn check(&self, result: &CachedResult, now: DateTime<Utc>) -> CooldownCheck {
        let cooldown_ms = i64::try_from(self.cooldown.as_millis()).unwrap_or(i64::MAX);
        let elapsed_ms = (now - result.fetched_at).num_milliseconds();
        // A clock that went backwards counts as "just fetched".
        let remaining_ms = cooldown_ms - elapsed_ms.max(0);

        CooldownCheck {
            serve: elapsed_ms < cooldown_ms,
            remaining_secs: u64::try_from(remaining_ms.max(0) / 1000).unwrap_or(0),
        }
    }
}
