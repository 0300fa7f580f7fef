use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use super::cache::BoundedExpiringCache;
use crate::config::AdmissionConfig;

/// Outcome of an admission check for one issue submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Forward the request.
    Accept,
    /// The interval ceiling was reached, nothing else is accepted until the next interval.
    RejectBusted,
    /// This client used up its budget for the current window.
    RejectRateLimited,
}

impl Decision {
    pub fn is_accept(&self) -> bool {
        matches!(self, Decision::Accept)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Accept => "accept",
            Decision::RejectBusted => "reject_busted",
            Decision::RejectRateLimited => "reject_rate_limited",
        }
    }
}

/// Counters of one interval, as logged when the interval closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IntervalSnapshot {
    /// Budget granted to clients first seen during the interval
    pub current_limit: u64,
    pub count_accepted: u64,
    pub count_dropped: u64,
    /// Time since the interval started
    pub elapsed_ms: u64,
    /// Time from interval start until the ceiling was reached, if it was
    pub bust_after_ms: Option<u64>,
}

struct IntervalState {
    count_accepted: u64,
    count_dropped: u64,
    interval_start: Instant,
    bust_at: Option<Instant>,
    current_limit: u64,
}

impl IntervalState {
    fn snapshot(&self, now: Instant) -> IntervalSnapshot {
        IntervalSnapshot {
            current_limit: self.current_limit,
            count_accepted: self.count_accepted,
            count_dropped: self.count_dropped,
            elapsed_ms: duration_ms(now.saturating_duration_since(self.interval_start)),
            bust_after_ms: self
                .bust_at
                .map(|at| duration_ms(at.saturating_duration_since(self.interval_start))),
        }
    }
}

struct Inner {
    interval: IntervalState,
    budgets: BoundedExpiringCache<String, u64>,
}

/// Decides which issue submissions reach the collector.
///
/// All state sits behind one mutex and no operation awaits while holding it, so a check or a
/// rollover is never interleaved with another one.
pub struct AdmissionController {
    inner: Mutex<Inner>,
    ceiling: u64,
    base_limit: u64,
    window: Duration,
}

impl AdmissionController {
    pub fn new(config: &AdmissionConfig) -> Self {
        Self::with_limits(
            config.ceiling,
            config.base_limit,
            config.interval(),
            config.cache_capacity,
        )
    }

    pub fn with_limits(ceiling: u64, base_limit: u64, window: Duration, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                interval: IntervalState {
                    count_accepted: 0,
                    count_dropped: 0,
                    interval_start: Instant::now(),
                    bust_at: None,
                    current_limit: base_limit,
                },
                budgets: BoundedExpiringCache::new(capacity),
            }),
            ceiling,
            base_limit,
            window,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Updates never leave the state half-written
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Interval length, which is also the per-client sliding window.
    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn check(&self, client: &str) -> Decision {
        self.check_at(client, Instant::now())
    }

    pub fn check_at(&self, client: &str, now: Instant) -> Decision {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let state = &mut inner.interval;

        if state.bust_at.is_some() {
            state.count_dropped = state.count_dropped.saturating_add(1);
            return Decision::RejectBusted;
        }

        let remaining = inner
            .budgets
            .get(client, now)
            .copied()
            .unwrap_or(state.current_limit);
        if remaining == 0 {
            state.count_dropped = state.count_dropped.saturating_add(1);
            return Decision::RejectRateLimited;
        }

        inner
            .budgets
            .set(client.to_string(), remaining - 1, 1, now + self.window);
        state.count_accepted = state.count_accepted.saturating_add(1);
        if state.count_accepted == self.ceiling {
            state.bust_at = Some(now);
        }
        Decision::Accept
    }

    /// Move the start of the current interval to `now`, counters and budgets untouched.
    ///
    /// Called when the ticker starts so the first interval is measured from the same instant
    /// as its first tick.
    pub fn restart_interval_at(&self, now: Instant) {
        self.lock().interval.interval_start = now;
    }

    /// Close the current interval and start the next one.
    ///
    /// Returns the counters of the interval that just ended. Client budgets are left alone.
    pub fn rollover(&self) -> IntervalSnapshot {
        self.rollover_at(Instant::now())
    }

    pub fn rollover_at(&self, now: Instant) -> IntervalSnapshot {
        let mut guard = self.lock();
        let state = &mut guard.interval;
        let snapshot = state.snapshot(now);

        let bust_after = state
            .bust_at
            .map(|at| at.saturating_duration_since(state.interval_start));
        state.current_limit = adaptive_limit(self.base_limit, bust_after, self.window);
        state.count_accepted = 0;
        state.count_dropped = 0;
        state.bust_at = None;
        state.interval_start = now;

        snapshot
    }

    /// Counters of the interval in progress.
    pub fn snapshot(&self) -> IntervalSnapshot {
        self.lock().interval.snapshot(Instant::now())
    }

    pub fn current_limit(&self) -> u64 {
        self.lock().interval.current_limit
    }

    pub fn is_busted(&self) -> bool {
        self.lock().interval.bust_at.is_some()
    }

    /// Clients with a budget entry, expired entries not yet purged included.
    pub fn tracked_clients(&self) -> usize {
        self.lock().budgets.len()
    }

    pub fn cache_weight(&self) -> usize {
        self.lock().budgets.total_weight()
    }
}

/// Per-client budget for the interval following one that busted after `bust_after`.
///
/// The earlier the bust, the smaller the budget: `ceil(base_limit * bust_after / period)`.
/// Without a bust the base limit applies.
pub fn adaptive_limit(base_limit: u64, bust_after: Option<Duration>, period: Duration) -> u64 {
    let Some(bust_after) = bust_after else {
        return base_limit;
    };
    let period_ms = period.as_millis().max(1);
    let elapsed_ms = bust_after.as_millis().min(period_ms);
    let limit = (u128::from(base_limit) * elapsed_ms).div_ceil(period_ms);
    u64::try_from(limit).unwrap_or(base_limit)
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
