//! Rate-limit countdown.
//!
//! [`RateLimitCountdown`] is the pure state: a single process-wide "next
//! allowed" instant, evaluated against an injected `now`. [`CountdownTicker`]
//! is the scoped timer that wakes the event loop once per period while a
//! countdown is armed; dropping it cancels the timer.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Whole-unit decomposition of a remaining duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Remaining {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Remaining {
    /// Floors to whole seconds; negative spans decompose to zero.
    pub fn from_delta(delta: TimeDelta) -> Self {
        let total = delta.num_seconds().max(0);
        Self {
            days: total / 86_400,
            hours: total % 86_400 / 3_600,
            minutes: total % 3_600 / 60,
            seconds: total % 60,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    /// Compact label such as `1 h, 2 min, 5 s`. Zero units are omitted, so a
    /// zero duration renders as the empty string.
    pub fn label(&self) -> String {
        [
            (self.days, "d"),
            (self.hours, "h"),
            (self.minutes, "min"),
            (self.seconds, "s"),
        ]
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, unit)| format!("{n} {unit}"))
        .collect::<Vec<_>>()
        .join(", ")
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitCountdown {
    next_allowed_at: Option<DateTime<Utc>>,
}

impl RateLimitCountdown {
    /// Point the countdown at a new reset instant, replacing any previous one.
    pub fn arm(&mut self, next_allowed_at: DateTime<Utc>) {
        self.next_allowed_at = Some(next_allowed_at);
    }

    pub fn disarm(&mut self) {
        self.next_allowed_at = None;
    }

    pub fn next_allowed_at(&self) -> Option<DateTime<Utc>> {
        self.next_allowed_at
    }

    /// Remaining whole time until requests are permitted again.
    pub fn remaining(&self, now: DateTime<Utc>) -> Remaining {
        self.next_allowed_at
            .map(|at| Remaining::from_delta(at - now))
            .unwrap_or_default()
    }

    /// Rendered remaining time; empty means idle.
    pub fn label(&self, now: DateTime<Utc>) -> String {
        self.remaining(now).label()
    }

    /// True while requests must be held back.
    pub fn is_blocking(&self, now: DateTime<Utc>) -> bool {
        !self.remaining(now).is_zero()
    }
}

// ---------------------------------------------------------------------------
// Ticker
// ---------------------------------------------------------------------------

/// Cancellable periodic task. Only one should exist at a time; replacing the
/// owning `Option<CountdownTicker>` drops (and cancels) the previous one.
#[derive(Debug)]
pub struct CountdownTicker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl CountdownTicker {
    /// Spawn a task that calls `on_tick` every `period`, starting immediately.
    /// The task ends on cancellation or when `on_tick` returns `false`.
    pub fn spawn<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        if !on_tick() {
                            break;
                        }
                    }
                }
            }
        });
        Self { cancel, handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for CountdownTicker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Holds at most one [`CountdownTicker`].
#[derive(Debug, Default)]
pub struct CountdownSlot {
    ticker: Option<CountdownTicker>,
}

impl CountdownSlot {
    /// Cancel the current ticker, then start a new one.
    pub fn rearm<F>(&mut self, period: Duration, on_tick: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        self.disarm();
        self.ticker = Some(CountdownTicker::spawn(period, on_tick));
    }

    pub fn disarm(&mut self) {
        self.ticker = None;
    }

    pub fn is_armed(&self) -> bool {
        self.ticker.is_some()
    }
}
