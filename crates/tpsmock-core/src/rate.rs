//! Throughput accounting primitive.
//!
//! A [`RateAccumulator`] counts events since its last reset and derives an
//! events-per-second figure from the first and the most recent arrival.
//!
//! The whole counter state lives behind one `RwLock` and every write replaces
//! it in a single assignment, so a reader observes either the state before a
//! write or the state after it, never a mix. Snapshots may run concurrently
//! with each other; `record_*` and `reset` are exclusive.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Counter state while active. `None` in the accumulator means inactive.
#[derive(Debug, Clone, Copy)]
struct Window {
    count: u64,
    start: DateTime<Utc>,
    last: DateTime<Utc>,
}

/// Per-endpoint event counter with first/last arrival tracking.
#[derive(Debug, Default)]
pub struct RateAccumulator {
    state: RwLock<Option<Window>>,
}

impl RateAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one event at the current wall-clock time.
    pub fn record_event(&self) {
        self.record_at(Utc::now());
    }

    /// Record one event at `now`.
    ///
    /// A timestamp older than the last recorded one (clock stepped back) is
    /// clamped, so `start <= last` always holds.
    pub fn record_at(&self, now: DateTime<Utc>) {
        let mut state = self.write();
        *state = Some(match *state {
            None => Window {
                count: 1,
                start: now,
                last: now,
            },
            Some(w) => Window {
                count: w.count.saturating_add(1),
                start: w.start,
                last: now.max(w.last),
            },
        });
    }

    /// Point-in-time view of the counter.
    pub fn snapshot(&self) -> RateSnapshot {
        let state = *self.read();
        let Some(w) = state else {
            return RateSnapshot::idle();
        };

        let window_seconds = (w.last - w.start)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        // Simultaneous arrivals report zero rather than infinity.
        let rate = if window_seconds > 0.0 {
            w.count as f64 / window_seconds
        } else {
            0.0
        };

        RateSnapshot {
            total_events: w.count,
            window_seconds,
            rate,
            window_start: Some(format_ts(w.start)),
            window_end: Some(format_ts(w.last)),
        }
    }

    /// Zero the counter and deactivate.
    pub fn reset(&self) {
        *self.write() = None;
    }

    pub fn is_active(&self) -> bool {
        self.read().is_some()
    }

    // The guarded value is replaced wholesale on every write, so a panic in
    // another holder cannot leave it half-updated.
    fn read(&self) -> RwLockReadGuard<'_, Option<Window>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Window>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Result of [`RateAccumulator::snapshot`].
///
/// Serialized with the field names the management API has always used
/// (`total_requests`, `tps`, ...).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateSnapshot {
    #[serde(rename = "total_requests")]
    pub total_events: u64,
    #[serde(rename = "duration_seconds")]
    pub window_seconds: f64,
    #[serde(rename = "tps")]
    pub rate: f64,
    #[serde(rename = "start_time")]
    pub window_start: Option<String>,
    #[serde(rename = "end_time")]
    pub window_end: Option<String>,
}

impl RateSnapshot {
    /// Snapshot of an accumulator that has seen nothing since reset.
    pub fn idle() -> Self {
        Self {
            total_events: 0,
            window_seconds: 0.0,
            rate: 0.0,
            window_start: None,
            window_end: None,
        }
    }
}

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
