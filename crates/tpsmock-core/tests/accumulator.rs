//! Rate accumulator behaviour under sequential and concurrent load.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::{Arc, Barrier};
use std::thread;

use chrono::{Duration, TimeZone, Utc};
use tpsmock_core::{RateAccumulator, RateSnapshot};

#[test]
fn fresh_snapshot_is_idle() {
    let acc = RateAccumulator::new();
    let s = acc.snapshot();
    assert_eq!(s, RateSnapshot::idle());
    assert_eq!(s.total_events, 0);
    assert_eq!(s.window_seconds, 0.0);
    assert_eq!(s.rate, 0.0);
    assert!(s.window_start.is_none());
    assert!(s.window_end.is_none());
}

#[test]
fn sequential_records_are_all_counted() {
    for n in [1u64, 2, 17, 500] {
        let acc = RateAccumulator::new();
        for _ in 0..n {
            acc.record_event();
        }
        let s = acc.snapshot();
        assert_eq!(s.total_events, n, "n={n}");
        assert!(s.window_start.is_some());
        assert!(s.window_end.is_some());
        assert!(s.window_seconds >= 0.0);
    }
}

#[test]
fn reset_returns_to_idle() {
    let acc = RateAccumulator::new();
    for _ in 0..10 {
        acc.record_event();
    }
    acc.reset();
    assert_eq!(acc.snapshot(), RateSnapshot::idle());

    // Idempotent on an idle accumulator.
    acc.reset();
    assert_eq!(acc.snapshot(), RateSnapshot::idle());
}

#[test]
fn zero_window_means_zero_rate() {
    let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let acc = RateAccumulator::new();
    acc.record_at(t);
    acc.record_at(t);
    acc.record_at(t);

    let s = acc.snapshot();
    assert_eq!(s.total_events, 3);
    assert_eq!(s.window_seconds, 0.0);
    assert_eq!(s.rate, 0.0);
}

#[test]
fn rate_is_events_over_window() {
    let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let acc = RateAccumulator::new();
    for i in 0..=10 {
        acc.record_at(t + Duration::milliseconds(i * 500));
    }

    // 11 events across 5 seconds.
    let s = acc.snapshot();
    assert_eq!(s.total_events, 11);
    assert!((s.window_seconds - 5.0).abs() < 1e-9);
    assert!((s.rate - 2.2).abs() < 1e-9);
}

#[test]
fn snapshot_serializes_with_api_names() {
    let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let acc = RateAccumulator::new();
    acc.record_at(t);
    acc.record_at(t + Duration::seconds(2));

    let v = serde_json::to_value(acc.snapshot()).unwrap();
    assert_eq!(v["total_requests"], 2);
    assert_eq!(v["duration_seconds"], 2.0);
    assert_eq!(v["tps"], 1.0);
    assert_eq!(v["start_time"], "2024-01-01T00:00:00Z");
    assert_eq!(v["end_time"], "2024-01-01T00:00:02Z");

    let idle = serde_json::to_value(RateSnapshot::idle()).unwrap();
    assert!(idle["start_time"].is_null());
    assert!(idle["end_time"].is_null());
}

#[test]
fn concurrent_records_lose_nothing() {
    const CALLERS: usize = 1000;

    let acc = Arc::new(RateAccumulator::new());
    let gate = Arc::new(Barrier::new(CALLERS));

    thread::scope(|scope| {
        for _ in 0..CALLERS {
            let acc = Arc::clone(&acc);
            let gate = Arc::clone(&gate);
            scope.spawn(move || {
                gate.wait();
                acc.record_event();
            });
        }
    });

    assert_eq!(acc.snapshot().total_events, CALLERS as u64);
}

#[test]
fn readers_never_see_partial_state() {
    let acc = Arc::new(RateAccumulator::new());

    thread::scope(|scope| {
        for _ in 0..4 {
            let acc = Arc::clone(&acc);
            scope.spawn(move || {
                for _ in 0..2_000 {
                    acc.record_event();
                }
            });
        }
        {
            let acc = Arc::clone(&acc);
            scope.spawn(move || {
                for i in 0..500 {
                    if i % 50 == 0 {
                        acc.reset();
                    }
                }
            });
        }
        for _ in 0..2 {
            let acc = Arc::clone(&acc);
            scope.spawn(move || {
                for _ in 0..2_000 {
                    let s = acc.snapshot();
                    if s.total_events == 0 {
                        assert!(s.window_start.is_none() && s.window_end.is_none());
                        assert_eq!(s.rate, 0.0);
                    } else {
                        let start = s.window_start.as_deref().unwrap();
                        let end = s.window_end.as_deref().unwrap();
                        assert!(start <= end);
                        assert!(s.window_seconds >= 0.0);
                    }
                }
            });
        }
    });
}
