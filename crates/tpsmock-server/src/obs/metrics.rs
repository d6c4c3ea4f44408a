//! Minimal metrics registry for the mock server.
//!
//! Counter/gauge/histogram types with dynamic labels backed by `DashMap`.
//! Labels are flattened into sorted key vectors to keep deterministic
//! ordering. Histogram buckets are fixed in microseconds to avoid floating
//! point math; the top buckets cover configured response delays.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

/// Helper to escape label values.
pub(crate) fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn label_key(labels: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut key: Vec<(String, String)> = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn has_label(key: &[(String, String)], name: &str, value: &str) -> bool {
    key.iter().any(|(k, v)| k == name && v == value)
}

fn label_str(key: &[(String, String)]) -> String {
    key.iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<Vec<(String, String)>, AtomicU64>,
}

impl CounterVec {
    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    /// Increment by an arbitrary value.
    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let counter = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    /// Current value for an exact label set (0 if never touched).
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Drop every series carrying `name=value`.
    pub fn forget(&self, name: &str, value: &str) {
        self.map.retain(|k, _| !has_label(k, name, value));
    }

    /// Render in Prometheus text exposition format.
    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} counter", name);
        for r in self.map.iter() {
            let val = r.value().load(Ordering::Relaxed);
            let _ = writeln!(out, "{}{{{}}} {}", name, label_str(r.key()), val);
        }
    }
}

#[derive(Default)]
pub struct GaugeVec {
    map: DashMap<Vec<(String, String)>, AtomicI64>,
}

impl GaugeVec {
    pub fn inc(&self, labels: &[(&str, &str)]) { self.add(labels, 1); }

    /// Decrement an existing series; a pruned label set stays pruned.
    pub fn dec(&self, labels: &[(&str, &str)]) {
        if let Some(g) = self.map.get(&label_key(labels)) {
            g.fetch_sub(1, Ordering::Relaxed);
        }
    }

    /// `inc` now, `dec` when the guard drops (including on cancellation).
    pub fn track<'a>(&'a self, labels: &[(&'a str, &'a str)]) -> GaugeGuard<'a> {
        self.inc(labels);
        GaugeGuard {
            gauge: self,
            labels: labels.to_vec(),
        }
    }

    /// Add an arbitrary signed delta.
    pub fn add(&self, labels: &[(&str, &str)], v: i64) {
        let gauge = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicI64::new(0));
        gauge.fetch_add(v, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> i64 {
        self.map
            .get(&label_key(labels))
            .map(|g| g.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Drop every series carrying `name=value`.
    pub fn forget(&self, name: &str, value: &str) {
        self.map.retain(|k, _| !has_label(k, name, value));
    }

    /// Render in Prometheus text exposition format.
    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} gauge", name);
        for r in self.map.iter() {
            let val = r.value().load(Ordering::Relaxed);
            let _ = writeln!(out, "{}{{{}}} {}", name, label_str(r.key()), val);
        }
    }
}

pub struct GaugeGuard<'a> {
    gauge: &'a GaugeVec,
    labels: Vec<(&'a str, &'a str)>,
}

impl Drop for GaugeGuard<'_> {
    fn drop(&mut self) {
        self.gauge.dec(&self.labels);
    }
}

// Fixed buckets in microseconds:
// 100us, 1ms, 10ms, 100ms, 500ms, 1s, 2.5s, 5s, 10s
const BUCKETS_MICROS: [u64; 9] = [
    100, 1_000, 10_000, 100_000, 500_000, 1_000_000, 2_500_000, 5_000_000, 10_000_000,
];

#[derive(Default)]
struct AtomicHistogram {
    count: AtomicU64,
    sum: AtomicU64,
    buckets: [AtomicU64; 9],
}

#[derive(Default)]
pub struct HistogramVec {
    map: DashMap<Vec<(String, String)>, AtomicHistogram>,
}

impl HistogramVec {
    /// Observe a duration and increment cumulative buckets (microsecond scale).
    pub fn observe(&self, labels: &[(&str, &str)], duration: Duration) {
        let hist = self
            .map
            .entry(label_key(labels))
            .or_insert_with(AtomicHistogram::default);
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);

        hist.count.fetch_add(1, Ordering::Relaxed);
        hist.sum.fetch_add(micros, Ordering::Relaxed);

        for (i, &b) in BUCKETS_MICROS.iter().enumerate() {
            if micros <= b {
                hist.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn count(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|h| h.count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Drop every series carrying `name=value`.
    pub fn forget(&self, name: &str, value: &str) {
        self.map.retain(|k, _| !has_label(k, name, value));
    }

    /// Render in Prometheus text exposition format (unit: microseconds).
    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} histogram", name);
        for r in self.map.iter() {
            let hist = r.value();
            let labels = label_str(r.key());
            let prefix = if labels.is_empty() { String::new() } else { format!("{},", labels) };

            for (i, &le) in BUCKETS_MICROS.iter().enumerate() {
                let count = hist.buckets[i].load(Ordering::Relaxed);
                let _ = writeln!(out, "{}_bucket{{{}le=\"{}\"}} {}", name, prefix, le, count);
            }
            let count = hist.count.load(Ordering::Relaxed);
            let _ = writeln!(out, "{}_bucket{{{}le=\"+Inf\"}} {}", name, prefix, count);

            let sum = hist.sum.load(Ordering::Relaxed);
            let _ = writeln!(out, "{}_sum{{{}}} {}", name, labels, sum);
            let _ = writeln!(out, "{}_count{{{}}} {}", name, labels, count);
        }
    }
}

/// One per-endpoint line computed at scrape time (accumulator figures).
#[derive(Debug, Clone)]
pub struct EndpointGauge {
    pub endpoint: String,
    pub total: u64,
    pub tps: f64,
}

#[derive(Default)]
pub struct ServerMetrics {
    /// Labels: endpoint, status.
    pub webhook_requests: CounterVec,
    /// Requests that matched no endpoint.
    pub webhook_not_found: CounterVec,
    /// Requests currently inside their configured delay. Label: endpoint.
    pub in_flight: GaugeVec,
    /// Arrival to response, including the configured delay. Label: endpoint.
    pub response_duration: HistogramVec,
    draining: AtomicBool,
}

impl ServerMetrics {
    /// Mark draining state.
    pub fn set_draining(&self) { self.draining.store(true, Ordering::Relaxed); }
    /// Return whether draining is active.
    pub fn is_draining(&self) -> bool { self.draining.load(Ordering::Relaxed) }

    /// Remove the series of a deleted endpoint.
    pub fn forget_endpoint(&self, id: &str) {
        self.webhook_requests.forget("endpoint", id);
        self.in_flight.forget("endpoint", id);
        self.response_duration.forget("endpoint", id);
    }

    /// Render all registered metrics plus per-endpoint accumulator gauges.
    pub fn render(&self, endpoints: &[EndpointGauge]) -> String {
        let mut out = String::new();
        self.webhook_requests.render("tpsmock_webhook_requests_total", &mut out);
        self.webhook_not_found.render("tpsmock_webhook_not_found_total", &mut out);
        self.in_flight.render("tpsmock_webhook_in_flight", &mut out);
        self.response_duration.render("tpsmock_response_duration_micros", &mut out);

        let _ = writeln!(out, "# TYPE tpsmock_endpoint_window_requests gauge");
        for e in endpoints {
            let _ = writeln!(
                out,
                "tpsmock_endpoint_window_requests{{endpoint=\"{}\"}} {}",
                escape_label(&e.endpoint),
                e.total
            );
        }
        let _ = writeln!(out, "# TYPE tpsmock_endpoint_tps gauge");
        for e in endpoints {
            let _ = writeln!(
                out,
                "tpsmock_endpoint_tps{{endpoint=\"{}\"}} {}",
                escape_label(&e.endpoint),
                e.tps
            );
        }

        let _ = writeln!(out, "# TYPE tpsmock_draining gauge\ntpsmock_draining {}", if self.is_draining() { 1 } else { 0 });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_labels_are_order_independent() {
        let c = CounterVec::default();
        c.inc(&[("endpoint", "a"), ("status", "200")]);
        c.inc(&[("status", "200"), ("endpoint", "a")]);
        assert_eq!(c.get(&[("endpoint", "a"), ("status", "200")]), 2);
    }

    #[test]
    fn histogram_buckets_are_cumulative() {
        let h = HistogramVec::default();
        h.observe(&[("endpoint", "slow")], Duration::from_millis(2_000));

        let mut out = String::new();
        h.render("d", &mut out);
        assert!(out.contains("d_bucket{endpoint=\"slow\",le=\"1000000\"} 0"));
        assert!(out.contains("d_bucket{endpoint=\"slow\",le=\"2500000\"} 1"));
        assert!(out.contains("d_count{endpoint=\"slow\"} 1"));
        assert_eq!(h.count(&[("endpoint", "slow")]), 1);
        assert_eq!(h.count(&[("endpoint", "fast")]), 0);
    }

    #[test]
    fn gauge_guard_decrements_on_drop() {
        let g = GaugeVec::default();
        {
            let _guard = g.track(&[("endpoint", "slow")]);
            assert_eq!(g.get(&[("endpoint", "slow")]), 1);
        }
        assert_eq!(g.get(&[("endpoint", "slow")]), 0);
    }

    #[test]
    fn forget_endpoint_prunes_its_series() {
        let m = ServerMetrics::default();
        m.webhook_requests.inc(&[("endpoint", "gone"), ("status", "200")]);
        m.webhook_requests.inc(&[("endpoint", "kept"), ("status", "200")]);
        m.response_duration.observe(&[("endpoint", "gone")], Duration::from_millis(1));
        let guard = m.in_flight.track(&[("endpoint", "gone")]);

        m.forget_endpoint("gone");
        drop(guard);

        let out = m.render(&[]);
        assert!(!out.contains("\"gone\""));
        assert_eq!(m.webhook_requests.get(&[("endpoint", "kept"), ("status", "200")]), 1);
        assert_eq!(m.in_flight.get(&[("endpoint", "gone")]), 0);
    }

    #[test]
    fn render_includes_endpoint_gauges() {
        let m = ServerMetrics::default();
        let out = m.render(&[EndpointGauge {
            endpoint: "default".into(),
            total: 4,
            tps: 2.0,
        }]);
        assert!(out.contains("tpsmock_endpoint_window_requests{endpoint=\"default\"} 4"));
        assert!(out.contains("tpsmock_endpoint_tps{endpoint=\"default\"} 2"));
        assert!(out.contains("tpsmock_draining 0"));
    }
}
