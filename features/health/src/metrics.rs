//! Counter/gauge/histogram collection with a ring-buffered series store.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;

/// Histogram bucket bounds for latency-style metrics, in milliseconds.
const DEFAULT_BOUNDS: &[f64] = &[1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 5000.0];

/// A fixed-bound histogram.
#[derive(Debug, Clone, Serialize)]
pub struct Histogram {
    /// Upper bounds per bucket; an implicit +inf bucket follows.
    pub bounds: Vec<f64>,
    /// Observation counts per bucket (one longer than `bounds`).
    pub counts: Vec<u64>,
    /// Sum of all observations.
    pub sum: f64,
    /// Total observations.
    pub count: u64,
}

impl Histogram {
    fn new(bounds: &[f64]) -> Self {
        Self {
            bounds: bounds.to_vec(),
            counts: vec![0; bounds.len() + 1],
            sum: 0.0,
            count: 0,
        }
    }

    fn observe(&mut self, value: f64) {
        let idx = self
            .bounds
            .iter()
            .position(|b| value <= *b)
            .unwrap_or(self.bounds.len());
        self.counts[idx] += 1;
        self.sum += value;
        self.count += 1;
    }

    /// Approximate quantile from bucket counts.
    pub fn quantile(&self, q: f64) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let target = (q.clamp(0.0, 1.0) * self.count as f64).ceil() as u64;
        let mut seen = 0u64;
        for (idx, count) in self.counts.iter().enumerate() {
            seen += count;
            if seen >= target {
                return self
                    .bounds
                    .get(idx)
                    .copied()
                    .unwrap_or_else(|| self.bounds.last().copied().unwrap_or(0.0));
            }
        }
        self.bounds.last().copied().unwrap_or(0.0)
    }
}

/// One point of the streamed series.
#[derive(Debug, Clone, Serialize)]
pub struct MetricSample {
    /// Metric name.
    pub name: String,
    /// Sampled value (counter delta, gauge level or observation).
    pub value: f64,
    /// Sample time.
    pub timestamp: DateTime<Utc>,
}

/// Full pull-style snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub counters: HashMap<String, u64>,
    pub gauges: HashMap<String, f64>,
    pub histograms: HashMap<String, Histogram>,
    pub taken_at: DateTime<Utc>,
}

struct Store {
    counters: HashMap<String, u64>,
    gauges: HashMap<String, f64>,
    histograms: HashMap<String, Histogram>,
    series: VecDeque<MetricSample>,
}

/// The metrics hub.
///
/// Exporters either pull a [`MetricsSnapshot`] or stream samples through
/// [`MetricsRegistry::subscribe`]. The series ring keeps a bounded window
/// so an absent exporter costs a fixed amount of memory.
pub struct MetricsRegistry {
    store: Mutex<Store>,
    series_cap: usize,
    stream: broadcast::Sender<MetricSample>,
}

impl MetricsRegistry {
    /// Create a registry retaining `series_cap` samples.
    pub fn new(series_cap: usize) -> Self {
        let (stream, _) = broadcast::channel(256);
        Self {
            store: Mutex::new(Store {
                counters: HashMap::new(),
                gauges: HashMap::new(),
                histograms: HashMap::new(),
                series: VecDeque::new(),
            }),
            series_cap: series_cap.max(16),
            stream,
        }
    }

    /// Increment a counter.
    pub fn incr(&self, name: &str) {
        self.incr_by(name, 1);
    }

    /// Increment a counter by `delta`.
    pub fn incr_by(&self, name: &str, delta: u64) {
        let mut store = self.lock();
        *store.counters.entry(name.to_string()).or_default() += delta;
        self.push_sample(&mut store, name, delta as f64);
    }

    /// Set a gauge.
    pub fn gauge(&self, name: &str, value: f64) {
        let mut store = self.lock();
        store.gauges.insert(name.to_string(), value);
        self.push_sample(&mut store, name, value);
    }

    /// Observe a histogram value (e.g. a duration in milliseconds).
    pub fn observe(&self, name: &str, value: f64) {
        let mut store = self.lock();
        store
            .histograms
            .entry(name.to_string())
            .or_insert_with(|| Histogram::new(DEFAULT_BOUNDS))
            .observe(value);
        self.push_sample(&mut store, name, value);
    }

    /// Pull a full snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let store = self.lock();
        MetricsSnapshot {
            counters: store.counters.clone(),
            gauges: store.gauges.clone(),
            histograms: store.histograms.clone(),
            taken_at: Utc::now(),
        }
    }

    /// Recent samples, oldest first.
    pub fn series(&self) -> Vec<MetricSample> {
        self.lock().series.iter().cloned().collect()
    }

    /// Stream samples as they are recorded.
    pub fn subscribe(&self) -> broadcast::Receiver<MetricSample> {
        self.stream.subscribe()
    }

    /// Counter value (0 when never incremented).
    pub fn counter(&self, name: &str) -> u64 {
        self.lock().counters.get(name).copied().unwrap_or(0)
    }

    /// Gauge value, if set.
    pub fn gauge_value(&self, name: &str) -> Option<f64> {
        self.lock().gauges.get(name).copied()
    }

    /// Histogram by name, if observed.
    pub fn histogram(&self, name: &str) -> Option<Histogram> {
        self.lock().histograms.get(name).cloned()
    }

    fn push_sample(&self, store: &mut Store, name: &str, value: f64) {
        let sample = MetricSample {
            name: name.to_string(),
            value,
            timestamp: Utc::now(),
        };
        store.series.push_back(sample.clone());
        while store.series.len() > self.series_cap {
            store.series.pop_front();
        }
        let _ = self.stream.send(sample);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Bridge from the resilience middleware into the hub.
impl coderelay_resilience::OutcomeObserver for MetricsRegistry {
    fn on_attempt(&self, operation: &str, succeeded: bool, duration: Duration) {
        let outcome = if succeeded { "success" } else { "failure" };
        self.incr(&format!("attempts.{operation}.{outcome}"));
        self.observe(
            &format!("duration_ms.{operation}"),
            duration.as_secs_f64() * 1000.0,
        );
    }

    fn on_circuit_rejection(&self, operation: &str) {
        self.incr(&format!("circuit_rejections.{operation}"));
    }
}

#[cfg(test)]
#[path = "metrics.test.rs"]
mod tests;
