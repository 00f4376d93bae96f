//! Engine statistics: lock-free counters and a reservoir latency
//! histogram with percentile queries.
//!
//! Counters are cache-line padded so the engine thread's updates do not
//! false-share with reader threads. The histogram keeps a bounded ring of
//! samples under a short-critical-section mutex and computes percentiles
//! on demand by sorting the live window.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;
use parking_lot::Mutex;

use crate::time::now_ns;

/// Summary of the recorded latency distribution, in nanoseconds.
#[derive(Clone, Copy, Debug, Default)]
pub struct LatencyStats {
    pub mean_ns: f64,
    pub p50_ns: f64,
    pub p90_ns: f64,
    pub p95_ns: f64,
    pub p99_ns: f64,
    pub p999_ns: f64,
    pub min_ns: u64,
    pub max_ns: u64,
    pub count: usize,
}

struct HistogramState {
    samples: Vec<u64>,
    write_pos: usize,
    count: usize,
    min: u64,
    max: u64,
    sum: u64,
}

/// Bounded reservoir of latency samples; older samples are overwritten
/// once the ring wraps.
pub struct LatencyHistogram {
    state: Mutex<HistogramState>,
    capacity: usize,
}

impl LatencyHistogram {
    pub const DEFAULT_SAMPLE_CAPACITY: usize = 100_000;

    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(HistogramState {
                samples: vec![0; capacity],
                write_pos: 0,
                count: 0,
                min: u64::MAX,
                max: 0,
                sum: 0,
            }),
            capacity,
        }
    }

    /// Record one sample.
    pub fn record(&self, latency_ns: u64) {
        let mut state = self.state.lock();
        let pos = state.write_pos;
        state.samples[pos] = latency_ns;
        state.write_pos = (pos + 1) % self.capacity;
        state.count += 1;
        state.min = state.min.min(latency_ns);
        state.max = state.max.max(latency_ns);
        state.sum += latency_ns;
    }

    /// Copy the live window, sort it, and interpolate percentiles.
    pub fn compute_stats(&self) -> LatencyStats {
        let state = self.state.lock();

        if state.count == 0 {
            return LatencyStats::default();
        }

        let window = state.count.min(self.capacity);
        let mut sorted = state.samples[..window].to_vec();
        sorted.sort_unstable();

        // Linear interpolation between adjacent order statistics.
        let percentile = |p: f64| -> f64 {
            let index = (p / 100.0) * (window - 1) as f64;
            let lower = index.floor() as usize;
            let upper = index.ceil() as usize;
            if lower == upper {
                sorted[lower] as f64
            } else {
                let frac = index - lower as f64;
                sorted[lower] as f64 * (1.0 - frac) + sorted[upper] as f64 * frac
            }
        };

        LatencyStats {
            mean_ns: state.sum as f64 / state.count as f64,
            p50_ns: percentile(50.0),
            p90_ns: percentile(90.0),
            p95_ns: percentile(95.0),
            p99_ns: percentile(99.0),
            p999_ns: percentile(99.9),
            min_ns: state.min,
            max_ns: state.max,
            count: state.count,
        }
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.write_pos = 0;
        state.count = 0;
        state.min = u64::MAX;
        state.max = 0;
        state.sum = 0;
    }

    pub fn count(&self) -> usize {
        self.state.lock().count
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SAMPLE_CAPACITY)
    }
}

/// Engine counters. Updated from the engine thread, readable from any
/// thread.
pub struct EngineStats {
    pub trade_count: CachePadded<AtomicU64>,
    pub volume: CachePadded<AtomicU64>,
    pub orders_received: CachePadded<AtomicU64>,
    pub orders_accepted: CachePadded<AtomicU64>,
    pub orders_cancelled: CachePadded<AtomicU64>,
    pub orders_modified: CachePadded<AtomicU64>,
    pub rejected_count: CachePadded<AtomicU64>,
    pub filled_qty: CachePadded<AtomicU64>,
    /// End-to-end latency: pop time minus enqueue time.
    pub latency: LatencyHistogram,
    /// Engine-only latency: dispatch duration per event.
    pub engine_latency: LatencyHistogram,
}

impl EngineStats {
    pub fn new() -> Self {
        Self {
            trade_count: CachePadded::new(AtomicU64::new(0)),
            volume: CachePadded::new(AtomicU64::new(0)),
            orders_received: CachePadded::new(AtomicU64::new(0)),
            orders_accepted: CachePadded::new(AtomicU64::new(0)),
            orders_cancelled: CachePadded::new(AtomicU64::new(0)),
            orders_modified: CachePadded::new(AtomicU64::new(0)),
            rejected_count: CachePadded::new(AtomicU64::new(0)),
            filled_qty: CachePadded::new(AtomicU64::new(0)),
            latency: LatencyHistogram::default(),
            engine_latency: LatencyHistogram::default(),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.trade_count,
            &self.volume,
            &self.orders_received,
            &self.orders_accepted,
            &self.orders_cancelled,
            &self.orders_modified,
            &self.rejected_count,
            &self.filled_qty,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.latency.clear();
        self.engine_latency.clear();
    }
}

impl Default for EngineStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-atomic copy of the counters for reporting.
#[derive(Clone, Copy, Debug, Default)]
pub struct StatsSnapshot {
    pub trade_count: u64,
    pub volume: u64,
    pub orders_received: u64,
    pub orders_accepted: u64,
    pub orders_cancelled: u64,
    pub orders_modified: u64,
    pub rejected_count: u64,
    pub filled_qty: u64,
    pub latency: LatencyStats,
    pub engine_latency: LatencyStats,
    pub timestamp: u64,
}

impl StatsSnapshot {
    pub fn capture(stats: &EngineStats) -> Self {
        Self {
            trade_count: stats.trade_count.load(Ordering::Relaxed),
            volume: stats.volume.load(Ordering::Relaxed),
            orders_received: stats.orders_received.load(Ordering::Relaxed),
            orders_accepted: stats.orders_accepted.load(Ordering::Relaxed),
            orders_cancelled: stats.orders_cancelled.load(Ordering::Relaxed),
            orders_modified: stats.orders_modified.load(Ordering::Relaxed),
            rejected_count: stats.rejected_count.load(Ordering::Relaxed),
            filled_qty: stats.filled_qty.load(Ordering::Relaxed),
            latency: stats.latency.compute_stats(),
            engine_latency: stats.engine_latency.compute_stats(),
            timestamp: now_ns(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_histogram() {
        let hist = LatencyHistogram::new(16);
        let stats = hist.compute_stats();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean_ns, 0.0);
    }

    #[test]
    fn test_percentiles_on_known_data() {
        let hist = LatencyHistogram::new(1000);
        // 1..=100 so percentiles are easy to reason about.
        for v in 1..=100u64 {
            hist.record(v);
        }

        let stats = hist.compute_stats();
        assert_eq!(stats.count, 100);
        assert_eq!(stats.min_ns, 1);
        assert_eq!(stats.max_ns, 100);
        assert!((stats.mean_ns - 50.5).abs() < 1e-9);
        assert!((stats.p50_ns - 50.5).abs() < 1e-9);
        assert!((stats.p90_ns - 90.1).abs() < 1e-9);
        assert!((stats.p99_ns - 99.01).abs() < 1e-6);
    }

    #[test]
    fn test_single_sample() {
        let hist = LatencyHistogram::new(16);
        hist.record(42);
        let stats = hist.compute_stats();
        assert_eq!(stats.p50_ns, 42.0);
        assert_eq!(stats.p999_ns, 42.0);
        assert_eq!(stats.min_ns, 42);
        assert_eq!(stats.max_ns, 42);
    }

    #[test]
    fn test_ring_wraps() {
        let hist = LatencyHistogram::new(4);
        for v in [10, 20, 30, 40, 50, 60] {
            hist.record(v);
        }

        let stats = hist.compute_stats();
        // Count keeps the total; the window holds the last 4 writes.
        assert_eq!(stats.count, 6);
        // Min/max track all-time extremes.
        assert_eq!(stats.min_ns, 10);
        assert_eq!(stats.max_ns, 60);
    }

    #[test]
    fn test_clear() {
        let hist = LatencyHistogram::new(16);
        hist.record(5);
        hist.clear();
        assert_eq!(hist.count(), 0);
        assert_eq!(hist.compute_stats().count, 0);
    }

    #[test]
    fn test_snapshot_capture() {
        let stats = EngineStats::new();
        stats.trade_count.fetch_add(3, Ordering::Relaxed);
        stats.volume.fetch_add(30, Ordering::Relaxed);
        stats.latency.record(1_000);

        let snap = StatsSnapshot::capture(&stats);
        assert_eq!(snap.trade_count, 3);
        assert_eq!(snap.volume, 30);
        assert_eq!(snap.latency.count, 1);

        stats.reset();
        let snap = StatsSnapshot::capture(&stats);
        assert_eq!(snap.trade_count, 0);
        assert_eq!(snap.latency.count, 0);
    }
}
