// src/metrics.rs
//
// Operation counters, latency reservoirs, and system-state gauges for
// the storage engine. One process-global instance; everything lock-free
// except the histograms.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Global metrics singleton
static METRICS: once_cell::sync::Lazy<Arc<Metrics>> =
    once_cell::sync::Lazy::new(|| Arc::new(Metrics::new()));

pub fn metrics() -> Arc<Metrics> {
    Arc::clone(&METRICS)
}

#[derive(Debug)]
pub struct Metrics {
    // === Operation Counters ===
    pub sets_total: Counter,
    pub dels_total: Counter,
    pub gets_total: Counter,

    // Where reads were answered
    pub memtable_hits: Counter,
    pub sstable_hits: Counter,
    pub misses: Counter,

    // Flushes
    pub flushes_total: Counter,
    pub flush_duration: Histogram,

    // Compactions
    pub compactions_total: Counter,
    pub compaction_keys_in: Counter,
    pub compaction_keys_out: Counter,
    pub compaction_duration: Histogram,

    // Bloom filter effectiveness
    pub bloom_skips: Counter,
    pub bloom_false_positives: Counter,

    // === Performance ===
    pub set_latency: Histogram,
    pub get_latency: Histogram,

    // === System State ===
    pub memtable_entries: Gauge,
    pub sstable_count: Gauge,
    pub registry_slots: Gauge,
    pub compaction_interval_us: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            sets_total: Counter::new(),
            dels_total: Counter::new(),
            gets_total: Counter::new(),

            memtable_hits: Counter::new(),
            sstable_hits: Counter::new(),
            misses: Counter::new(),

            flushes_total: Counter::new(),
            flush_duration: Histogram::new(),

            compactions_total: Counter::new(),
            compaction_keys_in: Counter::new(),
            compaction_keys_out: Counter::new(),
            compaction_duration: Histogram::new(),

            bloom_skips: Counter::new(),
            bloom_false_positives: Counter::new(),

            set_latency: Histogram::new(),
            get_latency: Histogram::new(),

            memtable_entries: Gauge::new(),
            sstable_count: Gauge::new(),
            registry_slots: Gauge::new(),
            compaction_interval_us: Gauge::new(),
        }
    }

    /// Share of reads answered without reporting a miss (0.0 to 1.0)
    pub fn read_hit_rate(&self) -> f64 {
        let hits = self.memtable_hits.get() + self.sstable_hits.get();
        let total = self.gets_total.get();
        if total == 0 {
            return 0.0;
        }
        hits as f64 / total as f64
    }

    /// Keys compaction dropped as duplicates (0.0 to 1.0)
    pub fn compaction_shrinkage(&self) -> f64 {
        let keys_in = self.compaction_keys_in.get();
        let keys_out = self.compaction_keys_out.get();
        if keys_in == 0 {
            return 0.0;
        }
        1.0 - (keys_out as f64 / keys_in as f64)
    }

    /// Format metrics for display
    pub fn summary(&self) -> String {
        format!(
            r#"Storage Engine Metrics
======================

Operations:
  Sets:        {:>12}
  Dels:        {:>12}
  Gets:        {:>12}  (memtable: {}, sstable: {}, misses: {})
  Flushes:     {:>12}
  Compactions: {:>12}

Read Performance:
  Hit Rate:    {:>11.2}%

Bloom Filter:
  Skips:       {:>12}
  False Pos:   {:>12}

Compaction:
  Keys In:     {:>12}
  Keys Out:    {:>12}
  Shrinkage:   {:>11.2}%

Latency (μs):
  Set p50:     {:>12.1}
  Set p99:     {:>12.1}
  Get p50:     {:>12.1}
  Get p99:     {:>12.1}
  Flush p50:   {:>12.1}
  Flush p99:   {:>12.1}

System State:
  MemTable:    {:>9} entries
  SSTables:    {:>12}
  Slots:       {:>12}
  Comp Clock:  {:>9} μs
"#,
            self.sets_total.get(),
            self.dels_total.get(),
            self.gets_total.get(),
            self.memtable_hits.get(),
            self.sstable_hits.get(),
            self.misses.get(),
            self.flushes_total.get(),
            self.compactions_total.get(),
            self.read_hit_rate() * 100.0,
            self.bloom_skips.get(),
            self.bloom_false_positives.get(),
            self.compaction_keys_in.get(),
            self.compaction_keys_out.get(),
            self.compaction_shrinkage() * 100.0,
            self.set_latency.percentile(0.5).as_micros() as f64,
            self.set_latency.percentile(0.99).as_micros() as f64,
            self.get_latency.percentile(0.5).as_micros() as f64,
            self.get_latency.percentile(0.99).as_micros() as f64,
            self.flush_duration.percentile(0.5).as_micros() as f64,
            self.flush_duration.percentile(0.99).as_micros() as f64,
            self.memtable_entries.get(),
            self.sstable_count.get(),
            self.registry_slots.get(),
            self.compaction_interval_us.get(),
        )
    }

    /// Reset all metrics (useful for testing)
    pub fn reset(&self) {
        self.sets_total.reset();
        self.dels_total.reset();
        self.gets_total.reset();
        self.memtable_hits.reset();
        self.sstable_hits.reset();
        self.misses.reset();
        self.flushes_total.reset();
        self.flush_duration.reset();
        self.compactions_total.reset();
        self.compaction_keys_in.reset();
        self.compaction_keys_out.reset();
        self.compaction_duration.reset();
        self.bloom_skips.reset();
        self.bloom_false_positives.reset();
        self.set_latency.reset();
        self.get_latency.reset();
        self.memtable_entries.set(0);
        self.sstable_count.set(0);
        self.registry_slots.set(0);
        self.compaction_interval_us.set(0);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Atomic counter (lock-free)
#[derive(Debug)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, delta: u64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.value.store(0, Ordering::Relaxed);
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

/// Gauge for tracking current state
#[derive(Debug)]
pub struct Gauge {
    value: AtomicU64,
}

impl Gauge {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn set(&self, value: u64) {
        self.value.store(value, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Default for Gauge {
    fn default() -> Self {
        Self::new()
    }
}

/// Histogram for latency tracking
#[derive(Debug)]
pub struct Histogram {
    samples: RwLock<Vec<Duration>>,
    max_samples: usize,
}

impl Histogram {
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    pub fn with_capacity(max_samples: usize) -> Self {
        Self {
            samples: RwLock::new(Vec::with_capacity(max_samples)),
            max_samples,
        }
    }

    /// Record a latency sample
    pub fn observe(&self, duration: Duration) {
        let mut samples = self.samples.write();

        // Reservoir sampling to bound memory
        if samples.len() < self.max_samples {
            samples.push(duration);
        } else {
            let idx = fastrand::usize(..samples.len());
            samples[idx] = duration;
        }
    }

    /// Get percentile (0.0 to 1.0)
    pub fn percentile(&self, p: f64) -> Duration {
        let samples = self.samples.read();

        if samples.is_empty() {
            return Duration::ZERO;
        }

        let mut sorted: Vec<Duration> = samples.clone();
        sorted.sort();

        let idx = ((sorted.len() - 1) as f64 * p) as usize;
        sorted[idx]
    }

    pub fn count(&self) -> usize {
        self.samples.read().len()
    }

    pub fn reset(&self) {
        self.samples.write().clear();
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}
