//! Background compaction
//!
//! Keeps the registry's slot count bounded and collapses duplicate keys
//! between generations.
//!
//! # Algorithm: two-way tail merge
//!
//! 1. Sleep for the compactor clock interval
//! 2. Above the trigger, inspect the two tail slots under the lock
//! 3. Tidy Empty slots in place, or capture both live tables' folders
//! 4. Read and merge the two sorted runs outside the lock, newer side
//!    winning on key ties; tombstones are carried through unchanged
//! 5. Publish under the lock: the merged table takes the older slot (and
//!    its folder name), the newer slot goes Empty
//!
//! The clock stretches ×10 on every write and shrinks ÷10 on every read
//! that reaches the SSTables, so compaction backs off under write load
//! and speeds up when reads start paying for a long registry.

use crate::config::{MAX_COMP_INTERVAL_US, MIN_COMP_INTERVAL_US};
use crate::metrics::metrics;
use crate::registry::{CompactionPlan, SsTableRegistry};
use crate::sstable::reader::read_all_records;
use crate::{Key, Result, Value};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Adaptive sleep interval for the compactor loop. Updated by the engine
/// on every operation; a hint, so all accesses are relaxed.
pub struct CompactionClock {
    micros: AtomicU64,
    min_micros: u64,
    max_micros: u64,
}

impl CompactionClock {
    pub fn new(min: Duration, max: Duration) -> Self {
        let max_micros = max.as_micros() as u64;
        CompactionClock {
            micros: AtomicU64::new(max_micros),
            min_micros: min.as_micros() as u64,
            max_micros,
        }
    }

    /// A write happened: back off ×10, up to the ceiling.
    pub fn on_write(&self) {
        let current = self.micros.load(AtomicOrdering::Relaxed);
        if current < self.max_micros {
            self.micros
                .store((current * 10).min(self.max_micros), AtomicOrdering::Relaxed);
        }
    }

    /// A read consulted the SSTables: speed up ÷10, down to the floor.
    pub fn on_table_read(&self) {
        let current = self.micros.load(AtomicOrdering::Relaxed);
        if current > self.min_micros {
            self.micros
                .store((current / 10).max(self.min_micros), AtomicOrdering::Relaxed);
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_micros(self.micros.load(AtomicOrdering::Relaxed))
    }
}

impl Default for CompactionClock {
    fn default() -> Self {
        Self::new(
            Duration::from_micros(MIN_COMP_INTERVAL_US),
            Duration::from_micros(MAX_COMP_INTERVAL_US),
        )
    }
}

#[derive(Debug, Clone)]
pub struct CompactionStats {
    pub keys_in: usize,
    pub keys_out: usize,
    pub duplicates_dropped: usize,
    pub duration: Duration,
}

/// Merge two ascending runs into one, preferring `newer` on key ties.
/// The preference is fixed by parameter, not by argument order.
pub fn merge_sorted_pairs(newer: &[(Key, Value)], older: &[(Key, Value)]) -> Vec<(Key, Value)> {
    let mut merged = Vec::with_capacity(newer.len() + older.len());
    let mut i = 0;
    let mut j = 0;

    while i < newer.len() && j < older.len() {
        match newer[i].0.cmp(&older[j].0) {
            Ordering::Less => {
                merged.push(newer[i].clone());
                i += 1;
            }
            Ordering::Greater => {
                merged.push(older[j].clone());
                j += 1;
            }
            Ordering::Equal => {
                merged.push(newer[i].clone());
                i += 1;
                j += 1;
            }
        }
    }
    merged.extend_from_slice(&newer[i..]);
    merged.extend_from_slice(&older[j..]);
    merged
}

/// One compactor iteration: plan under the lock, merge outside it,
/// publish under it. `Ok(None)` means there was nothing to merge.
pub fn run_compaction_cycle(
    registry: &SsTableRegistry,
    trigger: usize,
) -> Result<Option<CompactionStats>> {
    let job = match registry.plan_compaction(trigger) {
        CompactionPlan::Idle | CompactionPlan::Tidied => return Ok(None),
        CompactionPlan::Merge(job) => job,
    };

    let start = Instant::now();
    let newer = read_all_records(&job.newer_folder)?;
    let older = read_all_records(&job.older_folder)?;
    let merged = merge_sorted_pairs(&newer, &older);

    let stats = CompactionStats {
        keys_in: newer.len() + older.len(),
        keys_out: merged.len(),
        duplicates_dropped: newer.len() + older.len() - merged.len(),
        duration: start.elapsed(),
    };

    registry.publish_merged(&job, &merged)?;

    metrics().compactions_total.inc();
    metrics().compaction_keys_in.add(stats.keys_in as u64);
    metrics().compaction_keys_out.add(stats.keys_out as u64);
    metrics().compaction_duration.observe(stats.duration);
    metrics().sstable_count.set(registry.live_count() as u64);
    metrics().registry_slots.set(registry.len() as u64);

    println!(
        "🗜️  Compacted {} keys into {} ({} duplicates dropped, {:?})",
        stats.keys_in, stats.keys_out, stats.duplicates_dropped, stats.duration
    );

    Ok(Some(stats))
}

/// Owner of the background compactor thread. Dropping the handle signals
/// shutdown and joins the thread.
pub struct CompactorHandle {
    shutdown_tx: Sender<()>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Drop for CompactorHandle {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Spawn the compactor loop. The shutdown wait doubles as the clock
/// sleep: the thread wakes on timeout to run a cycle, and exits when the
/// handle signals or disappears.
pub fn spawn_compactor(
    registry: Arc<SsTableRegistry>,
    clock: Arc<CompactionClock>,
    trigger: usize,
) -> CompactorHandle {
    let (shutdown_tx, shutdown_rx) = bounded(1);
    let thread = thread::spawn(move || compactor_loop(registry, clock, trigger, shutdown_rx));
    CompactorHandle {
        shutdown_tx,
        thread: Some(thread),
    }
}

fn compactor_loop(
    registry: Arc<SsTableRegistry>,
    clock: Arc<CompactionClock>,
    trigger: usize,
    shutdown_rx: Receiver<()>,
) {
    loop {
        match shutdown_rx.recv_timeout(clock.interval()) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
        if let Err(e) = run_compaction_cycle(&registry, trigger) {
            eprintln!("compaction cycle failed: {}", e);
        }
    }
}
