//! Engine façade
//!
//! The process-wide coordinator behind SET/GET/DEL: writes go to the
//! memtable and spill into a new SSTable at the flush threshold; reads
//! check the memtable, then walk the registry newest-first; deletes are
//! tombstone writes. `start_compaction` brings up the background merger.
//!
//! Absence is not an error here: a GET whose key was never written, or
//! whose freshest record is a tombstone, returns the sentinel and lets
//! the wire layer speak "not found".

use crate::compaction::{spawn_compactor, CompactionClock, CompactorHandle};
use crate::config::{EngineConfig, DELIMITER, TOMBSTONE};
use crate::memtable::MemTable;
use crate::metrics::metrics;
use crate::registry::SsTableRegistry;
use crate::sstable::SsTable;
use crate::{Result, StorageError, Value};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

pub struct StorageEngine {
    memtable: Mutex<MemTable>,
    registry: Arc<SsTableRegistry>,
    clock: Arc<CompactionClock>,
    config: EngineConfig,
    compactor: Mutex<Option<CompactorHandle>>,
}

#[derive(Debug, serde::Serialize)]
pub struct EngineStats {
    pub memtable_entries: usize,
    pub live_sstables: usize,
    pub registry_slots: usize,
    pub compaction_interval_us: u128,
}

impl StorageEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let clock = CompactionClock::new(config.min_comp_interval, config.max_comp_interval);

        Ok(StorageEngine {
            memtable: Mutex::new(MemTable::new()),
            registry: Arc::new(SsTableRegistry::new()),
            clock: Arc::new(clock),
            config,
            compactor: Mutex::new(None),
        })
    }

    /// Insert or overwrite a key. Flushes the memtable into a fresh
    /// SSTable once it reaches the configured threshold.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        validate_value(value)?;

        let start = Instant::now();
        metrics().sets_total.inc();

        self.clock.on_write();
        metrics()
            .compaction_interval_us
            .set(self.clock.interval().as_micros() as u64);

        let mut memtable = self.memtable.lock();
        memtable.insert(key.to_string(), value.to_string());

        if memtable.len() >= self.config.memtable_max {
            self.flush(&mut memtable)?;
        }
        metrics().memtable_entries.set(memtable.len() as u64);
        drop(memtable);

        metrics().set_latency.observe(start.elapsed());
        Ok(())
    }

    /// Mark a key deleted by writing the tombstone sentinel over it.
    pub fn del(&self, key: &str) -> Result<()> {
        metrics().dels_total.inc();
        self.set(key, TOMBSTONE)
    }

    /// Current value for the key. Returns whatever the freshest record
    /// holds, tombstone included; a never-written key also reports the
    /// tombstone sentinel.
    pub fn get(&self, key: &str) -> Result<Value> {
        validate_key(key)?;

        let start = Instant::now();
        metrics().gets_total.inc();

        {
            let memtable = self.memtable.lock();
            if let Some(value) = memtable.get(key) {
                let value = value.clone();
                drop(memtable);
                metrics().memtable_hits.inc();
                metrics().get_latency.observe(start.elapsed());
                return Ok(value);
            }
        }

        self.clock.on_table_read();
        metrics()
            .compaction_interval_us
            .set(self.clock.interval().as_micros() as u64);

        let found = self.registry.lookup(key)?;
        metrics().get_latency.observe(start.elapsed());
        match found {
            Some(value) => {
                metrics().sstable_hits.inc();
                Ok(value)
            }
            None => {
                metrics().misses.inc();
                Ok(TOMBSTONE.to_string())
            }
        }
    }

    /// Spawn the background compactor. Non-blocking; a second call while
    /// the thread lives is a no-op.
    pub fn start_compaction(&self) {
        let mut compactor = self.compactor.lock();
        if compactor.is_none() {
            *compactor = Some(spawn_compactor(
                Arc::clone(&self.registry),
                Arc::clone(&self.clock),
                self.config.compact_trigger,
            ));
        }
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            memtable_entries: self.memtable.lock().len(),
            live_sstables: self.registry.live_count(),
            registry_slots: self.registry.len(),
            compaction_interval_us: self.clock.interval().as_micros(),
        }
    }

    /// Get formatted metrics summary
    pub fn metrics_summary(&self) -> String {
        metrics().summary()
    }

    /// Drain the memtable into a new tail SSTable and empty it. The
    /// folder name is indexed by the current registry length.
    fn flush(&self, memtable: &mut MemTable) -> Result<()> {
        let start = Instant::now();

        let pairs = memtable.sorted_pairs();

        // slot promotion during compaction can leave a live table owning
        // this index's folder; skip forward to a free name
        let mut index = self.registry.len();
        let mut folder = self.config.data_dir.join(format!("SSTable_{}", index));
        while folder.exists() {
            index += 1;
            folder = self.config.data_dir.join(format!("SSTable_{}", index));
        }

        let table = SsTable::create(folder, &pairs)?;
        self.registry.append(table);
        memtable.clear();

        metrics().flushes_total.inc();
        metrics().flush_duration.observe(start.elapsed());
        metrics().sstable_count.set(self.registry.live_count() as u64);
        metrics().registry_slots.set(self.registry.len() as u64);
        Ok(())
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key is empty".to_string()));
    }
    if key.as_bytes().contains(&DELIMITER) {
        return Err(StorageError::InvalidKey(format!(
            "key contains the reserved delimiter byte {:?}",
            DELIMITER as char
        )));
    }
    Ok(())
}

fn validate_value(value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(StorageError::InvalidValue("value is empty".to_string()));
    }
    if value.as_bytes().contains(&DELIMITER) {
        return Err(StorageError::InvalidValue(format!(
            "value contains the reserved delimiter byte {:?}",
            DELIMITER as char
        )));
    }
    Ok(())
}
