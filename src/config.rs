//! Engine constants and runtime configuration
//!
//! The compile-time constants mirror the on-disk format and tuning
//! defaults; `EngineConfig` makes the thresholds overridable (mainly so
//! tests can flush and compact without writing thousands of keys), and
//! `ServerConfig` is the TOML file the `serve` command accepts.

use crate::{Result, StorageError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Byte separating key from value inside data chunks. Reserved: keys and
/// values must not contain it.
pub const DELIMITER: u8 = b'#';

/// Sentinel value marking a deleted key.
pub const TOMBSTONE: &str = "tombstone";

/// Distinct keys held in the memtable before a flush.
pub const MEMTABLE_MAX: usize = 1000;

/// Index entries per `.bin` index chunk.
pub const INDEX_PER_CHUNK: usize = 512;

/// Data chunk size ceiling; a record that would cross it starts a new chunk.
pub const MAX_CHUNK_BYTES: usize = 4096;

/// Registry slot count above which the compactor starts merging.
pub const COMPACT_TRIGGER: usize = 100;

/// Compactor sleep bounds, microseconds.
pub const MIN_COMP_INTERVAL_US: u64 = 1;
pub const MAX_COMP_INTERVAL_US: u64 = 100_000;

/// Bloom summary: bit array width and design capacity.
pub const BLOOM_BITS: usize = 100_000;
pub const BLOOM_CAPACITY: usize = 10_000;

/// Default client port, matching the wire protocol's ancestry.
pub const DEFAULT_PORT: u16 = 6379;

/// Tunable engine parameters. Defaults equal the constants above.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory under which SSTable folders are created.
    pub data_dir: PathBuf,

    /// Memtable flush threshold (distinct keys).
    pub memtable_max: usize,

    /// Registry slot count that arms the compactor.
    pub compact_trigger: usize,

    /// Compactor clock floor.
    pub min_comp_interval: Duration,

    /// Compactor clock ceiling (also the initial interval).
    pub max_comp_interval: Duration,
}

impl EngineConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            memtable_max: MEMTABLE_MAX,
            compact_trigger: COMPACT_TRIGGER,
            min_comp_interval: Duration::from_micros(MIN_COMP_INTERVAL_US),
            max_comp_interval: Duration::from_micros(MAX_COMP_INTERVAL_US),
        }
    }

    /// Builder-style: set the memtable flush threshold.
    pub fn with_memtable_max(mut self, memtable_max: usize) -> Self {
        self.memtable_max = memtable_max;
        self
    }

    /// Builder-style: set the compaction trigger.
    pub fn with_compact_trigger(mut self, compact_trigger: usize) -> Self {
        self.compact_trigger = compact_trigger;
        self
    }
}

/// Server settings loaded from a TOML file; CLI flags override these.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub memtable_max: usize,
    pub compact_trigger: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_dir: PathBuf::from("granary_data"),
            memtable_max: MEMTABLE_MAX,
            compact_trigger: COMPACT_TRIGGER,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            StorageError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Ok(toml::from_str(&text)?)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(&self.data_dir)
            .with_memtable_max(self.memtable_max)
            .with_compact_trigger(self.compact_trigger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 6379);
        assert_eq!(config.memtable_max, MEMTABLE_MAX);
        assert_eq!(config.compact_trigger, COMPACT_TRIGGER);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: ServerConfig = toml::from_str("port = 7000\n").unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.memtable_max, MEMTABLE_MAX);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let parsed: std::result::Result<ServerConfig, _> = toml::from_str("prot = 7000\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_engine_config_builder() {
        let config = EngineConfig::new("/tmp/db")
            .with_memtable_max(10)
            .with_compact_trigger(3);
        assert_eq!(config.memtable_max, 10);
        assert_eq!(config.compact_trigger, 3);
        assert_eq!(config.max_comp_interval, Duration::from_micros(100_000));
    }
}
