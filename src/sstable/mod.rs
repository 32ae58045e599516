//! SSTable (Sorted String Table)
//!
//! An immutable on-disk run of key-value records: a folder of text data
//! chunks and binary index chunks plus an in-memory bloom summary. Built
//! once from a sorted sequence, answers point lookups by bloom-gated
//! binary search over the index, and removes its folder when dropped.

pub mod bloom;
pub mod format;
pub(crate) mod reader;
pub(crate) mod writer;

pub use bloom::BloomFilter;

use crate::metrics::metrics;
use crate::{Key, Result, Value};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

pub struct SsTable {
    folder: PathBuf,
    bloom: BloomFilter,
    num_keys: usize,
}

impl SsTable {
    /// Materialize a sorted, deduplicated run as a table under `folder`.
    pub fn create(folder: PathBuf, pairs: &[(Key, Value)]) -> Result<Self> {
        let num_keys = writer::write_sorted_pairs(&folder, pairs)?;

        let mut bloom = BloomFilter::new();
        for (key, _) in pairs {
            bloom.insert(key);
        }

        Ok(SsTable {
            folder,
            bloom,
            num_keys,
        })
    }

    /// Point lookup. `Ok(None)` means the key is not in this table; the
    /// value may be the tombstone sentinel, which callers interpret.
    pub fn find(&self, key: &str) -> Result<Option<Value>> {
        if self.num_keys == 0 || !self.bloom.exists(key) {
            metrics().bloom_skips.inc();
            return Ok(None);
        }

        let mut lo = 0usize;
        let mut hi = self.num_keys - 1;
        while lo <= hi {
            let mid = (lo + hi) / 2;
            let (chunk, offset) = reader::read_index_entry(&self.folder, mid)?;
            let (mid_key, mid_value) = reader::read_record_at(&self.folder, chunk, offset)?;

            match key.cmp(mid_key.as_str()) {
                Ordering::Equal => return Ok(Some(mid_value)),
                Ordering::Greater => lo = mid + 1,
                Ordering::Less => {
                    if mid == 0 {
                        break;
                    }
                    hi = mid - 1;
                }
            }
        }

        metrics().bloom_false_positives.inc();
        Ok(None)
    }

    pub fn num_keys(&self) -> usize {
        self.num_keys
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Full sorted contents, read back from disk.
    pub fn load_all(&self) -> Result<Vec<(Key, Value)>> {
        reader::read_all_records(&self.folder)
    }
}

impl Drop for SsTable {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.folder) {
            if e.kind() != std::io::ErrorKind::NotFound {
                eprintln!(
                    "failed to remove SSTable folder {}: {}",
                    self.folder.display(),
                    e
                );
            }
        }
    }
}
