//! SSTable construction
//!
//! Lays a sorted run out as data chunks plus index chunks. Construction
//! is best-effort: a data chunk that cannot be written is logged and
//! skipped, and its records are left out of the index so lookups for
//! them report not-found instead of tripping the corruption path.

use crate::config::{INDEX_PER_CHUNK, MAX_CHUNK_BYTES};
use crate::sstable::format::{self, encode_record, INDEX_ENTRY_BYTES};
use crate::{Key, Result, Value};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Write `pairs` (ascending, deduplicated) under `folder`. Returns the
/// number of records that were written and indexed.
pub(crate) fn write_sorted_pairs(folder: &Path, pairs: &[(Key, Value)]) -> Result<usize> {
    fs::create_dir_all(folder)?;

    let chunks = plan_chunks(pairs);

    let mut entries: Vec<(u32, u32)> = Vec::with_capacity(pairs.len());
    for (chunk, records) in chunks.iter().enumerate() {
        let chunk = chunk as u32;
        match write_data_chunk(folder, chunk, records) {
            Ok(offsets) => entries.extend(offsets),
            Err(e) => eprintln!(
                "skipping unwritable chunk {} of {}: {}",
                chunk,
                folder.display(),
                e
            ),
        }
    }

    write_index_chunks(folder, &entries)?;
    Ok(entries.len())
}

/// Group encoded records into chunks; a record that would push the chunk
/// past MAX_CHUNK_BYTES starts the next one. Records never span chunks.
fn plan_chunks(pairs: &[(Key, Value)]) -> Vec<Vec<String>> {
    let mut chunks: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_bytes = 0usize;

    for (key, value) in pairs {
        let record = encode_record(key, value);
        if current_bytes + record.len() > MAX_CHUNK_BYTES && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_bytes = 0;
        }
        current_bytes += record.len();
        current.push(record);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn write_data_chunk(folder: &Path, chunk: u32, records: &[String]) -> Result<Vec<(u32, u32)>> {
    let mut file = File::create(format::data_chunk_path(folder, chunk))?;
    let mut offsets = Vec::with_capacity(records.len());
    let mut position = 0u32;

    for record in records {
        file.write_all(record.as_bytes())?;
        offsets.push((chunk, position));
        position += record.len() as u32;
    }
    file.flush()?;
    Ok(offsets)
}

fn write_index_chunks(folder: &Path, entries: &[(u32, u32)]) -> Result<()> {
    for (chunk, group) in entries.chunks(INDEX_PER_CHUNK).enumerate() {
        let mut buf = Vec::with_capacity(group.len() * INDEX_ENTRY_BYTES);
        for &(data_chunk, offset) in group {
            buf.extend_from_slice(&format::encode_index_entry(data_chunk, offset));
        }
        fs::write(format::index_chunk_path(folder, chunk as u32), &buf)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pairs(n: usize) -> Vec<(Key, Value)> {
        (0..n)
            .map(|i| (format!("key{:05}", i), format!("value{:05}", i)))
            .collect()
    }

    #[test]
    fn test_small_run_is_one_chunk_each() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("table");

        let written = write_sorted_pairs(&folder, &pairs(10)).unwrap();
        assert_eq!(written, 10);
        assert!(folder.join("0.txt").exists());
        assert!(folder.join("0.bin").exists());
        assert!(!folder.join("1.txt").exists());

        let index = fs::read(folder.join("0.bin")).unwrap();
        assert_eq!(index.len(), 10 * INDEX_ENTRY_BYTES);
    }

    #[test]
    fn test_data_chunks_roll_over_at_size_limit() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("table");

        // each record is 20 bytes; 1000 of them need several 4096-byte chunks
        write_sorted_pairs(&folder, &pairs(1000)).unwrap();

        assert!(folder.join("1.txt").exists());
        for chunk in 0u32.. {
            let path = format::data_chunk_path(&folder, chunk);
            if !path.exists() {
                assert!(chunk >= 2);
                break;
            }
            assert!(fs::metadata(&path).unwrap().len() <= MAX_CHUNK_BYTES as u64);
        }
    }

    #[test]
    fn test_index_chunks_roll_over_at_fanout() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("table");

        write_sorted_pairs(&folder, &pairs(INDEX_PER_CHUNK + 5)).unwrap();

        let first = fs::read(folder.join("0.bin")).unwrap();
        let second = fs::read(folder.join("1.bin")).unwrap();
        assert_eq!(first.len(), INDEX_PER_CHUNK * INDEX_ENTRY_BYTES);
        assert_eq!(second.len(), 5 * INDEX_ENTRY_BYTES);
    }

    #[test]
    fn test_oversized_record_gets_its_own_chunk() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("table");

        let big = "v".repeat(MAX_CHUNK_BYTES);
        let run = vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), big),
            ("c".to_string(), "3".to_string()),
        ];
        let written = write_sorted_pairs(&folder, &run).unwrap();

        assert_eq!(written, 3);
        assert!(folder.join("2.txt").exists());
    }
}
