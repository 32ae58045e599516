//! SSTable probe and scan paths
//!
//! The probe path serves `find`: one index entry seek plus one record
//! read per binary-search step. The scan path feeds compaction: stream
//! every data chunk in filename order and split it back into records.
//! Anything malformed on disk is a corruption error; callers treat it as
//! fatal rather than answer from damaged data.

use crate::config::{DELIMITER, INDEX_PER_CHUNK};
use crate::sstable::format::{self, INDEX_ENTRY_BYTES};
use crate::{Key, Result, StorageError, Value};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Fetch the `position`-th entry of the virtual index.
pub(crate) fn read_index_entry(folder: &Path, position: usize) -> Result<(u32, u32)> {
    let chunk = (position / INDEX_PER_CHUNK) as u32;
    let path = format::index_chunk_path(folder, chunk);
    let mut file = File::open(&path).map_err(|e| {
        StorageError::Corruption(format!("cannot open index chunk {}: {}", path.display(), e))
    })?;

    let offset = (position % INDEX_PER_CHUNK) * INDEX_ENTRY_BYTES;
    file.seek(SeekFrom::Start(offset as u64))?;

    let mut buf = [0u8; INDEX_ENTRY_BYTES];
    file.read_exact(&mut buf).map_err(|e| {
        StorageError::Corruption(format!(
            "short read of index entry {} in {}: {}",
            position,
            path.display(),
            e
        ))
    })?;
    format::decode_index_entry(&buf)
}

/// Read the record starting at `offset` in data chunk `chunk`: everything
/// up to and including the second delimiter.
pub(crate) fn read_record_at(folder: &Path, chunk: u32, offset: u32) -> Result<(Key, Value)> {
    let path = format::data_chunk_path(folder, chunk);
    let file = File::open(&path).map_err(|e| {
        StorageError::Corruption(format!("cannot open data chunk {}: {}", path.display(), e))
    })?;

    let mut reader = BufReader::new(file);
    reader.seek(SeekFrom::Start(offset as u64))?;

    let mut raw = Vec::new();
    for _ in 0..2 {
        let n = reader.read_until(DELIMITER, &mut raw)?;
        if n == 0 || raw.last() != Some(&DELIMITER) {
            return Err(StorageError::Corruption(format!(
                "record at {}:{} ends before its second delimiter",
                path.display(),
                offset
            )));
        }
    }

    let text = String::from_utf8(raw).map_err(|_| {
        StorageError::Corruption(format!(
            "record at {}:{} is not valid UTF-8",
            path.display(),
            offset
        ))
    })?;
    format::decode_record(&text)
}

/// Every record of the table, ascending, by scanning the data chunks in
/// order. Used by compaction, which wants the whole run anyway.
pub(crate) fn read_all_records(folder: &Path) -> Result<Vec<(Key, Value)>> {
    let mut records = Vec::new();

    for chunk in 0u32.. {
        let path = format::data_chunk_path(folder, chunk);
        if !path.exists() {
            break;
        }
        let text = fs::read_to_string(&path)?;
        let tokens: Vec<&str> = text
            .split(DELIMITER as char)
            .filter(|token| !token.is_empty())
            .collect();
        if tokens.len() % 2 != 0 {
            return Err(StorageError::Corruption(format!(
                "unpaired record tokens in {}",
                path.display()
            )));
        }
        for pair in tokens.chunks(2) {
            records.push((pair[0].to_string(), pair[1].to_string()));
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sstable::writer::write_sorted_pairs;
    use tempfile::TempDir;

    fn build(folder: &Path, n: usize) -> usize {
        let pairs: Vec<(Key, Value)> = (0..n)
            .map(|i| (format!("key{:05}", i), format!("value{:05}", i)))
            .collect();
        write_sorted_pairs(folder, &pairs).unwrap()
    }

    #[test]
    fn test_index_probe_matches_written_record() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("table");
        let written = build(&folder, 700);
        assert_eq!(written, 700);

        for position in [0, 1, 511, 512, 699] {
            let (chunk, offset) = read_index_entry(&folder, position).unwrap();
            let (key, value) = read_record_at(&folder, chunk, offset).unwrap();
            assert_eq!(key, format!("key{:05}", position));
            assert_eq!(value, format!("value{:05}", position));
        }
    }

    #[test]
    fn test_probe_past_end_is_corruption() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("table");
        build(&folder, 10);

        assert!(matches!(
            read_index_entry(&folder, 10),
            Err(StorageError::Corruption(_))
        ));
    }

    #[test]
    fn test_truncated_record_is_corruption() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("table");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("0.txt"), b"key#val").unwrap();

        assert!(matches!(
            read_record_at(&folder, 0, 0),
            Err(StorageError::Corruption(_))
        ));
    }

    #[test]
    fn test_scan_returns_all_records_in_order() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("table");
        build(&folder, 600);

        let records = read_all_records(&folder).unwrap();
        assert_eq!(records.len(), 600);
        for (i, (key, value)) in records.iter().enumerate() {
            assert_eq!(key, &format!("key{:05}", i));
            assert_eq!(value, &format!("value{:05}", i));
        }
    }

    #[test]
    fn test_scan_rejects_unpaired_tokens() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("table");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("0.txt"), b"a#1#b#").unwrap();

        assert!(matches!(
            read_all_records(&folder),
            Err(StorageError::Corruption(_))
        ));
    }
}
