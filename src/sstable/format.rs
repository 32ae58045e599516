//! On-disk record and index formats
//!
//! Data chunks (`N.txt`) hold `key#value#` records back to back in key
//! order. Index chunks (`N.bin`) hold fixed 8-byte entries, two
//! little-endian u32s per record: the data chunk index and the byte
//! offset of the record inside it. Both families share the integer
//! filename space and stay apart by extension.

use crate::config::DELIMITER;
use crate::{Key, Result, StorageError, Value};
use bytes::{Buf, BufMut};
use std::path::{Path, PathBuf};

/// Bytes per index entry: chunk id + offset.
pub const INDEX_ENTRY_BYTES: usize = 8;

pub fn data_chunk_path(folder: &Path, chunk: u32) -> PathBuf {
    folder.join(format!("{}.txt", chunk))
}

pub fn index_chunk_path(folder: &Path, chunk: u32) -> PathBuf {
    folder.join(format!("{}.bin", chunk))
}

/// `key#value#`
pub fn encode_record(key: &str, value: &str) -> String {
    let delimiter = DELIMITER as char;
    format!("{}{}{}{}", key, delimiter, value, delimiter)
}

/// Inverse of `encode_record`; the input must carry both delimiters.
pub fn decode_record(record: &str) -> Result<(Key, Value)> {
    let delimiter = DELIMITER as char;
    let body = record
        .strip_suffix(delimiter)
        .ok_or_else(|| StorageError::Corruption(format!("record missing trailing delimiter: {:?}", record)))?;
    match body.split_once(delimiter) {
        Some((key, value)) => Ok((key.to_string(), value.to_string())),
        None => Err(StorageError::Corruption(format!(
            "record missing key/value delimiter: {:?}",
            record
        ))),
    }
}

pub fn encode_index_entry(chunk: u32, offset: u32) -> [u8; INDEX_ENTRY_BYTES] {
    let mut buf = [0u8; INDEX_ENTRY_BYTES];
    {
        let mut cursor = &mut buf[..];
        cursor.put_u32_le(chunk);
        cursor.put_u32_le(offset);
    }
    buf
}

pub fn decode_index_entry(mut buf: &[u8]) -> Result<(u32, u32)> {
    if buf.len() < INDEX_ENTRY_BYTES {
        return Err(StorageError::Corruption(format!(
            "short index entry: {} bytes",
            buf.len()
        )));
    }
    let chunk = buf.get_u32_le();
    let offset = buf.get_u32_le();
    Ok((chunk, offset))
}
