//! Probabilistic membership summary for SSTable lookups
//!
//! A fixed-width bloom filter: `exists` never lies about inserted keys
//! and false-positives at a bounded rate for everything else, so a
//! negative answer skips the on-disk binary search entirely.

use crate::config::{BLOOM_BITS, BLOOM_CAPACITY};
use xxhash_rust::xxh3::xxh3_64;

/// Per-mapping multipliers; the table must stay at least as long as the
/// hash-function count derived in `new`.
const MULTIPLIERS: [u64; 30] = [
    773, 311, 563, 647, 13, 839, 317, 673, 109, 503, 467, 827, 293, 283, 601, 61, 7, 857, 521,
    419, 809, 307, 503, 419, 367, 521, 193, 179, 113, 811,
];

pub struct BloomFilter {
    bits: Vec<u64>,
    num_bits: usize,
    num_hashes: usize,
}

impl BloomFilter {
    pub fn new() -> Self {
        Self::with_shape(BLOOM_BITS, BLOOM_CAPACITY)
    }

    /// Width `num_bits` and design capacity `max_items` fix the mapping
    /// count at ⌈(m/n)·ln 2⌉.
    pub fn with_shape(num_bits: usize, max_items: usize) -> Self {
        let num_hashes = ((num_bits as f64 / max_items as f64) * 2.0f64.ln()).ceil() as usize;
        let num_hashes = num_hashes.clamp(1, MULTIPLIERS.len());
        BloomFilter {
            bits: vec![0u64; (num_bits + 63) / 64],
            num_bits,
            num_hashes,
        }
    }

    /// Record a key. Idempotent.
    pub fn insert(&mut self, key: &str) {
        for i in 0..self.num_hashes {
            let pos = self.position(key, i);
            self.bits[pos / 64] |= 1 << (pos % 64);
        }
    }

    /// False means the key was never inserted; true means it probably was.
    pub fn exists(&self, key: &str) -> bool {
        (0..self.num_hashes).all(|i| {
            let pos = self.position(key, i);
            (self.bits[pos / 64] >> (pos % 64)) & 1 == 1
        })
    }

    /// i-th mapping: hash the key suffixed with the mapping index, spread
    /// by the i-th multiplier, reduce into the bit array.
    fn position(&self, key: &str, i: usize) -> usize {
        let seeded = format!("{}{}", key, i);
        let hashed = xxh3_64(seeded.as_bytes())
            .wrapping_mul(MULTIPLIERS[i])
            .wrapping_add(i as u64);
        (hashed % self.num_bits as u64) as usize
    }
}

impl Default for BloomFilter {
    fn default() -> Self {
        Self::new()
    }
}
