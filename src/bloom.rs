//! # Duplicate Detector
//!
//! Bloom filter over `name:location` identity strings, gating restaurant
//! creation.
//!
//! ## Implementation
//!
//! - Bit array lives in Redis as one plain bitmap key, so every process
//!   shares the same filter state
//! - Position derivation is pure: two seeded FNV-1a passes combined by
//!   double hashing, `k` positions per key
//! - Membership check reads the `k` bits in one pipelined round trip;
//!   recording sets them the same way
//! - Zero false negatives; the false-positive rate is fixed by capacity
//!   and epsilon at construction
//!
//! Check-then-record across two concurrent creates of the same identity is
//! a known race; deduplication here is best effort, not a uniqueness
//! guarantee.

use redis::{AsyncCommands, aio::ConnectionManager};

use crate::{error::Result, keys};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
const SECOND_HASH_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

#[derive(Debug, Clone, Copy)]
pub struct BloomParams {
    pub capacity: u64,
    pub error_rate: f64,
}

impl BloomParams {
    /// Bit count `m = -n * ln(eps) / (ln 2)^2`, rounded up.
    pub fn bits(&self) -> u64 {
        let ln2 = std::f64::consts::LN_2;
        ((-(self.capacity as f64) * self.error_rate.ln()) / (ln2 * ln2)).ceil() as u64
    }

    /// Hash count `k = (m / n) * ln 2`, rounded, at least one.
    pub fn hashes(&self) -> u32 {
        let ln2 = std::f64::consts::LN_2;
        let k = ((self.bits() as f64 / self.capacity as f64) * ln2).round() as u32;
        k.max(1)
    }
}

fn fnv1a(seed: u64, bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET ^ seed;
    for &byte in bytes {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// The `k` bit positions for a key. Double hashing: `h1 + i * h2 mod m`,
/// with `h2` forced odd so the step cycles the whole space.
pub fn bit_positions(key: &str, params: BloomParams) -> Vec<u64> {
    let bits = params.bits();
    let h1 = fnv1a(0, key.as_bytes());
    let h2 = fnv1a(SECOND_HASH_SEED, key.as_bytes()) | 1;

    (0..params.hashes() as u64)
        .map(|i| h1.wrapping_add(i.wrapping_mul(h2)) % bits)
        .collect()
}

pub struct DuplicateDetector {
    conn: ConnectionManager,
    params: BloomParams,
}

impl DuplicateDetector {
    pub fn new(conn: ConnectionManager, params: BloomParams) -> Self {
        Self { conn, params }
    }

    /// True when the key was possibly recorded before; false means
    /// definitely never recorded.
    pub async fn might_exist(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let filter = keys::duplicate_filter();

        let mut pipe = redis::pipe();
        for position in bit_positions(key, self.params) {
            pipe.getbit(&filter, position as usize);
        }

        let bits: Vec<bool> = pipe.query_async(&mut conn).await?;
        Ok(bits.into_iter().all(|bit| bit))
    }

    pub async fn record(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let filter = keys::duplicate_filter();

        let mut pipe = redis::pipe();
        for position in bit_positions(key, self.params) {
            pipe.setbit(&filter, position as usize, true).ignore();
        }

        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    /// Maintenance: drop every recorded bit. Capacity and epsilon are fixed
    /// at construction, so an empty bitmap is a fully reset filter.
    pub async fn reset(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(keys::duplicate_filter()).await?;
        Ok(())
    }
}
