//! Consistent hashing for percentage rollout.
//!
//! The same `(user_id, flag_id)` pair always lands in the same bucket, so a
//! user's outcome stays stable across evaluations.
use sha2::{Digest, Sha256};

/// Buckets run from 0 to 100 inclusive.
pub const BUCKET_COUNT: u64 = 101;

pub trait Bucketer {
    fn bucket(&self, user_id: &str, flag_id: &str) -> u64;
}

/// The default (and only production) bucketer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Bucketer;

impl Bucketer for Sha256Bucketer {
    fn bucket(&self, user_id: &str, flag_id: &str) -> u64 {
        bucket(user_id, flag_id)
    }
}

/// SHA-256 of `"{user_id}:{flag_id}"`, first 8 bytes read big-endian, reduced mod 101.
pub fn bucket(user_id: &str, flag_id: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update(b":");
    hasher.update(flag_id.as_bytes());
    let digest = hasher.finalize();

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix) % BUCKET_COUNT
}

/// Inclusive comparison: a 0% rollout still admits bucket 0.
pub fn is_in_rollout(bucket: u64, percentage: i64) -> bool {
    i64::try_from(bucket).map_or(false, |bucket| bucket <= percentage)
}
