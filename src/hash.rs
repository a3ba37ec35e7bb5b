// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// Maps a user key to one of its candidate buckets
///
/// Builder and reader of a table must use bit-identical hash functions,
/// otherwise the table is unreadable.
///
/// The result is reduced modulo `bucket_count` by the table, so
/// implementations may return any `u64`.
///
/// Any `Fn(&[u8], u32, u64) -> u64` closure is a hash function:
///
/// ```
/// # use cuckoo_table::HashFunction;
/// let hash_fn = |key: &[u8], probe: u32, bucket_count: u64| {
///     (key.len() as u64 + u64::from(probe)) % bucket_count
/// };
/// assert_eq!(2, hash_fn.hash(b"ab", 0, 10));
/// ```
pub trait HashFunction {
    /// Returns the bucket index of `key` for the given probe.
    fn hash(&self, key: &[u8], probe: u32, bucket_count: u64) -> u64;
}

impl<F: Fn(&[u8], u32, u64) -> u64> HashFunction for F {
    fn hash(&self, key: &[u8], probe: u32, bucket_count: u64) -> u64 {
        self(key, probe, bucket_count)
    }
}

/// Default hash function: XXH3 seeded with the probe index
#[derive(Copy, Clone, Debug, Default)]
pub struct Xxh3Hash;

impl HashFunction for Xxh3Hash {
    fn hash(&self, key: &[u8], probe: u32, bucket_count: u64) -> u64 {
        let seed = 0x51_7c_c1_b7_27_22_0a_95_u64.wrapping_mul(u64::from(probe) + 1);
        xxhash_rust::xxh3::xxh3_64_with_seed(key, seed) % bucket_count.max(1)
    }
}

/// Computes the bucket of `key` for `probe`, always within `0..bucket_count`.
pub(crate) fn bucket_of<H: HashFunction + ?Sized>(
    hash_fn: &H,
    key: &[u8],
    probe: u32,
    bucket_count: u64,
) -> u64 {
    debug_assert!(bucket_count > 0);
    hash_fn.hash(key, probe, bucket_count) % bucket_count
}
