// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::bucket::EntryBuffer;
use crate::HashSet;

/// Encodes `n` big-endian into the tail of a zeroed buffer of `width` bytes.
///
/// Returns `None` if `n` does not fit into `width` bytes.
fn encode_candidate(n: u64, width: usize) -> Option<Vec<u8>> {
    let needed = std::mem::size_of::<u64>() - (n.leading_zeros() / 8) as usize;

    if needed > width {
        return None;
    }

    let mut candidate = vec![0; width];

    #[expect(clippy::indexing_slicing, reason = "needed <= width and needed <= 8")]
    candidate[(width - needed)..].copy_from_slice(&n.to_be_bytes()[(8 - needed)..]);

    Some(candidate)
}

/// Picks the key that marks empty buckets.
///
/// Tries `0, 1, 2, ...` (encoded into the bucket key width) and returns the
/// first one that is not the bucket key of any entry. By the pigeonhole
/// principle, at most `entry_count + 1` candidates are needed.
///
/// Returns `None` if the bucket key is too narrow to hold a free candidate.
pub fn select_empty_key(entries: &EntryBuffer) -> Option<Vec<u8>> {
    let width = entries.layout().key_len;

    let mut taken: HashSet<&[u8]> = HashSet::default();
    taken.reserve(entries.len());

    for idx in 0..entries.len() {
        taken.insert(entries.bucket_key(idx));
    }

    (0..=entries.len() as u64)
        .map_while(|n| encode_candidate(n, width))
        .find(|candidate| !taken.contains(candidate.as_slice()))
}
