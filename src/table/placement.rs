// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Cuckoo placement of entries into buckets
//!
//! Every entry has `k` candidate buckets, one per hash function.
//! An entry is put into its first free candidate. If all candidates are taken,
//! a breadth-first search over the cuckoo graph looks for the shortest chain of
//! evictions that ends in a free bucket. If no chain within `max_search_depth`
//! exists, the whole placement is restarted with `k + 1` hash functions.

use super::bucket::EntryBuffer;
use crate::{hash::bucket_of, BuildOptions, HashFunction};

/// Marks a free bucket
pub const EMPTY_BUCKET: usize = usize::MAX;

const NO_PARENT: usize = usize::MAX;

/// Final assignment of entries to buckets
#[derive(Debug)]
pub struct Placement {
    /// Entry index per bucket, [`EMPTY_BUCKET`] for free buckets
    pub buckets: Vec<usize>,

    /// Number of hash functions needed
    pub num_hash_functions: u32,
}

/// Runs placement with escalating hash function counts.
///
/// Returns `None` if no placement could be found with up to
/// `max_num_hash_functions` hash functions.
pub fn place<H: HashFunction + ?Sized>(
    entries: &EntryBuffer,
    bucket_count: usize,
    opts: &BuildOptions,
    hash_fn: &H,
) -> Option<Placement> {
    for k in opts.initial_num_hash_functions()..=opts.max_num_hash_functions {
        let mut attempt = Attempt::new(entries, bucket_count, k, opts.max_search_depth, hash_fn);

        if attempt.run() {
            log::trace!(
                "Placed {} entries into {bucket_count} buckets using {k} hash functions",
                entries.len(),
            );

            return Some(Placement {
                buckets: attempt.buckets,
                num_hash_functions: k,
            });
        }

        log::trace!("Placement with {k} hash functions failed, escalating");
    }

    None
}

/// Node of the eviction search tree
#[derive(Copy, Clone, Debug)]
struct Node {
    bucket: usize,
    depth: u32,
    parent: usize,
}

/// One placement attempt with a fixed number of hash functions
struct Attempt<'a, H: HashFunction + ?Sized> {
    entries: &'a EntryBuffer,
    hash_fn: &'a H,
    num_hash_functions: u32,
    max_search_depth: u32,

    buckets: Vec<usize>,

    /// Search queue, never holds more nodes than there are buckets
    queue: Vec<Node>,

    /// Per bucket stamp of the last search that visited it
    visited: Vec<u32>,
    stamp: u32,
}

impl<'a, H: HashFunction + ?Sized> Attempt<'a, H> {
    fn new(
        entries: &'a EntryBuffer,
        bucket_count: usize,
        num_hash_functions: u32,
        max_search_depth: u32,
        hash_fn: &'a H,
    ) -> Self {
        Self {
            entries,
            hash_fn,
            num_hash_functions,
            max_search_depth,
            buckets: vec![EMPTY_BUCKET; bucket_count],
            queue: Vec::with_capacity(bucket_count),
            visited: vec![0; bucket_count],
            stamp: 0,
        }
    }

    fn candidate(&self, entry: usize, probe: u32) -> usize {
        let bucket_count = self.buckets.len() as u64;

        let bucket = bucket_of(self.hash_fn, self.entries.user_key(entry), probe, bucket_count);

        // NOTE: bucket < bucket_count, which came from a usize
        usize::try_from(bucket).unwrap_or(EMPTY_BUCKET)
    }

    fn is_free(&self, bucket: usize) -> bool {
        self.buckets.get(bucket).copied() == Some(EMPTY_BUCKET)
    }

    fn run(&mut self) -> bool {
        for entry in 0..self.entries.len() {
            if !self.insert(entry) {
                return false;
            }
        }
        true
    }

    fn insert(&mut self, entry: usize) -> bool {
        for probe in 0..self.num_hash_functions {
            let bucket = self.candidate(entry, probe);

            if let Some(slot) = self.buckets.get_mut(bucket) {
                if *slot == EMPTY_BUCKET {
                    *slot = entry;
                    return true;
                }
            }
        }

        self.make_room(entry)
    }

    fn next_stamp(&mut self) {
        if self.stamp == u32::MAX {
            self.visited.fill(0);
            self.stamp = 0;
        }
        self.stamp += 1;
    }

    /// Marks a bucket as visited, returns `false` if it already was.
    fn visit(&mut self, bucket: usize) -> bool {
        match self.visited.get_mut(bucket) {
            Some(stamp) if *stamp != self.stamp => {
                *stamp = self.stamp;
                true
            }
            _ => false,
        }
    }

    /// Searches for the shortest eviction chain that frees one of
    /// `entry`'s candidates, and commits it.
    fn make_room(&mut self, entry: usize) -> bool {
        self.next_stamp();
        self.queue.clear();

        for probe in 0..self.num_hash_functions {
            let bucket = self.candidate(entry, probe);

            if self.visit(bucket) {
                self.queue.push(Node {
                    bucket,
                    depth: 0,
                    parent: NO_PARENT,
                });
            }
        }

        let mut head = 0;

        while let Some(node) = self.queue.get(head).copied() {
            if node.depth < self.max_search_depth {
                let Some(&occupant) = self.buckets.get(node.bucket) else {
                    return false;
                };

                for probe in 0..self.num_hash_functions {
                    let alt = self.candidate(occupant, probe);

                    if !self.visit(alt) {
                        continue;
                    }

                    if self.is_free(alt) {
                        self.commit(head, alt, entry);
                        return true;
                    }

                    self.queue.push(Node {
                        bucket: alt,
                        depth: node.depth + 1,
                        parent: head,
                    });
                }
            }

            head += 1;
        }

        false
    }

    /// Shifts every occupant on the path ending at `queue[tail]` one step
    /// towards the free bucket, then puts `entry` into the root bucket.
    fn commit(&mut self, tail: usize, free: usize, entry: usize) {
        let mut target = free;
        let mut cursor = tail;

        while let Some(node) = self.queue.get(cursor).copied() {
            let occupant = self.buckets.get(node.bucket).copied().unwrap_or(EMPTY_BUCKET);

            if let Some(slot) = self.buckets.get_mut(target) {
                *slot = occupant;
            }

            target = node.bucket;
            cursor = node.parent;
        }

        if let Some(slot) = self.buckets.get_mut(target) {
            *slot = entry;
        }
    }
}
