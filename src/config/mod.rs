// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// Default target occupancy of the bucket array
pub const DEFAULT_HASH_TABLE_RATIO: f64 = 0.9;

/// Default ceiling for the number of hash functions
pub const DEFAULT_MAX_NUM_HASH_FUNCTIONS: u32 = 64;

/// Default number of hash functions the placement starts with
pub const DEFAULT_MIN_NUM_HASH_FUNCTIONS: u32 = 2;

/// Default ceiling for the length of an eviction path
pub const DEFAULT_MAX_SEARCH_DEPTH: u32 = 100;

/// Cuckoo table build options
///
/// ```
/// # use cuckoo_table::BuildOptions;
/// let opts = BuildOptions::default()
///     .hash_table_ratio(0.75)
///     .max_num_hash_functions(8)
///     .last_level_file(true);
///
/// assert!(opts.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct BuildOptions {
    /// Target occupancy, `entry_count / bucket_count`
    pub hash_table_ratio: f64,

    /// Highest number of hash functions before the build is given up
    pub max_num_hash_functions: u32,

    /// Number of hash functions the first placement attempt uses
    pub min_num_hash_functions: u32,

    /// Maximum length of an eviction path
    pub max_search_depth: u32,

    /// Bucket count is rounded up to a multiple of this
    pub cuckoo_block_size: u32,

    /// If `true`, buckets only store user keys
    ///
    /// Only valid for tables in the last level of an LSM-tree, where no older
    /// versions can be shadowed anymore.
    pub is_last_level_file: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            hash_table_ratio: DEFAULT_HASH_TABLE_RATIO,
            max_num_hash_functions: DEFAULT_MAX_NUM_HASH_FUNCTIONS,
            min_num_hash_functions: DEFAULT_MIN_NUM_HASH_FUNCTIONS,
            max_search_depth: DEFAULT_MAX_SEARCH_DEPTH,
            cuckoo_block_size: 1,
            is_last_level_file: false,
        }
    }
}

impl BuildOptions {
    /// Sets the target occupancy of the bucket array.
    ///
    /// Lower ratios make placement easier, at the cost of file size.
    ///
    /// Default = 0.9
    #[must_use]
    pub fn hash_table_ratio(mut self, ratio: f64) -> Self {
        self.hash_table_ratio = ratio;
        self
    }

    /// Sets the highest number of hash functions placement may escalate to.
    ///
    /// Default = 64
    #[must_use]
    pub fn max_num_hash_functions(mut self, n: u32) -> Self {
        self.max_num_hash_functions = n;
        self
    }

    /// Sets the number of hash functions placement starts with.
    ///
    /// Default = 2
    #[must_use]
    pub fn min_num_hash_functions(mut self, n: u32) -> Self {
        self.min_num_hash_functions = n;
        self
    }

    /// Sets the maximum eviction path length.
    ///
    /// Default = 100
    #[must_use]
    pub fn max_search_depth(mut self, depth: u32) -> Self {
        self.max_search_depth = depth;
        self
    }

    /// Sets the bucket count alignment.
    ///
    /// Default = 1
    #[must_use]
    pub fn cuckoo_block_size(mut self, size: u32) -> Self {
        self.cuckoo_block_size = size;
        self
    }

    /// Marks the table as belonging to the last level.
    ///
    /// Default = false
    #[must_use]
    pub fn last_level_file(mut self, b: bool) -> Self {
        self.is_last_level_file = b;
        self
    }

    /// Checks the options for values that can not be used.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidArgument`] on malformed options.
    pub fn validate(&self) -> crate::Result<()> {
        if !(self.hash_table_ratio > 0.0 && self.hash_table_ratio <= 1.0) {
            return Err(crate::Error::InvalidArgument(
                "hash_table_ratio must be in (0.0, 1.0]",
            ));
        }
        if self.max_num_hash_functions == 0 {
            return Err(crate::Error::InvalidArgument(
                "max_num_hash_functions must be >= 1",
            ));
        }
        if self.min_num_hash_functions == 0 {
            return Err(crate::Error::InvalidArgument(
                "min_num_hash_functions must be >= 1",
            ));
        }
        if self.max_search_depth == 0 {
            return Err(crate::Error::InvalidArgument(
                "max_search_depth must be >= 1",
            ));
        }
        if self.cuckoo_block_size == 0 {
            return Err(crate::Error::InvalidArgument(
                "cuckoo_block_size must be >= 1",
            ));
        }
        Ok(())
    }

    /// Number of hash functions the first placement attempt uses.
    pub(crate) fn initial_num_hash_functions(&self) -> u32 {
        self.min_num_hash_functions.min(self.max_num_hash_functions)
    }

    /// Computes the bucket count for `entry_count` entries.
    pub(crate) fn bucket_count(&self, entry_count: u64) -> u64 {
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss,
            reason = "bucket count is about as large as the entry count"
        )]
        let count = (entry_count as f64 / self.hash_table_ratio).ceil() as u64;

        let count = count.max(entry_count).max(1);
        count.next_multiple_of(u64::from(self.cuckoo_block_size.max(1)))
    }
}
