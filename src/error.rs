// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    coding::{DecodeError, EncodeError},
    Checksum,
};

/// Represents errors that can occur when building or reading cuckoo tables
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(std::io::Error),

    /// Serialization failed
    Encode(EncodeError),

    /// Deserialization failed
    Decode(DecodeError),

    /// Caller supplied input or options that can not be used
    InvalidArgument(&'static str),

    /// Table file or lookup key is malformed
    Corruption(&'static str),

    /// No collision-free placement was found within the configured
    /// hash function and search depth limits
    ///
    /// The caller should fall back to another table format.
    BuildFailure {
        /// Number of entries that were added
        entry_count: u64,

        /// Number of buckets of the last attempt
        bucket_count: u64,

        /// Highest number of hash functions that was tried
        max_num_hash_functions: u32,
    },

    /// Invalid checksum value
    ChecksumMismatch {
        /// Checksum of loaded data
        got: Checksum,

        /// Checksum that was saved in the table properties
        expected: Checksum,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CuckooTableError: {self:?}")
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Encode(e) => Some(e),
            Self::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl Error {
    /// Returns `true` if the error signals a malformed table or key.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::Corruption(_) | Self::Decode(_) | Self::ChecksumMismatch { .. }
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<EncodeError> for Error {
    fn from(value: EncodeError) -> Self {
        Self::Encode(value)
    }
}

impl From<DecodeError> for Error {
    fn from(value: DecodeError) -> Self {
        Self::Decode(value)
    }
}

/// Cuckoo table result
pub type Result<T> = std::result::Result<T, Error>;
