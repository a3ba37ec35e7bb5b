// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A read-optimized, immutable table format for point lookups, based on cuckoo hashing.
//!
//! ##### About
//!
//! This crate exports a table [`table::Builder`] and a table [`table::Reader`] for
//! write-once data files of an LSM-tree-like storage engine.
//!
//! All entries of a table share the same key and value length. The builder places
//! every entry into one of a few candidate buckets (one per hash function), moving
//! other entries around (cuckoo eviction) and using more hash functions if needed.
//! A point read then never needs more than `num_hash_functions` bucket reads,
//! which makes memory-mapped tables very fast to query.
//!
//! Range scans are not supported, and building may fail for inputs that can not be
//! placed ([`Error::BuildFailure`]), in which case the caller should fall back to
//! a different table format.
//!
//! Keys are internal keys: a user key followed by a sequence number and a value type,
//! see [`InternalKey`].
//!
//! ```
//! use cuckoo_table::{coding::Encode, table::{Builder, Reader}, BuildOptions, InternalKey, ValueType, Xxh3Hash};
//!
//! let folder = tempfile::tempdir()?;
//! let path = folder.path().join("1.cuckoo");
//!
//! let mut builder = Builder::create(&path, BuildOptions::default(), Xxh3Hash)?;
//! builder.add(&InternalKey::new(*b"a", 0, ValueType::Value).encode_into_vec(), b"1")?;
//! builder.add(&InternalKey::new(*b"b", 1, ValueType::Value).encode_into_vec(), b"2")?;
//! builder.finish()?;
//! builder.sync()?;
//!
//! let reader = Reader::open_path(&path, Xxh3Hash)?;
//!
//! let key = InternalKey::new(*b"b", 1, ValueType::Value).encode_into_vec();
//! assert!(reader.contains_key(&key)?);
//! #
//! # Ok::<(), cuckoo_table::Error>(())
//! ```

#![deny(clippy::all, missing_docs, clippy::cargo)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::indexing_slicing)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]
#![warn(clippy::multiple_crate_versions)]
#![allow(clippy::option_if_let_else)]
#![warn(clippy::redundant_feature_names)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

#[doc(hidden)]
pub type HashMap<K, V> = std::collections::HashMap<K, V, rustc_hash::FxBuildHasher>;

pub(crate) type HashSet<K> = std::collections::HashSet<K, rustc_hash::FxBuildHasher>;

macro_rules! fail_iter {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(e) => return Some(Err(e.into())),
        }
    };
}

#[doc(hidden)]
pub mod checksum;

#[doc(hidden)]
pub mod coding;

/// Configuration
pub mod config;

mod error;

#[doc(hidden)]
pub mod file;

mod hash;
mod key;

/// Table builder and reader
pub mod table;

mod value_type;

pub use {
    checksum::Checksum,
    config::BuildOptions,
    error::{Error, Result},
    hash::{HashFunction, Xxh3Hash},
    key::{InternalKey, ParsedInternalKey, SeqNo, UserKey, INTERNAL_KEY_TRAILER_SIZE, MAX_SEQNO},
    value_type::ValueType,
};

#[doc(hidden)]
#[must_use]
#[allow(missing_docs, clippy::missing_errors_doc, clippy::unwrap_used)]
pub fn get_tmp_folder() -> tempfile::TempDir {
    if let Ok(p) = std::env::var("CUCKOO_TMP_FOLDER") {
        tempfile::tempdir_in(p)
    } else {
        tempfile::tempdir()
    }
    .unwrap()
}
