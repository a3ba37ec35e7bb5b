// Copyright (c) 2025-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Cuckoo hashed table files
//!
//! A table is a fixed-size array of fixed-size buckets, followed by
//! a property block and a footer:
//!
//! ```text
//! [bucket 0][bucket 1]...[bucket n-1][properties][magic: u64 LE][properties offset: u64 LE]
//! ```
//!
//! Every entry lives in one of the buckets its user key hashes to, so a point
//! read needs at most `num_hash_functions` bucket reads. Unused buckets hold a
//! key that is not stored in the table (the "empty key").

mod bucket;
mod builder;
pub mod footer;
mod placement;
pub mod properties;
mod reader;
mod sentinel;
mod source;


pub use bucket::{BucketLayout, KeyFormat};
pub use builder::Builder;
pub use properties::{PropertyBlock, TableProperties};
pub use reader::Reader;
pub use source::RandomAccess;
