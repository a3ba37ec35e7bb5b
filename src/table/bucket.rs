// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{key::INTERNAL_KEY_TRAILER_SIZE, ParsedInternalKey, ValueType};

/// How internal keys are stored in the key area of a bucket
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum KeyFormat {
    /// The full encoded internal key is stored
    Internal,

    /// Only the user key is stored
    ///
    /// Used for last level tables: stored keys are reported
    /// with seqno 0 and [`ValueType::Value`].
    UserKeyOnly,
}

impl KeyFormat {
    /// Returns the key format of a table.
    #[must_use]
    pub fn for_level(is_last_level: bool) -> Self {
        if is_last_level {
            Self::UserKeyOnly
        } else {
            Self::Internal
        }
    }

    /// Returns the length of the bucket key of an internal key with the given user key length.
    #[must_use]
    pub fn bucket_key_len(self, user_key_len: usize) -> usize {
        match self {
            Self::Internal => user_key_len + INTERNAL_KEY_TRAILER_SIZE,
            Self::UserKeyOnly => user_key_len,
        }
    }

    /// Returns the bytes that represent `parsed` (encoded as `encoded`) inside a bucket.
    #[must_use]
    pub fn bucket_key<'a>(self, encoded: &'a [u8], parsed: &ParsedInternalKey<'a>) -> &'a [u8] {
        match self {
            Self::Internal => encoded,
            Self::UserKeyOnly => parsed.user_key,
        }
    }

    /// Decodes the key area of an occupied bucket.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Corruption`] if a stored internal key can not be parsed.
    pub fn decode<'a>(self, stored: &'a [u8]) -> crate::Result<ParsedInternalKey<'a>> {
        match self {
            Self::Internal => ParsedInternalKey::parse(stored),
            Self::UserKeyOnly => Ok(ParsedInternalKey {
                user_key: stored,
                seqno: 0,
                value_type: ValueType::Value,
            }),
        }
    }
}

/// Fixed-size bucket geometry
///
/// ```text
/// [key area: key_len bytes][value area: value_len bytes]
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BucketLayout {
    /// Length of the key area
    pub key_len: usize,

    /// Length of the value area
    pub value_len: usize,
}

impl BucketLayout {
    /// Creates a layout whose lengths fit into the `u32` table properties.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidArgument`] if the key or value is too long.
    pub fn checked(key_len: usize, value_len: usize) -> crate::Result<Self> {
        let fits = |len: usize| u32::try_from(len).is_ok();

        if !fits(key_len) {
            return Err(crate::Error::InvalidArgument("key is too long"));
        }

        if !fits(value_len) || !key_len.checked_add(value_len).is_some_and(fits) {
            return Err(crate::Error::InvalidArgument("value is too long"));
        }

        Ok(Self { key_len, value_len })
    }

    /// Size of a bucket in bytes.
    #[must_use]
    pub fn bucket_size(&self) -> usize {
        self.key_len + self.value_len
    }

    /// Byte offset of a bucket in the table file.
    #[must_use]
    pub fn offset(&self, bucket: u64) -> u64 {
        bucket * self.bucket_size() as u64
    }

    /// Splits raw bucket bytes into key and value.
    #[must_use]
    pub fn split<'a>(&self, bucket: &'a [u8]) -> (&'a [u8], &'a [u8]) {
        debug_assert_eq!(bucket.len(), self.bucket_size());
        bucket.split_at(self.key_len.min(bucket.len()))
    }
}

/// Flat buffer of fixed-size entries, laid out exactly like buckets
pub(crate) struct EntryBuffer {
    data: Vec<u8>,
    layout: BucketLayout,
    format: KeyFormat,
    len: usize,
}

impl EntryBuffer {
    pub fn new(layout: BucketLayout, format: KeyFormat) -> Self {
        Self {
            data: Vec::new(),
            layout,
            format,
            len: 0,
        }
    }

    pub fn layout(&self) -> BucketLayout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn push(&mut self, bucket_key: &[u8], value: &[u8]) {
        debug_assert_eq!(bucket_key.len(), self.layout.key_len);
        debug_assert_eq!(value.len(), self.layout.value_len);

        self.data.extend_from_slice(bucket_key);
        self.data.extend_from_slice(value);
        self.len += 1;
    }

    /// Returns the raw bucket bytes of an entry.
    #[expect(clippy::indexing_slicing, reason = "idx is always < len")]
    pub fn bucket(&self, idx: usize) -> &[u8] {
        let size = self.layout.bucket_size();
        let start = idx * size;
        &self.data[start..(start + size)]
    }

    pub fn bucket_key(&self, idx: usize) -> &[u8] {
        self.layout.split(self.bucket(idx)).0
    }

    /// Returns the bytes that are fed into the hash function.
    #[expect(clippy::indexing_slicing, reason = "bucket key length is validated on insert")]
    pub fn user_key(&self, idx: usize) -> &[u8] {
        let key = self.bucket_key(idx);

        match self.format {
            KeyFormat::Internal => &key[..(key.len() - INTERNAL_KEY_TRAILER_SIZE)],
            KeyFormat::UserKeyOnly => key,
        }
    }
}
