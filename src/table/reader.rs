// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::{
    bucket::{BucketLayout, KeyFormat},
    footer::{Footer, FOOTER_SIZE},
    properties::{PropertyBlock, TableProperties, TABLE_VERSION},
    source::RandomAccess,
};
use crate::{
    coding::Decode, hash::bucket_of, key::INTERNAL_KEY_TRAILER_SIZE, Checksum, Error,
    HashFunction, InternalKey, ParsedInternalKey,
};
use memmap2::Mmap;
use std::{fs::File, path::Path};

/// Size of the reads when checksumming the bucket array
const VERIFY_CHUNK_SIZE: usize = 64 * 1_024;

/// Reads a part of the table trailer, which must be within the file.
fn read_trailer<S: RandomAccess>(
    source: &S,
    offset: u64,
    len: usize,
) -> crate::Result<std::borrow::Cow<'_, [u8]>> {
    source.read_at(offset, len).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::Corruption("table is shorter than its file size")
        } else {
            Error::Io(e)
        }
    })
}

/// Answers point lookups on a cuckoo table
///
/// Lookups take `&self` and never mutate anything, so a reader can be shared
/// between threads as long as the source is `Sync`.
pub struct Reader<S: RandomAccess, H: HashFunction> {
    source: S,
    hash_fn: H,
    file_size: u64,

    properties: TableProperties,
    property_block: PropertyBlock,

    layout: BucketLayout,
    format: KeyFormat,
}

macro_rules! corrupt {
    ($cond:expr, $msg:literal) => {
        if !$cond {
            log::warn!("Rejecting cuckoo table: {}", $msg);
            return Err(Error::Corruption($msg));
        }
    };
}

impl<S: RandomAccess, H: HashFunction> Reader<S, H> {
    /// Opens a table of `file_size` bytes.
    ///
    /// `hash_fn` must be the hash function the table was built with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corruption`] if the footer or properties are malformed,
    /// or do not agree with the file size.
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn open(source: S, file_size: u64, hash_fn: H) -> crate::Result<Self> {
        corrupt!(file_size >= FOOTER_SIZE as u64, "file too small to hold footer");

        let footer_offset = file_size - FOOTER_SIZE as u64;

        let footer = {
            let bytes = read_trailer(&source, footer_offset, FOOTER_SIZE)?;
            Footer::decode_from(&mut &bytes[..]).map_err(|e| {
                log::warn!("Rejecting cuckoo table: {e}");
                Error::Corruption("malformed footer")
            })?
        };

        corrupt!(
            footer.properties_offset <= footer_offset,
            "property block offset out of bounds"
        );

        let property_block = {
            let Ok(len) = usize::try_from(footer_offset - footer.properties_offset) else {
                return Err(Error::Corruption("property block too large"));
            };

            let bytes = read_trailer(&source, footer.properties_offset, len)?;
            let mut reader = &bytes[..];

            let block = PropertyBlock::decode_from(&mut reader).map_err(|e| {
                log::warn!("Rejecting cuckoo table: {e}");
                Error::Corruption("malformed property block")
            })?;

            corrupt!(reader.is_empty(), "trailing bytes after property block");

            block
        };

        let parsed = TableProperties::table_version(&property_block)
            .and_then(|version| Ok((version, TableProperties::from_block(&property_block)?)));

        let (version, properties) = parsed.map_err(|e| {
            log::warn!("Rejecting cuckoo table: {e}");
            Error::Corruption("missing or malformed table property")
        })?;

        corrupt!(version == TABLE_VERSION, "unsupported table version");

        Self::validate(&properties, footer.properties_offset)?;

        let layout = BucketLayout {
            key_len: properties.key_length as usize,
            value_len: properties.value_length as usize,
        };
        let format = KeyFormat::for_level(properties.is_last_level);

        log::trace!(
            "Opened cuckoo table with {} entries in {} buckets ({} hash functions)",
            properties.num_entries,
            properties.bucket_count,
            properties.num_hash_functions,
        );

        Ok(Self {
            source,
            hash_fn,
            file_size,
            properties,
            property_block,
            layout,
            format,
        })
    }

    fn validate(properties: &TableProperties, properties_offset: u64) -> crate::Result<()> {
        corrupt!(properties.bucket_count > 0, "bucket count is zero");
        corrupt!(properties.num_hash_functions > 0, "hash function count is zero");
        corrupt!(properties.key_length > 0, "key length is zero");
        corrupt!(
            properties.num_entries <= properties.bucket_count,
            "more entries than buckets"
        );
        corrupt!(
            properties.hash_table_ratio > 0.0 && properties.hash_table_ratio <= 1.0,
            "hash table ratio out of range"
        );
        corrupt!(
            properties.empty_key.len() == properties.key_length as usize,
            "empty key length differs from key length"
        );

        let trailer_size = if properties.is_last_level {
            0
        } else {
            INTERNAL_KEY_TRAILER_SIZE as u32
        };
        corrupt!(
            properties.user_key_length.checked_add(trailer_size) == Some(properties.key_length),
            "user key length disagrees with key length"
        );

        let bucket_size = u64::from(properties.key_length) + u64::from(properties.value_length);
        corrupt!(
            properties.bucket_count.checked_mul(bucket_size) == Some(properties_offset),
            "bucket array size disagrees with property block offset"
        );

        Ok(())
    }

    /// Returns the table properties.
    #[must_use]
    pub fn properties(&self) -> &TableProperties {
        &self.properties
    }

    /// Returns all stored properties, including ones this reader does not know.
    #[must_use]
    pub fn property_block(&self) -> &PropertyBlock {
        &self.property_block
    }

    /// Returns the size of the table file.
    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Reads the raw bytes of a bucket.
    fn bucket(&self, bucket: u64) -> crate::Result<std::borrow::Cow<'_, [u8]>> {
        let bytes = self
            .source
            .read_at(self.layout.offset(bucket), self.layout.bucket_size())?;

        if bytes.len() == self.layout.bucket_size() {
            Ok(bytes)
        } else {
            Err(Error::Corruption("bucket is shorter than bucket size"))
        }
    }

    fn candidate(&self, user_key: &[u8], probe: u32) -> u64 {
        bucket_of(&self.hash_fn, user_key, probe, self.properties.bucket_count)
    }

    /// Searches for `key` (an encoded internal key), and calls `callback` for every
    /// matching entry until it returns `false`.
    ///
    /// Not finding the key is not an error; the callback is not called then.
    ///
    /// Last level tables match by user key only and report hits with seqno 0
    /// and [`crate::ValueType::Value`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corruption`] if `key` is not an internal key, in which
    /// case `callback` is never called.
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn get<F: FnMut(&ParsedInternalKey<'_>, &[u8]) -> bool>(
        &self,
        key: &[u8],
        mut callback: F,
    ) -> crate::Result<()> {
        let parsed = ParsedInternalKey::parse(key)?;
        let lookup = self.format.bucket_key(key, &parsed);

        // NOTE: All stored keys have the same length
        if lookup.len() != self.layout.key_len {
            return Ok(());
        }

        for probe in 0..self.properties.num_hash_functions {
            let bucket = self.candidate(parsed.user_key, probe);

            let bytes = self.bucket(bucket)?;
            let (stored_key, value) = self.layout.split(&bytes);

            if stored_key == self.properties.empty_key || stored_key != lookup {
                continue;
            }

            // NOTE: Different probes may hit the same bucket, only report it once
            if (0..probe).any(|earlier| self.candidate(parsed.user_key, earlier) == bucket) {
                continue;
            }

            let stored = self.format.decode(stored_key)?;

            if !callback(&stored, value) {
                break;
            }
        }

        Ok(())
    }

    /// Returns the first entry matching `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corruption`] if `key` is not an internal key.
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn point_read(&self, key: &[u8]) -> crate::Result<Option<(InternalKey, Vec<u8>)>> {
        let mut result = None;

        self.get(key, |stored, value| {
            result = Some((stored.to_owned_key(), value.to_vec()));
            false
        })?;

        Ok(result)
    }

    /// Returns `true` if the table contains `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corruption`] if `key` is not an internal key.
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn contains_key(&self, key: &[u8]) -> crate::Result<bool> {
        self.point_read(key).map(|x| x.is_some())
    }

    /// Recomputes the checksum of the bucket array.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChecksumMismatch`] if the bucket array was modified.
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn verify_checksum(&self) -> crate::Result<()> {
        let data_len = self.layout.offset(self.properties.bucket_count);
        let mut hasher = xxhash_rust::xxh3::Xxh3Default::new();

        let mut offset = 0;

        while offset < data_len {
            #[expect(clippy::cast_possible_truncation, reason = "chunk size fits into usize")]
            let len = (data_len - offset).min(VERIFY_CHUNK_SIZE as u64) as usize;

            hasher.update(&self.source.read_at(offset, len)?);
            offset += len as u64;
        }

        Checksum::from_raw(hasher.digest128()).check(self.properties.data_checksum)
    }

    /// Iterates over all stored entries, in bucket order.
    ///
    /// This is not a sorted scan; the order depends on the hash function.
    pub fn iter_entries(&self) -> impl Iterator<Item = crate::Result<(InternalKey, Vec<u8>)>> + '_ {
        (0..self.properties.bucket_count).filter_map(move |bucket| {
            let bytes = fail_iter!(self.bucket(bucket));
            let (stored_key, value) = self.layout.split(&bytes);

            if stored_key == self.properties.empty_key {
                return None;
            }

            let stored = fail_iter!(self.format.decode(stored_key));
            Some(Ok((stored.to_owned_key(), value.to_vec())))
        })
    }
}

impl<H: HashFunction> Reader<Mmap, H> {
    /// Memory-maps and opens a table file.
    ///
    /// The file must not be modified while the reader is alive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corruption`] if the table is malformed.
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn open_path<P: AsRef<Path>>(path: P, hash_fn: H) -> crate::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;

        log::debug!("Memory-mapping cuckoo table at {}", path.display());

        // SAFETY: Table files are never modified after they are written
        let mmap = unsafe { Mmap::map(&file)? };
        let file_size = mmap.len() as u64;

        Self::open(mmap, file_size, hash_fn)
    }
}
