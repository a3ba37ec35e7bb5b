// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Table properties

use crate::{
    coding::{read_len_prefixed, write_len_prefixed, Decode, DecodeError, Encode, EncodeError},
    Checksum,
};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Read, Write};
use varint_rs::{VarintReader, VarintWriter};

/// Current table format version
pub const TABLE_VERSION: u8 = 1;

/// Names of the table properties
pub mod names {
    #![allow(missing_docs)]

    pub const BUCKET_COUNT: &str = "cuckoo.bucket_count";
    pub const DATA_CHECKSUM: &str = "cuckoo.checksum#data";
    pub const EMPTY_KEY: &str = "cuckoo.empty_key";
    pub const HASH_TABLE_RATIO: &str = "cuckoo.hash_table_ratio";
    pub const IS_LAST_LEVEL: &str = "cuckoo.is_last_level";
    pub const KEY_LENGTH: &str = "cuckoo.key_length";
    pub const NUM_HASH_FUNC: &str = "cuckoo.num_hash_func";
    pub const USER_KEY_LENGTH: &str = "cuckoo.user_key_length";
    pub const VALUE_LENGTH: &str = "cuckoo.value_length";
    pub const CRATE_VERSION: &str = "crate_version";
    pub const CREATED_AT: &str = "created_at";
    pub const NUM_ENTRIES: &str = "num_entries";
    pub const TABLE_VERSION: &str = "table_version";
}

/// Named, untyped properties as stored in the table
///
/// ```text
/// [varint count] ([varint name len][name][varint value len][value])*
/// ```
///
/// Unknown properties survive decoding, so newer writers can add
/// properties without breaking older readers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PropertyBlock(Vec<(String, Vec<u8>)>);

impl PropertyBlock {
    /// Adds a property.
    pub fn insert<N: Into<String>, V: Into<Vec<u8>>>(&mut self, name: N, value: V) {
        self.0.push((name.into(), value.into()));
    }

    /// Returns the raw value of a property.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Iterates over all properties, including unknown ones.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    fn require(&self, name: &'static str) -> Result<&[u8], DecodeError> {
        self.get(name).ok_or(DecodeError::MissingProperty(name))
    }

    fn require_len(&self, name: &'static str, len: usize) -> Result<&[u8], DecodeError> {
        let bytes = self.require(name)?;

        if bytes.len() == len {
            Ok(bytes)
        } else {
            Err(DecodeError::InvalidPropertyLength((name, bytes.len())))
        }
    }

    fn read_u8(&self, name: &'static str) -> Result<u8, DecodeError> {
        let mut bytes = self.require_len(name, 1)?;
        Ok(bytes.read_u8()?)
    }

    fn read_u32(&self, name: &'static str) -> Result<u32, DecodeError> {
        let mut bytes = self.require_len(name, 4)?;
        Ok(bytes.read_u32::<LittleEndian>()?)
    }

    fn read_u64(&self, name: &'static str) -> Result<u64, DecodeError> {
        let mut bytes = self.require_len(name, 8)?;
        Ok(bytes.read_u64::<LittleEndian>()?)
    }

    fn read_u128(&self, name: &'static str) -> Result<u128, DecodeError> {
        let mut bytes = self.require_len(name, 16)?;
        Ok(bytes.read_u128::<LittleEndian>()?)
    }

    fn read_f64(&self, name: &'static str) -> Result<f64, DecodeError> {
        let mut bytes = self.require_len(name, 8)?;
        Ok(f64::from_bits(bytes.read_u64::<LittleEndian>()?))
    }
}

/// Unix timestamp in nanoseconds, 0 if the clock is before the epoch
fn created_at() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
}

impl Encode for PropertyBlock {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        let mut items = self.0.iter().collect::<Vec<_>>();
        items.sort_by(|a, b| a.0.cmp(&b.0));

        // NOTE: We know there are not 4 billion properties
        #[expect(clippy::cast_possible_truncation)]
        writer.write_u32_varint(items.len() as u32)?;

        for (name, value) in items {
            write_len_prefixed(writer, name.as_bytes())?;
            write_len_prefixed(writer, value)?;
        }

        Ok(())
    }
}

impl Decode for PropertyBlock {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let count = reader.read_u32_varint()?;

        let mut items = Vec::new();

        for _ in 0..count {
            let name = read_len_prefixed(reader)?;
            let name = std::str::from_utf8(&name)?.to_owned();

            let value = read_len_prefixed(reader)?;

            items.push((name, value));
        }

        Ok(Self(items))
    }
}

/// Typed properties of a cuckoo table
#[derive(Clone, Debug, PartialEq)]
pub struct TableProperties {
    /// Number of stored entries
    pub num_entries: u64,

    /// Length of the key area of a bucket
    pub key_length: u32,

    /// Length of the user keys
    pub user_key_length: u32,

    /// Length of the values
    pub value_length: u32,

    /// Number of buckets
    pub bucket_count: u64,

    /// Number of hash functions used for placement
    pub num_hash_functions: u32,

    /// Whether buckets only hold user keys
    pub is_last_level: bool,

    /// Key that marks empty buckets
    pub empty_key: Vec<u8>,

    /// Configured target occupancy
    pub hash_table_ratio: f64,

    /// Checksum of the bucket array
    pub data_checksum: Checksum,
}

impl TableProperties {
    /// Returns the effective occupancy of the bucket array.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn occupancy(&self) -> f64 {
        if self.bucket_count == 0 {
            0.0
        } else {
            self.num_entries as f64 / self.bucket_count as f64
        }
    }

    /// Converts into the named property representation.
    #[must_use]
    pub fn to_block(&self) -> PropertyBlock {
        let mut block = PropertyBlock::default();

        block.insert(names::BUCKET_COUNT, self.bucket_count.to_le_bytes());
        block.insert(
            names::DATA_CHECKSUM,
            self.data_checksum.into_u128().to_le_bytes(),
        );
        block.insert(names::EMPTY_KEY, self.empty_key.clone());
        block.insert(names::HASH_TABLE_RATIO, self.hash_table_ratio.to_le_bytes());
        block.insert(names::IS_LAST_LEVEL, [u8::from(self.is_last_level)]);
        block.insert(names::KEY_LENGTH, self.key_length.to_le_bytes());
        block.insert(names::NUM_HASH_FUNC, self.num_hash_functions.to_le_bytes());
        block.insert(names::USER_KEY_LENGTH, self.user_key_length.to_le_bytes());
        block.insert(names::VALUE_LENGTH, self.value_length.to_le_bytes());
        block.insert(names::CRATE_VERSION, env!("CARGO_PKG_VERSION"));
        block.insert(names::CREATED_AT, created_at().to_le_bytes());
        block.insert(names::NUM_ENTRIES, self.num_entries.to_le_bytes());
        block.insert(names::TABLE_VERSION, [TABLE_VERSION]);

        block
    }

    /// Parses the recognized properties out of a property block.
    ///
    /// Only checks presence and width of every property,
    /// semantic validation is done by the reader.
    ///
    /// # Errors
    ///
    /// Returns an error if a property is missing or has the wrong width.
    pub fn from_block(block: &PropertyBlock) -> Result<Self, DecodeError> {
        let is_last_level = match block.read_u8(names::IS_LAST_LEVEL)? {
            0 => false,
            1 => true,
            _ => return Err(DecodeError::InvalidPropertyValue(names::IS_LAST_LEVEL)),
        };

        Ok(Self {
            num_entries: block.read_u64(names::NUM_ENTRIES)?,
            key_length: block.read_u32(names::KEY_LENGTH)?,
            user_key_length: block.read_u32(names::USER_KEY_LENGTH)?,
            value_length: block.read_u32(names::VALUE_LENGTH)?,
            bucket_count: block.read_u64(names::BUCKET_COUNT)?,
            num_hash_functions: block.read_u32(names::NUM_HASH_FUNC)?,
            is_last_level,
            empty_key: block.require(names::EMPTY_KEY)?.to_vec(),
            hash_table_ratio: block.read_f64(names::HASH_TABLE_RATIO)?,
            data_checksum: Checksum::from_raw(block.read_u128(names::DATA_CHECKSUM)?),
        })
    }

    /// Returns the table format version stored in the block.
    ///
    /// # Errors
    ///
    /// Returns an error if the version is missing.
    pub fn table_version(block: &PropertyBlock) -> Result<u8, DecodeError> {
        block.read_u8(names::TABLE_VERSION)
    }
}
