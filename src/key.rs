// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Internal key encoding
//!
//! An internal key is the user key followed by an 8 byte trailer,
//! which packs the sequence number and the value type:
//!
//! ```text
//! [user key][u64 LE: seqno << 8 | value type]
//! ```

use crate::{
    coding::{Encode, EncodeError},
    ValueType,
};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Write;

/// User defined key (byte array)
pub type UserKey = Vec<u8>;

/// Sequence number - a monotonically increasing counter
///
/// A value with a higher sequence number shadows an item with the
/// same key and lower sequence number.
pub type SeqNo = u64;

/// Highest sequence number that fits into the internal key trailer
pub const MAX_SEQNO: SeqNo = (1 << 56) - 1;

/// Size of the seqno + value type trailer
pub const INTERNAL_KEY_TRAILER_SIZE: usize = std::mem::size_of::<u64>();

fn pack_trailer(seqno: SeqNo, value_type: ValueType) -> u64 {
    (seqno << 8) | u64::from(u8::from(value_type))
}

/// Borrowed, decoded view of an internal key
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct ParsedInternalKey<'a> {
    /// User key
    pub user_key: &'a [u8],

    /// Sequence number
    pub seqno: SeqNo,

    /// Operation tag
    pub value_type: ValueType,
}

impl std::fmt::Debug for ParsedInternalKey<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?}:{}:{}",
            self.user_key,
            self.seqno,
            self.value_type.short_name(),
        )
    }
}

impl<'a> ParsedInternalKey<'a> {
    /// Creates a new parsed key.
    ///
    /// # Panics
    ///
    /// Panics if the sequence number does not fit into 56 bits.
    #[must_use]
    pub fn new(user_key: &'a [u8], seqno: SeqNo, value_type: ValueType) -> Self {
        assert!(seqno <= MAX_SEQNO, "seqno does not fit into 56 bits");

        Self {
            user_key,
            seqno,
            value_type,
        }
    }

    /// Decodes an encoded internal key.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Corruption`] if the bytes are too short
    /// to hold the trailer, or the value type tag is unknown.
    pub fn parse(bytes: &'a [u8]) -> crate::Result<Self> {
        let Some(split) = bytes.len().checked_sub(INTERNAL_KEY_TRAILER_SIZE) else {
            return Err(crate::Error::Corruption("internal key too short"));
        };

        let (user_key, mut trailer) = bytes.split_at(split);
        let packed = trailer.read_u64::<LittleEndian>()?;

        #[expect(clippy::cast_possible_truncation, reason = "we mask the low byte")]
        let value_type = ValueType::try_from((packed & 0xFF) as u8)
            .map_err(|()| crate::Error::Corruption("invalid value type in internal key"))?;

        Ok(Self {
            user_key,
            seqno: packed >> 8,
            value_type,
        })
    }

    /// Returns the length of the encoded key.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.user_key.len() + INTERNAL_KEY_TRAILER_SIZE
    }

    /// Converts into an owned [`InternalKey`].
    #[must_use]
    pub fn to_owned_key(&self) -> InternalKey {
        InternalKey::new(self.user_key, self.seqno, self.value_type)
    }
}

impl Encode for ParsedInternalKey<'_> {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        writer.write_all(self.user_key)?;
        writer.write_u64::<LittleEndian>(pack_trailer(self.seqno, self.value_type))?;
        Ok(())
    }
}

/// Owned internal key
#[derive(Clone, Eq, PartialEq)]
pub struct InternalKey {
    /// User key
    pub user_key: UserKey,

    /// Sequence number
    pub seqno: SeqNo,

    /// Operation tag
    pub value_type: ValueType,
}

impl std::fmt::Debug for InternalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_parsed().fmt(f)
    }
}

impl InternalKey {
    /// Creates a new internal key.
    ///
    /// # Panics
    ///
    /// Panics if the sequence number does not fit into 56 bits.
    pub fn new<K: Into<UserKey>>(user_key: K, seqno: SeqNo, value_type: ValueType) -> Self {
        assert!(seqno <= MAX_SEQNO, "seqno does not fit into 56 bits");

        Self {
            user_key: user_key.into(),
            seqno,
            value_type,
        }
    }

    /// Borrows the key as [`ParsedInternalKey`].
    #[must_use]
    pub fn as_parsed(&self) -> ParsedInternalKey<'_> {
        ParsedInternalKey {
            user_key: &self.user_key,
            seqno: self.seqno,
            value_type: self.value_type,
        }
    }

    /// Returns `true` if the key is a tombstone marker.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.value_type.is_tombstone()
    }
}

impl Encode for InternalKey {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        self.as_parsed().encode_into(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn internal_key_raw() -> crate::Result<()> {
        let key = InternalKey::new(*b"abc", 1, ValueType::Value);

        #[rustfmt::skip]
        let bytes = [
            // User key
            b'a', b'b', b'c',

            // Seqno + type
            0, 1, 0, 0, 0, 0, 0, 0,
        ];

        assert_eq!(bytes.as_slice(), key.encode_into_vec());

        let parsed = ParsedInternalKey::parse(&bytes)?;
        assert_eq!(b"abc", parsed.user_key);
        assert_eq!(1, parsed.seqno);
        assert_eq!(ValueType::Value, parsed.value_type);

        Ok(())
    }

    #[test]
    fn internal_key_tombstone() -> crate::Result<()> {
        let key = InternalKey::new(*b"a", MAX_SEQNO, ValueType::Tombstone);
        let bytes = key.encode_into_vec();

        let parsed = ParsedInternalKey::parse(&bytes)?;
        assert_eq!(key, parsed.to_owned_key());
        assert!(parsed.value_type.is_tombstone());

        Ok(())
    }

    #[test]
    fn internal_key_empty_user_key() -> crate::Result<()> {
        let bytes = InternalKey::new(vec![], 5, ValueType::Value).encode_into_vec();
        assert_eq!(INTERNAL_KEY_TRAILER_SIZE, bytes.len());

        let parsed = ParsedInternalKey::parse(&bytes)?;
        assert!(parsed.user_key.is_empty());
        assert_eq!(5, parsed.seqno);
        assert_eq!(bytes.len(), parsed.encoded_len());

        Ok(())
    }

    #[test]
    fn internal_key_truncated() {
        let mut bytes = InternalKey::new(*b"abc", 1, ValueType::Value).encode_into_vec();
        bytes.truncate(7);

        assert!(matches!(
            ParsedInternalKey::parse(&bytes),
            Err(crate::Error::Corruption(_)),
        ));
    }

    #[test]
    fn internal_key_invalid_type() {
        let mut bytes = InternalKey::new(*b"abc", 1, ValueType::Value).encode_into_vec();

        #[expect(clippy::indexing_slicing)]
        {
            bytes[3] = 0x42;
        }

        assert!(matches!(
            ParsedInternalKey::parse(&bytes),
            Err(crate::Error::Corruption(_)),
        ));
    }
}
