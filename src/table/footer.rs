// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Table footer

use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Identifies a cuckoo table file
pub const MAGIC_NUMBER: u64 = 0x9267_89d0_c5f1_7873;

/// Fixed size of the footer
pub const FOOTER_SIZE: usize = 16;

/// Fixed-size footer at the very end of a table file
///
/// ```text
/// [magic: u64 LE][properties offset: u64 LE]
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Footer {
    /// Start of the property block
    pub properties_offset: u64,
}

impl Encode for Footer {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        writer.write_u64::<LittleEndian>(MAGIC_NUMBER)?;
        writer.write_u64::<LittleEndian>(self.properties_offset)?;
        Ok(())
    }
}

impl Decode for Footer {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let magic = reader.read_u64::<LittleEndian>()?;

        if magic != MAGIC_NUMBER {
            return Err(DecodeError::InvalidMagic(magic));
        }

        let properties_offset = reader.read_u64::<LittleEndian>()?;

        Ok(Self { properties_offset })
    }
}
