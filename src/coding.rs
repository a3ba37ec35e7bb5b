// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::io::{Read, Write};
use varint_rs::{VarintReader, VarintWriter};

/// Error during serialization
#[derive(Debug)]
pub enum EncodeError {
    /// I/O error
    Io(std::io::Error),
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "EncodeError(Io: {e})"),
        }
    }
}

impl From<std::io::Error> for EncodeError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
        }
    }
}

/// Error during deserialization
#[derive(Debug)]
pub enum DecodeError {
    /// I/O error
    Io(std::io::Error),

    /// Invalid footer magic
    InvalidMagic(u64),

    /// A property has a value of unexpected width
    InvalidPropertyLength((&'static str, usize)),

    /// A property is missing
    MissingProperty(&'static str),

    /// A property holds a value that is out of range
    InvalidPropertyValue(&'static str),

    /// UTF-8 error
    Utf8(std::str::Utf8Error),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "DecodeError({})",
            match self {
                Self::Io(e) => e.to_string(),
                e => format!("{e:?}"),
            }
        )
    }
}

impl From<std::str::Utf8Error> for DecodeError {
    fn from(value: std::str::Utf8Error) -> Self {
        Self::Utf8(value)
    }
}

impl From<std::io::Error> for DecodeError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Utf8(e) => Some(e),
            _ => None,
        }
    }
}

/// Trait to serialize stuff
pub trait Encode {
    /// Serializes into writer.
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError>;

    /// Serializes into vector.
    #[expect(
        clippy::expect_used,
        reason = "we write into a Vec<u8>, so no I/O error can happen"
    )]
    fn encode_into_vec(&self) -> Vec<u8> {
        let mut v = vec![];
        self.encode_into(&mut v).expect("cannot fail");
        v
    }
}

/// Trait to deserialize stuff
pub trait Decode {
    /// Deserializes from reader.
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError>
    where
        Self: Sized;
}

/// Writes a varint length prefix followed by the bytes.
pub(crate) fn write_len_prefixed<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<(), EncodeError> {
    let len = u32::try_from(bytes.len())
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "slice too long"))?;

    writer.write_u32_varint(len)?;
    writer.write_all(bytes)?;

    Ok(())
}

/// Reads a varint length prefix and exactly that many bytes.
///
/// The prefix is not trusted for the allocation, so a corrupted length
/// ends in an `UnexpectedEof` instead of a huge buffer.
pub(crate) fn read_len_prefixed<R: Read>(reader: &mut R) -> Result<Vec<u8>, DecodeError> {
    let len = reader.read_u32_varint()?;

    let mut buf = Vec::new();
    reader.take(u64::from(len)).read_to_end(&mut buf)?;

    if buf.len() == len as usize {
        Ok(buf)
    } else {
        Err(DecodeError::Io(std::io::ErrorKind::UnexpectedEof.into()))
    }
}
