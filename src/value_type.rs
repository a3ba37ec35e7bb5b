// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// Operation tag stored in the low byte of an internal key trailer
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[allow(clippy::module_name_repetitions)]
#[repr(u8)]
pub enum ValueType {
    /// Existing value
    Value = 0,

    /// Deleted value
    Tombstone = 0x01,

    /// "Weak" deletion (a.k.a. `SingleDelete` in `RocksDB`)
    WeakTombstone = 0x11,
}

impl ValueType {
    /// Returns `true` if the type is a tombstone marker (either normal or weak).
    #[must_use]
    pub fn is_tombstone(self) -> bool {
        matches!(self, Self::Tombstone | Self::WeakTombstone)
    }

    /// Single letter used in debug output of keys.
    pub(crate) fn short_name(self) -> &'static str {
        match self {
            Self::Value => "V",
            Self::Tombstone => "T",
            Self::WeakTombstone => "W",
        }
    }
}

impl TryFrom<u8> for ValueType {
    type Error = ();

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        [Self::Value, Self::Tombstone, Self::WeakTombstone]
            .into_iter()
            .find(|vt| u8::from(*vt) == tag)
            .ok_or(())
    }
}

impl From<ValueType> for u8 {
    fn from(value: ValueType) -> Self {
        value as Self
    }
}
