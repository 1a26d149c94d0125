mod reader;

use bitflags::bitflags;

pub(crate) use reader::{read_header, read_pragma};

/// The pragma for a CARv2. This is also a valid CARv1 header, with version 2 and no root CIDs.
///
/// For more information, check the specification: <https://ipld.io/specs/transport/car/carv2/#pragma>
pub const PRAGMA: [u8; 11] = [
    0x0a, // unit(10)
    0xa1, // map(1)
    0x67, // string(7)
    0x76, 0x65, 0x72, 0x73, 0x69, 0x6f, 0x6e, // "version"
    0x02, // uint(2)
];

bitflags! {
    /// Characteristics of the enclosed data.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Characteristics: u128 {
        const EMPTY = 0;
        const FULLY_INDEXED = 1 << 127;
    }
}

impl Characteristics {
    /// Check whether the `fully-indexed` characteristic is set.
    #[inline]
    pub const fn is_fully_indexed(&self) -> bool {
        self.intersects(Self::FULLY_INDEXED)
    }
}

impl Default for Characteristics {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Low-level CARv2 header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Describes certain features of the enclosed data.
    pub characteristics: Characteristics,
    /// Byte-offset from the beginning of the CARv2 pragma to the first byte of the CARv1 data payload.
    pub data_offset: u64,
    /// Byte-length of the CARv1 data payload.
    pub data_size: u64,
    /// Byte-offset from the beginning of the CARv2 pragma to the first byte of the index payload.
    /// This value may be 0 to indicate the absence of index data.
    pub index_offset: u64,
}

impl Header {
    /// The [`Header`] size in bytes (includes the pragma).
    ///
    /// As defined in the [specification](https://ipld.io/specs/transport/car/carv2/#header).
    pub const SIZE: usize = PRAGMA.len() + 40;

    /// Offset of the first byte after the CARv1 payload.
    pub fn data_end(&self) -> Option<u64> {
        self.data_offset.checked_add(self.data_size)
    }
}
