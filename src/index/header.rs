//! Fixed-size file header

use crate::utils::{read_u32_le, read_u64_le, write_u32_le, write_u64_le};
use std::fmt;
use std::io::{self, Read, Write};

/// Header stored at the start of a serialized index.
///
/// Version 2 adds the bidirectional flag and is compatible with version 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub tag: u32,
    pub version: u32,
    pub sequences: u64,
    /// Total length including the endmarkers
    pub size: u64,
    /// Node ids `1..=offset` are unused
    pub offset: u64,
    /// Largest node id + 1
    pub alphabet_size: u64,
    pub flags: u64,
}

impl Header {
    /// Size of the header in bytes
    pub const SIZE: usize = 4 + 4 + 8 * 5; // 48 bytes

    pub const TAG: u32 = 0x6B37_6B37;
    pub const VERSION: u32 = 2;
    pub const MIN_VERSION: u32 = 1;

    pub const FLAG_MASK: u64 = 0x0001;
    pub const FLAG_BIDIRECTIONAL: u64 = 0x0001;

    pub fn new() -> Self {
        Self {
            tag: Self::TAG,
            version: Self::VERSION,
            sequences: 0,
            size: 0,
            offset: 0,
            alphabet_size: 0,
            flags: 0,
        }
    }

    pub fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<usize> {
        write_u32_le(writer, self.tag)?;
        write_u32_le(writer, self.version)?;
        write_u64_le(writer, self.sequences)?;
        write_u64_le(writer, self.size)?;
        write_u64_le(writer, self.offset)?;
        write_u64_le(writer, self.alphabet_size)?;
        write_u64_le(writer, self.flags)?;
        Ok(Self::SIZE)
    }

    pub fn load<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            tag: read_u32_le(reader)?,
            version: read_u32_le(reader)?,
            sequences: read_u64_le(reader)?,
            size: read_u64_le(reader)?,
            offset: read_u64_le(reader)?,
            alphabet_size: read_u64_le(reader)?,
            flags: read_u64_le(reader)?,
        })
    }

    /// Tag, version and flags are valid
    pub fn check(&self) -> bool {
        self.tag == Self::TAG
            && (Self::MIN_VERSION..=Self::VERSION).contains(&self.version)
            && self.flags & !Self::FLAG_MASK == 0
    }

    pub fn set(&mut self, flag: u64) {
        self.flags |= flag;
    }

    pub fn unset(&mut self, flag: u64) {
        self.flags &= !flag;
    }

    pub fn get(&self, flag: u64) -> bool {
        self.flags & flag != 0
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Header {{ tag: {:#010x}, version: {}, sequences: {}, size: {}, offset: {}, alphabet_size: {}, flags: {:#x} }}",
            self.tag, self.version, self.sequences, self.size, self.offset, self.alphabet_size, self.flags
        )
    }
}
