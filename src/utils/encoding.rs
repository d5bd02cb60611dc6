use crate::index::types::Run;
use std::io::{self, Read, Write};

const DATA_BITS: u32 = 7;
const DATA_MASK: u8 = 0x7F;
const NEXT_BYTE: u8 = 0x80;

/// Encode a value as a little-endian variable-length integer
pub fn encode_varint(mut value: usize, buf: &mut Vec<u8>) {
    loop {
        if value <= DATA_MASK as usize {
            buf.push(value as u8);
            break;
        }
        buf.push((value as u8 & DATA_MASK) | NEXT_BYTE);
        value >>= DATA_BITS;
    }
}

/// Decode a variable-length integer starting at `*offset`
///
/// Advances the offset past the encoding. Returns `None` if the input is
/// truncated or the value does not fit in `usize`.
pub fn decode_varint(buf: &[u8], offset: &mut usize) -> Option<usize> {
    let mut result: usize = 0;
    let mut shift = 0;

    for (i, &byte) in buf.get(*offset..)?.iter().enumerate() {
        if shift >= usize::BITS {
            return None; // Overflow
        }

        let bits = (byte & DATA_MASK) as usize;
        if shift > 0 && bits >> (usize::BITS - shift) != 0 {
            return None;
        }
        result |= bits << shift;

        if byte & NEXT_BYTE == 0 {
            *offset += i + 1;
            return Some(result);
        }

        shift += DATA_BITS;
    }

    None // Incomplete
}

/// Run coder for the body of a record with a given outdegree.
///
/// Stored lengths are `len - 1`. With outdegree 1 only the length is written.
/// Up to [`RunCoder::MAX_PACKED_OUTDEGREE`] the rank is packed into a single
/// byte together with short lengths, and longer lengths continue as a
/// varint. Larger outdegrees write rank and length as two varints.
#[derive(Debug, Clone, Copy)]
pub struct RunCoder {
    outdegree: usize,
    run_continues: usize,
}

impl RunCoder {
    /// Largest outdegree using the packed single-byte code.
    pub const MAX_PACKED_OUTDEGREE: usize = 255;

    pub fn new(outdegree: usize) -> Self {
        let run_continues = if (2..=Self::MAX_PACKED_OUTDEGREE).contains(&outdegree) {
            256 / outdegree - 1
        } else {
            0
        };
        Self {
            outdegree,
            run_continues,
        }
    }

    /// Append the encoding of `run` to `buf`. Records without edges have no body.
    pub fn write(&self, buf: &mut Vec<u8>, run: Run) {
        debug_assert!(run.len > 0, "runs are never empty");
        let len = run.len - 1;

        match self.outdegree {
            0 => {}
            1 => encode_varint(len, buf),
            d if d <= Self::MAX_PACKED_OUTDEGREE => {
                if len < self.run_continues {
                    buf.push(self.pack(run.rank, len));
                } else {
                    buf.push(self.pack(run.rank, self.run_continues));
                    encode_varint(len - self.run_continues, buf);
                }
            }
            _ => {
                encode_varint(run.rank, buf);
                encode_varint(len, buf);
            }
        }
    }

    /// Decode the run starting at `*offset`, advancing the offset past it
    pub fn read(&self, buf: &[u8], offset: &mut usize) -> Option<Run> {
        let (rank, len) = match self.outdegree {
            0 => return None,
            1 => (0, decode_varint(buf, offset)?),
            d if d <= Self::MAX_PACKED_OUTDEGREE => {
                let code = *buf.get(*offset)? as usize;
                *offset += 1;
                let (rank, mut len) = (code % d, code / d);
                if len >= self.run_continues {
                    len = len.checked_add(decode_varint(buf, offset)?)?;
                }
                (rank, len)
            }
            _ => (decode_varint(buf, offset)?, decode_varint(buf, offset)?),
        };
        Some(Run::new(rank, len.checked_add(1)?))
    }

    #[inline]
    fn pack(&self, rank: usize, len: usize) -> u8 {
        (rank + self.outdegree * len) as u8
    }
}

/// Write a u32 in little-endian format
pub fn write_u32_le<W: Write>(writer: &mut W, value: u32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Read a u32 in little-endian format
pub fn read_u32_le<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Write a u64 in little-endian format
pub fn write_u64_le<W: Write>(writer: &mut W, value: u64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Read a u64 in little-endian format
pub fn read_u64_le<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}
