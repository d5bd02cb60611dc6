//! Serialization of a dynamic index
//!
//! Layout:
//! - header (48 bytes)
//! - length of the record stream (u64)
//! - node index: a roaring bitmap with the byte offset where each record starts
//! - record stream: for each record, the outdegree, the outgoing edges as
//!   (node, offset) pairs and the body encoded with a [`RunCoder`]
//!
//! All integers in the record stream are varints. Incoming edges are not
//! stored; they are rebuilt when loading.

use super::dynamic::DynamicIndex;
use crate::error::{IndexError, Result};
use crate::utils::{encode_varint, write_u64_le, RunCoder};
use roaring::RoaringBitmap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

impl DynamicIndex {
    /// Write the index. Returns the number of bytes written.
    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let (stream, node_index) = self.encode_records()?;

        let mut written = self.header.serialize(writer)?;
        write_u64_le(writer, stream.len() as u64)?;
        written += 8;
        node_index.serialize_into(&mut *writer)?;
        written += node_index.serialized_size();
        writer.write_all(&stream)?;
        written += stream.len();

        Ok(written)
    }

    /// Write the index to a file
    pub fn save(&self, path: &Path) -> Result<usize> {
        let mut file = BufWriter::with_capacity(65536, File::create(path)?);
        let written = self.serialize(&mut file)?;
        file.flush()?;
        debug!(path = %path.display(), bytes = written, "index written");
        Ok(written)
    }

    /// Encode the records of the effective alphabet
    fn encode_records(&self) -> Result<(Vec<u8>, RoaringBitmap)> {
        let mut stream = Vec::new();
        let mut node_index = RoaringBitmap::new();

        for record in &self.bwt[..self.effective().min(self.bwt.len())] {
            let start =
                u32::try_from(stream.len()).map_err(|_| IndexError::StreamTooLarge(stream.len()))?;
            node_index.insert(start);

            encode_varint(record.outdegree(), &mut stream);
            for edge in record.outgoing() {
                encode_varint(edge.node, &mut stream);
                encode_varint(edge.offset, &mut stream);
            }

            if record.outdegree() > 0 {
                let coder = RunCoder::new(record.outdegree());
                for &run in record.body() {
                    coder.write(&mut stream, run);
                }
            }
        }

        Ok((stream, node_index))
    }
}
