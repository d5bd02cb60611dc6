//! Loading a serialized dynamic index

use super::dynamic::DynamicIndex;
use super::header::Header;
use super::record::DynamicRecord;
use super::types::{Edge, IndexConfig, InEdge, ENDMARKER};
use crate::error::{IndexError, Result};
use crate::utils::{decode_varint, read_u64_le, RunCoder};
use memmap2::Mmap;
use roaring::RoaringBitmap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::warn;

impl DynamicIndex {
    /// Read an index written by [`DynamicIndex::serialize`].
    ///
    /// An invalid header is reported but does not stop loading.
    pub fn load<R: Read>(reader: &mut R) -> Result<Self> {
        let header = Header::load(reader)?;
        if !header.check() {
            warn!("invalid header: {}", header);
        }

        let stream_len = read_u64_le(reader)?;
        let node_index = RoaringBitmap::deserialize_from(&mut *reader)?;
        let effective = header.alphabet_size.saturating_sub(header.offset);
        if node_index.len() != effective {
            return Err(IndexError::Corrupt(format!(
                "node index has {} records, expected {}",
                node_index.len(),
                effective
            )));
        }

        let mut stream = Vec::new();
        reader.by_ref().take(stream_len).read_to_end(&mut stream)?;
        if stream.len() as u64 != stream_len {
            return Err(IndexError::Corrupt(format!(
                "record stream truncated at {} of {} bytes",
                stream.len(),
                stream_len
            )));
        }
        // Every record takes at least one byte for its outdegree.
        if effective > stream.len() as u64 {
            return Err(IndexError::Corrupt(format!(
                "{} records do not fit in a stream of {} bytes",
                effective,
                stream.len()
            )));
        }

        let effective = effective as usize;
        let mut bwt = Vec::with_capacity(effective);
        for comp in 0..effective {
            let start = select(&node_index, comp)?;
            let stop = if comp + 1 < effective {
                select(&node_index, comp + 1)?
            } else {
                stream.len()
            };
            let encoding = stream.get(start..stop).ok_or_else(|| {
                IndexError::Corrupt(format!("record {} has invalid range {}..{}", comp, start, stop))
            })?;
            let record = decode_record(encoding)
                .ok_or_else(|| IndexError::Corrupt(format!("cannot decode record {}", comp)))?;
            bwt.push(record);
        }

        let mut index = Self {
            header,
            bwt,
            config: IndexConfig::default(),
        };
        index.rebuild_incoming()?;
        Ok(index)
    }

    /// Memory-map and load an index file
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Self::load(&mut &mmap[..])
    }

    /// Rebuild the incoming edges from the bodies of all records
    fn rebuild_incoming(&mut self) -> Result<()> {
        for comp in 0..self.bwt.len() {
            let node = self.to_node(comp);
            let counts = self.bwt[comp].rank_counts();
            for (rank, count) in counts.into_iter().enumerate() {
                let successor = self.bwt[comp].successor(rank);
                if successor == ENDMARKER {
                    continue;
                }
                let target = self.record_mut(successor).ok_or_else(|| {
                    IndexError::Corrupt(format!("edge from {} to unknown node {}", node, successor))
                })?;
                target.add_incoming(InEdge::new(node, count));
            }
        }
        Ok(())
    }
}

fn select(node_index: &RoaringBitmap, comp: usize) -> Result<usize> {
    u32::try_from(comp)
        .ok()
        .and_then(|n| node_index.select(n))
        .map(|offset| offset as usize)
        .ok_or_else(|| IndexError::Corrupt(format!("node index has no record {}", comp)))
}

fn decode_record(encoding: &[u8]) -> Option<DynamicRecord> {
    let mut offset = 0;

    let outdegree = decode_varint(encoding, &mut offset)?;
    if outdegree > encoding.len() {
        return None; // Each edge takes at least two bytes.
    }
    let mut outgoing = Vec::with_capacity(outdegree);
    for _ in 0..outdegree {
        let node = decode_varint(encoding, &mut offset)?;
        let edge_offset = decode_varint(encoding, &mut offset)?;
        outgoing.push(Edge::new(node, edge_offset));
    }

    let mut body = Vec::new();
    if outdegree > 0 {
        let coder = RunCoder::new(outdegree);
        while offset < encoding.len() {
            let run = coder.read(encoding, &mut offset)?;
            if run.rank >= outdegree {
                return None;
            }
            body.push(run);
        }
    } else if offset != encoding.len() {
        return None;
    }

    DynamicRecord::from_parts(outgoing, body)
}
