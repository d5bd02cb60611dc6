//! Dynamic index over collections of sequences
//!
//! The container owns one [`DynamicRecord`] per node of a compacted alphabet.
//! Node ids `1..=offset` are unused, so node `v > offset` lives at index
//! `v - offset` and the endmarker always lives at index 0.

use super::header::Header;
use super::insert::{insert_batch, Cursor, TextSource};
use super::record::DynamicRecord;
use super::types::{IndexConfig, NodeId, ENDMARKER};
use crate::error::{IndexError, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, trace};

#[derive(Debug, Clone, Default)]
pub struct DynamicIndex {
    pub(crate) header: Header,
    pub(crate) bwt: Vec<DynamicRecord>,
    pub(crate) config: IndexConfig,
}

/// First difference found when comparing two indexes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    Header {
        this: Header,
        other: Header,
    },
    Record {
        comp: usize,
        this: DynamicRecord,
        other: DynamicRecord,
    },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::Header { this, other } => {
                writeln!(f, "This:    {}", this)?;
                write!(f, "Another: {}", other)
            }
            Mismatch::Record { comp, this, other } => {
                writeln!(f, "This[{}]:    {}", comp, this)?;
                write!(f, "Another[{}]: {}", comp, other)
            }
        }
    }
}

/// Summary statistics of an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub sequences: usize,
    pub size: usize,
    pub offset: usize,
    pub alphabet_size: usize,
    pub effective_alphabet: usize,
    /// Nodes other than the endmarker with at least one occurrence
    pub nodes: usize,
    pub runs: usize,
    pub edges: usize,
    pub bidirectional: bool,
}

impl DynamicIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: IndexConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: IndexConfig) {
        self.config = config;
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Number of inserted sequences
    #[inline]
    pub fn sequences(&self) -> usize {
        self.header.sequences as usize
    }

    /// Total length of the sequences including endmarkers
    #[inline]
    pub fn size(&self) -> usize {
        self.header.size as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.header.size == 0
    }

    /// Alphabet size: largest node id + 1
    #[inline]
    pub fn sigma(&self) -> usize {
        self.header.alphabet_size as usize
    }

    /// Number of unused node ids after the endmarker
    #[inline]
    pub fn offset(&self) -> usize {
        self.header.offset as usize
    }

    /// Number of records in the compacted alphabet
    #[inline]
    pub fn effective(&self) -> usize {
        self.sigma().saturating_sub(self.offset())
    }

    pub fn is_bidirectional(&self) -> bool {
        self.header.get(Header::FLAG_BIDIRECTIONAL)
    }

    pub fn set_bidirectional(&mut self, bidirectional: bool) {
        if bidirectional {
            self.header.set(Header::FLAG_BIDIRECTIONAL);
        } else {
            self.header.unset(Header::FLAG_BIDIRECTIONAL);
        }
    }

    /// Node has a record in the compacted alphabet
    #[inline]
    pub fn contains(&self, node: NodeId) -> bool {
        if node == ENDMARKER {
            self.effective() > 0
        } else {
            node > self.offset() && node < self.sigma()
        }
    }

    pub fn record(&self, node: NodeId) -> Option<&DynamicRecord> {
        if self.contains(node) {
            self.bwt.get(self.to_comp(node))
        } else {
            None
        }
    }

    pub(crate) fn record_mut(&mut self, node: NodeId) -> Option<&mut DynamicRecord> {
        if self.contains(node) {
            let comp = self.to_comp(node);
            self.bwt.get_mut(comp)
        } else {
            None
        }
    }

    /// Number of occurrences of `node`
    pub fn count(&self, node: NodeId) -> usize {
        self.record(node).map_or(0, DynamicRecord::size)
    }

    /// Total number of runs in all records
    pub fn runs(&self) -> usize {
        self.bwt.iter().map(DynamicRecord::runs).sum()
    }

    #[inline]
    pub(crate) fn to_comp(&self, node: NodeId) -> usize {
        if node == ENDMARKER {
            0
        } else {
            node - self.offset()
        }
    }

    #[inline]
    pub(crate) fn to_node(&self, comp: usize) -> NodeId {
        if comp == 0 {
            ENDMARKER
        } else {
            comp + self.offset()
        }
    }

    /// Record of a node known to be in the alphabet
    #[inline]
    pub(crate) fn record_at(&self, node: NodeId) -> &DynamicRecord {
        &self.bwt[self.to_comp(node)]
    }

    #[inline]
    pub(crate) fn record_at_mut(&mut self, node: NodeId) -> &mut DynamicRecord {
        let comp = self.to_comp(node);
        &mut self.bwt[comp]
    }

    /// Grow the compacted alphabet window.
    ///
    /// The offset is only lowered, except when the index has no real nodes yet,
    /// and the alphabet size is only raised. Fails without modifying the index
    /// if the resulting offset is not below the alphabet size.
    pub fn resize(&mut self, new_offset: usize, new_sigma: usize) -> Result<()> {
        let mut new_offset = new_offset;
        let mut new_sigma = new_sigma;
        if (self.sigma() > 1 && new_offset > self.offset()) || new_sigma <= 1 {
            new_offset = self.offset();
        }
        if self.sigma() > new_sigma {
            new_sigma = self.sigma();
        }
        if new_offset > 0 && new_offset >= new_sigma {
            return Err(IndexError::InvalidAlphabet {
                offset: new_offset,
                alphabet_size: new_sigma,
            });
        }

        if new_offset == self.offset() && new_sigma == self.sigma() {
            return Ok(());
        }
        if new_offset != self.offset() {
            trace!(offset = new_offset, "changing alphabet offset");
        }
        if new_sigma != self.sigma() {
            trace!(alphabet_size = new_sigma, "increasing alphabet size");
        }

        let old_offset = self.offset();
        let mut new_bwt = Vec::new();
        new_bwt.resize_with(new_sigma - new_offset, DynamicRecord::default);
        let mut records = std::mem::take(&mut self.bwt).into_iter();
        if let Some(endmarker) = records.next() {
            new_bwt[0] = endmarker;
        }
        for (i, record) in records.enumerate() {
            new_bwt[i + 1 + old_offset - new_offset] = record;
        }

        self.bwt = new_bwt;
        self.header.offset = new_offset as u64;
        self.header.alphabet_size = new_sigma as u64;
        Ok(())
    }

    /// Insert the sequences of `text`. Each sequence ends with the endmarker.
    ///
    /// Returns the number of iterations of the insertion algorithm.
    pub fn insert(&mut self, text: &[NodeId]) -> Result<usize> {
        let start = Instant::now();

        if text.is_empty() {
            return Ok(0);
        }
        if text.last() != Some(&ENDMARKER) {
            return Err(IndexError::MissingEndmarker);
        }

        // Start one cursor per sequence at the endmarker and find the node range.
        let (mut min_node, mut max_node) = if self.is_empty() {
            (NodeId::MAX, 0)
        } else {
            (self.offset() + 1, self.sigma() - 1)
        };
        let mut cursors = Vec::new();
        let mut seq_start = true;
        for (i, &node) in text.iter().enumerate() {
            if seq_start {
                let id = self.sequences() + cursors.len();
                cursors.push(Cursor::start(id, node, i));
                seq_start = false;
            }
            if node == ENDMARKER {
                seq_start = true;
            } else {
                min_node = min_node.min(node);
            }
            max_node = max_node.max(node);
        }
        if max_node == 0 {
            min_node = 1; // No real nodes; keep the offset at 0.
        }
        debug!(
            sequences = cursors.len(),
            length = text.len(),
            "inserting sequences"
        );

        self.resize(min_node - 1, max_node + 1)?;
        self.header.sequences += cursors.len() as u64;

        let iterations = insert_batch(self, cursors, &TextSource(text));
        self.recode();

        debug!(
            iterations,
            seconds = start.elapsed().as_secs_f64(),
            "insertion finished"
        );
        Ok(iterations)
    }

    /// Insert all sequences of `source` into this index.
    ///
    /// Sequences are inserted in batches of `batch_size`, or of the configured
    /// `merge_batch_size` when `None`. A batch size of 0 inserts everything at once.
    pub fn merge(&mut self, source: &DynamicIndex, batch_size: Option<usize>) -> Result<()> {
        let start = Instant::now();

        if source.is_empty() {
            debug!("the other index is empty");
            return Ok(());
        }
        if self.is_empty() {
            let config = self.config.clone();
            *self = source.clone();
            self.config = config;
            info!(
                sequences = source.sequences(),
                size = source.size(),
                seconds = start.elapsed().as_secs_f64(),
                "inserted into an empty index"
            );
            return Ok(());
        }

        let endmarker = source.record_at(ENDMARKER);
        if endmarker.size() != source.sequences() {
            return Err(IndexError::Corrupt(format!(
                "source has {} sequences but {} endmarker occurrences",
                source.sequences(),
                endmarker.size()
            )));
        }
        let batch_size = match batch_size.unwrap_or(self.config.merge_batch_size) {
            0 => source.sequences(),
            n => n,
        };
        self.resize(source.offset(), source.sigma())?;

        // Walk the source endmarker record to find the start of each sequence.
        let mut run_index = 0;
        let mut run_offset = 0;
        let mut source_offset = 0;
        while source_offset < source.sequences() {
            let batch_start = Instant::now();
            let limit = (source_offset + batch_size).min(source.sequences());
            let mut cursors = Vec::with_capacity(limit - source_offset);
            while source_offset < limit {
                let run = endmarker.body[run_index];
                if run_offset >= run.len {
                    run_index += 1;
                    run_offset = 0;
                    continue;
                }
                let id = self.sequences();
                cursors.push(Cursor::start(id, endmarker.successor(run.rank), source_offset));
                self.header.sequences += 1;
                source_offset += 1;
                run_offset += 1;
            }

            debug!(
                first = source_offset - cursors.len(),
                last = source_offset - 1,
                "inserting sequences"
            );
            let iterations = insert_batch(self, cursors, source);
            debug!(
                iterations,
                seconds = batch_start.elapsed().as_secs_f64(),
                "batch finished"
            );
        }

        self.recode();

        info!(
            sequences = source.sequences(),
            size = source.size(),
            seconds = start.elapsed().as_secs_f64(),
            "merge finished"
        );
        Ok(())
    }

    /// Sort the outgoing edges of every record by destination
    pub fn recode(&mut self) {
        let effective = self.effective().min(self.bwt.len());
        let records = &mut self.bwt[..effective];
        if self.config.parallel_recode {
            records.par_iter_mut().for_each(DynamicRecord::recode);
        } else {
            records.iter_mut().for_each(DynamicRecord::recode);
        }
    }

    /// Position in the body of `to` reached from the first `i` occurrences of `from`.
    ///
    /// Works for edges never observed in the index: the result is then the
    /// position where such occurrences would be inserted. Returns `None` if
    /// `to` is outside the alphabet.
    pub fn lf_to(&self, from: NodeId, i: usize, to: NodeId) -> Option<usize> {
        let to_record = self.record(to)?;
        if from >= self.sigma() {
            return Some(to_record.size());
        }
        if let Some(result) = self.record(from).and_then(|record| record.lf_to(i, to)) {
            return Some(result);
        }

        // Edge (from, to) has not been observed. Occurrences from `from` go
        // before those from the first predecessor >= `from`.
        let inrank = to_record.find_first(from);
        if inrank >= to_record.indegree() {
            return Some(to_record.size());
        }
        let next_from = self.record_at(to_record.predecessor(inrank));
        next_from.edge_to(to).map(|rank| next_from.offset(rank))
    }

    /// Follow position `i` of `from` to its successor.
    pub fn lf(&self, from: NodeId, i: usize) -> Option<(NodeId, usize)> {
        self.record(from)?.lf(i)
    }

    pub fn stats(&self) -> IndexStats {
        let records = &self.bwt[..self.effective().min(self.bwt.len())];
        IndexStats {
            sequences: self.sequences(),
            size: self.size(),
            offset: self.offset(),
            alphabet_size: self.sigma(),
            effective_alphabet: self.effective(),
            nodes: records.iter().skip(1).filter(|record| !record.is_empty()).count(),
            runs: self.runs(),
            edges: records.iter().map(DynamicRecord::outdegree).sum(),
            bidirectional: self.is_bidirectional(),
        }
    }

    /// First difference between the headers or records of two indexes
    pub fn first_mismatch(&self, other: &DynamicIndex) -> Option<Mismatch> {
        if self.header != other.header {
            return Some(Mismatch::Header {
                this: self.header,
                other: other.header,
            });
        }

        for comp in 0..self.effective() {
            let this = self.bwt.get(comp).cloned().unwrap_or_default();
            let another = other.bwt.get(comp).cloned().unwrap_or_default();
            if this != another {
                return Some(Mismatch::Record {
                    comp,
                    this,
                    other: another,
                });
            }
        }

        None
    }

    /// Compare two indexes, logging the first difference
    pub fn compare(&self, other: &DynamicIndex) -> bool {
        match self.first_mismatch(other) {
            Some(mismatch) => {
                info!("indexes differ\n{}", mismatch);
                false
            }
            None => {
                info!("the indexes are identical");
                true
            }
        }
    }
}

impl PartialEq for DynamicIndex {
    fn eq(&self, other: &Self) -> bool {
        self.first_mismatch(other).is_none()
    }
}

impl Eq for DynamicIndex {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::{Edge, Run};

    fn build(sequences: &[&[NodeId]]) -> DynamicIndex {
        let mut text = Vec::new();
        for seq in sequences {
            text.extend_from_slice(seq);
            text.push(ENDMARKER);
        }
        let mut index = DynamicIndex::new();
        index.insert(&text).unwrap();
        index
    }

    #[test]
    fn test_two_sequences() {
        let index = build(&[&[2, 3], &[3, 2]]);
        assert_eq!(index.sequences(), 2);
        assert_eq!(index.size(), 6);
        assert_eq!(index.offset(), 1);
        assert_eq!(index.sigma(), 4);
        assert_eq!(index.effective(), 3);

        let two = index.record(2).unwrap();
        assert_eq!(two.outgoing(), &[Edge::new(ENDMARKER, 0), Edge::new(3, 1)]);
        assert_eq!(two.body(), &[Run::new(1, 1), Run::new(0, 1)]);
        let three = index.record(3).unwrap();
        assert_eq!(three.outgoing(), &[Edge::new(ENDMARKER, 0), Edge::new(2, 1)]);

        let endmarker = index.record(ENDMARKER).unwrap();
        assert_eq!(endmarker.size(), 2);
        assert_eq!(endmarker.outgoing(), &[Edge::new(2, 0), Edge::new(3, 0)]);
        assert_eq!(endmarker.body(), &[Run::new(0, 1), Run::new(1, 1)]);
        assert_eq!(index.lf(ENDMARKER, 0), Some((2, 0)));
        assert_eq!(index.lf(ENDMARKER, 1), Some((3, 0)));
    }

    #[test]
    fn test_insert_requires_endmarker() {
        let mut index = DynamicIndex::new();
        assert!(matches!(
            index.insert(&[1, 2]),
            Err(IndexError::MissingEndmarker)
        ));
        assert!(index.is_empty());
        assert_eq!(index.insert(&[]).unwrap(), 0);
        assert!(index.is_empty());
    }

    #[test]
    fn test_only_endmarkers() {
        let mut index = DynamicIndex::new();
        index.insert(&[ENDMARKER, ENDMARKER]).unwrap();
        assert_eq!(index.sequences(), 2);
        assert_eq!(index.size(), 2);
        assert_eq!(index.offset(), 0);
        assert_eq!(index.sigma(), 1);
        assert_eq!(index.count(ENDMARKER), 2);
    }

    #[test]
    fn test_resize_moves_records() {
        let mut index = build(&[&[5, 6]]);
        assert_eq!(index.offset(), 4);
        let five = index.record(5).cloned().unwrap();

        index.resize(1, 10).unwrap();
        assert_eq!(index.offset(), 1);
        assert_eq!(index.sigma(), 10);
        assert_eq!(index.effective(), 9);
        assert_eq!(index.record(5), Some(&five));
        assert_eq!(index.count(ENDMARKER), 1);
        assert!(index.record(2).unwrap().is_empty());

        // Never grows the offset or shrinks the alphabet of a real index.
        index.resize(3, 2).unwrap();
        assert_eq!(index.offset(), 1);
        assert_eq!(index.sigma(), 10);
    }

    #[test]
    fn test_resize_rejects_invalid_window() {
        let mut index = DynamicIndex::new();
        assert!(matches!(
            index.resize(5, 5),
            Err(IndexError::InvalidAlphabet { offset: 5, alphabet_size: 5 })
        ));
        assert_eq!(index.sigma(), 0);
    }

    #[test]
    fn test_lf_to_unseen_edges() {
        // 2 -> 4 and 3 -> 4 observed; 1 -> 4 and 5 -> 4 never observed.
        let index = build(&[&[2, 4], &[3, 4], &[5]]);
        assert_eq!(index.lf_to(2, 1, 4), Some(1));
        assert_eq!(index.lf_to(3, 1, 4), Some(2));
        assert_eq!(index.lf_to(3, 0, 4), Some(1));
        // Before all predecessors of 4.
        assert_eq!(index.lf_to(1, 0, 4), Some(0));
        // After all predecessors of 4.
        assert_eq!(index.lf_to(5, 0, 4), Some(2));
        // Outside the alphabet.
        assert_eq!(index.lf_to(2, 0, 9), None);
        assert_eq!(index.lf_to(9, 0, 4), Some(2));
    }

    #[test]
    fn test_lf_out_of_range() {
        let index = build(&[&[2, 3]]);
        assert_eq!(index.lf(7, 0), None);
        assert_eq!(index.lf(2, 1), None);
        assert_eq!(index.lf(2, 0), Some((3, 0)));
    }

    #[test]
    fn test_stats() {
        let index = build(&[&[2, 3], &[3, 2]]);
        let stats = index.stats();
        assert_eq!(stats.sequences, 2);
        assert_eq!(stats.size, 6);
        assert_eq!(stats.nodes, 2);
        assert_eq!(stats.edges, 6);
        assert_eq!(stats.runs, index.runs());
        assert!(!stats.bidirectional);
    }

    #[test]
    fn test_first_mismatch() {
        let a = build(&[&[2, 3]]);
        let b = build(&[&[2, 3]]);
        assert!(a.compare(&b));
        assert_eq!(a, b);

        let c = build(&[&[2, 2]]);
        match a.first_mismatch(&c) {
            Some(Mismatch::Header { .. }) => {}
            other => panic!("expected header mismatch, got {:?}", other),
        }

        let mut d = build(&[&[2, 3]]);
        d.record_at_mut(3).increment(2);
        match a.first_mismatch(&d) {
            Some(Mismatch::Record { comp, .. }) => assert_eq!(comp, 2),
            other => panic!("expected record mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_bidirectional_flag() {
        let mut index = DynamicIndex::new();
        index.set_bidirectional(true);
        assert!(index.is_bidirectional());
        index.set_bidirectional(false);
        assert!(!index.is_bidirectional());
    }
}
