use serde::{Deserialize, Serialize};

/// Identifier of a node, i.e. a symbol of the transform
pub type NodeId = usize;

/// Node identifier terminating every sequence
pub const ENDMARKER: NodeId = 0;

/// A maximal repetition of one outgoing edge in a record body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Run {
    /// Rank of the outgoing edge
    pub rank: usize,
    /// Number of consecutive occurrences
    pub len: usize,
}

impl Run {
    #[inline]
    pub fn new(rank: usize, len: usize) -> Self {
        Self { rank, len }
    }
}

/// Outgoing edge of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Edge {
    /// Destination node
    pub node: NodeId,
    /// Offset in the destination body where the occurrences reached
    /// through this edge begin
    pub offset: usize,
}

impl Edge {
    #[inline]
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// Incoming edge of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct InEdge {
    /// Predecessor node
    pub node: NodeId,
    /// Number of occurrences in the predecessor leading to this record
    pub count: usize,
}

impl InEdge {
    #[inline]
    pub fn new(node: NodeId, count: usize) -> Self {
        Self { node, count }
    }
}

/// Tuning knobs for building and merging indexes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Number of sequences inserted per batch when merging (0 = all at once)
    pub merge_batch_size: usize,
    /// Recode records in parallel after insertion
    pub parallel_recode: bool,
    /// Cursor count above which the per-iteration sort runs in parallel
    pub parallel_sort_threshold: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            merge_batch_size: 0,
            parallel_recode: true,
            parallel_sort_threshold: 1 << 16,
        }
    }
}
