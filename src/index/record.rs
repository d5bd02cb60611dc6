//! Per-node record of the dynamic index
//!
//! A record stores one column of the transform: the outgoing edges of the
//! node, the run-length encoded sequence of edge choices (the body) and the
//! incoming edges with predecessor counts. Records refer to each other only
//! by node id, so the record array can be reallocated freely.

use super::merger::RunMerger;
use super::types::{Edge, InEdge, NodeId, Run};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DynamicRecord {
    pub(crate) body_size: usize,
    pub(crate) incoming: Vec<InEdge>,
    pub(crate) outgoing: Vec<Edge>,
    pub(crate) body: Vec<Run>,
}

impl DynamicRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from decoded edges and body. Returns `None` if the
    /// body length overflows.
    pub(crate) fn from_parts(outgoing: Vec<Edge>, body: Vec<Run>) -> Option<Self> {
        let body_size = body
            .iter()
            .try_fold(0usize, |total, run| total.checked_add(run.len))?;
        Some(Self {
            body_size,
            incoming: Vec::new(),
            outgoing,
            body,
        })
    }

    /// Number of occurrences of the node
    #[inline]
    pub fn size(&self) -> usize {
        self.body_size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.body_size == 0
    }

    /// Number of runs in the body
    #[inline]
    pub fn runs(&self) -> usize {
        self.body.len()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn body(&self) -> &[Run] {
        &self.body
    }

    pub fn outgoing(&self) -> &[Edge] {
        &self.outgoing
    }

    pub fn incoming(&self) -> &[InEdge] {
        &self.incoming
    }

    #[inline]
    pub fn outdegree(&self) -> usize {
        self.outgoing.len()
    }

    #[inline]
    pub fn successor(&self, rank: usize) -> NodeId {
        self.outgoing[rank].node
    }

    /// Stored offset of outgoing edge `rank` in the successor's body
    #[inline]
    pub fn offset(&self, rank: usize) -> usize {
        self.outgoing[rank].offset
    }

    #[inline]
    pub fn indegree(&self) -> usize {
        self.incoming.len()
    }

    #[inline]
    pub fn predecessor(&self, rank: usize) -> NodeId {
        self.incoming[rank].node
    }

    #[inline]
    pub fn count(&self, rank: usize) -> usize {
        self.incoming[rank].count
    }

    /// Rank of the outgoing edge to `node`
    pub fn edge_to(&self, node: NodeId) -> Option<usize> {
        self.outgoing.iter().position(|edge| edge.node == node)
    }

    /// Follow position `i` of the body to the successor record.
    ///
    /// Returns the successor and the position within its body, or `None` if
    /// `i` is past the end of the body.
    pub fn lf(&self, i: usize) -> Option<(NodeId, usize)> {
        if i >= self.body_size {
            return None;
        }

        let mut counts: Vec<usize> = self.outgoing.iter().map(|edge| edge.offset).collect();
        let mut end = 0;
        for run in &self.body {
            end += run.len;
            if end > i {
                let within = run.len - (end - i);
                return Some((self.successor(run.rank), counts[run.rank] + within));
            }
            counts[run.rank] += run.len;
        }

        None
    }

    /// Position in the body of `to` reached from the first `i` occurrences
    /// of this node. Returns `None` if there is no edge to `to`.
    pub fn lf_to(&self, i: usize, to: NodeId) -> Option<usize> {
        let rank = self.edge_to(to)?;
        let mut result = self.offset(rank);
        let mut remaining = i;
        for run in &self.body {
            if remaining == 0 {
                break;
            }
            let taken = remaining.min(run.len);
            if run.rank == rank {
                result += taken;
            }
            remaining -= taken;
        }
        Some(result)
    }

    /// Occurrences of each outgoing edge in the body
    pub fn rank_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.outdegree()];
        for run in &self.body {
            counts[run.rank] += run.len;
        }
        counts
    }

    /// Count one more transition from `from` into this node
    pub fn increment(&mut self, from: NodeId) {
        match self.incoming.binary_search_by_key(&from, |edge| edge.node) {
            Ok(i) => self.incoming[i].count += 1,
            Err(i) => self.incoming.insert(i, InEdge::new(from, 1)),
        }
    }

    /// Add an incoming edge, keeping incoming edges sorted by predecessor
    pub fn add_incoming(&mut self, inedge: InEdge) {
        match self.incoming.binary_search_by_key(&inedge.node, |edge| edge.node) {
            Ok(i) => self.incoming[i].count += inedge.count,
            Err(i) => self.incoming.insert(i, inedge),
        }
    }

    /// Rank of the first incoming edge from a node `>= from`; `indegree()` if none
    pub fn find_first(&self, from: NodeId) -> usize {
        self.incoming.partition_point(|edge| edge.node < from)
    }

    /// Sort the outgoing edges by destination and renumber the body
    pub fn recode(&mut self) {
        if self.outgoing.windows(2).all(|pair| pair[0].node <= pair[1].node) {
            return;
        }

        let mut order: Vec<usize> = (0..self.outdegree()).collect();
        order.sort_unstable_by_key(|&rank| self.outgoing[rank].node);
        let mut new_rank = vec![0; self.outdegree()];
        for (new, &old) in order.iter().enumerate() {
            new_rank[old] = new;
        }

        for run in &mut self.body {
            run.rank = new_rank[run.rank];
        }
        self.outgoing = order.iter().map(|&rank| self.outgoing[rank]).collect();
    }

    /// Append an outgoing edge to `node` and return its rank
    pub(crate) fn add_edge(&mut self, node: NodeId) -> usize {
        self.outgoing.push(Edge::new(node, 0));
        self.outgoing.len() - 1
    }

    pub(crate) fn set_offset(&mut self, rank: usize, offset: usize) {
        self.outgoing[rank].offset = offset;
    }

    /// Detach the body for merging. The body size stays until `swap_body`.
    pub(crate) fn take_body(&mut self) -> Vec<Run> {
        std::mem::take(&mut self.body)
    }

    /// Replace the body with the result of a merge
    pub(crate) fn swap_body(&mut self, merger: RunMerger) {
        let (body, body_size) = merger.finish();
        self.body = body;
        self.body_size = body_size;
    }
}

impl fmt::Display for DynamicRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(size {}, {} runs, indegree {}, outdegree {}, incoming = [",
            self.size(),
            self.runs(),
            self.indegree(),
            self.outdegree()
        )?;
        for (i, edge) in self.incoming.iter().enumerate() {
            let sep = if i > 0 { ", " } else { "" };
            write!(f, "{}({}, {})", sep, edge.node, edge.count)?;
        }
        write!(f, "], outgoing = [")?;
        for (i, edge) in self.outgoing.iter().enumerate() {
            let sep = if i > 0 { ", " } else { "" };
            write!(f, "{}({}, {})", sep, edge.node, edge.offset)?;
        }
        write!(f, "], body = [")?;
        for (i, run) in self.body.iter().enumerate() {
            let sep = if i > 0 { ", " } else { "" };
            write!(f, "{}({}, {})", sep, run.rank, run.len)?;
        }
        write!(f, "])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Outgoing edges to 7 (offset 2) and 3 (offset 5), body 7 7 3 7 3 3.
    fn sample() -> DynamicRecord {
        DynamicRecord::from_parts(
            vec![Edge::new(7, 2), Edge::new(3, 5)],
            vec![Run::new(0, 2), Run::new(1, 1), Run::new(0, 1), Run::new(1, 2)],
        )
        .unwrap()
    }

    #[test]
    fn test_queries() {
        let record = sample();
        assert_eq!(record.size(), 6);
        assert_eq!(record.runs(), 4);
        assert_eq!(record.outdegree(), 2);
        assert_eq!(record.edge_to(3), Some(1));
        assert_eq!(record.edge_to(4), None);
        assert_eq!(record.rank_counts(), vec![3, 3]);
    }

    #[test]
    fn test_lf() {
        let record = sample();
        assert_eq!(record.lf(0), Some((7, 2)));
        assert_eq!(record.lf(1), Some((7, 3)));
        assert_eq!(record.lf(2), Some((3, 5)));
        assert_eq!(record.lf(3), Some((7, 4)));
        assert_eq!(record.lf(5), Some((3, 7)));
        assert_eq!(record.lf(6), None);
        assert_eq!(DynamicRecord::new().lf(0), None);
    }

    #[test]
    fn test_lf_to() {
        let record = sample();
        assert_eq!(record.lf_to(0, 7), Some(2));
        assert_eq!(record.lf_to(3, 7), Some(4));
        assert_eq!(record.lf_to(3, 3), Some(6));
        assert_eq!(record.lf_to(6, 3), Some(8));
        assert_eq!(record.lf_to(2, 9), None);
    }

    #[test]
    fn test_incoming_stays_sorted() {
        let mut record = DynamicRecord::new();
        record.increment(5);
        record.increment(2);
        record.increment(5);
        record.add_incoming(InEdge::new(3, 4));
        assert_eq!(
            record.incoming(),
            &[InEdge::new(2, 1), InEdge::new(3, 4), InEdge::new(5, 2)]
        );
        assert_eq!(record.find_first(0), 0);
        assert_eq!(record.find_first(3), 1);
        assert_eq!(record.find_first(4), 2);
        assert_eq!(record.find_first(6), record.indegree());
    }

    #[test]
    fn test_recode_sorts_edges() {
        let mut record = sample();
        record.recode();
        assert_eq!(record.outgoing(), &[Edge::new(3, 5), Edge::new(7, 2)]);
        assert_eq!(
            record.body(),
            &[Run::new(1, 2), Run::new(0, 1), Run::new(1, 1), Run::new(0, 2)]
        );
        // Positions map to the same destinations as before.
        let original = sample();
        for i in 0..record.size() {
            assert_eq!(record.lf(i), original.lf(i));
        }
    }

    #[test]
    fn test_swap_body() {
        let mut record = DynamicRecord::new();
        let rank = record.add_edge(4);
        let mut merger = RunMerger::new(0);
        merger.add_edge();
        merger.insert(rank);
        merger.insert(rank);
        record.swap_body(merger);
        assert_eq!(record.size(), 2);
        assert_eq!(record.body(), &[Run::new(0, 2)]);
    }

    #[test]
    fn test_display() {
        let mut record = sample();
        record.increment(1);
        assert_eq!(
            record.to_string(),
            "(size 6, 4 runs, indegree 1, outdegree 2, incoming = [(1, 1)], \
             outgoing = [(7, 2), (3, 5)], body = [(0, 2), (1, 1), (0, 1), (1, 2)])"
        );
    }
}
