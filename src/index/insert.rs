//! Batched insertion of sequences
//!
//! All sequences of a batch advance one position per iteration. Cursors are
//! kept sorted by `(curr, offset)` at the start of each iteration, so every
//! record is rewritten once per iteration by a single [`RunMerger`] pass.
//!
//! One iteration:
//! 1. For each group of cursors sharing `curr`, merge one occurrence of the
//!    edge to `next` into the body of `curr` at `offset`, store the rank of
//!    that occurrence among `curr -> next` transitions in `rank` and count the
//!    transition in the incoming edges of `next`.
//! 2. Move the source position forward and sort by `(next, curr, rank)`.
//!    Cursors whose `next` is the endmarker are finished.
//! 3. Recompute the offsets of all edges into each remaining `next` from its
//!    incoming edges, then set `offset = edge offset + rank`, which is the
//!    position of the cursor in the body of `next`.
//! 4. Move to `next` and read the following node from the source.

use super::dynamic::DynamicIndex;
use super::merger::RunMerger;
use super::types::{NodeId, Run, ENDMARKER};
use rayon::prelude::*;

/// State of a sequence being inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cursor {
    pub curr: NodeId,
    pub next: NodeId,
    /// Position in the body of `curr` where the transition to `next` goes
    pub offset: usize,
    /// Rank of the inserted transition among `curr -> next` transitions
    pub rank: usize,
    /// Text position of `next`, or offset in the source record of `curr`
    pub source_pos: usize,
}

impl Cursor {
    /// Cursor at the endmarker for sequence `id`, which is inserted after the
    /// existing `id` sequences of the target index
    pub fn start(id: usize, next: NodeId, source_pos: usize) -> Self {
        Self {
            curr: ENDMARKER,
            next,
            offset: id,
            rank: 0,
            source_pos,
        }
    }

    #[inline]
    fn sort_key(&self) -> (NodeId, NodeId, usize) {
        (self.next, self.curr, self.rank)
    }
}

/// Where the sequences being inserted come from
pub(crate) trait Source {
    /// Move the source position from `curr` to `next`.
    /// Cursors are grouped by `curr`.
    fn next_position(&self, cursors: &mut [Cursor]);

    /// Move each cursor to `next` and read the following node.
    /// Cursors are grouped by `next`.
    fn advance_position(&self, cursors: &mut [Cursor]);
}

/// Concatenated endmarker-terminated sequences
pub(crate) struct TextSource<'a>(pub &'a [NodeId]);

impl Source for TextSource<'_> {
    fn next_position(&self, cursors: &mut [Cursor]) {
        for cursor in cursors {
            cursor.source_pos += 1;
        }
    }

    fn advance_position(&self, cursors: &mut [Cursor]) {
        for cursor in cursors {
            cursor.curr = cursor.next;
            cursor.next = self.0[cursor.source_pos];
        }
    }
}

impl Source for DynamicIndex {
    fn next_position(&self, cursors: &mut [Cursor]) {
        let mut i = 0;
        while i < cursors.len() {
            let curr = cursors[i].curr;
            let record = self.record_at(curr);
            let mut counts: Vec<usize> = record.outgoing.iter().map(|edge| edge.offset).collect();
            let mut runs = record.body.iter();
            let mut end = 0;
            let mut rank = 0;
            while i < cursors.len() && cursors[i].curr == curr {
                let pos = cursors[i].source_pos;
                while end <= pos {
                    let Some(run) = runs.next() else { break };
                    end += run.len;
                    rank = run.rank;
                    counts[rank] += run.len;
                }
                debug_assert!(end > pos, "source offset past the end of the record");
                cursors[i].source_pos = counts[rank] - (end - pos);
                i += 1;
            }
        }
    }

    fn advance_position(&self, cursors: &mut [Cursor]) {
        let mut i = 0;
        while i < cursors.len() {
            let node = cursors[i].next;
            let record = self.record_at(node);
            let mut runs = record.body.iter();
            let mut end = 0;
            let mut rank = 0;
            while i < cursors.len() && cursors[i].next == node {
                let pos = cursors[i].source_pos;
                while end <= pos {
                    let Some(run) = runs.next() else { break };
                    end += run.len;
                    rank = run.rank;
                }
                cursors[i].curr = node;
                cursors[i].next = record.successor(rank);
                i += 1;
            }
        }
    }
}

/// Insert the sequences behind `cursors`, which must be sorted by
/// `(curr, offset)`. Returns the number of iterations.
pub(crate) fn insert_batch<S: Source + ?Sized>(
    index: &mut DynamicIndex,
    mut cursors: Vec<Cursor>,
    source: &S,
) -> usize {
    let mut iterations = 0;
    loop {
        iterations += 1;

        let mut start = 0;
        while start < cursors.len() {
            let curr = cursors[start].curr;
            let len = cursors[start..]
                .iter()
                .position(|cursor| cursor.curr != curr)
                .unwrap_or(cursors.len() - start);
            merge_group(index, &mut cursors[start..start + len]);
            start += len;
        }
        index.header.size += cursors.len() as u64;
        source.next_position(&mut cursors);

        // Sorting by (next, curr, rank) now is sorting by (curr, offset)
        // in the next iteration.
        sort_cursors(&mut cursors, index.config.parallel_sort_threshold);
        let finished = cursors.partition_point(|cursor| cursor.next == ENDMARKER);
        cursors.drain(..finished);
        if cursors.is_empty() {
            return iterations;
        }

        rebuild_edge_offsets(index, &cursors);
        for cursor in cursors.iter_mut() {
            let record = index.record_at(cursor.curr);
            let edge_offset = record
                .edge_to(cursor.next)
                .map_or(0, |rank| record.offset(rank));
            cursor.offset = edge_offset + cursor.rank;
        }
        source.advance_position(&mut cursors);
    }
}

/// Rewrite the body of the record shared by `group`, inserting one
/// transition per cursor.
fn merge_group(index: &mut DynamicIndex, group: &mut [Cursor]) {
    let curr = group[0].curr;
    let comp = index.to_comp(curr);
    let mut old_body = index.bwt[comp].take_body();
    let mut merger = RunMerger::new(index.bwt[comp].outdegree());
    let mut old_run = 0;

    for cursor in group.iter_mut() {
        let record = &mut index.bwt[comp];
        let rank = match record.edge_to(cursor.next) {
            Some(rank) => rank,
            None => {
                merger.add_edge();
                record.add_edge(cursor.next)
            }
        };

        // Copy old runs up to the insertion point, splitting the last one.
        while merger.size() < cursor.offset {
            let Some(run) = old_body.get_mut(old_run) else { break };
            let needed = cursor.offset - merger.size();
            if run.len <= needed {
                merger.insert_run(*run);
                old_run += 1;
            } else {
                merger.insert_run(Run::new(run.rank, needed));
                run.len -= needed;
            }
        }
        cursor.rank = merger.count(rank);
        merger.insert(rank);

        // The endmarker does not track incoming edges.
        if cursor.next != ENDMARKER {
            index.record_at_mut(cursor.next).increment(curr);
        }
    }

    for &run in &old_body[old_run..] {
        merger.insert_run(run);
    }
    index.bwt[comp].swap_body(merger);
}

fn sort_cursors(cursors: &mut [Cursor], parallel_threshold: usize) {
    if cursors.len() > parallel_threshold {
        cursors.par_sort_unstable_by_key(Cursor::sort_key);
    } else {
        cursors.sort_unstable_by_key(Cursor::sort_key);
    }
}

/// Set the offsets of the edges into each distinct `next`. Occurrences in the
/// body of `next` are ordered by predecessor id.
fn rebuild_edge_offsets(index: &mut DynamicIndex, cursors: &[Cursor]) {
    let mut previous = None;
    for cursor in cursors {
        let next = cursor.next;
        if previous == Some(next) {
            continue;
        }
        previous = Some(next);

        let mut offset = 0;
        for k in 0..index.record_at(next).indegree() {
            let inedge = index.record_at(next).incoming[k];
            let predecessor = index.record_at_mut(inedge.node);
            if let Some(rank) = predecessor.edge_to(next) {
                predecessor.set_offset(rank, offset);
            }
            offset += inedge.count;
        }
    }
}
