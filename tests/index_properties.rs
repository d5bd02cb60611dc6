//! End-to-end tests of insertion, merging and serialization, checked against
//! a naive model that sorts every occurrence by its reversed prefix.

use dynbwt::index::{DynamicIndex, DynamicRecord, IndexConfig, NodeId, ENDMARKER};
use proptest::prelude::*;
use std::collections::BTreeMap;

/// One occurrence of a node: sort key, predecessor and successor
struct Occurrence {
    key: Vec<NodeId>,
    predecessor: NodeId,
    successor: NodeId,
}

/// Successors of every node in BWT order, built by brute force.
///
/// An occurrence at position `k` of sequence `id` is ordered by
/// `seq[k - 1], ..., seq[0], ENDMARKER, id`.
struct Model {
    nodes: BTreeMap<NodeId, Vec<Occurrence>>,
}

impl Model {
    fn new(sequences: &[Vec<NodeId>]) -> Self {
        let mut nodes: BTreeMap<NodeId, Vec<Occurrence>> = BTreeMap::new();
        for (id, sequence) in sequences.iter().enumerate() {
            nodes.entry(ENDMARKER).or_default().push(Occurrence {
                key: vec![id],
                predecessor: ENDMARKER,
                successor: sequence[0],
            });
            for (k, &node) in sequence.iter().enumerate() {
                let mut key: Vec<NodeId> = sequence[..k].iter().rev().copied().collect();
                key.push(ENDMARKER);
                key.push(id);
                nodes.entry(node).or_default().push(Occurrence {
                    key,
                    predecessor: if k == 0 { ENDMARKER } else { sequence[k - 1] },
                    successor: sequence.get(k + 1).copied().unwrap_or(ENDMARKER),
                });
            }
        }
        for occurrences in nodes.values_mut() {
            occurrences.sort_by(|a, b| a.key.cmp(&b.key));
        }
        Self { nodes }
    }

    fn successors(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&node)
            .map(|occs| occs.iter().map(|occ| occ.successor).collect())
            .unwrap_or_default()
    }

    /// Occurrences of `to` entered from predecessors before `from`, plus
    /// transitions `from -> to` among the first `i` occurrences of `from`
    fn lf_to(&self, from: NodeId, i: usize, to: NodeId) -> usize {
        let before = self
            .nodes
            .get(&to)
            .map_or(0, |occs| occs.iter().filter(|occ| occ.predecessor < from).count());
        let within = self.successors(from).iter().take(i).filter(|&&node| node == to).count();
        before + within
    }
}

fn expand(record: &DynamicRecord) -> Vec<NodeId> {
    record
        .body()
        .iter()
        .flat_map(|run| std::iter::repeat(record.successor(run.rank)).take(run.len))
        .collect()
}

fn to_text(sequences: &[Vec<NodeId>]) -> Vec<NodeId> {
    let mut text = Vec::new();
    for sequence in sequences {
        text.extend_from_slice(sequence);
        text.push(ENDMARKER);
    }
    text
}

fn build(sequences: &[Vec<NodeId>]) -> DynamicIndex {
    let mut index = DynamicIndex::new();
    index.insert(&to_text(sequences)).unwrap();
    index
}

fn nodes_of(sequences: &[Vec<NodeId>]) -> Vec<NodeId> {
    let mut nodes: Vec<NodeId> = sequences.iter().flatten().copied().collect();
    nodes.sort_unstable();
    nodes.dedup();
    nodes
}

/// Structural invariants every index must satisfy
fn check_invariants(index: &DynamicIndex, sequences: &[Vec<NodeId>]) {
    let total: usize = sequences.iter().map(|sequence| sequence.len() + 1).sum();
    assert_eq!(index.sequences(), sequences.len());
    assert_eq!(index.size(), total);
    assert_eq!(index.count(ENDMARKER), sequences.len());

    let mut recorded = 0;
    for node in std::iter::once(ENDMARKER).chain(index.offset() + 1..index.sigma()) {
        let Some(record) = index.record(node) else { continue };
        recorded += record.size();

        // Canonical runs
        for pair in record.body().windows(2) {
            assert_ne!(pair[0].rank, pair[1].rank, "adjacent runs share a rank at {}", node);
        }
        assert!(record.body().iter().all(|run| run.len > 0));
        // Sorted outgoing edges
        assert!(record.outgoing().windows(2).all(|pair| pair[0].node < pair[1].node));
        // Incoming counts cover the body
        if node != ENDMARKER {
            let incoming: usize = record.incoming().iter().map(|edge| edge.count).sum();
            assert_eq!(incoming, record.size(), "incoming counts at {}", node);
        }
    }
    assert_eq!(recorded, total);
}

#[test]
fn test_single_sequence() {
    let sequences = vec![vec![1, 2, 3]];
    let index = build(&sequences);
    check_invariants(&index, &sequences);
    assert_eq!(index.offset(), 0);
    assert_eq!(index.sigma(), 4);
    assert_eq!(index.lf(ENDMARKER, 0), Some((1, 0)));
    assert_eq!(index.lf(1, 0), Some((2, 0)));
    assert_eq!(index.lf(2, 0), Some((3, 0)));
    assert_eq!(index.lf(3, 0).map(|(node, _)| node), Some(ENDMARKER));
}

#[test]
fn test_shared_prefix() {
    let sequences = vec![vec![4, 5, 7], vec![4, 6, 7], vec![4, 5, 7]];
    let index = build(&sequences);
    check_invariants(&index, &sequences);
    assert_eq!(index.offset(), 3);

    let model = Model::new(&sequences);
    for node in nodes_of(&sequences) {
        assert_eq!(expand(index.record(node).unwrap()), model.successors(node));
    }
    // Occurrences of 7 are ordered by predecessor: 5, 5, 6.
    assert_eq!(index.record(7).unwrap().incoming().len(), 2);
    assert_eq!(index.lf(6, 0), Some((7, 2)));
}

#[test]
fn test_empty_text_is_noop() {
    let mut index = DynamicIndex::new();
    assert_eq!(index.insert(&[]).unwrap(), 0);
    assert!(index.is_empty());
    assert_eq!(index.sigma(), 0);
}

#[test]
fn test_missing_endmarker() {
    let mut index = build(&[vec![2, 3]]);
    let before = index.clone();
    assert!(index.insert(&[2, 3]).is_err());
    assert_eq!(index, before);
}

#[test]
fn test_incremental_insert_equals_batch() {
    let sequences = vec![vec![5, 6], vec![2, 9, 2], vec![6, 5, 6]];
    let batch = build(&sequences);
    let mut incremental = DynamicIndex::new();
    for sequence in &sequences {
        incremental.insert(&to_text(std::slice::from_ref(sequence))).unwrap();
    }
    assert_eq!(incremental, batch);
    check_invariants(&incremental, &sequences);
}

#[test]
fn test_merge_into_empty_and_from_empty() {
    let sequences = vec![vec![3, 4], vec![4, 3]];
    let index = build(&sequences);

    let mut empty = DynamicIndex::new();
    empty.merge(&index, None).unwrap();
    assert_eq!(empty, index);

    let mut copy = index.clone();
    copy.merge(&DynamicIndex::new(), None).unwrap();
    assert_eq!(copy, index);
}

#[test]
fn test_merge_keeps_config() {
    let config = IndexConfig {
        merge_batch_size: 1,
        parallel_recode: false,
        parallel_sort_threshold: 0,
    };
    let mut target = DynamicIndex::with_config(config.clone());
    target.merge(&build(&[vec![1, 2]]), None).unwrap();
    assert_eq!(target.config(), &config);
}

#[test]
fn test_serialize_after_merge() {
    let first = vec![vec![10, 11, 12], vec![11, 12]];
    let second = vec![vec![12, 10], vec![13]];
    let mut index = build(&first);
    index.merge(&build(&second), Some(1)).unwrap();

    let mut buf = Vec::new();
    index.serialize(&mut buf).unwrap();
    let loaded = DynamicIndex::load(&mut buf.as_slice()).unwrap();
    assert!(loaded.compare(&index));

    let all: Vec<Vec<NodeId>> = first.into_iter().chain(second).collect();
    check_invariants(&loaded, &all);
}

#[test]
fn test_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roundtrip.dbwt");
    let sequences = vec![vec![2, 2, 2], vec![3, 2]];
    let mut index = build(&sequences);
    index.set_bidirectional(true);
    index.save(&path).unwrap();

    let loaded = DynamicIndex::open(&path).unwrap();
    assert_eq!(loaded, index);
    assert!(loaded.is_bidirectional());
}

#[test]
fn test_first_mismatch() {
    let a = build(&[vec![1, 2]]);
    let b = build(&[vec![1, 3]]);
    assert!(a.first_mismatch(&a.clone()).is_none());
    assert!(a.first_mismatch(&b).is_some());
    assert!(!a.compare(&b));
}

fn sequences_strategy() -> impl Strategy<Value = Vec<Vec<NodeId>>> {
    prop::collection::vec(prop::collection::vec(1usize..12, 1..8), 1..6)
}

proptest! {
    #[test]
    fn prop_insert_matches_model(sequences in sequences_strategy()) {
        let index = build(&sequences);
        check_invariants(&index, &sequences);

        let model = Model::new(&sequences);
        prop_assert_eq!(expand(index.record(ENDMARKER).unwrap()), model.successors(ENDMARKER));
        for node in nodes_of(&sequences) {
            prop_assert_eq!(expand(index.record(node).unwrap()), model.successors(node));
        }
    }

    #[test]
    fn prop_lf_matches_model(sequences in sequences_strategy()) {
        let index = build(&sequences);
        let model = Model::new(&sequences);
        let nodes = nodes_of(&sequences);

        for &to in &nodes {
            for from in 1..index.sigma() + 2 {
                for i in 0..=model.successors(from).len() {
                    prop_assert_eq!(
                        index.lf_to(from, i, to),
                        Some(model.lf_to(from, i, to)),
                        "lf_to({}, {}, {})", from, i, to
                    );
                }
            }
        }

        for &from in &nodes {
            for (i, &successor) in model.successors(from).iter().enumerate() {
                if successor == ENDMARKER {
                    continue;
                }
                prop_assert_eq!(
                    index.lf(from, i),
                    Some((successor, model.lf_to(from, i, successor)))
                );
            }
        }
    }

    #[test]
    fn prop_merge_equals_insert(
        first in sequences_strategy(),
        second in sequences_strategy(),
        batch_size in 0usize..4,
    ) {
        let mut merged = build(&first);
        merged.merge(&build(&second), Some(batch_size)).unwrap();

        let all: Vec<Vec<NodeId>> = first.iter().chain(second.iter()).cloned().collect();
        let expected = build(&all);
        prop_assert!(merged.first_mismatch(&expected).is_none());
    }

    #[test]
    fn prop_serialize_roundtrip(sequences in sequences_strategy()) {
        let index = build(&sequences);
        let mut buf = Vec::new();
        let written = index.serialize(&mut buf).unwrap();
        prop_assert_eq!(written, buf.len());

        let loaded = DynamicIndex::load(&mut buf.as_slice()).unwrap();
        prop_assert!(loaded.first_mismatch(&index).is_none());
        for node in nodes_of(&sequences) {
            prop_assert_eq!(
                loaded.record(node).unwrap().incoming(),
                index.record(node).unwrap().incoming()
            );
        }
    }
}
