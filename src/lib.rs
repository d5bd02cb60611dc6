//! # dynbwt - Dynamic run-length BWT over node sequences
//!
//! A mutable run-length encoded Burrows-Wheeler transform for collections of
//! paths over an integer alphabet, as used for haplotype paths in sequence
//! graphs. Each node keeps its own record of outgoing edges and a run-length
//! body; LF-mapping follows a position in one node's body to the next node.
//!
//! ## Architecture
//!
//! - [`index`] - Records, the run merger, batched insertion, merging and persistence
//! - [`error`] - Error types
//! - [`output`] - Colored verdicts for the binary
//! - [`utils`] - Varint and run coding, configuration loading, progress bars
//!
//! ## Quick Start
//!
//! ```
//! use dynbwt::index::{DynamicIndex, ENDMARKER};
//!
//! let mut index = DynamicIndex::new();
//! index.insert(&[1, 2, ENDMARKER, 1, 3, ENDMARKER]).unwrap();
//! assert_eq!(index.sequences(), 2);
//!
//! // The second occurrence of node 1 continues to node 3.
//! assert_eq!(index.lf(1, 1), Some((3, 0)));
//! ```
//!
//! ## Insertion
//!
//! Sequences are inserted in batches: every sequence of a batch advances by
//! one node per iteration, and every touched record is rewritten once per
//! iteration. Merging another index reuses the same engine with the other
//! index as the source of sequences.

pub mod error;
pub mod index;
pub mod output;
pub mod utils;
