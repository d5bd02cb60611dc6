//! The dynamic index and its building blocks.
//!
//! - [`record`] - one node: outgoing edges, run-length body, incoming edges
//! - [`merger`] - builds canonical run-length bodies
//! - [`dynamic`] - the container over a compacted alphabet
//! - [`writer`] / [`reader`] - serialization
//! - [`build`] / [`stats`] - file-level operations used by the binary

pub mod build;
pub mod dynamic;
pub mod header;
pub(crate) mod insert;
pub mod merger;
pub mod reader;
pub mod record;
pub mod stats;
pub mod types;
pub mod writer;

pub use dynamic::{DynamicIndex, IndexStats, Mismatch};
pub use header::Header;
pub use merger::RunMerger;
pub use record::DynamicRecord;
pub use types::*;
