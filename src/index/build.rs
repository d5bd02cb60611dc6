use crate::index::dynamic::DynamicIndex;
use crate::index::types::{IndexConfig, NodeId, ENDMARKER};
use crate::utils::progress::{ProgressBar, ProgressStyle};
use anyhow::{bail, Context, Result};
use memchr::memchr_iter;
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Parse a sequence file: one sequence of whitespace-separated node ids per
/// line. Blank lines are skipped.
pub fn parse_sequences(content: &[u8]) -> Result<Vec<Vec<NodeId>>> {
    let mut sequences = Vec::new();
    let mut line_start = 0;
    let line_ends = memchr_iter(b'\n', content).chain(std::iter::once(content.len()));

    for (line_num, line_end) in line_ends.enumerate() {
        let line = &content[line_start..line_end];
        line_start = line_end + 1;

        let line = std::str::from_utf8(line)
            .with_context(|| format!("line {}: invalid UTF-8", line_num + 1))?;
        let mut sequence = Vec::new();
        for token in line.split_ascii_whitespace() {
            let node: NodeId = token
                .parse()
                .with_context(|| format!("line {}: invalid node id '{}'", line_num + 1, token))?;
            if node == ENDMARKER {
                bail!("line {}: node id {} is reserved for the endmarker", line_num + 1, ENDMARKER);
            }
            sequence.push(node);
        }
        if !sequence.is_empty() {
            sequences.push(sequence);
        }
    }

    Ok(sequences)
}

/// Read and parse a sequence file
pub fn read_sequences(path: &Path) -> Result<Vec<Vec<NodeId>>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    if file.metadata()?.len() == 0 {
        return Ok(Vec::new());
    }
    let mmap = unsafe { Mmap::map(&file)? };
    parse_sequences(&mmap).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Concatenate sequences into endmarker-terminated text
pub fn to_text(sequences: &[Vec<NodeId>]) -> Vec<NodeId> {
    let len = sequences.iter().map(|sequence| sequence.len() + 1).sum();
    let mut text = Vec::with_capacity(len);
    for sequence in sequences {
        text.extend_from_slice(sequence);
        text.push(ENDMARKER);
    }
    text
}

fn spinner(silent: bool) -> Option<ProgressBar> {
    if silent {
        return None;
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    Some(spinner)
}

/// Build an index from sequence files.
///
/// Sequences are inserted in batches of `batch_lines` lines; 0 inserts each
/// file in one batch.
pub fn build_index(
    inputs: &[PathBuf],
    output: &Path,
    batch_lines: usize,
    config: IndexConfig,
    silent: bool,
) -> Result<DynamicIndex> {
    let start = Instant::now();
    let mut index = DynamicIndex::with_config(config);
    let spinner = spinner(silent);

    for input in inputs {
        if let Some(spinner) = &spinner {
            spinner.set_message(format!("Reading {}", input.display()));
        }
        let sequences = read_sequences(input)?;
        let batch_lines = if batch_lines == 0 { sequences.len().max(1) } else { batch_lines };

        for (batch_num, batch) in sequences.chunks(batch_lines).enumerate() {
            if let Some(spinner) = &spinner {
                spinner.set_message(format!(
                    "{}: batch {} ({} sequences)",
                    input.display(),
                    batch_num + 1,
                    batch.len()
                ));
            }
            let iterations = index
                .insert(&to_text(batch))
                .with_context(|| format!("Failed to insert sequences from {}", input.display()))?;
            debug!(input = %input.display(), batch = batch_num + 1, iterations, "batch inserted");
        }
    }

    index
        .save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    if let Some(spinner) = spinner {
        spinner.finish_with_message(format!(
            "Indexed {} sequences of total length {}",
            index.sequences(),
            index.size()
        ));
    }
    info!(
        sequences = index.sequences(),
        size = index.size(),
        seconds = start.elapsed().as_secs_f64(),
        "index built"
    );

    Ok(index)
}

/// Merge `others` into `base` in order and write the result to `output`
pub fn merge_indexes(
    base: &Path,
    others: &[PathBuf],
    output: &Path,
    batch_size: Option<usize>,
    config: IndexConfig,
) -> Result<DynamicIndex> {
    let mut index = DynamicIndex::open(base)
        .with_context(|| format!("Failed to open index {}", base.display()))?;
    index.set_config(config);

    for path in others {
        let other = DynamicIndex::open(path)
            .with_context(|| format!("Failed to open index {}", path.display()))?;
        index
            .merge(&other, batch_size)
            .with_context(|| format!("Failed to merge {}", path.display()))?;
    }

    index
        .save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(index)
}
