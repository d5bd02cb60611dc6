use crate::index::dynamic::DynamicIndex;
use anyhow::{Context, Result};
use std::path::Path;

/// Display index statistics
pub fn show_stats(path: &Path, json: bool) -> Result<()> {
    let index = DynamicIndex::open(path)
        .with_context(|| format!("Failed to open index {}", path.display()))?;
    let stats = index.stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Index Statistics");
    println!("================");
    println!();
    println!("Index location:   {}", path.display());
    println!("Header:           {}", index.header());
    println!("Sequences:        {}", stats.sequences);
    println!("Total length:     {}", stats.size);
    println!("Alphabet offset:  {}", stats.offset);
    println!("Alphabet size:    {}", stats.alphabet_size);
    println!("Effective:        {}", stats.effective_alphabet);
    println!("Nodes with data:  {}", stats.nodes);
    println!("Runs:             {}", stats.runs);
    println!("Edges:            {}", stats.edges);
    println!("Bidirectional:    {}", stats.bidirectional);
    if stats.size > 0 {
        println!(
            "Avg run length:   {:.2}",
            stats.size as f64 / stats.runs.max(1) as f64
        );
    }

    if let Ok(meta) = std::fs::metadata(path) {
        println!();
        println!("File size:        {}", format_size(meta.len()));
    }

    Ok(())
}

/// Format byte size to human readable
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
