use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use dynbwt::index::build::{build_index, merge_indexes};
use dynbwt::index::stats::show_stats;
use dynbwt::index::{DynamicIndex, IndexConfig};
use dynbwt::output::{print_comparison, print_lf};
use dynbwt::utils::{get_config_path, init_config, load_config};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dynbwt")]
#[command(about = "Build, merge and inspect dynamic run-length BWT indexes of node sequences")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (defaults to <config dir>/dynbwt/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index from sequence files (one sequence of node ids per line)
    Build {
        /// Input files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output index file
        #[arg(short, long)]
        output: PathBuf,

        /// Sequences per insertion batch (0 = whole file)
        #[arg(short, long, default_value_t = 0)]
        batch_lines: usize,

        /// Do not show progress
        #[arg(short, long)]
        quiet: bool,
    },
    /// Merge indexes into a base index
    Merge {
        /// Base index
        base: PathBuf,

        /// Indexes merged into the base, in order
        #[arg(required = true)]
        others: Vec<PathBuf>,

        /// Output index file
        #[arg(short, long)]
        output: PathBuf,

        /// Sequences per merge batch (0 = all at once; defaults to the config)
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Show index statistics
    Stats {
        /// Index file
        index: PathBuf,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check whether two indexes are identical
    Compare {
        first: PathBuf,
        second: PathBuf,
    },
    /// Follow a position of a node to its successor
    Lf {
        /// Index file
        index: PathBuf,

        /// Node id
        from: usize,

        /// Offset in the body of the node
        offset: usize,

        /// Map to the occurrences of this successor instead
        #[arg(long)]
        to: Option<usize>,
    },
    /// Show the effective configuration, or write the default one
    Config {
        /// Write the default configuration to --config or the default path
        #[arg(long)]
        init: bool,

        /// Replace an existing config file
        #[arg(long, requires = "init")]
        force: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let color = !cli.no_color;

    match cli.command {
        Commands::Build {
            inputs,
            output,
            batch_lines,
            quiet,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let index = build_index(&inputs, &output, batch_lines, config, quiet)?;
            if !quiet {
                println!(
                    "Wrote {} sequences to {}",
                    index.sequences(),
                    output.display()
                );
            }
        }
        Commands::Merge {
            base,
            others,
            output,
            batch_size,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let index = merge_indexes(&base, &others, &output, batch_size, config)?;
            println!(
                "Wrote {} sequences of total length {} to {}",
                index.sequences(),
                index.size(),
                output.display()
            );
        }
        Commands::Stats { index, json } => {
            show_stats(&index, json)?;
        }
        Commands::Compare { first, second } => {
            let a = DynamicIndex::open(&first)
                .with_context(|| format!("Failed to open index {}", first.display()))?;
            let b = DynamicIndex::open(&second)
                .with_context(|| format!("Failed to open index {}", second.display()))?;
            let mismatch = a.first_mismatch(&b);
            print_comparison(mismatch.as_ref(), color)?;
            if mismatch.is_some() {
                std::process::exit(1);
            }
        }
        Commands::Lf {
            index,
            from,
            offset,
            to,
        } => {
            let index = DynamicIndex::open(&index)
                .with_context(|| format!("Failed to open index {}", index.display()))?;
            let result = match to {
                Some(to) => index.lf_to(from, offset, to).map(|pos| (to, pos)),
                None => index.lf(from, offset),
            };
            print_lf(from, offset, result, color)?;
        }
        Commands::Config { init, force } => {
            if init {
                let path = init_config(cli.config.as_deref(), force)?;
                println!("Wrote default config to {}", path.display());
            } else {
                let path = match cli.config {
                    Some(path) => path,
                    None => get_config_path()?,
                };
                let config = if path.exists() {
                    load_config(Some(&path))?
                } else {
                    IndexConfig::default()
                };
                println!("# {}", path.display());
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}
