//! CLI argument definitions using clap
//!
//! One-shot, non-interactive surface:
//! - reforge                          # evaluate the first sample in the library
//! - reforge samples/mine.py          # evaluate a specific baseline
//! - reforge -g 3 samples/mine.py     # generate 3 rewrites, then evaluate
//! - reforge --variants-dir rewrites  # evaluate pre-written rewrites

use clap::Parser;
use std::path::PathBuf;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "reforge.json";

#[derive(Parser)]
#[command(name = "reforge")]
#[command(about = "Evaluate candidate function rewrites against a trusted baseline")]
#[command(
    long_about = r#"Reforge - correctness-first evaluation of candidate function rewrites

Derives ground truth by running the baseline over a synthesized input set,
executes every rewrite against the same inputs in isolated environments,
and selects the fastest fully correct candidate.

USAGE:
  reforge                            # first sample in the library
  reforge samples/mine.py            # specific baseline
  reforge -g 3 samples/mine.py       # request 3 rewrites from the model
  reforge --variants-dir rewrites    # evaluate rewrites already on disk"#
)]
#[command(version)]
pub struct Cli {
    /// Baseline source file (defaults to the first sample in the library)
    pub baseline: Option<PathBuf>,

    /// Directory of rewrite sources to evaluate
    #[arg(long, conflicts_with = "generate")]
    pub variants_dir: Option<PathBuf>,

    /// Number of rewrites to request from the configured model
    #[arg(long, short = 'g')]
    pub generate: Option<usize>,

    /// Path to configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: PathBuf,

    /// Per-case execution timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Keep execution environments alive after the run
    #[arg(long)]
    pub keep_environments: bool,

    /// Directory to write the JSON report to
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Print the winning candidate's source after the table
    #[arg(long)]
    pub show_winner_source: bool,
}
