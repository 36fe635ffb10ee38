//! Reforge CLI
//!
//! Non-interactive front end for the evaluation harness: pick a baseline,
//! gather or generate rewrites, run the evaluation, print the comparison
//! table and the winner.

mod args;
mod run;

use anyhow::Result;
use clap::Parser;

pub use args::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with environment-based filtering
    // Set RUST_LOG=debug for verbose logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    run::run(cli).await
}
