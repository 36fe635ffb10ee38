//! One-shot evaluation command

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;

use reforge_core::provider::{load_source, load_variants_dir, save_variants};
use reforge_core::report::{render_table, render_winner, JsonReporter};
use reforge_core::{
    CandidateSet, CandidateSource, EvalHarness, HarnessConfig, RewriteGenerator, SampleLibrary,
};

use crate::args::Cli;

pub async fn run(cli: Cli) -> Result<()> {
    let mut config =
        HarnessConfig::load(Some(&cli.config_file)).context("Failed to load configuration")?;
    if let Some(secs) = cli.timeout_secs {
        config.exec_timeout = Duration::from_secs(secs);
    }
    if cli.keep_environments {
        config.keep_environments = true;
    }
    if let Some(dir) = cli.output_dir.clone() {
        config.output_dir = Some(dir);
    }

    let baseline = load_baseline(&cli, &config).await?;
    println!("{} {}", "Baseline:".bold(), baseline.name);

    let variants = load_variants(&cli, &config, &baseline).await?;
    if variants.is_empty() {
        println!(
            "{}",
            "No rewrites supplied; evaluating the baseline by itself \
             (use --generate or --variants-dir)"
                .yellow()
        );
    } else {
        println!("{} {}", "Rewrites:".bold(), variants.len());
    }

    let set = CandidateSet::new(baseline, variants);
    let backend = Arc::new(config.build_local_backend());
    let harness = EvalHarness::new(backend, config.clone());

    // Ctrl-C stops dispatching further executions; in-flight ones finish
    let cancel = harness.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n{}", "Interrupt received; stopping dispatch...".yellow());
            cancel.cancel();
        }
    });

    let outcome = harness
        .evaluate(&set)
        .await
        .context("Evaluation aborted")?;

    println!("\n{}", "Performance Comparison".bold());
    println!("{}", "═".repeat(80));
    print!("{}", render_table(&outcome));

    println!("\n{}", "Best Performing Variant".bold());
    println!("{}", "═".repeat(80));
    print!("{}", render_winner(&outcome));

    if cli.show_winner_source {
        if let Some(winner) = outcome.winner() {
            if let Some(source) = set
                .to_variants()
                .iter()
                .find(|v| v.id == winner.variant_id)
            {
                println!("\n{}", "Winning source".bold());
                println!("{}", "─".repeat(50));
                println!("{}", source.source);
            }
        }
    }

    if let Some(dir) = &config.output_dir {
        let path = JsonReporter::save(&outcome, dir)
            .await
            .context("Failed to save JSON report")?;
        println!("\nReport saved to {}", path.display());
    }

    if !outcome.registry.is_empty() {
        println!(
            "\n{} {} execution environment(s) kept alive for inspection",
            "Note:".yellow(),
            outcome.registry.len()
        );
    }

    Ok(())
}

async fn load_baseline(cli: &Cli, config: &HarnessConfig) -> Result<CandidateSource> {
    match &cli.baseline {
        Some(path) => load_source(path)
            .await
            .with_context(|| format!("Failed to read baseline {}", path.display())),
        None => {
            let library = SampleLibrary::new(&config.samples_dir);
            library
                .ensure_default()
                .await
                .context("Failed to prepare sample library")?;
            library
                .load_all()
                .await?
                .into_iter()
                .next()
                .context("Sample library is empty")
        }
    }
}

async fn load_variants(
    cli: &Cli,
    config: &HarnessConfig,
    baseline: &CandidateSource,
) -> Result<Vec<CandidateSource>> {
    if let Some(dir) = &cli.variants_dir {
        return load_variants_dir(dir)
            .await
            .with_context(|| format!("Failed to read rewrites from {}", dir.display()));
    }

    if let Some(count) = cli.generate {
        let count = count.clamp(1, config.max_variants);
        let generator =
            RewriteGenerator::new(config.llm.clone()).context("Rewrite generation unavailable")?;
        let variants = generator
            .generate(&baseline.code, count)
            .await
            .context("Rewrite generation failed")?;
        let saved = save_variants(&config.variations_dir, &variants)
            .await
            .context("Failed to persist generated rewrites")?;
        println!(
            "{} {} rewrite(s) saved under {}",
            "Generated:".bold(),
            saved.len(),
            config.variations_dir.display()
        );
        return Ok(variants);
    }

    Ok(Vec::new())
}
