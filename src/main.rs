//! Spawn pipeline CLI
//!
//! Usage:
//!   spawn-pipeline --config pipeline.ron
//!   spawn-pipeline --data-dir ./content --output out/map_spawns.json --sequential

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use spawn_pipeline::logging::{self, LogLevel};
use spawn_pipeline::{pipeline, PipelineConfig};

/// Build map NPC, portal and mob spawn tables from game content datasets
#[derive(Parser, Debug)]
#[command(name = "spawn-pipeline")]
struct Args {
    /// Pipeline config file (.ron or .json)
    #[arg(long, short = 'c', env = "SPAWN_PIPELINE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding monsters/spawn_tags/maps datasets and the xblock/ geometry dir
    #[arg(long, short = 'd')]
    data_dir: Option<PathBuf>,

    /// Output file (.json or .ron)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Override the monster-id threshold
    #[arg(long)]
    threshold: Option<u32>,

    /// Resolve maps one at a time
    #[arg(long)]
    sequential: bool,

    /// Default log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<LogLevel>,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    config
        .apply_env_overrides()
        .context("applying environment overrides")?;

    if let Some(dir) = &args.data_dir {
        config.set_data_dir(dir);
    }
    if let Some(output) = args.output {
        config.output_path = output;
    }
    if let Some(threshold) = args.threshold {
        config.monster_id_threshold = threshold;
    }
    if args.sequential {
        config.parallel = false;
    }
    if let Some(level) = args.log_level {
        config.logging = config.logging.clone().with_default_level(level);
    }
    config.validate()?;

    logging::init_tracing(&config.logging);
    info!(
        threshold = config.monster_id_threshold,
        parallel = config.parallel,
        "Starting spawn pipeline"
    );

    let (mut tables, report) = pipeline::run_from_config(&config).context("pipeline run failed")?;
    tables.sort_for_output();
    tables
        .write_to(&config.output_path)
        .with_context(|| format!("writing {}", config.output_path.display()))?;

    for failure in &report.maps_failed {
        eprintln!(
            "map {} ({}) skipped: {}",
            failure.map_id, failure.xblock, failure.reason
        );
    }
    println!("{}", report.summary_line());
    println!(
        "Wrote {} rows to {}",
        tables.total_rows(),
        config.output_path.display()
    );
    Ok(())
}
