//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and installs the log subscriber
//! - parses CLI arguments (or a JSON profile) into a `PipelineConfig`
//! - runs the curation pipeline and persists its artifacts
//! - prints the run summary

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, ProfileArgs, RunArgs};
use crate::domain::PipelineConfig;
use crate::error::CurateError;

pub mod pipeline;

/// Entry point for the `curate` binary.
pub fn run() -> Result<(), CurateError> {
    // A missing .env file is the normal case.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = crate::cli::Cli::parse();
    let config = match cli.command {
        Command::Run(args) => config_from_args(&args),
        Command::Profile(args) => config_from_profile(&args)?,
    };

    info!(
        hf_sources = config.hf_sources.len(),
        daily = %config.daily_source.display(),
        noise = config.noise_amplitude,
        price_gaps = crate::report::describe_price_gaps(config.price_gaps),
        "starting curation"
    );

    match pipeline::run_and_persist(&config) {
        Ok((output, written)) => {
            println!("{}", crate::report::format_run_summary(&output, &config));
            for path in written {
                println!("wrote {}", path.display());
            }
            Ok(())
        }
        Err(err) => {
            error!(stage = err.stage(), "{err}");
            Err(err)
        }
    }
}

/// Install the stderr log subscriber; `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn config_from_args(args: &RunArgs) -> PipelineConfig {
    PipelineConfig {
        hf_sources: args.hf_sources.clone(),
        daily_source: args.daily.clone(),
        noise_amplitude: args.noise_amplitude,
        curated_path: args.out.clone(),
        pre_noise_path: args.pre_noise_out.clone(),
        seed: args.seed,
        price_gaps: args.price_gaps,
        timestamp_format: args.timestamp_format,
        include_index: args.include_index,
    }
}

fn config_from_profile(args: &ProfileArgs) -> Result<PipelineConfig, CurateError> {
    let mut config = read_profile(&args.path)?;
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    Ok(config)
}

/// Read a JSON profile. Relative paths inside it resolve against the working directory.
pub fn read_profile(path: &Path) -> Result<PipelineConfig, CurateError> {
    let source_id = path.display().to_string();
    let file = File::open(path).map_err(|e| CurateError::load(&source_id, format!("Failed to open profile: {e}")))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| CurateError::load(source_id, format!("Invalid profile JSON: {e}")))
}
