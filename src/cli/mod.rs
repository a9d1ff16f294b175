//! Command-line parsing for the `curate` binary.
//!
//! Argument parsing is kept apart from the pipeline: every subcommand ends up
//! as a `PipelineConfig` handed to `app::pipeline`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{PriceGapPolicy, TimestampFormat};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "curate", version, about = "Mesh high-frequency index prices with a daily volatility surface")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Curate the given sources, configured entirely from flags.
    Run(RunArgs),
    /// Curate using a JSON profile (a serialized pipeline configuration).
    Profile(ProfileArgs),
}

/// Options for `curate run`.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// High-frequency CSV source; repeat for several files, concatenated in the given order.
    #[arg(long = "hf", value_name = "CSV", required = true)]
    pub hf_sources: Vec<PathBuf>,

    /// Daily volatility-surface CSV source.
    #[arg(long, value_name = "CSV")]
    pub daily: PathBuf,

    /// Curated output CSV.
    #[arg(short = 'o', long = "out", value_name = "CSV")]
    pub out: PathBuf,

    /// Also write the interpolated table before noise.
    #[arg(long = "pre-noise-out", value_name = "CSV")]
    pub pre_noise_out: Option<PathBuf>,

    /// Noise amplitude: each vol cell moves by a uniform draw in [-eps, +eps].
    #[arg(long = "noise", env = "VOLMESH_NOISE", default_value_t = 0.0025)]
    pub noise_amplitude: f64,

    /// Seed for the noise generator (random when omitted).
    #[arg(long, env = "VOLMESH_SEED")]
    pub seed: Option<u64>,

    /// What to do with rows that have no high-frequency price.
    #[arg(long = "price-gaps", value_enum, default_value_t = PriceGapPolicy::Keep)]
    pub price_gaps: PriceGapPolicy,

    /// Timestamp format in output files.
    #[arg(long = "timestamp-format", value_enum, default_value_t = TimestampFormat::EpochMs)]
    pub timestamp_format: TimestampFormat,

    /// Prepend a 0-based `index` column to output files.
    #[arg(long = "index")]
    pub include_index: bool,
}

/// Options for `curate profile`.
#[derive(Debug, Args, Clone)]
pub struct ProfileArgs {
    /// JSON profile file.
    #[arg(value_name = "JSON")]
    pub path: PathBuf,

    /// Override the profile's seed.
    #[arg(long, env = "VOLMESH_SEED")]
    pub seed: Option<u64>,
}
