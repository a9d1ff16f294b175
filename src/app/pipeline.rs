//! Shared curation pipeline used by every front-end.
//!
//! load -> align -> merge -> interpolate -> noise -> (price-gap policy) -> persist
//!
//! Each stage consumes the whole output of the previous one. Nothing is written
//! until every computing stage has succeeded.

use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::curate::{align, inject_noise, interpolate, max_deviation, merge_ordered, to_instants};
use crate::domain::{CuratedRow, PipelineConfig, PriceGapPolicy, VOL_COLUMNS};
use crate::error::CurateError;
use crate::io::export::{CommittedFile, StagedFile, WriteOptions, stage_curated_csv};
use crate::io::ingest::{LoadedData, load_sources};

/// Counters collected along the way, for the run summary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub hf_rows_per_source: Vec<(PathBuf, usize)>,
    pub hf_rows_loaded: usize,
    pub hf_rows_truncated: usize,
    pub daily_rows: usize,
    pub merged_rows: usize,
    pub duplicates: usize,
    pub known: [usize; VOL_COLUMNS],
    pub expiry_trailing_gap: usize,
    pub price_gap_rows_dropped: usize,
    pub max_noise: f64,
    pub seed: u64,
}

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Interpolated table before noise.
    pub pre_noise: Vec<CuratedRow>,
    /// Final table.
    pub curated: Vec<CuratedRow>,
    pub stats: RunStats,
}

/// Run the full pipeline and persist both artifacts.
///
/// The noise generator is seeded from `config.seed`, or from OS entropy when
/// unset; the seed actually used is recorded in the stats.
pub fn run_and_persist(config: &PipelineConfig) -> Result<(RunOutput, Vec<PathBuf>), CurateError> {
    let seed = config.seed.unwrap_or_else(|| rand::thread_rng().r#gen());
    info!(seed, explicit = config.seed.is_some(), "seeding noise generator");
    let mut rng = StdRng::seed_from_u64(seed);

    let mut output = run_pipeline(config, &mut rng)?;
    output.stats.seed = seed;
    let written = persist(&output, config)?;
    Ok((output, written))
}

/// Load the configured sources and curate them. Writes nothing.
pub fn run_pipeline<R: Rng + ?Sized>(config: &PipelineConfig, rng: &mut R) -> Result<RunOutput, CurateError> {
    config.validate()?;
    let loaded = load_sources(&config.hf_sources, &config.daily_source)?;
    curate_loaded(loaded, config.noise_amplitude, config.price_gaps, rng)
}

/// Curate already-loaded tables.
pub fn curate_loaded<R: Rng + ?Sized>(
    loaded: LoadedData,
    noise_amplitude: f64,
    price_gaps: PriceGapPolicy,
    rng: &mut R,
) -> Result<RunOutput, CurateError> {
    let LoadedData {
        hf,
        daily,
        hf_rows_per_source,
    } = loaded;
    let hf_rows_loaded = hf.len();

    let (hf, daily) = to_instants(hf, daily)?;
    let aligned = align(hf, daily)?;
    let merged = merge_ordered(&aligned.hf, &aligned.daily);
    let merged_rows = merged.rows.len();
    let duplicates = merged.duplicates;

    let interpolated = interpolate(merged)?;
    let mut pre_noise = interpolated.rows;
    let mut curated = inject_noise(&pre_noise, noise_amplitude, rng)?;
    let max_noise = max_deviation(&pre_noise, &curated);

    let price_gap_rows_dropped = match price_gaps {
        PriceGapPolicy::Keep => 0,
        PriceGapPolicy::Drop => {
            let before = curated.len();
            pre_noise.retain(|r| r.index_price.is_some());
            curated.retain(|r| r.index_price.is_some());
            before - curated.len()
        }
    };

    let stats = RunStats {
        hf_rows_per_source,
        hf_rows_loaded,
        hf_rows_truncated: aligned.truncated,
        daily_rows: aligned.daily.len(),
        merged_rows,
        duplicates,
        known: interpolated.known,
        expiry_trailing_gap: interpolated.expiry_trailing_gap,
        price_gap_rows_dropped,
        max_noise,
        seed: 0,
    };
    info!(rows = curated.len(), price_gap_rows_dropped, max_noise, "curation complete");

    Ok(RunOutput {
        pre_noise,
        curated,
        stats,
    })
}

/// Write the curated table and, if configured, the pre-noise table.
///
/// Both files are staged first. If any target cannot be replaced, the ones
/// already replaced are rolled back and the rest are discarded, so a failed
/// run leaves every previous output as it was.
pub fn persist(output: &RunOutput, config: &PipelineConfig) -> Result<Vec<PathBuf>, CurateError> {
    let opts = WriteOptions {
        timestamp_format: config.timestamp_format,
        include_index: config.include_index,
    };

    let mut staged = vec![stage_curated_csv(&config.curated_path, &output.curated, opts)?];
    if let Some(path) = &config.pre_noise_path {
        match stage_curated_csv(path, &output.pre_noise, opts) {
            Ok(file) => staged.push(file),
            Err(e) => {
                staged.into_iter().for_each(StagedFile::discard);
                return Err(e);
            }
        }
    }

    let mut committed: Vec<CommittedFile> = Vec::with_capacity(staged.len());
    let mut pending = staged.into_iter();
    while let Some(file) = pending.next() {
        match file.commit() {
            Ok(done) => committed.push(done),
            Err(e) => {
                pending.for_each(StagedFile::discard);
                committed.into_iter().rev().for_each(CommittedFile::rollback);
                return Err(e);
            }
        }
    }

    Ok(committed.into_iter().map(CommittedFile::finish).collect())
}
