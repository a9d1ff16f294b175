//! Shared domain types.
//!
//! Rows move through the pipeline in four shapes:
//!
//! - raw rows straight from CSV (`RawHfRow`, `RawDailyRow`), timestamps in epoch ms
//! - aligned rows (`HfSample`, `DailySnapshot`), timestamps as `DateTime<Utc>`
//! - merged rows (`MergedRow`) with absent cells wherever a series had no observation
//! - filled rows (`CuratedRow`), used for both the pre-noise and the curated table

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::CurateError;

/// Number of continuous volatility quotes in a surface snapshot.
pub const VOL_COLUMNS: usize = 5;

/// One of the five continuous volatility columns of the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolColumn {
    Atm,
    Call10,
    Put10,
    Call25,
    Put25,
}

impl VolColumn {
    /// Canonical column order, used for storage, output, and noise draws.
    pub const ALL: [VolColumn; VOL_COLUMNS] = [
        VolColumn::Atm,
        VolColumn::Call10,
        VolColumn::Put10,
        VolColumn::Call25,
        VolColumn::Put25,
    ];

    /// Column header as it appears in source and output files.
    pub fn header(self) -> &'static str {
        match self {
            VolColumn::Atm => "volATM",
            VolColumn::Call10 => "vol10C",
            VolColumn::Put10 => "vol10P",
            VolColumn::Call25 => "vol25C",
            VolColumn::Put25 => "vol25P",
        }
    }

    /// Position of this column in a `[_; VOL_COLUMNS]` array.
    pub fn index(self) -> usize {
        match self {
            VolColumn::Atm => 0,
            VolColumn::Call10 => 1,
            VolColumn::Put10 => 2,
            VolColumn::Call25 => 3,
            VolColumn::Put25 => 4,
        }
    }
}

/// A high-frequency tick as read from CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct RawHfRow {
    pub timestamp_ms: i64,
    pub index_price: f64,
}

/// A daily surface snapshot as read from CSV.
///
/// Blank cells are kept as `None`; they are gaps like any other.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDailyRow {
    pub timestamp_ms: i64,
    pub index_price: Option<f64>,
    pub vol_expiry: Option<String>,
    pub vols: [Option<f64>; VOL_COLUMNS],
}

/// A high-frequency tick on the instant timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct HfSample {
    pub timestamp: DateTime<Utc>,
    pub index_price: f64,
}

/// A daily surface snapshot on the instant timeline (timestamp rounded to the minute).
#[derive(Debug, Clone, PartialEq)]
pub struct DailySnapshot {
    pub timestamp: DateTime<Utc>,
    pub index_price: Option<f64>,
    pub vol_expiry: Option<String>,
    pub vols: [Option<f64>; VOL_COLUMNS],
}

/// A row of the union-keyed table, before gap filling.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub timestamp: DateTime<Utc>,
    /// Only ever sourced from the high-frequency series.
    pub index_price: Option<f64>,
    pub vol_expiry: Option<String>,
    pub vols: [Option<f64>; VOL_COLUMNS],
}

/// A row with every volatility quote populated.
#[derive(Debug, Clone, PartialEq)]
pub struct CuratedRow {
    pub timestamp: DateTime<Utc>,
    /// Absent for rows that exist only on the daily grid.
    pub index_price: Option<f64>,
    /// Absent only in a trailing gap with no later known expiry.
    pub vol_expiry: Option<String>,
    pub vols: [f64; VOL_COLUMNS],
}

impl CuratedRow {
    pub fn vol(&self, column: VolColumn) -> f64 {
        self.vols[column.index()]
    }
}

/// What to do with rows that have no high-frequency price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PriceGapPolicy {
    /// Keep daily-only rows with an absent `indexPrice`.
    #[default]
    Keep,
    /// Drop daily-only rows after curation (one output row per tick).
    Drop,
}

/// How timestamps are rendered in output files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TimestampFormat {
    /// Integer epoch milliseconds, same as the inputs.
    #[default]
    EpochMs,
    /// RFC 3339 with millisecond precision, e.g. `2024-01-07T08:00:00.000Z`.
    Rfc3339,
}

/// A full run's configuration as understood by the pipeline.
///
/// Built from CLI flags or deserialized from a JSON profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// High-frequency sources, concatenated in this order.
    pub hf_sources: Vec<PathBuf>,
    pub daily_source: PathBuf,
    /// Symmetric noise amplitude: each vol cell moves by at most this much.
    pub noise_amplitude: f64,
    pub curated_path: PathBuf,
    /// Where to persist the interpolated table before noise (optional).
    #[serde(default)]
    pub pre_noise_path: Option<PathBuf>,
    /// Seed for the noise generator; `None` draws one from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub price_gaps: PriceGapPolicy,
    #[serde(default)]
    pub timestamp_format: TimestampFormat,
    /// Prepend a 0-based `index` column to output files.
    #[serde(default)]
    pub include_index: bool,
}

impl PipelineConfig {
    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), CurateError> {
        if self.hf_sources.is_empty() {
            return Err(CurateError::validation(
                "No high-frequency sources configured.",
            ));
        }
        check_noise_amplitude(self.noise_amplitude)?;
        if let Some(pre_noise) = &self.pre_noise_path {
            if pre_noise == &self.curated_path {
                return Err(CurateError::validation(format!(
                    "Pre-noise output would overwrite the curated output '{}'.",
                    pre_noise.display()
                )));
            }
        }
        Ok(())
    }
}

/// Accept a noise amplitude only if `[-eps, +eps]` is a usable sampling range.
///
/// The width `2 * eps` must itself be finite, so amplitudes near `f64::MAX` are
/// rejected along with negative and non-finite ones.
pub fn check_noise_amplitude(amplitude: f64) -> Result<(), CurateError> {
    if amplitude >= 0.0 && (2.0 * amplitude).is_finite() {
        return Ok(());
    }
    Err(CurateError::validation(format!(
        "Noise amplitude must be >= 0 with a finite range width (got {amplitude})."
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PipelineConfig {
        PipelineConfig {
            hf_sources: vec![PathBuf::from("hf.csv")],
            daily_source: PathBuf::from("daily.csv"),
            noise_amplitude: 0.0025,
            curated_path: PathBuf::from("curated.csv"),
            pre_noise_path: None,
            seed: Some(7),
            price_gaps: PriceGapPolicy::Keep,
            timestamp_format: TimestampFormat::EpochMs,
            include_index: false,
        }
    }

    #[test]
    fn vol_column_order_matches_indices() {
        for (i, col) in VolColumn::ALL.iter().enumerate() {
            assert_eq!(col.index(), i);
        }
        let headers: Vec<_> = VolColumn::ALL.iter().map(|c| c.header()).collect();
        assert_eq!(headers, ["volATM", "vol10C", "vol10P", "vol25C", "vol25P"]);
    }

    #[test]
    fn validate_rejects_negative_or_nan_amplitude() {
        let mut c = config();
        assert!(c.validate().is_ok());
        c.noise_amplitude = -0.01;
        assert!(matches!(c.validate(), Err(CurateError::Validation(_))));
        c.noise_amplitude = f64::NAN;
        assert!(matches!(c.validate(), Err(CurateError::Validation(_))));
    }

    #[test]
    fn validate_rejects_amplitude_with_overflowing_range() {
        let mut c = config();
        c.noise_amplitude = 1e308;
        assert!(matches!(c.validate(), Err(CurateError::Validation(_))));
        c.noise_amplitude = f64::MAX / 4.0;
        assert!(c.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_source_list() {
        let mut c = config();
        c.hf_sources.clear();
        assert!(matches!(c.validate(), Err(CurateError::Validation(_))));
    }

    #[test]
    fn validate_rejects_colliding_outputs() {
        let mut c = config();
        c.pre_noise_path = Some(c.curated_path.clone());
        assert!(matches!(c.validate(), Err(CurateError::Validation(_))));
    }

    #[test]
    fn profile_json_uses_defaults_for_optional_fields() {
        let json = r#"{
            "hf_sources": ["data/22-7-12.csv", "data/23-1-7.csv"],
            "daily_source": "data/option-daily.csv",
            "noise_amplitude": 0.01,
            "curated_path": "out/curated.csv"
        }"#;
        let c: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(c.hf_sources.len(), 2);
        assert_eq!(c.seed, None);
        assert_eq!(c.price_gaps, PriceGapPolicy::Keep);
        assert_eq!(c.timestamp_format, TimestampFormat::EpochMs);
        assert!(!c.include_index);
    }
}
