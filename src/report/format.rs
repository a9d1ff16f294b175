//! Formatted terminal output for a finished run.
//!
//! Formatting lives here so the pipeline code stays free of presentation.

use crate::app::pipeline::{RunOutput, RunStats};
use crate::domain::{CuratedRow, PipelineConfig, PriceGapPolicy, VolColumn};

/// Format the run summary: inputs, stage counters, and output ranges.
pub fn format_run_summary(output: &RunOutput, config: &PipelineConfig) -> String {
    let stats = &output.stats;
    let mut out = String::new();

    out.push_str("=== curate - HF price / daily vol surface mesh ===\n");
    out.push_str(&format!(
        "Noise: eps={} | seed={}{}\n",
        config.noise_amplitude,
        stats.seed,
        if config.seed.is_some() { "" } else { " (entropy)" },
    ));

    out.push_str("\nSources:\n");
    for (path, rows) in &stats.hf_rows_per_source {
        out.push_str(&format!("  hf    {:>9} rows  {}\n", rows, path.display()));
    }
    out.push_str(&format!("  daily {:>9} rows  {}\n", stats.daily_rows, config.daily_source.display()));

    out.push_str("\nStages:\n");
    out.push_str(&format_stage_counts(stats));

    out.push_str("\nKnown cells before interpolation:\n");
    for col in VolColumn::ALL {
        out.push_str(&format!("  {:<7} {}\n", col.header(), stats.known[col.index()]));
    }

    out.push_str("\nOutput:\n");
    out.push_str(&format!("  rows: {}\n", output.curated.len()));
    match time_range(&output.curated) {
        Some((first, last)) => out.push_str(&format!("  range: {first} .. {last}\n")),
        None => out.push_str("  range: (empty)\n"),
    }
    out.push_str(&format!("  max |curated - pre_noise|: {:.6}\n", stats.max_noise));

    out
}

fn format_stage_counts(stats: &RunStats) -> String {
    let mut out = String::new();
    out.push_str(&format!("  hf loaded:        {}\n", stats.hf_rows_loaded));
    out.push_str(&format!("  hf truncated:     {}\n", stats.hf_rows_truncated));
    out.push_str(&format!("  merged rows:      {}\n", stats.merged_rows));
    if stats.duplicates > 0 {
        out.push_str(&format!("  duplicates:       {}\n", stats.duplicates));
    }
    if stats.expiry_trailing_gap > 0 {
        out.push_str(&format!("  expiry tail gap:  {}\n", stats.expiry_trailing_gap));
    }
    if stats.price_gap_rows_dropped > 0 {
        out.push_str(&format!("  price-gap drops:  {}\n", stats.price_gap_rows_dropped));
    }
    out
}

fn time_range(rows: &[CuratedRow]) -> Option<(String, String)> {
    let first = rows.first()?;
    let last = rows.last()?;
    Some((first.timestamp.to_rfc3339(), last.timestamp.to_rfc3339()))
}

/// One-line description of the price-gap policy, for log lines and help text.
pub fn describe_price_gaps(policy: PriceGapPolicy) -> &'static str {
    match policy {
        PriceGapPolicy::Keep => "daily-only rows kept with empty indexPrice",
        PriceGapPolicy::Drop => "daily-only rows dropped",
    }
}
