//! Ordered outer join of the aligned series.
//!
//! Both inputs are sorted by timestamp (the aligner guarantees it), so the join
//! is a single two-pointer pass: every distinct timestamp from either side shows
//! up exactly once, ascending. Columns a side does not carry stay `None`.

use std::cmp::Ordering;

use tracing::{info, warn};

use crate::domain::{DailySnapshot, HfSample, MergedRow, VOL_COLUMNS};

/// Merger output.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedTable {
    pub rows: Vec<MergedRow>,
    /// Rows collapsed because their timestamp repeated within one input.
    pub duplicates: usize,
}

/// Join the two series on timestamp.
///
/// The daily `indexPrice` is discarded: the high-frequency price is the only
/// price in the result. Repeated timestamps within one input keep their first row.
pub fn merge_ordered(hf: &[HfSample], daily: &[DailySnapshot]) -> MergedTable {
    let mut rows: Vec<MergedRow> = Vec::with_capacity(hf.len() + daily.len());
    let mut duplicates = 0usize;
    let (mut i, mut j) = (0usize, 0usize);

    while i < hf.len() || j < daily.len() {
        let order = match (hf.get(i), daily.get(j)) {
            (Some(h), Some(d)) => h.timestamp.cmp(&d.timestamp),
            (Some(_), None) => Ordering::Less,
            (None, _) => Ordering::Greater,
        };

        let row = match order {
            Ordering::Less => {
                let h = &hf[i];
                i += 1;
                price_row(h)
            }
            Ordering::Greater => {
                let d = &daily[j];
                j += 1;
                surface_row(d, None)
            }
            Ordering::Equal => {
                let (h, d) = (&hf[i], &daily[j]);
                i += 1;
                j += 1;
                surface_row(d, Some(h.index_price))
            }
        };

        let same_key = rows.last().is_some_and(|last| last.timestamp == row.timestamp);
        if !same_key {
            rows.push(row);
        } else if let Some(last) = rows.last_mut() {
            // The earlier row came from a different input only if it lacks
            // what this one carries; fill those cells, otherwise it is a repeat.
            if !absorb(last, &row) {
                duplicates += 1;
            }
        }
    }

    if duplicates > 0 {
        warn!(duplicates, "collapsed repeated timestamps during merge");
    }
    info!(rows = rows.len(), hf_rows = hf.len(), daily_rows = daily.len(), "merged series");

    MergedTable { rows, duplicates }
}

fn price_row(h: &HfSample) -> MergedRow {
    MergedRow {
        timestamp: h.timestamp,
        index_price: Some(h.index_price),
        vol_expiry: None,
        vols: [None; VOL_COLUMNS],
    }
}

fn surface_row(d: &DailySnapshot, index_price: Option<f64>) -> MergedRow {
    MergedRow {
        timestamp: d.timestamp,
        index_price,
        vol_expiry: d.vol_expiry.clone(),
        vols: d.vols,
    }
}

/// Merge `next` into `last` (same timestamp) when they come from different inputs.
///
/// Returns `false` when `next` repeats an input `last` already drew from; in
/// that case `last` keeps its own values.
fn absorb(last: &mut MergedRow, next: &MergedRow) -> bool {
    let last_has_price = last.index_price.is_some();
    let next_has_price = next.index_price.is_some();
    let last_has_surface = has_surface(last);
    let next_has_surface = has_surface(next);

    let repeats_price = last_has_price && next_has_price;
    let repeats_surface = last_has_surface && next_has_surface;
    if repeats_price || repeats_surface {
        // Still pick up the half `last` is missing, if any.
        if !last_has_price && next_has_price {
            last.index_price = next.index_price;
        }
        if !last_has_surface && next_has_surface {
            last.vol_expiry = next.vol_expiry.clone();
            last.vols = next.vols;
        }
        return false;
    }

    if next_has_price {
        last.index_price = next.index_price;
    }
    if next_has_surface {
        last.vol_expiry = next.vol_expiry.clone();
        last.vols = next.vols;
    }
    true
}

fn has_surface(row: &MergedRow) -> bool {
    row.vol_expiry.is_some() || row.vols.iter().any(Option::is_some)
}
