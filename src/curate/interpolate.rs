//! Gap filling for the merged table.
//!
//! - `volExpiry` is a step function: each gap takes the next known expiry
//!   (backward fill). A trailing gap has no later value and stays absent.
//! - Each vol column gets a natural cubic spline whose x-axis is the 0-based row
//!   position in the time-sorted table (not wall-clock time), fitted through the
//!   known cells and evaluated at every position.
//!
//! The result is the pre-noise table.

use tracing::{debug, info};

use crate::curate::merge::MergedTable;
use crate::domain::{CuratedRow, VOL_COLUMNS, VolColumn};
use crate::error::CurateError;
use crate::math::NaturalCubicSpline;

/// Interpolator output.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedTable {
    pub rows: Vec<CuratedRow>,
    /// Known (pre-fill) cells per vol column, in `VolColumn::ALL` order.
    pub known: [usize; VOL_COLUMNS],
    /// Rows at the end of the table still without an expiry.
    pub expiry_trailing_gap: usize,
}

/// Fill every gap in the merged table.
pub fn interpolate(merged: MergedTable) -> Result<InterpolatedTable, CurateError> {
    let n = merged.rows.len();

    let mut expiries: Vec<Option<String>> = Vec::with_capacity(n);
    let mut columns: [Vec<Option<f64>>; VOL_COLUMNS] = std::array::from_fn(|_| Vec::with_capacity(n));
    let mut timestamps = Vec::with_capacity(n);
    let mut prices = Vec::with_capacity(n);

    for row in merged.rows {
        timestamps.push(row.timestamp);
        prices.push(row.index_price);
        expiries.push(row.vol_expiry);
        for (col, value) in columns.iter_mut().zip(row.vols) {
            col.push(value);
        }
    }

    let expiry_known = expiries.iter().filter(|v| v.is_some()).count();
    if expiry_known == 0 {
        return Err(CurateError::Interpolation {
            column: "volExpiry".to_string(),
            known: 0,
            rows: n,
            message: "no known expiry to step-fill from".to_string(),
        });
    }
    let expiry_trailing_gap = backward_fill(&mut expiries);

    let mut known = [0usize; VOL_COLUMNS];
    let mut filled: [Vec<f64>; VOL_COLUMNS] = std::array::from_fn(|_| Vec::new());
    for col in VolColumn::ALL {
        let cells = &columns[col.index()];
        known[col.index()] = cells.iter().filter(|v| v.is_some()).count();
        filled[col.index()] = spline_fill(cells, col)?;
    }

    let [atm, c10, p10, c25, p25] = filled;
    let rows: Vec<CuratedRow> = timestamps
        .into_iter()
        .zip(prices)
        .zip(expiries)
        .enumerate()
        .map(|(i, ((timestamp, index_price), vol_expiry))| CuratedRow {
            timestamp,
            index_price,
            vol_expiry,
            vols: [atm[i], c10[i], p10[i], c25[i], p25[i]],
        })
        .collect();

    info!(
        rows = rows.len(),
        expiry_known,
        expiry_trailing_gap,
        known_atm = known[VolColumn::Atm.index()],
        "interpolated volatility surface"
    );

    Ok(InterpolatedTable {
        rows,
        known,
        expiry_trailing_gap,
    })
}

/// Copy each known value backward into the gap before it.
///
/// Returns the length of the trailing gap (cells after the last known value).
pub fn backward_fill<T: Clone>(cells: &mut [Option<T>]) -> usize {
    let mut next: Option<T> = None;
    let mut trailing = 0usize;
    for cell in cells.iter_mut().rev() {
        match cell {
            Some(v) => next = Some(v.clone()),
            None => match &next {
                Some(v) => *cell = Some(v.clone()),
                None => trailing += 1,
            },
        }
    }
    trailing
}

/// Fit a natural cubic spline over the known positions of one column and
/// evaluate it at every position.
pub fn spline_fill(cells: &[Option<f64>], column: VolColumn) -> Result<Vec<f64>, CurateError> {
    let (x, y): (Vec<f64>, Vec<f64>) = cells
        .iter()
        .enumerate()
        .filter_map(|(i, &v)| v.map(|v| (i as f64, v)))
        .unzip();

    let known = x.len();
    let err = |message: &str| CurateError::Interpolation {
        column: column.header().to_string(),
        known,
        rows: cells.len(),
        message: message.to_string(),
    };

    if known < 2 {
        return Err(err("a spline needs at least 2 known points"));
    }
    let spline = NaturalCubicSpline::new(x, y).ok_or_else(|| err("spline fit failed"))?;
    debug!(column = column.header(), knots = spline.knots(), "fitted spline");

    Ok((0..cells.len()).map(|i| spline.evaluate(i as f64)).collect())
}
