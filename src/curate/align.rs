//! Time alignment of the two series.
//!
//! Two steps:
//!
//! 1. `to_instants`: epoch milliseconds to `DateTime<Utc>`.
//! 2. `align`: round daily timestamps to the minute, order both tables, and cut
//!    the high-frequency table at the last daily snapshot.
//!
//! `align` is a fixed point: feeding it its own output returns the same tables.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::domain::{DailySnapshot, HfSample, RawDailyRow, RawHfRow};
use crate::error::CurateError;

const MINUTE_MS: i64 = 60_000;

/// Both series on the instant timeline, ready to merge.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedTables {
    pub hf: Vec<HfSample>,
    pub daily: Vec<DailySnapshot>,
    /// High-frequency rows dropped because they are later than the last snapshot.
    pub truncated: usize,
}

/// Convert raw epoch-millisecond rows into instants.
pub fn to_instants(
    hf: Vec<RawHfRow>,
    daily: Vec<RawDailyRow>,
) -> Result<(Vec<HfSample>, Vec<DailySnapshot>), CurateError> {
    let hf = hf
        .into_iter()
        .map(|row| {
            Ok(HfSample {
                timestamp: instant_from_millis(row.timestamp_ms)?,
                index_price: row.index_price,
            })
        })
        .collect::<Result<Vec<_>, CurateError>>()?;

    let daily = daily
        .into_iter()
        .map(|row| {
            Ok(DailySnapshot {
                timestamp: instant_from_millis(row.timestamp_ms)?,
                index_price: row.index_price,
                vol_expiry: row.vol_expiry,
                vols: row.vols,
            })
        })
        .collect::<Result<Vec<_>, CurateError>>()?;

    Ok((hf, daily))
}

/// Round, order, and truncate.
///
/// Sorting is stable, so rows sharing a timestamp keep their source-list order.
pub fn align(mut hf: Vec<HfSample>, mut daily: Vec<DailySnapshot>) -> Result<AlignedTables, CurateError> {
    if daily.is_empty() {
        return Err(CurateError::validation(
            "Daily table is empty: no volatility surface to align against.",
        ));
    }

    for snap in daily.iter_mut() {
        snap.timestamp = round_to_minute(snap.timestamp)?;
    }
    daily.sort_by_key(|s| s.timestamp);
    hf.sort_by_key(|s| s.timestamp);

    let horizon = daily
        .last()
        .map(|s| s.timestamp)
        .ok_or_else(|| CurateError::validation("Daily table is empty."))?;

    // hf is sorted, so everything past the horizon is a suffix.
    let keep = hf.partition_point(|s| s.timestamp <= horizon);
    let truncated = hf.len() - keep;
    hf.truncate(keep);

    info!(
        horizon = %horizon,
        hf_rows = hf.len(),
        truncated,
        daily_rows = daily.len(),
        "aligned series"
    );
    if hf.is_empty() {
        warn!(horizon = %horizon, "no high-frequency rows remain at or before the last daily snapshot");
    }

    Ok(AlignedTables { hf, daily, truncated })
}

/// Round an instant to the nearest minute.
///
/// Ties (exactly 30s past the minute) round up to the later minute. The
/// remainder is Euclidean, so instants before the epoch round the same way.
pub fn round_to_minute(ts: DateTime<Utc>) -> Result<DateTime<Utc>, CurateError> {
    let ms = ts.timestamp_millis();
    let rem = ms.rem_euclid(MINUTE_MS);
    let floor = ms - rem;
    let rounded = if rem * 2 >= MINUTE_MS { floor + MINUTE_MS } else { floor };
    instant_from_millis(rounded)
}

fn instant_from_millis(ms: i64) -> Result<DateTime<Utc>, CurateError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| CurateError::validation(format!("Timestamp {ms} ms is out of range.")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VOL_COLUMNS;

    fn ts(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    fn hf(ms: i64, price: f64) -> HfSample {
        HfSample { timestamp: ts(ms), index_price: price }
    }

    fn snap(ms: i64) -> DailySnapshot {
        DailySnapshot {
            timestamp: ts(ms),
            index_price: Some(1.0),
            vol_expiry: Some("E".to_string()),
            vols: [Some(0.5); VOL_COLUMNS],
        }
    }

    #[test]
    fn rounding_is_half_up() {
        assert_eq!(round_to_minute(ts(29_999)).unwrap(), ts(0));
        assert_eq!(round_to_minute(ts(30_000)).unwrap(), ts(60_000));
        assert_eq!(round_to_minute(ts(89_999)).unwrap(), ts(60_000));
        assert_eq!(round_to_minute(ts(120_000)).unwrap(), ts(120_000));
    }

    #[test]
    fn rounding_before_epoch_matches_after() {
        assert_eq!(round_to_minute(ts(-30_000)).unwrap(), ts(0));
        assert_eq!(round_to_minute(ts(-30_001)).unwrap(), ts(-60_000));
    }

    #[test]
    fn to_instants_converts_epoch_millis() {
        let (h, d) = to_instants(
            vec![RawHfRow { timestamp_ms: 1_700_000_000_123, index_price: 2.0 }],
            vec![RawDailyRow {
                timestamp_ms: 1_700_000_000_000,
                index_price: None,
                vol_expiry: None,
                vols: [None; VOL_COLUMNS],
            }],
        )
        .unwrap();
        assert_eq!(h[0].timestamp.timestamp_millis(), 1_700_000_000_123);
        assert_eq!(d[0].timestamp.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn to_instants_rejects_out_of_range() {
        let err = to_instants(vec![RawHfRow { timestamp_ms: i64::MAX, index_price: 1.0 }], vec![]).unwrap_err();
        assert!(matches!(err, CurateError::Validation(_)));
    }

    #[test]
    fn empty_daily_table_is_a_validation_error() {
        let err = align(vec![hf(0, 1.0)], vec![]).unwrap_err();
        assert!(matches!(err, CurateError::Validation(_)));
    }

    #[test]
    fn drops_ticks_after_last_snapshot() {
        let aligned = align(
            vec![hf(0, 1.0), hf(60_000, 2.0), hf(120_000, 3.0), hf(120_001, 4.0), hf(180_000, 5.0)],
            vec![snap(0), snap(119_000)],
        )
        .unwrap();
        // 119s rounds to 120s, which becomes the horizon.
        assert_eq!(aligned.daily[1].timestamp, ts(120_000));
        assert_eq!(aligned.hf.len(), 3);
        assert_eq!(aligned.truncated, 2);
        assert!(aligned.hf.iter().all(|s| s.timestamp <= ts(120_000)));
    }

    #[test]
    fn empty_hf_after_truncation_is_legal() {
        let aligned = align(vec![hf(600_000, 1.0)], vec![snap(0)]).unwrap();
        assert!(aligned.hf.is_empty());
        assert_eq!(aligned.truncated, 1);
    }

    #[test]
    fn sort_is_stable_for_equal_timestamps() {
        let aligned = align(
            vec![hf(60_000, 2.0), hf(0, 1.0), hf(60_000, 3.0)],
            vec![snap(60_000)],
        )
        .unwrap();
        let prices: Vec<f64> = aligned.hf.iter().map(|s| s.index_price).collect();
        assert_eq!(prices, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn align_is_a_fixed_point() {
        let first = align(
            vec![hf(90_000, 2.0), hf(10_000, 1.0), hf(500_000, 9.0)],
            vec![snap(200_400), snap(29_000)],
        )
        .unwrap();
        let second = align(first.hf.clone(), first.daily.clone()).unwrap();
        assert_eq!(second.hf, first.hf);
        assert_eq!(second.daily, first.daily);
        assert_eq!(second.truncated, 0);
    }
}
