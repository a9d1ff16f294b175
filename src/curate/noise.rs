//! Bounded noise on the interpolated volatility columns.
//!
//! A spline between daily snapshots is perfectly smooth; the curated table adds
//! an independent `Uniform[-eps, +eps]` draw to every vol cell. Draws are taken
//! column by column (`VolColumn::ALL` order), row by row within a column, so a
//! seeded generator always produces the same table.

use rand::Rng;
use rand_distr::{Distribution, Uniform};
use tracing::info;

use crate::domain::{CuratedRow, VolColumn, check_noise_amplitude};
use crate::error::CurateError;

/// Return a perturbed copy of `rows`; `rows` itself is left untouched.
///
/// Only the vol columns move; timestamp, price, and expiry are copied as-is.
pub fn inject_noise<R: Rng + ?Sized>(
    rows: &[CuratedRow],
    amplitude: f64,
    rng: &mut R,
) -> Result<Vec<CuratedRow>, CurateError> {
    check_noise_amplitude(amplitude)?;

    let noise = Uniform::new_inclusive(-amplitude, amplitude);
    let mut out = rows.to_vec();
    for col in VolColumn::ALL {
        let i = col.index();
        for row in out.iter_mut() {
            row.vols[i] += noise.sample(rng);
        }
    }

    info!(rows = out.len(), amplitude, "injected noise");
    Ok(out)
}

/// Largest absolute difference between matching vol cells of two tables.
pub fn max_deviation(before: &[CuratedRow], after: &[CuratedRow]) -> f64 {
    before
        .iter()
        .zip(after)
        .flat_map(|(b, a)| b.vols.iter().zip(a.vols.iter()).map(|(x, y)| (x - y).abs()))
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::domain::VOL_COLUMNS;

    fn rows(n: usize) -> Vec<CuratedRow> {
        (0..n)
            .map(|i| CuratedRow {
                timestamp: DateTime::from_timestamp_millis(i as i64 * 1_000).unwrap(),
                index_price: if i % 3 == 0 { None } else { Some(100.0 + i as f64) },
                vol_expiry: Some(format!("E{}", i / 10)),
                vols: [0.4 + 0.001 * i as f64; VOL_COLUMNS],
            })
            .collect()
    }

    #[test]
    fn noise_is_bounded_by_amplitude() {
        let base = rows(500);
        for eps in [0.0025, 0.01] {
            let mut rng = StdRng::seed_from_u64(11);
            let noisy = inject_noise(&base, eps, &mut rng).unwrap();
            assert!(max_deviation(&base, &noisy) <= eps + 1e-12);
            // With 2500 draws something must actually move.
            assert!(max_deviation(&base, &noisy) > 0.0);
        }
    }

    #[test]
    fn only_vol_columns_change() {
        let base = rows(50);
        let mut rng = StdRng::seed_from_u64(3);
        let noisy = inject_noise(&base, 0.01, &mut rng).unwrap();
        for (b, n) in base.iter().zip(&noisy) {
            assert_eq!(b.timestamp, n.timestamp);
            assert_eq!(b.index_price, n.index_price);
            assert_eq!(b.vol_expiry, n.vol_expiry);
        }
    }

    #[test]
    fn same_seed_same_output() {
        let base = rows(100);
        let a = inject_noise(&base, 0.0025, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = inject_noise(&base, 0.0025, &mut StdRng::seed_from_u64(42)).unwrap();
        let c = inject_noise(&base, 0.0025, &mut StdRng::seed_from_u64(43)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn zero_amplitude_is_identity() {
        let base = rows(20);
        let noisy = inject_noise(&base, 0.0, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(noisy, base);
    }

    #[test]
    fn amplitude_too_wide_to_sample_is_rejected() {
        let base = rows(3);
        let err = inject_noise(&base, 1e308, &mut StdRng::seed_from_u64(1)).unwrap_err();
        assert!(matches!(err, CurateError::Validation(_)));
        let err = inject_noise(&base, f64::INFINITY, &mut StdRng::seed_from_u64(1)).unwrap_err();
        assert!(matches!(err, CurateError::Validation(_)));
    }

    #[test]
    fn negative_amplitude_is_rejected() {
        let err = inject_noise(&rows(2), -0.1, &mut StdRng::seed_from_u64(1)).unwrap_err();
        assert!(matches!(err, CurateError::Validation(_)));
    }
}
