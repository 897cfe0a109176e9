//! Seeded Gaussian sensor noise.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::TimeSeries;
use crate::error::SimError;

/// Add i.i.d. `N(0, std_dev²)` noise to every sample of `series`.
///
/// The same `seed` always produces the same trace. `std_dev == 0` returns an
/// unchanged copy.
pub fn add_sensor_noise(series: &TimeSeries, std_dev: f64, seed: u64) -> Result<TimeSeries, SimError> {
    if !(std_dev.is_finite() && std_dev >= 0.0) {
        return Err(SimError::InvalidParameter {
            name: "noise_std",
            reason: format!("must be finite and >= 0, got {std_dev}"),
        });
    }
    if std_dev == 0.0 {
        return Ok(series.clone());
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, std_dev).map_err(|e| SimError::InvalidParameter {
        name: "noise_std",
        reason: e.to_string(),
    })?;

    let noisy: Vec<f64> = series
        .values()
        .iter()
        .map(|&v| v + normal.sample(&mut rng))
        .collect();
    log::debug!("noise: std={std_dev} seed={seed} n={}", noisy.len());
    series.with_values(noisy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> TimeSeries {
        let t: Vec<f64> = (0..200).map(|i| i as f64 * 0.05).collect();
        let y = t.iter().map(|&t| 100.0 + 2.0 * t).collect();
        TimeSeries::new(t, y).unwrap()
    }

    #[test]
    fn zero_std_is_identity() {
        let s = ramp();
        assert_eq!(add_sensor_noise(&s, 0.0, 7).unwrap(), s);
    }

    #[test]
    fn same_seed_same_trace() {
        let s = ramp();
        let a = add_sensor_noise(&s, 0.5, 42).unwrap();
        let b = add_sensor_noise(&s, 0.5, 42).unwrap();
        let c = add_sensor_noise(&s, 0.5, 43).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.time(), s.time());
    }

    #[test]
    fn noise_is_centred_and_scaled() {
        let s = ramp();
        let noisy = add_sensor_noise(&s, 0.5, 1).unwrap();
        let diffs: Vec<f64> = noisy.values().iter().zip(s.values()).map(|(a, b)| a - b).collect();
        let mean = diffs.iter().sum::<f64>() / diffs.len() as f64;
        let var = diffs.iter().map(|d| (d - mean) * (d - mean)).sum::<f64>() / diffs.len() as f64;
        assert!(mean.abs() < 0.15, "mean={mean}");
        assert!((var.sqrt() - 0.5).abs() < 0.15, "std={}", var.sqrt());
    }

    #[test]
    fn rejects_negative_std() {
        assert!(matches!(
            add_sensor_noise(&ramp(), -1.0, 0),
            Err(SimError::InvalidParameter { name: "noise_std", .. })
        ));
    }
}
