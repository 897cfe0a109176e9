//! Work integral over a pressure / displacement history.

use crate::error::SimError;
use crate::math::trapezoid;

/// Trapezoidal integral of `pressure · area · height_change` over `time`.
///
/// Only the first `n - 1` samples of each input are integrated: the final
/// sample is dropped before integrating. Reference outputs depend on this
/// alignment, so it must not be "corrected".
pub fn compute_work(
    time: &[f64],
    pressure: &[f64],
    area: f64,
    height_change: &[f64],
) -> Result<f64, SimError> {
    let n = time.len();
    if pressure.len() != n || height_change.len() != n {
        return Err(SimError::InvalidInput(format!(
            "Work integral needs equal-length inputs (time={n}, pressure={}, height_change={}).",
            pressure.len(),
            height_change.len()
        )));
    }
    if n < 2 {
        return Err(SimError::InvalidInput(
            "Work integral needs at least two samples.".to_string(),
        ));
    }
    if !area.is_finite() {
        return Err(SimError::numeric("work integral", format!("non-finite area {area}")));
    }

    let m = n - 1;
    let integrand: Vec<f64> = pressure[..m]
        .iter()
        .zip(&height_change[..m])
        .map(|(p, dh)| p * area * dh)
        .collect();
    let work = trapezoid(&integrand, &time[..m]);

    if !work.is_finite() {
        return Err(SimError::numeric("work integral", format!("result is {work}")));
    }
    Ok(work)
}

/// Per-step displacement increments, with a leading zero so the output
/// aligns with the input grid.
pub fn height_increments(displacement: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(displacement.len());
    if displacement.is_empty() {
        return out;
    }
    out.push(0.0);
    out.extend(displacement.windows(2).map(|w| w[1] - w[0]));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_pressure_three_points() {
        // Truncated to the first two samples: integrand 100·0.01·0.1 = 0.1 on [0, 1].
        let work = compute_work(&[0.0, 1.0, 2.0], &[100.0; 3], 0.01, &[0.1; 3]).unwrap();
        assert!((work - 0.1).abs() < 1e-12, "work={work}");
    }

    #[test]
    fn final_sample_is_ignored() {
        let a = compute_work(&[0.0, 1.0, 2.0], &[100.0, 200.0, 1e9], 0.01, &[0.1, 0.2, 5.0]).unwrap();
        let b = compute_work(&[0.0, 1.0, 2.0], &[100.0, 200.0, 0.0], 0.01, &[0.1, 0.2, 0.0]).unwrap();
        assert_eq!(a, b);
        // (0.1 + 0.4) / 2
        assert!((a - 0.25).abs() < 1e-12);
    }

    #[test]
    fn exponential_pressure_sample() {
        // P = 100·exp(0.1 t) on t = 0..5 with increasing piston steps, area 0.01.
        let time: [f64; 6] = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let pressure: Vec<f64> = time.iter().map(|t| 100.0 * (0.1 * t).exp()).collect();
        let heights = [0.02, 0.03, 0.04, 0.05, 0.06, 0.07];
        let work = compute_work(&time, &pressure, 0.01, &heights).unwrap();

        let y: Vec<f64> = (0..5).map(|i| pressure[i] * 0.01 * heights[i]).collect();
        let expected: f64 = (1..5).map(|i| (y[i] + y[i - 1]) / 2.0).sum();
        assert!((work - expected).abs() < 1e-12);
    }

    #[test]
    fn rejects_mismatched_or_short_inputs() {
        assert!(compute_work(&[0.0, 1.0], &[1.0], 1.0, &[1.0, 1.0]).is_err());
        assert!(compute_work(&[0.0], &[1.0], 1.0, &[1.0]).is_err());
    }

    #[test]
    fn two_samples_integrate_to_zero() {
        assert_eq!(compute_work(&[0.0, 1.0], &[5.0, 5.0], 1.0, &[1.0, 1.0]).unwrap(), 0.0);
    }

    #[test]
    fn increments_align_with_grid() {
        assert_eq!(height_increments(&[0.0, 0.5, 1.5]), vec![0.0, 0.5, 1.0]);
        assert!(height_increments(&[]).is_empty());
    }
}
