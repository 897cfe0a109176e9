//! Summary statistics used for scoring fits and integrating work.

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Total sum of squares `Σ(y - ȳ)²`.
pub fn ss_total(observed: &[f64]) -> Option<f64> {
    let m = mean(observed)?;
    Some(observed.iter().map(|y| (y - m) * (y - m)).sum())
}

/// Residual sum of squares `Σ(y - ŷ)²`.
pub fn ss_residual(observed: &[f64], predicted: &[f64]) -> Option<f64> {
    if observed.len() != predicted.len() {
        return None;
    }
    Some(
        observed
            .iter()
            .zip(predicted)
            .map(|(y, p)| (y - p) * (y - p))
            .sum(),
    )
}

/// Coefficient of determination `R² = 1 - SS_res / SS_tot`.
///
/// Returns `None` when the lengths differ, the input is empty, or the observed
/// series has zero variance (R² undefined).
pub fn r_squared(observed: &[f64], predicted: &[f64]) -> Option<f64> {
    let ss_tot = ss_total(observed)?;
    let ss_res = ss_residual(observed, predicted)?;
    if ss_tot == 0.0 {
        return None;
    }
    Some(1.0 - ss_res / ss_tot)
}

/// Trapezoidal integral of `y` over the sample points `x`.
///
/// Matches numpy's `trapz`: fewer than two points integrate to zero.
/// `x` and `y` must have equal length (the shorter length is used otherwise).
pub fn trapezoid(y: &[f64], x: &[f64]) -> f64 {
    let n = y.len().min(x.len());
    let mut total = 0.0;
    for i in 1..n {
        total += (x[i] - x[i - 1]) * (y[i] + y[i - 1]) / 2.0;
    }
    total
}
