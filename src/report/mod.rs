//! Reporting utilities: fit residuals and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::{FitResult, TimeSeries};
use crate::error::SimError;
use crate::models::predict;

/// Observed vs fitted value at one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Residual {
    pub time: f64,
    pub observed: f64,
    pub fitted: f64,
    pub residual: f64,
}

/// Compute fitted values and residuals for each sample of `series`.
pub fn compute_residuals(series: &TimeSeries, fit: &FitResult) -> Result<Vec<Residual>, SimError> {
    let mut out = Vec::with_capacity(series.len());
    for (time, observed) in series.iter() {
        let fitted = predict(fit.model, time, &fit.params);
        if !fitted.is_finite() {
            return Err(SimError::numeric(
                "residuals",
                format!("non-finite {} prediction at t={time}", fit.model),
            ));
        }
        out.push(Residual {
            time,
            observed,
            fitted,
            residual: observed - fitted,
        });
    }
    Ok(out)
}

/// Sample with the largest absolute residual.
pub fn worst_residual(residuals: &[Residual]) -> Option<Residual> {
    residuals
        .iter()
        .copied()
        .max_by(|a, b| a.residual.abs().total_cmp(&b.residual.abs()))
}
