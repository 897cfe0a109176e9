//! Model selection (Linear vs Quadratic vs Exponential) by R².
//!
//! Selection is a chained strict comparison, not a max-reduction:
//! 1. Linear wins if its R² strictly exceeds both others
//! 2. otherwise Quadratic wins if its R² strictly exceeds Exponential's
//! 3. otherwise Exponential
//!
//! Exact ties therefore resolve towards the later candidate in each test,
//! with one exception: a fit whose R² rounds to exactly 1 reproduces the series
//! to f64 resolution. Nested models then tie at 1 (a quadratic can always match
//! a line), so the simplest exact model wins.

use rayon::prelude::*;

use crate::domain::{FitResult, ModelKind, SelectionResult};
use crate::error::SimError;
use crate::fit::fitter::{fit, FitOptions};

/// Pick the winning model kind from the three candidate fits.
pub fn select_best(linear: &FitResult, quadratic: &FitResult, exponential: &FitResult) -> ModelKind {
    let (l, q, e) = (linear.r_squared, quadratic.r_squared, exponential.r_squared);
    if is_exact(l) || (l > q && l > e) {
        ModelKind::Linear
    } else if is_exact(q) || q > e {
        ModelKind::Quadratic
    } else {
        ModelKind::Exponential
    }
}

fn is_exact(r_squared: f64) -> bool {
    r_squared >= 1.0
}

/// Fit all three candidates and select the best.
///
/// With `parallel`, the fits run on the rayon pool; results are identical to
/// the sequential path. The first error in `ModelKind::ALL` order is returned.
pub fn fit_and_select(
    time: &[f64],
    observed: &[f64],
    opts: &FitOptions,
    parallel: bool,
) -> Result<SelectionResult, SimError> {
    let results: Vec<Result<FitResult, SimError>> = if parallel {
        ModelKind::ALL
            .par_iter()
            .map(|&kind| fit(kind, time, observed, opts))
            .collect()
    } else {
        ModelKind::ALL
            .iter()
            .map(|&kind| fit(kind, time, observed, opts))
            .collect()
    };
    let fits = results.into_iter().collect::<Result<Vec<_>, _>>()?;

    let best_kind = select_best(&fits[0], &fits[1], &fits[2]);
    let best = fits
        .iter()
        .find(|f| f.model == best_kind)
        .cloned()
        .ok_or_else(|| SimError::InvalidInput(format!("No fit recorded for {best_kind}.")))?;

    log::info!(
        "best model: {best_kind} (R² linear={:.8} quadratic={:.8} exponential={:.8})",
        fits[0].r_squared,
        fits[1].r_squared,
        fits[2].r_squared
    );
    Ok(SelectionResult { best, fits })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_r2(model: ModelKind, r_squared: f64) -> FitResult {
        FitResult {
            model,
            params: vec![0.0; model.param_count()],
            r_squared,
            sse: 0.0,
            rmse: 0.0,
            evaluations: 1,
        }
    }

    fn pick(l: f64, q: f64, e: f64) -> ModelKind {
        select_best(
            &with_r2(ModelKind::Linear, l),
            &with_r2(ModelKind::Quadratic, q),
            &with_r2(ModelKind::Exponential, e),
        )
    }

    #[test]
    fn linear_quadratic_tie_goes_to_quadratic() {
        assert_eq!(pick(0.9, 0.9, 0.5), ModelKind::Quadratic);
    }

    #[test]
    fn chained_rule_is_not_a_max() {
        assert_eq!(pick(0.95, 0.9, 0.5), ModelKind::Linear);
        assert_eq!(pick(0.5, 0.9, 0.9), ModelKind::Exponential);
        assert_eq!(pick(0.9, 0.5, 0.9), ModelKind::Exponential);
        assert_eq!(pick(0.8, 0.7, 0.75), ModelKind::Linear);
        assert_eq!(pick(0.7, 0.6, 0.8), ModelKind::Exponential);
    }

    #[test]
    fn exact_fit_goes_to_the_simplest_model() {
        assert_eq!(pick(1.0, 1.0, 1.0), ModelKind::Linear);
        assert_eq!(pick(1.0, 1.0, 0.999_999), ModelKind::Linear);
        assert_eq!(pick(0.98, 1.0, 1.0), ModelKind::Quadratic);
        assert_eq!(pick(0.9, 0.95, 1.0), ModelKind::Exponential);
    }

    fn grid() -> Vec<f64> {
        (0..50).map(|i| i as f64 * 0.2).collect()
    }

    #[test]
    fn quadratic_data_selects_quadratic() {
        let t = grid();
        let y: Vec<f64> = t.iter().map(|&t| 0.5 * t * t + t + 2.0).collect();
        let sel = fit_and_select(&t, &y, &FitOptions::default(), false).unwrap();

        let lin = sel.fit_for(ModelKind::Linear).unwrap();
        let quad = sel.fit_for(ModelKind::Quadratic).unwrap();
        assert!(lin.r_squared < quad.r_squared);
        assert_eq!(sel.best.model, ModelKind::Quadratic);
        assert_eq!(sel.fits.len(), 3);
    }

    #[test]
    fn linear_data_selects_linear() {
        let t = grid();
        let y: Vec<f64> = t.iter().map(|&t| 101.325 + 4.78 * t).collect();
        let sel = fit_and_select(&t, &y, &FitOptions::default(), false).unwrap();

        assert_eq!(sel.best.model, ModelKind::Linear);
        assert!((sel.best.params[0] - 4.78).abs() < 1e-8);
        assert_eq!(sel.best.r_squared, 1.0);

        // The exponential only approaches a line as b → 0 and stops short of it.
        let exp = sel.fit_for(ModelKind::Exponential).unwrap();
        assert!(exp.r_squared < 1.0 && exp.r_squared > 0.999_99, "r2={}", exp.r_squared);
    }

    #[test]
    fn parallel_matches_sequential() {
        let t = grid();
        let y: Vec<f64> = t.iter().map(|&t| 3.0 * (0.3 * t).exp() + 0.5 * t).collect();
        let opts = FitOptions::default();
        let seq = fit_and_select(&t, &y, &opts, false).unwrap();
        let par = fit_and_select(&t, &y, &opts, true).unwrap();
        assert_eq!(seq, par);
    }

    #[test]
    fn degenerate_series_propagates_fit_error() {
        let t = grid();
        let y = vec![0.0; t.len()];
        let err = fit_and_select(&t, &y, &FitOptions::default(), true).unwrap_err();
        assert!(matches!(
            err,
            SimError::FitConvergence {
                model: ModelKind::Linear,
                ..
            }
        ));
    }
}
