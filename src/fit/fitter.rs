//! Fitting routine for a single model kind.
//!
//! Given:
//! - sample times `t_i`
//! - observed values `y_i`
//! - a model kind
//!
//! we:
//! - seed the coefficients (exact SVD least squares for the models that are
//!   linear in their coefficients, a configured guess for the exponential)
//! - refine them with Levenberg–Marquardt on `Σ (y_i - f(t_i))²`, using the
//!   total sum of squares as the solver's stall scale (a step that moves R² by
//!   less than `ftol` is no progress)
//! - score the result with R², SSE and RMSE

use nalgebra::{DMatrix, DVector};

use crate::domain::{FitResult, ModelKind, RunConfig, TimeSeries};
use crate::error::SimError;
use crate::math::{
    levenberg_marquardt, r_squared, solve_least_squares, ss_residual, ss_total,
    LeastSquaresProblem, LmOptions,
};
use crate::models::{fill_jacobian_row, fitted_values, is_linear_in_params, predict};

/// Options that affect how each model is calibrated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    /// Starting point for `a·exp(b·t) + c`.
    pub exponential_seed: [f64; 3],
    pub solver: LmOptions,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            exponential_seed: [1.0, 0.1, 1.0],
            solver: LmOptions::default(),
        }
    }
}

impl FitOptions {
    pub fn from_run_config(config: &RunConfig) -> Self {
        Self {
            exponential_seed: config.exponential_seed,
            solver: LmOptions {
                max_evaluations: config.max_evaluations,
                ftol: config.ftol,
                xtol: config.xtol,
                gtol: config.gtol,
                ..LmOptions::default()
            },
        }
    }

    /// Same options with a different exponential starting point.
    pub fn with_exponential_seed(self, seed: [f64; 3]) -> Self {
        Self {
            exponential_seed: seed,
            ..self
        }
    }
}

/// `observed - model(t; p)` over borrowed sample columns.
struct CurveProblem<'a> {
    model: ModelKind,
    time: &'a [f64],
    observed: &'a [f64],
    ss_tot: f64,
}

impl LeastSquaresProblem for CurveProblem<'_> {
    fn observation_count(&self) -> usize {
        self.time.len()
    }

    fn param_count(&self) -> usize {
        self.model.param_count()
    }

    fn residuals(&self, params: &DVector<f64>, out: &mut DVector<f64>) {
        let p = params.as_slice();
        for (i, (&t, &y)) in self.time.iter().zip(self.observed).enumerate() {
            out[i] = y - predict(self.model, t, p);
        }
    }

    fn jacobian(&self, params: &DVector<f64>, out: &mut DMatrix<f64>) {
        let p = params.as_slice();
        let mut row = [0.0; 3];
        for (i, &t) in self.time.iter().enumerate() {
            fill_jacobian_row(self.model, t, p, &mut row);
            for j in 0..self.model.param_count() {
                out[(i, j)] = row[j];
            }
        }
    }

    fn reference_sse(&self) -> Option<f64> {
        Some(self.ss_tot)
    }
}

/// Fit `model` to `(time, observed)`.
pub fn fit(
    model: ModelKind,
    time: &[f64],
    observed: &[f64],
    opts: &FitOptions,
) -> Result<FitResult, SimError> {
    let n = time.len();
    let k = model.param_count();
    if observed.len() != n {
        return Err(SimError::InvalidInput(format!(
            "{model} fit: {n} time samples vs {} observations.",
            observed.len()
        )));
    }
    if n < k {
        return Err(SimError::InvalidInput(format!(
            "{model} fit needs at least {k} samples, got {n}."
        )));
    }
    if time.iter().chain(observed).any(|v| !v.is_finite()) {
        return Err(SimError::InvalidInput(format!(
            "{model} fit: input contains non-finite values."
        )));
    }

    let ss_tot = ss_total(observed).unwrap_or(0.0);
    if ss_tot == 0.0 {
        return Err(SimError::FitConvergence {
            model,
            reason: "observed series has zero variance".to_string(),
        });
    }

    let seed = initial_guess(model, time, observed, opts)?;
    let problem = CurveProblem {
        model,
        time,
        observed,
        ss_tot,
    };
    let solution = levenberg_marquardt(&problem, &seed, &opts.solver).map_err(|e| {
        SimError::FitConvergence {
            model,
            reason: e.to_string(),
        }
    })?;

    log::debug!(
        "{model}: solver stopped on {:?} after {} evaluations",
        solution.termination,
        solution.evaluations
    );

    let params: Vec<f64> = solution.params.iter().copied().collect();
    score(model, params, time, observed, solution.evaluations)
}

/// Fit `model` to a time series.
pub fn fit_series(
    model: ModelKind,
    series: &TimeSeries,
    opts: &FitOptions,
) -> Result<FitResult, SimError> {
    fit(model, series.time(), series.values(), opts)
}

fn initial_guess(
    model: ModelKind,
    time: &[f64],
    observed: &[f64],
    opts: &FitOptions,
) -> Result<Vec<f64>, SimError> {
    if !is_linear_in_params(model) {
        return Ok(opts.exponential_seed.to_vec());
    }

    // Design rows do not depend on the coefficients for these models.
    let k = model.param_count();
    let zeros = [0.0; 3];
    let mut row = [0.0; 3];
    let mut x = DMatrix::<f64>::zeros(time.len(), k);
    for (i, &t) in time.iter().enumerate() {
        fill_jacobian_row(model, t, &zeros, &mut row);
        for j in 0..k {
            x[(i, j)] = row[j];
        }
    }
    let y = DVector::from_column_slice(observed);

    let Some(beta) = solve_least_squares(&x, &y) else {
        return Err(SimError::FitConvergence {
            model,
            reason: "linear least-squares seed failed".to_string(),
        });
    };
    Ok(beta.iter().copied().collect())
}

fn score(
    model: ModelKind,
    params: Vec<f64>,
    time: &[f64],
    observed: &[f64],
    evaluations: usize,
) -> Result<FitResult, SimError> {
    let mut fit = FitResult {
        model,
        params,
        r_squared: f64::NAN,
        sse: f64::NAN,
        rmse: f64::NAN,
        evaluations,
    };
    let predicted = fitted_values(&fit, time);
    if predicted.iter().any(|v| !v.is_finite()) {
        return Err(SimError::numeric(
            format!("{model} fit"),
            "non-finite prediction",
        ));
    }

    let sse = ss_residual(observed, &predicted).unwrap_or(f64::NAN);
    let r2 = r_squared(observed, &predicted).unwrap_or(f64::NAN);
    if !(sse.is_finite() && r2.is_finite()) {
        return Err(SimError::numeric(
            format!("{model} fit"),
            format!("sse={sse} r_squared={r2}"),
        ));
    }

    fit.sse = sse;
    fit.rmse = (sse / observed.len() as f64).sqrt();
    fit.r_squared = r2;
    log::debug!(
        "{model}: params={:?} r2={r2:.10} sse={sse:.4e} evals={evaluations}",
        fit.params
    );
    Ok(fit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grid(n: usize, step: f64) -> Vec<f64> {
        (0..n).map(|i| i as f64 * step).collect()
    }

    #[test]
    fn linear_recovers_coefficients() {
        let t = grid(40, 0.25);
        let y: Vec<f64> = t.iter().map(|&t| 3.5 * t - 2.0).collect();
        let f = fit(ModelKind::Linear, &t, &y, &FitOptions::default()).unwrap();

        assert_eq!(f.params.len(), 2);
        assert!((f.params[0] - 3.5).abs() < 1e-9, "a={}", f.params[0]);
        assert!((f.params[1] + 2.0).abs() < 1e-9, "b={}", f.params[1]);
        assert!((f.r_squared - 1.0).abs() < 1e-12);
        assert!(f.r_squared <= 1.0);
    }

    #[test]
    fn quadratic_beats_linear_on_curved_data() {
        let t = grid(50, 0.2);
        let y: Vec<f64> = t.iter().map(|&t| 0.5 * t * t + t + 2.0).collect();
        let opts = FitOptions::default();

        let lin = fit(ModelKind::Linear, &t, &y, &opts).unwrap();
        let quad = fit(ModelKind::Quadratic, &t, &y, &opts).unwrap();

        assert!(lin.r_squared < quad.r_squared);
        assert!((quad.params[0] - 0.5).abs() < 1e-8);
        assert!((quad.params[1] - 1.0).abs() < 1e-8);
        assert!((quad.params[2] - 2.0).abs() < 1e-8);
    }

    #[test]
    fn exponential_recovers_coefficients_from_default_seed() {
        let t = grid(60, 0.1);
        let y: Vec<f64> = t.iter().map(|&t| 2.0 * (0.4 * t).exp() + 1.0).collect();
        let f = fit(ModelKind::Exponential, &t, &y, &FitOptions::default()).unwrap();

        assert!((f.params[0] - 2.0).abs() < 1e-5, "a={}", f.params[0]);
        assert!((f.params[1] - 0.4).abs() < 1e-5, "b={}", f.params[1]);
        assert!((f.params[2] - 1.0).abs() < 1e-5, "c={}", f.params[2]);
        assert!(f.r_squared > 0.999_999);
    }

    #[test]
    fn constant_zero_series_is_fit_convergence_for_every_model() {
        let t = grid(10, 1.0);
        let y = vec![0.0; 10];
        for kind in ModelKind::ALL {
            let err = fit(kind, &t, &y, &FitOptions::default()).unwrap_err();
            assert!(err.is_fit_convergence(), "{kind}: {err}");
        }
    }

    #[test]
    fn exhausted_budget_is_fit_convergence() {
        let t = grid(30, 0.2);
        let y: Vec<f64> = t.iter().map(|&t| 5.0 * (0.7 * t).exp() - 3.0).collect();
        let opts = FitOptions {
            solver: LmOptions {
                max_evaluations: 2,
                ..LmOptions::default()
            },
            ..FitOptions::default()
        };
        let err = fit(ModelKind::Exponential, &t, &y, &opts).unwrap_err();
        assert!(matches!(
            err,
            SimError::FitConvergence {
                model: ModelKind::Exponential,
                ..
            }
        ));
    }

    #[test]
    fn exponential_on_a_straight_line_converges() {
        let t = grid(200, 0.05);
        let y: Vec<f64> = t.iter().map(|&t| 101.325 + 47.6 * t).collect();
        let f = fit(ModelKind::Exponential, &t, &y, &FitOptions::default()).unwrap();

        assert!(f.r_squared.is_finite() && f.r_squared < 1.0);
        assert!(f.r_squared > 0.999_99, "r2={}", f.r_squared);
        assert!(f.evaluations < 1000);
    }

    #[test]
    fn overflowing_exponential_seed_is_an_explicit_error() {
        // exp(120 · 5.9) is still finite; the residual sum of squares is not.
        let t = grid(60, 0.1);
        let y: Vec<f64> = t.iter().map(|&t| 2.0 * (0.4 * t).exp() + 1.0).collect();
        let opts = FitOptions::default().with_exponential_seed([1.0, 120.0, 0.0]);

        let err = fit(ModelKind::Exponential, &t, &y, &opts).unwrap_err();
        assert!(err.is_fit_convergence(), "{err}");
        assert!(err.to_string().contains("not finite"), "{err}");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn large_rate_seeds_never_leak_non_finite_scores(b in 0.0f64..200.0) {
            let t = grid(60, 0.1);
            let y: Vec<f64> = t.iter().map(|&t| 2.0 * (0.4 * t).exp() + 1.0).collect();
            let opts = FitOptions::default().with_exponential_seed([1.0, b, 0.0]);

            match fit(ModelKind::Exponential, &t, &y, &opts) {
                Ok(f) => {
                    prop_assert!(f.r_squared.is_finite());
                    prop_assert!(f.params.iter().all(|v| v.is_finite()));
                }
                Err(e) => prop_assert!(
                    e.is_fit_convergence() || matches!(e, SimError::Numeric { .. }),
                    "unexpected error: {}",
                    e
                ),
            }
        }
    }

    #[test]
    fn rejects_malformed_input() {
        let opts = FitOptions::default();
        assert!(matches!(
            fit(ModelKind::Linear, &[0.0, 1.0], &[1.0], &opts),
            Err(SimError::InvalidInput(_))
        ));
        assert!(matches!(
            fit(ModelKind::Quadratic, &[0.0, 1.0], &[1.0, 2.0], &opts),
            Err(SimError::InvalidInput(_))
        ));
        assert!(matches!(
            fit(ModelKind::Linear, &[0.0, 1.0, 2.0], &[1.0, f64::NAN, 2.0], &opts),
            Err(SimError::InvalidInput(_))
        ));
    }

    #[test]
    fn fit_series_matches_slices() {
        let series = TimeSeries::new(grid(20, 0.5), (0..20).map(|i| (i * i) as f64).collect()).unwrap();
        let opts = FitOptions::default();
        let a = fit_series(ModelKind::Quadratic, &series, &opts).unwrap();
        let b = fit(ModelKind::Quadratic, series.time(), series.values(), &opts).unwrap();
        assert_eq!(a, b);
    }
}
