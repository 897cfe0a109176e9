//! Model evaluation for the linear / quadratic / exponential candidates.
//!
//! The fitter relies on two primitive operations:
//! - predict `f(t)` given coefficients (for residuals/plots)
//! - fill a Jacobian row `∂f/∂params` at `t` (for the solver)
//!
//! Linear and quadratic models are linear in their coefficients, so their
//! Jacobian row doubles as the OLS design row used to seed them.

use crate::domain::{FitResult, ModelKind};

/// Predict `f(t)` for the given model kind.
///
/// # Panics
/// Panics if `params` is shorter than `model.param_count()`.
pub fn predict(model: ModelKind, t: f64, params: &[f64]) -> f64 {
    match model {
        ModelKind::Linear => params[0] * t + params[1],
        ModelKind::Quadratic => params[0] * t * t + params[1] * t + params[2],
        ModelKind::Exponential => params[0] * (params[1] * t).exp() + params[2],
    }
}

/// Fill `out` with the partial derivatives of `f(t)` w.r.t. each coefficient.
///
/// # Panics
/// Panics if `out` or `params` is shorter than `model.param_count()`.
pub fn fill_jacobian_row(model: ModelKind, t: f64, params: &[f64], out: &mut [f64]) {
    match model {
        ModelKind::Linear => {
            out[0] = t;
            out[1] = 1.0;
        }
        ModelKind::Quadratic => {
            out[0] = t * t;
            out[1] = t;
            out[2] = 1.0;
        }
        ModelKind::Exponential => {
            let e = (params[1] * t).exp();
            out[0] = e;
            out[1] = params[0] * t * e;
            out[2] = 1.0;
        }
    }
}

/// Whether the model is linear in its coefficients (closed-form seed available).
pub fn is_linear_in_params(model: ModelKind) -> bool {
    matches!(model, ModelKind::Linear | ModelKind::Quadratic)
}

/// Evaluate a fitted model on a grid.
pub fn fitted_values(fit: &FitResult, times: &[f64]) -> Vec<f64> {
    times.iter().map(|&t| predict(fit.model, t, &fit.params)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_matches_formulas() {
        assert_eq!(predict(ModelKind::Linear, 2.0, &[3.0, 1.0]), 7.0);
        assert_eq!(predict(ModelKind::Quadratic, 2.0, &[1.0, -1.0, 0.5]), 2.5);
        let y = predict(ModelKind::Exponential, 1.0, &[2.0, 0.0, 1.0]);
        assert!((y - 3.0).abs() < 1e-15);
    }

    #[test]
    fn exponential_jacobian_matches_finite_difference() {
        let params = [1.5, 0.2, -3.0];
        let t = 2.5;
        let mut row = [0.0; 3];
        fill_jacobian_row(ModelKind::Exponential, t, &params, &mut row);

        let h = 1e-6;
        for j in 0..3 {
            let mut up = params;
            let mut down = params;
            up[j] += h;
            down[j] -= h;
            let fd = (predict(ModelKind::Exponential, t, &up)
                - predict(ModelKind::Exponential, t, &down))
                / (2.0 * h);
            assert!((fd - row[j]).abs() < 1e-6, "param {j}: fd={fd} analytic={}", row[j]);
        }
    }
}
