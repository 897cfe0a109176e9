//! Levenberg–Marquardt non-linear least squares.
//!
//! Minimises `Σ r_i(p)²` where `r = observed - predicted(p)`. Each iteration
//! solves the damped linearised problem
//!
//! ```text
//! minimize ||r - J δ||² + λ Σ d_j δ_j²
//! ```
//!
//! with `J` the Jacobian of the predictions and `d_j = ||J_j||²` (Marquardt
//! scaling). The damped system is stacked as `[J; sqrt(λ D)] δ = [r; 0]` and
//! handed to the SVD solver in [`crate::math::ols`], which keeps steps finite
//! when columns are nearly collinear.
//!
//! Damping follows Nielsen's update: shrink by `max(1/3, 1 - (2ρ - 1)³)` after
//! an accepted step (`ρ` = actual / predicted reduction), grow by a doubling
//! factor after each rejected one.
//!
//! Termination mirrors MINPACK's tests:
//! - gradient: every Jacobian column is orthogonal to `r` within `gtol`
//! - cost: actual and predicted relative SSE reduction both `<= ftol`
//! - step: `||δ|| <= xtol (||p|| + xtol)`
//!
//! plus a stall test for problems that report a [`reference_sse`]: the run stops
//! once `stall_steps` consecutive accepted steps each lowered the SSE by at most
//! `ftol · reference`. An exponential fitted to a straight line has no finite
//! optimum (`b → 0`, `a → ∞`), and every step there still cuts the SSE by a few
//! percent, so the relative tests never fire.
//!
//! [`reference_sse`]: LeastSquaresProblem::reference_sse

use nalgebra::{DMatrix, DVector};

use crate::math::solve_least_squares;

const MIN_DAMPING: f64 = 1e-15;
const MAX_DAMPING: f64 = 1e16;

/// A least-squares problem over a fixed set of observations.
pub trait LeastSquaresProblem {
    fn observation_count(&self) -> usize;
    fn param_count(&self) -> usize;

    /// Fill `out` with `observed - predicted(params)`.
    fn residuals(&self, params: &DVector<f64>, out: &mut DVector<f64>);

    /// Fill `out` (observations × params) with `∂predicted/∂params`.
    fn jacobian(&self, params: &DVector<f64>, out: &mut DMatrix<f64>);

    /// Scale for the stall test, typically the total sum of squares of the
    /// observations. `None` disables the test.
    fn reference_sse(&self) -> Option<f64> {
        None
    }
}

/// Solver budget and tolerances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmOptions {
    /// Maximum residual evaluations (including the initial one).
    pub max_evaluations: usize,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    pub initial_damping: f64,
    /// Consecutive negligible steps (relative to [`LeastSquaresProblem::reference_sse`])
    /// that count as converged.
    pub stall_steps: usize,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_evaluations: 1000,
            ftol: 1.49e-8,
            xtol: 1.49e-8,
            gtol: 1e-12,
            initial_damping: 1e-3,
            stall_steps: 5,
        }
    }
}

/// Which convergence test stopped the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    ExactFit,
    Gradient,
    CostReduction,
    StepSize,
    /// Progress fell below the problem's reference scale.
    Stalled,
}

#[derive(Debug, Clone)]
pub struct LmSolution {
    pub params: DVector<f64>,
    pub sse: f64,
    pub evaluations: usize,
    pub termination: Termination,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LmError {
    #[error("initial guess has {got} parameters, expected {expected}")]
    ParamCount { expected: usize, got: usize },
    #[error("residuals or their sum of squares are not finite at the initial guess")]
    NonFiniteStart,
    #[error("Jacobian is not finite after {evaluations} evaluations")]
    NonFiniteJacobian { evaluations: usize },
    #[error("no convergence within {evaluations} evaluations (sse={sse:.6e})")]
    MaxEvaluations { evaluations: usize, sse: f64 },
    #[error("damping exceeded 1e16 without reducing the cost (sse={sse:.6e})")]
    DampingOverflow { sse: f64 },
}

/// Run Levenberg–Marquardt from `initial`.
pub fn levenberg_marquardt<P: LeastSquaresProblem>(
    problem: &P,
    initial: &[f64],
    opts: &LmOptions,
) -> Result<LmSolution, LmError> {
    let n = problem.observation_count();
    let k = problem.param_count();
    if initial.len() != k {
        return Err(LmError::ParamCount {
            expected: k,
            got: initial.len(),
        });
    }

    let mut p = DVector::from_column_slice(initial);
    let mut r = DVector::<f64>::zeros(n);
    let mut r_trial = DVector::<f64>::zeros(n);
    let mut jac = DMatrix::<f64>::zeros(n, k);

    problem.residuals(&p, &mut r);
    let mut evaluations = 1usize;
    let mut sse = r.norm_squared();
    if !sse.is_finite() {
        return Err(LmError::NonFiniteStart);
    }
    let mut lambda = opts.initial_damping.max(MIN_DAMPING);
    let mut growth = 2.0;
    let stall_floor = problem.reference_sse().map(|reference| opts.ftol * reference);
    let mut stalled = 0usize;

    let done = |params: DVector<f64>,
                sse: f64,
                evaluations: usize,
                termination: Termination|
     -> Result<LmSolution, LmError> {
        log::debug!("lm: {termination:?} after {evaluations} evaluations, sse={sse:.6e}");
        Ok(LmSolution {
            params,
            sse,
            evaluations,
            termination,
        })
    };

    loop {
        if sse == 0.0 {
            return done(p, sse, evaluations, Termination::ExactFit);
        }

        problem.jacobian(&p, &mut jac);
        if !jac.iter().all(|v| v.is_finite()) {
            return Err(LmError::NonFiniteJacobian { evaluations });
        }

        // Column norms double as the Marquardt scaling.
        let grad = jac.transpose() * &r;
        let mut scale = DVector::<f64>::zeros(k);
        for j in 0..k {
            scale[j] = jac.column(j).norm_squared();
        }
        // Finite entries can still overflow once squared and summed.
        if !grad.iter().chain(scale.iter()).all(|v| v.is_finite()) {
            return Err(LmError::NonFiniteJacobian { evaluations });
        }

        let r_norm = sse.sqrt();
        let mut max_cos = 0.0_f64;
        for j in 0..k {
            if scale[j] > 0.0 {
                max_cos = max_cos.max(grad[j].abs() / (scale[j].sqrt() * r_norm));
            }
        }
        if max_cos <= opts.gtol {
            return done(p, sse, evaluations, Termination::Gradient);
        }

        // Floor the scaling so a vanishing column is still damped.
        let max_scale = scale.max();
        for s in scale.iter_mut() {
            *s = s.max(max_scale * 1e-12).max(f64::MIN_POSITIVE);
        }

        // Raise damping until a step reduces the SSE.
        loop {
            if evaluations >= opts.max_evaluations {
                return Err(LmError::MaxEvaluations { evaluations, sse });
            }

            let mut a = DMatrix::<f64>::zeros(n + k, k);
            a.view_mut((0, 0), (n, k)).copy_from(&jac);
            for j in 0..k {
                a[(n + j, j)] = (lambda * scale[j]).sqrt();
            }
            if !a.rows(n, k).iter().all(|v| v.is_finite()) {
                return Err(LmError::DampingOverflow { sse });
            }
            let mut b = DVector::<f64>::zeros(n + k);
            b.rows_mut(0, n).copy_from(&r);

            let Some(step) = solve_least_squares(&a, &b) else {
                lambda *= growth;
                growth *= 2.0;
                if lambda > MAX_DAMPING {
                    return Err(LmError::DampingOverflow { sse });
                }
                continue;
            };

            let predicted = sse - (&r - &jac * &step).norm_squared();
            let small_step = step.norm() <= opts.xtol * (p.norm() + opts.xtol);

            let trial = &p + &step;
            problem.residuals(&trial, &mut r_trial);
            evaluations += 1;
            let trial_sse = if r_trial.iter().all(|v| v.is_finite()) {
                r_trial.norm_squared()
            } else {
                f64::INFINITY
            };

            if trial_sse < sse {
                let actual = sse - trial_sse;
                let prev = sse;
                let rho = if predicted > 0.0 { actual / predicted } else { 0.0 };
                p = trial;
                std::mem::swap(&mut r, &mut r_trial);
                sse = trial_sse;
                lambda = (lambda * (1.0 / 3.0_f64).max(1.0 - (2.0 * rho - 1.0).powi(3))).max(MIN_DAMPING);
                growth = 2.0;

                if actual <= opts.ftol * prev && predicted <= opts.ftol * prev {
                    return done(p, sse, evaluations, Termination::CostReduction);
                }
                if small_step {
                    return done(p, sse, evaluations, Termination::StepSize);
                }
                if let Some(floor) = stall_floor {
                    stalled = if actual <= floor { stalled + 1 } else { 0 };
                    if stalled >= opts.stall_steps.max(1) {
                        return done(p, sse, evaluations, Termination::Stalled);
                    }
                }
                break;
            }

            if predicted <= opts.ftol * sse {
                return done(p, sse, evaluations, Termination::CostReduction);
            }
            if small_step {
                return done(p, sse, evaluations, Termination::StepSize);
            }

            lambda *= growth;
            growth *= 2.0;
            if lambda > MAX_DAMPING {
                return Err(LmError::DampingOverflow { sse });
            }
        }
    }
}
