//! Shared "simulate + fit" pipeline used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! phase 1 -> (sensor noise) -> fit/select -> phase 2 -> work integral
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use crate::data::add_sensor_noise;
use crate::domain::{
    HeatBudget, ModelKind, Phase1Series, Phase2Series, RunConfig, SelectionResult, TimeSeries,
};
use crate::error::SimError;
use crate::fit::{fit_and_select, FitOptions};
use crate::physics::{compute_work, heat_budget, height_increments, simulate_phase1, simulate_phase2};

/// Phase 1 plus the model fits on its pressure series.
#[derive(Debug, Clone)]
pub struct FitStage {
    pub phase1: Phase1Series,
    /// The series the models were fitted to (phase 1 pressure, possibly noisy).
    pub observed: TimeSeries,
    pub selection: SelectionResult,
}

/// All computed outputs of a single `piston simulate` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub phase1: Phase1Series,
    pub observed: TimeSeries,
    pub selection: SelectionResult,
    pub phase2: Phase2Series,
    pub heat_budget: HeatBudget,
    /// Trapezoidal work integral over the phase 2 history (kJ).
    pub work_integral: f64,
}

/// Simulate phase 1 and fit the candidate models to its pressure series.
pub fn run_fits(config: &RunConfig) -> Result<FitStage, SimError> {
    let phase1 = simulate_phase1(&config.params)?;
    let observed = add_sensor_noise(&phase1.pressure, config.noise_std, config.noise_seed)?;
    let selection = select_with_retry(&observed, config)?;

    Ok(FitStage {
        phase1,
        observed,
        selection,
    })
}

/// Execute the full pipeline and return the computed outputs.
pub fn run_simulation(config: &RunConfig) -> Result<RunOutput, SimError> {
    let FitStage {
        phase1,
        observed,
        selection,
    } = run_fits(config)?;

    let phase2 = simulate_phase2(&phase1.pressure, &config.params)?;
    let dh = height_increments(phase2.displacement.values());
    let work_integral = compute_work(
        phase2.pressure.time(),
        phase2.pressure.values(),
        config.params.piston_area(),
        &dh,
    )?;
    let heat_budget = heat_budget(&config.params, config.delta_t)?;

    log::info!(
        "run complete: best={} W_end={:.6} ∫W={work_integral:.6}",
        selection.best.model,
        phase2.work.last_value()
    );

    Ok(RunOutput {
        phase1,
        observed,
        selection,
        phase2,
        heat_budget,
        work_integral,
    })
}

/// Fit and select; on an exponential convergence failure, retry with each
/// configured fallback seed before giving up.
pub fn select_with_retry(observed: &TimeSeries, config: &RunConfig) -> Result<SelectionResult, SimError> {
    let opts = FitOptions::from_run_config(config);
    let mut last_err = match fit_and_select(observed.time(), observed.values(), &opts, config.parallel) {
        Ok(sel) => return Ok(sel),
        Err(e) => e,
    };

    for seed in &config.fallback_seeds {
        if !is_exponential_failure(&last_err) {
            break;
        }
        log::warn!("{last_err}; retrying exponential fit from seed {seed:?}");
        let retry = opts.with_exponential_seed(*seed);
        match fit_and_select(observed.time(), observed.values(), &retry, config.parallel) {
            Ok(sel) => return Ok(sel),
            Err(e) => last_err = e,
        }
    }
    Err(last_err)
}

fn is_exponential_failure(err: &SimError) -> bool {
    matches!(
        err,
        SimError::FitConvergence {
            model: ModelKind::Exponential,
            ..
        }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParametersBuilder;

    fn small_config() -> RunConfig {
        RunConfig {
            params: ParametersBuilder {
                steps: 200,
                ..Default::default()
            }
            .build()
            .unwrap(),
            ..RunConfig::default()
        }
    }

    #[test]
    fn full_run_produces_consistent_outputs() {
        let config = small_config();
        let out = run_simulation(&config).unwrap();

        assert_eq!(out.phase1.pressure.len(), 200);
        assert_eq!(out.phase2.work.len(), 200);
        assert_eq!(out.observed, out.phase1.pressure);
        assert_eq!(out.selection.fits.len(), 3);
        // Phase 1 pressure is exactly linear in time.
        assert_eq!(out.selection.best.model, ModelKind::Linear);
        assert!(out.work_integral > 0.0);
        assert!((out.heat_budget.delta_t - 50.0).abs() < 1e-12);
    }

    #[test]
    fn reference_parameters_complete_the_pipeline() {
        let out = run_simulation(&RunConfig::default()).unwrap();

        assert_eq!(out.selection.best.model, ModelKind::Linear);
        let exp = out.selection.fit_for(ModelKind::Exponential).unwrap();
        assert!(exp.r_squared.is_finite() && exp.r_squared < out.selection.best.r_squared);
        assert!(exp.evaluations < RunConfig::default().max_evaluations);

        // Phase 2 starts at rest and is driven at a constant pressure afterwards.
        let p2 = out.phase2.pressure.values();
        assert_eq!(p2[0], 0.0);
        assert!(p2[1..].iter().all(|&p| p == p2[1]));
    }

    #[test]
    fn noisy_run_still_fits() {
        let config = RunConfig {
            noise_std: 0.5,
            noise_seed: 9,
            ..small_config()
        };
        let out = run_fits(&config).unwrap();
        assert_ne!(out.observed, out.phase1.pressure);
        assert!(out.selection.best.r_squared > 0.9);
    }

    #[test]
    fn retry_recovers_with_fallback_seed() {
        // The primary seed overflows exp(b·t), the fallback is sane.
        let config = RunConfig {
            exponential_seed: [1.0, 1e6, 1.0],
            fallback_seeds: vec![[1.0, 0.1, 1.0]],
            ..small_config()
        };
        let sel = select_with_retry(&run_fits_observed(&config), &config).unwrap();
        assert_eq!(sel.fits.len(), 3);
    }

    #[test]
    fn exhausted_retries_propagate_the_error() {
        let config = RunConfig {
            exponential_seed: [1.0, 1e6, 1.0],
            fallback_seeds: vec![[1.0, 2e6, 1.0]],
            ..small_config()
        };
        let err = select_with_retry(&run_fits_observed(&config), &config).unwrap_err();
        assert!(is_exponential_failure(&err));
        assert_eq!(err.exit_code(), 3);
    }

    fn run_fits_observed(config: &RunConfig) -> TimeSeries {
        simulate_phase1(&config.params).unwrap().pressure
    }
}
