//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the physics/fitting code stays clean and testable
//! - output changes are localized (snapshot tests below)

use crate::app::pipeline::RunOutput;
use crate::domain::{FitResult, HeatBudget, RunConfig, SelectionResult, SimulationParameters, TimeSeries};
use crate::error::SimError;
use crate::report::{compute_residuals, worst_residual};

/// Format the full run summary (parameters, heat budget, fits, phase finals).
pub fn format_run_summary(run: &RunOutput, config: &RunConfig) -> String {
    let mut out = String::new();

    out.push_str("=== piston - Piston-Cylinder Simulation ===\n");
    out.push_str(&format_parameters(&config.params));
    if config.noise_std > 0.0 {
        out.push_str(&format!(
            "Noise: std={} seed={}\n",
            config.noise_std, config.noise_seed
        ));
    }

    out.push('\n');
    out.push_str(&format_heat_budget(&run.heat_budget));

    out.push_str("\nPhase 1 pressure fits:\n");
    out.push_str(&format_fit_table(&run.selection));
    if let Ok(line) = format_worst_residual(&run.observed, &run.selection.best) {
        out.push_str(&line);
    }

    let p1 = &run.phase1;
    let p2 = &run.phase2;
    out.push_str("\nPhase 1 (sealed heating):\n");
    out.push_str(&format!("- Q_end = {:.4} kJ\n", p1.heat.last_value()));
    out.push_str(&format!("- T_end = {:.4} °C\n", p1.temperature.last_value()));
    out.push_str(&format!("- P_end = {:.4} kPa\n", p1.pressure.last_value()));

    out.push_str("\nPhase 2 (piston release):\n");
    out.push_str(&format!("- P_drive = {:.4} kPa\n", p2.pressure.last_value()));
    out.push_str(&format!("- h_end   = {:.6} m\n", p2.displacement.last_value()));
    out.push_str(&format!("- W_end   = {:.6} kJ\n", p2.work.last_value()));
    out.push_str(&format!("- ∫P·A·dh = {:.6} kJ (trapezoidal)\n", run.work_integral));
    out.push('\n');

    out
}

/// One line per candidate fit; the selected model is marked with `*`.
pub fn format_fit_table(selection: &SelectionResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "  {:<12} {:>14} {:>12} {:>12} {:>6}  {}\n",
        "model", "R²", "SSE", "RMSE", "evals", "params"
    ));
    for fit in &selection.fits {
        let chosen = if fit.model == selection.best.model { "*" } else { " " };
        out.push_str(&format!(
            "{chosen} {:<12} {:>14.10} {:>12.4e} {:>12.4e} {:>6}  {}\n",
            fit.model.display_name(),
            fit.r_squared,
            fit.sse,
            fit.rmse,
            fit.evaluations,
            fmt_vec(&fit.params)
        ));
    }
    out.push_str(&format!(
        "Best: {} ({})\n",
        selection.best.model,
        selection.best.model.formula()
    ));
    out
}

/// Largest residual of `fit` against `observed`, relative to the observed span.
pub fn format_worst_residual(observed: &TimeSeries, fit: &FitResult) -> Result<String, SimError> {
    let residuals = compute_residuals(observed, fit)?;
    let Some(worst) = worst_residual(&residuals) else {
        return Ok(String::new());
    };
    let (lo, hi) = observed.value_range();
    let span = hi - lo;
    let share = if span > 0.0 { worst.residual.abs() / span } else { 0.0 };
    Ok(format!(
        "Largest residual: {:+.4e} at t={:.3} s (observed {:.4}, fitted {:.4}; {share:.2e} of span)\n",
        worst.residual, worst.time, worst.observed, worst.fitted
    ))
}

pub fn format_heat_budget(budget: &HeatBudget) -> String {
    let mut out = String::new();
    out.push_str(&format!("Heat budget (ΔT = {} °C):\n", budget.delta_t));
    out.push_str(&format!("- sensible Q1 = {:.4} kJ\n", budget.sensible));
    out.push_str(&format!("- latent   Q2 = {:.4} kJ\n", budget.latent));
    out.push_str(&format!("- total    Q  = {:.4} kJ\n", budget.total));
    out.push_str(&format!("- internal ΔU = {:.4} kJ\n", budget.internal_energy));
    out
}

/// Result of the standalone work integral.
pub fn format_work(a: f64, b: f64, area: f64, samples: usize, work: f64) -> String {
    format!(
        "Pressure model: P(t) = {a} * exp({b} * t), area = {area} m², {samples} samples\n\
         Total work done by the system: {work:.2} J\n"
    )
}

fn format_parameters(p: &SimulationParameters) -> String {
    format!(
        "Steps: {} | duration={} s | heat_rate={} kJ/s\n\
         Water: m={} kg cp={} cv={} | evaporated={} kg h_fg={}\n\
         Piston: m={} kg A={} m² | g={} | P_atm={} kPa\n",
        p.steps(),
        p.duration(),
        p.heat_rate(),
        p.water_mass(),
        p.specific_heat_cp(),
        p.specific_heat_cv(),
        p.evaporated_mass(),
        p.latent_heat(),
        p.piston_mass(),
        p.piston_area(),
        p.gravity(),
        p.atm_pressure(),
    )
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6}")).collect();
    format!("[{}]", parts.join(", "))
}
