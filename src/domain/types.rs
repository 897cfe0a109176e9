//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - used in-memory during simulation and fitting
//! - exported to JSON/CSV
//! - reloaded later for plotting

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Candidate analytic model for a pressure series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// `a·t + b`
    Linear,
    /// `a·t² + b·t + c`
    Quadratic,
    /// `a·exp(b·t) + c`
    Exponential,
}

impl ModelKind {
    /// All candidates, in tie-break priority order.
    pub const ALL: [ModelKind; 3] = [ModelKind::Linear, ModelKind::Quadratic, ModelKind::Exponential];

    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Linear => "Linear",
            ModelKind::Quadratic => "Quadratic",
            ModelKind::Exponential => "Exponential",
        }
    }

    /// Number of fitted coefficients.
    pub fn param_count(self) -> usize {
        match self {
            ModelKind::Linear => 2,
            ModelKind::Quadratic => 3,
            ModelKind::Exponential => 3,
        }
    }

    /// Formula with symbolic coefficients, for reports and chart legends.
    pub fn formula(self) -> &'static str {
        match self {
            ModelKind::Linear => "a*t + b",
            ModelKind::Quadratic => "a*t^2 + b*t + c",
            ModelKind::Exponential => "a*exp(b*t) + c",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Physical constants driving both phases.
///
/// Units follow the reference setup: kJ, kPa, kg, m, s.
/// Only constructible through [`ParametersBuilder::build`], so every instance
/// has finite, strictly positive values and at least two time steps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ParametersBuilder", into = "ParametersBuilder")]
pub struct SimulationParameters {
    specific_heat_cp: f64,
    specific_heat_cv: f64,
    latent_heat: f64,
    gravity: f64,
    atm_pressure: f64,
    water_mass: f64,
    evaporated_mass: f64,
    piston_area: f64,
    piston_mass: f64,
    heat_rate: f64,
    duration: f64,
    steps: usize,
}

impl SimulationParameters {
    pub fn builder() -> ParametersBuilder {
        ParametersBuilder::default()
    }

    /// Specific heat at constant pressure (kJ/kg·K).
    pub fn specific_heat_cp(&self) -> f64 {
        self.specific_heat_cp
    }

    /// Specific heat at constant volume (kJ/kg·K).
    pub fn specific_heat_cv(&self) -> f64 {
        self.specific_heat_cv
    }

    /// Latent heat of vaporization (kJ/kg).
    pub fn latent_heat(&self) -> f64 {
        self.latent_heat
    }

    pub fn gravity(&self) -> f64 {
        self.gravity
    }

    /// Atmospheric pressure (kPa).
    pub fn atm_pressure(&self) -> f64 {
        self.atm_pressure
    }

    pub fn water_mass(&self) -> f64 {
        self.water_mass
    }

    pub fn evaporated_mass(&self) -> f64 {
        self.evaporated_mass
    }

    /// Piston cross-sectional area (m²).
    pub fn piston_area(&self) -> f64 {
        self.piston_area
    }

    pub fn piston_mass(&self) -> f64 {
        self.piston_mass
    }

    /// Heat input rate (kJ/s).
    pub fn heat_rate(&self) -> f64 {
        self.heat_rate
    }

    /// Total simulated duration (s).
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Convert back into an editable builder (for overrides).
    pub fn to_builder(&self) -> ParametersBuilder {
        ParametersBuilder::from(*self)
    }
}

impl Default for SimulationParameters {
    fn default() -> Self {
        let b = ParametersBuilder::default();
        Self {
            specific_heat_cp: b.specific_heat_cp,
            specific_heat_cv: b.specific_heat_cv,
            latent_heat: b.latent_heat,
            gravity: b.gravity,
            atm_pressure: b.atm_pressure,
            water_mass: b.water_mass,
            evaporated_mass: b.evaporated_mass,
            piston_area: b.piston_area,
            piston_mass: b.piston_mass,
            heat_rate: b.heat_rate,
            duration: b.duration,
            steps: b.steps,
        }
    }
}

/// Unvalidated parameter values.
///
/// Also used as the `[parameters]` table of the TOML config; omitted keys keep
/// the reference defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParametersBuilder {
    pub specific_heat_cp: f64,
    pub specific_heat_cv: f64,
    pub latent_heat: f64,
    pub gravity: f64,
    pub atm_pressure: f64,
    pub water_mass: f64,
    pub evaporated_mass: f64,
    pub piston_area: f64,
    pub piston_mass: f64,
    pub heat_rate: f64,
    pub duration: f64,
    pub steps: usize,
}

impl Default for ParametersBuilder {
    fn default() -> Self {
        Self {
            specific_heat_cp: 4.18,
            specific_heat_cv: 2.09,
            latent_heat: 2257.0,
            gravity: 9.81,
            atm_pressure: 101.325,
            water_mass: 0.1,
            evaporated_mass: 0.01,
            piston_area: 0.01,
            piston_mass: 1.0,
            heat_rate: 10.0,
            duration: 10.0,
            steps: 1000,
        }
    }
}

impl ParametersBuilder {
    /// Validate and freeze the parameter set.
    pub fn build(self) -> Result<SimulationParameters, SimError> {
        let checks = [
            ("specific_heat_cp", self.specific_heat_cp),
            ("specific_heat_cv", self.specific_heat_cv),
            ("latent_heat", self.latent_heat),
            ("gravity", self.gravity),
            ("atm_pressure", self.atm_pressure),
            ("water_mass", self.water_mass),
            ("evaporated_mass", self.evaporated_mass),
            ("piston_area", self.piston_area),
            ("piston_mass", self.piston_mass),
            ("heat_rate", self.heat_rate),
            ("duration", self.duration),
        ];
        for (name, value) in checks {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimError::InvalidParameter {
                    name,
                    reason: format!("must be finite and > 0, got {value}"),
                });
            }
        }
        if self.steps < 2 {
            return Err(SimError::InvalidParameter {
                name: "steps",
                reason: format!("must be >= 2, got {}", self.steps),
            });
        }

        Ok(SimulationParameters {
            specific_heat_cp: self.specific_heat_cp,
            specific_heat_cv: self.specific_heat_cv,
            latent_heat: self.latent_heat,
            gravity: self.gravity,
            atm_pressure: self.atm_pressure,
            water_mass: self.water_mass,
            evaporated_mass: self.evaporated_mass,
            piston_area: self.piston_area,
            piston_mass: self.piston_mass,
            heat_rate: self.heat_rate,
            duration: self.duration,
            steps: self.steps,
        })
    }
}

impl From<SimulationParameters> for ParametersBuilder {
    fn from(p: SimulationParameters) -> Self {
        Self {
            specific_heat_cp: p.specific_heat_cp,
            specific_heat_cv: p.specific_heat_cv,
            latent_heat: p.latent_heat,
            gravity: p.gravity,
            atm_pressure: p.atm_pressure,
            water_mass: p.water_mass,
            evaporated_mass: p.evaporated_mass,
            piston_area: p.piston_area,
            piston_mass: p.piston_mass,
            heat_rate: p.heat_rate,
            duration: p.duration,
            steps: p.steps,
        }
    }
}

impl TryFrom<ParametersBuilder> for SimulationParameters {
    type Error = SimError;

    fn try_from(value: ParametersBuilder) -> Result<Self, Self::Error> {
        value.build()
    }
}

/// An ordered sequence of `(time, value)` samples.
///
/// Invariants: non-empty, equal-length columns, finite values, strictly
/// increasing time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    time: Vec<f64>,
    values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(time: Vec<f64>, values: Vec<f64>) -> Result<Self, SimError> {
        if time.is_empty() {
            return Err(SimError::InvalidInput("Time series is empty.".to_string()));
        }
        if time.len() != values.len() {
            return Err(SimError::InvalidInput(format!(
                "Time series length mismatch: {} time samples vs {} values.",
                time.len(),
                values.len()
            )));
        }
        if let Some(i) = time.iter().position(|t| !t.is_finite()) {
            return Err(SimError::InvalidInput(format!("Non-finite time at index {i}.")));
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(SimError::numeric(
                "time series",
                format!("non-finite value {} at index {i}", values[i]),
            ));
        }
        if let Some(i) = time.windows(2).position(|w| w[1] <= w[0]) {
            return Err(SimError::InvalidInput(format!(
                "Time is not strictly increasing at index {}.",
                i + 1
            )));
        }
        Ok(Self { time, values })
    }

    /// Replace the values while keeping the same time axis.
    pub fn with_values(&self, values: Vec<f64>) -> Result<Self, SimError> {
        Self::new(self.time.clone(), values)
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Final sample value (series are never empty).
    pub fn last_value(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.time.iter().copied().zip(self.values.iter().copied())
    }

    /// Collect `(time, value)` pairs, e.g. for chart widgets.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.iter().collect()
    }

    /// `(min, max)` of the values.
    pub fn value_range(&self) -> (f64, f64) {
        self.values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }
}

/// Phase 1 outputs: sealed-vessel heating.
#[derive(Debug, Clone, PartialEq)]
pub struct Phase1Series {
    /// Cumulative heat input Q (kJ).
    pub heat: TimeSeries,
    /// Temperature rise T (°C).
    pub temperature: TimeSeries,
    /// Chamber pressure P (kPa).
    pub pressure: TimeSeries,
}

/// Phase 2 outputs: piston release.
#[derive(Debug, Clone, PartialEq)]
pub struct Phase2Series {
    /// Driving pressure (kPa).
    pub pressure: TimeSeries,
    /// Piston displacement h (m).
    pub displacement: TimeSeries,
    /// Cumulative work W (kJ).
    pub work: TimeSeries,
}

/// Heat split between sensible heating and evaporation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatBudget {
    /// Temperature rise the budget was computed for (°C).
    pub delta_t: f64,
    /// `Q1 = m_w·cp·ΔT`
    pub sensible: f64,
    /// `Q2 = m_evap·h_fg`
    pub latent: f64,
    /// `Q = Q1 + Q2`
    pub total: f64,
    /// `ΔU = m_w·cv·ΔT`
    pub internal_energy: f64,
}

/// Output of fitting a single model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub model: ModelKind,
    /// Coefficients in formula order (`a, b[, c]`).
    pub params: Vec<f64>,
    pub r_squared: f64,
    pub sse: f64,
    pub rmse: f64,
    /// Residual evaluations spent by the solver.
    pub evaluations: usize,
}

/// Best model plus every candidate fit, for audit/display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub best: FitResult,
    /// Fits in `ModelKind::ALL` order.
    pub fits: Vec<FitResult>,
}

impl SelectionResult {
    pub fn fit_for(&self, model: ModelKind) -> Option<&FitResult> {
        self.fits.iter().find(|f| f.model == model)
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// Derived from defaults, the TOML config file, and CLI flags.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub params: SimulationParameters,
    /// Temperature rise used for the heat budget (°C).
    pub delta_t: f64,

    /// Starting point for the exponential fit.
    pub exponential_seed: [f64; 3],
    /// Seeds retried, in order, when the exponential fit fails to converge.
    pub fallback_seeds: Vec<[f64; 3]>,
    pub max_evaluations: usize,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    /// Fit the three models on the rayon pool.
    pub parallel: bool,

    /// Standard deviation of Gaussian sensor noise added before fitting (0 disables).
    pub noise_std: f64,
    pub noise_seed: u64,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_series: Option<PathBuf>,
    pub export_summary: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            params: SimulationParameters::default(),
            delta_t: 50.0,
            exponential_seed: [1.0, 0.1, 1.0],
            fallback_seeds: Vec::new(),
            max_evaluations: 1000,
            ftol: 1.49e-8,
            xtol: 1.49e-8,
            gtol: 1e-12,
            parallel: true,
            noise_std: 0.0,
            noise_seed: 42,
            plot: true,
            plot_width: 100,
            plot_height: 25,
            export_series: None,
            export_summary: None,
        }
    }
}
