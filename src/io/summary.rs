//! Read/write run summary JSON files.
//!
//! A summary is the "portable" record of a run:
//! - parameters and heat budget
//! - every candidate fit and the selected model
//! - phase finals and the integrated work
//! - a precomputed best-fit grid for quick re-plotting

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::pipeline::RunOutput;
use crate::domain::{FitResult, HeatBudget, ModelKind, RunConfig, SimulationParameters};
use crate::error::AppError;
use crate::models::fitted_values;
use crate::physics::linspace;

/// Number of points in the stored best-fit grid.
const GRID_POINTS: usize = 101;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub parameters: SimulationParameters,
    pub heat_budget: HeatBudget,
    pub noise_std: f64,
    pub fits: Vec<FitResult>,
    pub best: ModelKind,
    pub finals: PhaseFinals,
    /// Trapezoidal `∫ P·A·dh` over phase 2 (kJ).
    pub work_integral: f64,
    pub grid: FitGrid,
}

/// Last sample of each simulated series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseFinals {
    pub heat: f64,
    pub temperature: f64,
    pub pressure_phase1: f64,
    pub pressure_phase2: f64,
    pub displacement: f64,
    pub work: f64,
}

/// Best-fit pressure sampled on an even time grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitGrid {
    pub time: Vec<f64>,
    pub pressure: Vec<f64>,
}

impl RunSummary {
    pub fn from_run(run: &RunOutput, config: &RunConfig) -> Self {
        let best = &run.selection.best;
        let time = linspace(0.0, config.params.duration(), GRID_POINTS);
        let pressure = fitted_values(best, &time);

        RunSummary {
            tool: env!("CARGO_PKG_NAME").to_string(),
            generated_at: Utc::now(),
            parameters: config.params,
            heat_budget: run.heat_budget,
            noise_std: config.noise_std,
            fits: run.selection.fits.clone(),
            best: best.model,
            finals: PhaseFinals {
                heat: run.phase1.heat.last_value(),
                temperature: run.phase1.temperature.last_value(),
                pressure_phase1: run.phase1.pressure.last_value(),
                pressure_phase2: run.phase2.pressure.last_value(),
                displacement: run.phase2.displacement.last_value(),
                work: run.phase2.work.last_value(),
            },
            work_integral: run.work_integral,
            grid: FitGrid { time, pressure },
        }
    }

    pub fn best_fit(&self) -> Option<&FitResult> {
        self.fits.iter().find(|f| f.model == self.best)
    }

    /// `(time, pressure)` pairs of the stored grid.
    pub fn grid_points(&self) -> Vec<(f64, f64)> {
        self.grid
            .time
            .iter()
            .copied()
            .zip(self.grid.pressure.iter().copied())
            .collect()
    }
}

/// Write a summary JSON file.
pub fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create summary JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(BufWriter::new(file), summary)
        .map_err(|e| AppError::new(2, format!("Failed to write summary JSON: {e}")))?;

    log::info!("wrote summary to {}", path.display());
    Ok(())
}

/// Read a summary JSON file.
pub fn read_summary_json(path: &Path) -> Result<RunSummary, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open summary JSON '{}': {e}", path.display())))?;
    let summary: RunSummary = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid summary JSON: {e}")))?;
    if summary.grid.time.len() != summary.grid.pressure.len() {
        return Err(AppError::new(2, "Summary grid columns differ in length."));
    }
    Ok(summary)
}
