//! Command-line parsing for the piston-cylinder simulator.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the physics/fitting code.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::RunConfig;
use crate::error::AppError;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "piston",
    version,
    about = "Piston-cylinder heat/work simulator with pressure curve fitting"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG` wins.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// TOML config file (falls back to `$PISTON_CONFIG`).
    #[arg(long, value_name = "TOML", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run both phases, fit the pressure models, print the report and plots.
    Simulate(SimulateArgs),
    /// Run phase 1 and print the model fits only.
    Fit(RunArgs),
    /// Integrate work for an exponential pressure sample.
    Work(WorkArgs),
    /// Plot the best-fit curve from an exported JSON summary.
    Plot(PlotArgs),
    /// Launch the interactive TUI with charts and the piston animation.
    ///
    /// This uses the same pipeline as `piston simulate`, but renders results
    /// in a terminal UI using Ratatui.
    Tui(RunArgs),
}

/// Overrides shared by every command that runs the simulation.
///
/// Unset flags leave the config file (or default) value in place.
#[derive(Debug, Args, Clone, Default)]
pub struct RunArgs {
    /// Number of time steps.
    #[arg(long)]
    pub steps: Option<usize>,

    /// Simulated duration (s).
    #[arg(long)]
    pub duration: Option<f64>,

    /// Heat input rate (kJ/s).
    #[arg(long)]
    pub heat_rate: Option<f64>,

    /// Temperature rise for the heat budget (°C).
    #[arg(long)]
    pub delta_t: Option<f64>,

    /// Standard deviation of Gaussian noise added to the pressure before fitting.
    #[arg(long)]
    pub noise_std: Option<f64>,

    /// Seed for the noise generator.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Fit the models one after another instead of on the thread pool.
    #[arg(long)]
    pub sequential: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns, default 100).
    #[arg(long)]
    pub width: Option<usize>,

    /// Plot height (rows, default 25).
    #[arg(long)]
    pub height: Option<usize>,
}

/// Options for the full simulation run.
#[derive(Debug, Args, Clone, Default)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Export every simulated series to CSV.
    #[arg(long, value_name = "CSV")]
    pub export_series: Option<PathBuf>,

    /// Export the run summary (parameters, fits, finals) to JSON.
    #[arg(long, value_name = "JSON")]
    pub export_summary: Option<PathBuf>,
}

/// Options for the standalone work integral.
#[derive(Debug, Args, Clone)]
pub struct WorkArgs {
    /// Pressure amplitude `a` in `a·exp(b·t)`.
    #[arg(short, long, default_value_t = 100.0)]
    pub a: f64,

    /// Rate constant `b` in `a·exp(b·t)` (1/s).
    #[arg(short, long, default_value_t = 0.1, allow_negative_numbers = true)]
    pub b: f64,

    /// Piston area (m²).
    #[arg(long, default_value_t = 0.01)]
    pub area: f64,

    /// Piston movement per sample (m); samples are 1 s apart starting at t = 0.
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = [0.02, 0.03, 0.04, 0.05, 0.06, 0.07]
    )]
    pub heights: Vec<f64>,
}

/// Options for plotting a saved summary.
#[derive(Debug, Args)]
pub struct PlotArgs {
    /// Summary JSON file produced by `piston simulate --export-summary`.
    #[arg(long, value_name = "JSON")]
    pub summary: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

impl RunArgs {
    /// Apply the flags on top of `base`.
    pub fn apply(&self, base: RunConfig) -> Result<RunConfig, AppError> {
        let mut params = base.params.to_builder();
        if let Some(steps) = self.steps {
            params.steps = steps;
        }
        if let Some(duration) = self.duration {
            params.duration = duration;
        }
        if let Some(heat_rate) = self.heat_rate {
            params.heat_rate = heat_rate;
        }

        Ok(RunConfig {
            params: params.build()?,
            delta_t: self.delta_t.unwrap_or(base.delta_t),
            noise_std: self.noise_std.unwrap_or(base.noise_std),
            noise_seed: self.seed.unwrap_or(base.noise_seed),
            parallel: base.parallel && !self.sequential,
            plot: base.plot && !self.no_plot,
            plot_width: self.width.unwrap_or(base.plot_width),
            plot_height: self.height.unwrap_or(base.plot_height),
            ..base
        })
    }
}
