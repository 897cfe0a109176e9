//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and initialises logging
//! - layers defaults, the TOML config file and CLI flags into a `RunConfig`
//! - runs the simulation + fit pipeline
//! - prints reports/plots
//! - writes optional exports

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::cli::{Command, PlotArgs, RunArgs, SimulateArgs, WorkArgs};
use crate::config::{Config, CONFIG_ENV};
use crate::domain::{RunConfig, SelectionResult, TimeSeries};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `piston` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    // `piston` and `piston --steps 500` behave like `piston simulate ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    init_logging(cli.verbose);

    let config_path = cli.config.clone();
    match cli.command {
        Command::Simulate(args) => handle_simulate(args, config_path.as_deref()),
        Command::Fit(args) => handle_fit(args, config_path.as_deref()),
        Command::Work(args) => handle_work(args),
        Command::Plot(args) => handle_plot(args),
        Command::Tui(args) => handle_tui(args, config_path.as_deref()),
    }
}

/// `RUST_LOG` overrides the `-v` count.
fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

/// Defaults, then the config file (`--config` or `$PISTON_CONFIG`), then flags.
pub fn resolve_run_config(config_path: Option<&Path>, args: &RunArgs) -> Result<RunConfig, AppError> {
    let path = config_path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

    let base = match path {
        Some(path) => {
            log::info!("loading config from {}", path.display());
            Config::from_file(&path)?.apply(RunConfig::default())?
        }
        None => RunConfig::default(),
    };
    args.apply(base)
}

fn handle_simulate(args: SimulateArgs, config_path: Option<&Path>) -> Result<(), AppError> {
    let mut config = resolve_run_config(config_path, &args.run)?;
    config.export_series = args.export_series;
    config.export_summary = args.export_summary;

    let run = pipeline::run_simulation(&config)?;

    println!("{}", crate::report::format_run_summary(&run, &config));

    if config.plot {
        println!("Phase 1 pressure (o) with {} fit (-):", run.selection.best.model);
        println!(
            "{}",
            crate::plot::render_fit_plot(&run.observed, &run.selection.best, config.plot_width, config.plot_height)
        );
        println!("Phase 2 piston displacement:");
        println!(
            "{}",
            crate::plot::render_series_plot(&run.phase2.displacement, config.plot_width, config.plot_height)
        );
        println!("Phase 2 cumulative work:");
        println!(
            "{}",
            crate::plot::render_series_plot(&run.phase2.work, config.plot_width, config.plot_height)
        );
    }

    // Optional exports.
    if let Some(path) = &config.export_series {
        crate::io::write_series_csv(path, &run.phase1, &run.phase2)?;
    }
    if let Some(path) = &config.export_summary {
        let summary = crate::io::RunSummary::from_run(&run, &config);
        crate::io::write_summary_json(path, &summary)?;
    }

    Ok(())
}

fn handle_fit(args: RunArgs, config_path: Option<&Path>) -> Result<(), AppError> {
    let config = resolve_run_config(config_path, &args)?;
    let stage = pipeline::run_fits(&config)?;

    println!("{}", crate::report::format_fit_table(&stage.selection));
    print!(
        "{}",
        crate::report::format_worst_residual(&stage.observed, &stage.selection.best)?
    );
    if config.plot {
        println!(
            "{}",
            crate::plot::render_fit_plot(&stage.observed, &stage.selection.best, config.plot_width, config.plot_height)
        );
    }
    Ok(())
}

fn handle_work(args: WorkArgs) -> Result<(), AppError> {
    let time: Vec<f64> = (0..args.heights.len()).map(|i| i as f64).collect();
    let pressure: Vec<f64> = time.iter().map(|&t| args.a * (args.b * t).exp()).collect();
    let work = crate::physics::compute_work(&time, &pressure, args.area, &args.heights)?;

    println!(
        "{}",
        crate::report::format_work(args.a, args.b, args.area, time.len(), work)
    );
    let series = TimeSeries::new(time, pressure)?;
    println!("{}", crate::plot::render_series_plot(&series, 60, 15));
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let summary = crate::io::read_summary_json(&args.summary)?;
    let Some(best) = summary.best_fit().cloned() else {
        return Err(AppError::new(
            2,
            format!("Summary has no fit for its best model ({}).", summary.best),
        ));
    };

    let selection = SelectionResult {
        best,
        fits: summary.fits.clone(),
    };
    println!("Run generated at {}", summary.generated_at.to_rfc3339());
    println!("{}", crate::report::format_fit_table(&selection));
    println!(
        "{}",
        crate::plot::render_curve_plot(&summary.grid_points(), args.width, args.height)
    );
    Ok(())
}

fn handle_tui(args: RunArgs, config_path: Option<&Path>) -> Result<(), AppError> {
    let config = resolve_run_config(config_path, &args)?;
    crate::tui::run(config)
}

/// Rewrite argv so `piston` defaults to `piston simulate`.
///
/// Rules:
/// - `piston`                      -> `piston simulate`
/// - `piston --steps 500 ...`      -> `piston simulate --steps 500 ...`
/// - `piston --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("simulate".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "simulate" | "fit" | "work" | "plot" | "tui");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "simulate flags".
    if arg1.starts_with('-') {
        argv.insert(1, "simulate".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_defaults_to_simulate() {
        assert_eq!(rewrite_args(argv(&["piston"])), argv(&["piston", "simulate"]));
        assert_eq!(
            rewrite_args(argv(&["piston", "--steps", "50"])),
            argv(&["piston", "simulate", "--steps", "50"])
        );
        assert_eq!(rewrite_args(argv(&["piston", "--help"])), argv(&["piston", "--help"]));
        assert_eq!(rewrite_args(argv(&["piston", "tui"])), argv(&["piston", "tui"]));
    }

    #[test]
    fn rewritten_args_parse() {
        let cli = crate::cli::Cli::parse_from(rewrite_args(argv(&["piston", "-v", "--no-plot"])));
        assert_eq!(cli.verbose, 1);
        assert!(matches!(cli.command, Command::Simulate(ref a) if a.run.no_plot));
    }

    #[test]
    fn config_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("piston.toml");
        std::fs::write(&path, "[parameters]\nsteps = 300\nduration = 5.0\n").unwrap();

        let args = RunArgs {
            duration: Some(2.0),
            ..RunArgs::default()
        };
        let config = resolve_run_config(Some(&path), &args).unwrap();
        assert_eq!(config.params.steps(), 300);
        assert!((config.params.duration() - 2.0).abs() < 1e-12);
    }
}
