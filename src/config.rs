//! TOML configuration file support.
//!
//! Instead of passing many CLI flags, a run can be described in a file:
//!
//! ```toml
//! # piston.toml
//! delta_t = 50.0
//!
//! [parameters]
//! heat_rate = 12.0
//! steps = 2000
//!
//! [fit]
//! exponential_seed = [1.0, 0.1, 1.0]
//! fallback_seeds = [[100.0, 0.01, 0.0]]
//! max_evaluations = 2000
//! parallel = true
//!
//! [noise]
//! std = 0.25
//! seed = 7
//! ```
//!
//! Omitted keys keep their defaults; CLI flags are applied on top.

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::domain::{ParametersBuilder, RunConfig};
use crate::error::AppError;

/// Environment variable naming a config file to load when `--config` is absent.
pub const CONFIG_ENV: &str = "PISTON_CONFIG";

/// Root configuration structure for piston config files.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Temperature rise for the heat budget (°C).
    pub delta_t: Option<f64>,

    /// Physical constants; omitted keys keep the reference values.
    #[serde(default)]
    pub parameters: ParametersBuilder,

    #[serde(default)]
    pub fit: FitConfig,

    #[serde(default)]
    pub noise: NoiseConfig,
}

/// Solver settings.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FitConfig {
    pub exponential_seed: Option<[f64; 3]>,
    /// Tried in order when the exponential fit fails to converge.
    pub fallback_seeds: Option<Vec<[f64; 3]>>,
    pub max_evaluations: Option<usize>,
    pub ftol: Option<f64>,
    pub xtol: Option<f64>,
    pub gtol: Option<f64>,
    pub parallel: Option<bool>,
}

/// Synthetic sensor noise.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoiseConfig {
    pub std: Option<f64>,
    pub seed: Option<u64>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(2, format!("Failed to read config file {}: {e}", path.display()))
        })?;

        content.parse()
    }

    /// Overlay this file onto `base`, validating the physical parameters.
    pub fn apply(&self, base: RunConfig) -> Result<RunConfig, AppError> {
        let params = self.parameters.build()?;
        let fit = &self.fit;
        let noise = &self.noise;

        Ok(RunConfig {
            params,
            delta_t: self.delta_t.unwrap_or(base.delta_t),
            exponential_seed: fit.exponential_seed.unwrap_or(base.exponential_seed),
            fallback_seeds: fit.fallback_seeds.clone().unwrap_or(base.fallback_seeds),
            max_evaluations: fit.max_evaluations.unwrap_or(base.max_evaluations),
            ftol: fit.ftol.unwrap_or(base.ftol),
            xtol: fit.xtol.unwrap_or(base.xtol),
            gtol: fit.gtol.unwrap_or(base.gtol),
            parallel: fit.parallel.unwrap_or(base.parallel),
            noise_std: noise.std.unwrap_or(base.noise_std),
            noise_seed: noise.seed.unwrap_or(base.noise_seed),
            ..base
        })
    }
}

impl FromStr for Config {
    type Err = AppError;

    /// Parse configuration from a TOML string.
    fn from_str(content: &str) -> Result<Self, Self::Err> {
        toml::from_str(content)
            .map_err(|e| AppError::new(2, format!("Failed to parse TOML configuration: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
            delta_t = 40.0

            [parameters]
            heat_rate = 12.0
            steps = 2000

            [fit]
            exponential_seed = [2.0, 0.05, 0.0]
            fallback_seeds = [[100.0, 0.01, 0.0], [1.0, -0.1, 1.0]]
            max_evaluations = 2000
            parallel = false

            [noise]
            std = 0.25
            seed = 7
        "#;

        let config = toml.parse::<Config>().unwrap();
        assert_eq!(config.delta_t, Some(40.0));
        assert_eq!(config.parameters.steps, 2000);
        assert_eq!(config.fit.fallback_seeds.as_ref().map(Vec::len), Some(2));
        assert_eq!(config.noise.seed, Some(7));

        let run = config.apply(RunConfig::default()).unwrap();
        assert_eq!(run.params.steps(), 2000);
        assert!((run.params.heat_rate() - 12.0).abs() < 1e-12);
        assert!((run.params.water_mass() - 0.1).abs() < 1e-12);
        assert_eq!(run.exponential_seed, [2.0, 0.05, 0.0]);
        assert_eq!(run.max_evaluations, 2000);
        assert!(!run.parallel);
        assert!((run.noise_std - 0.25).abs() < 1e-12);
        assert!((run.delta_t - 40.0).abs() < 1e-12);
    }

    #[test]
    fn test_partial_config() {
        let toml = r#"
            [noise]
            std = 1.0
        "#;

        let config = toml.parse::<Config>().unwrap();
        assert_eq!(config.noise.std, Some(1.0));
        assert_eq!(config.noise.seed, None);

        let run = config.apply(RunConfig::default()).unwrap();
        assert_eq!(run.noise_seed, 42);
        assert_eq!(run.params.steps(), 1000);
    }

    #[test]
    fn test_empty_config() {
        let config = "".parse::<Config>().unwrap();
        assert_eq!(config.fit.max_evaluations, None);
        assert_eq!(config.parameters, ParametersBuilder::default());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let bad_key = "[parameters]\nmass = 1.0\n".parse::<Config>().unwrap_err();
        assert_eq!(bad_key.exit_code(), 2);

        let config = "[parameters]\nsteps = 1\n".parse::<Config>().unwrap();
        let err = config.apply(RunConfig::default()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("steps"));
    }

    #[test]
    fn test_parse_through_from_str() {
        fn load<T: FromStr>(text: &str) -> Result<T, T::Err> {
            text.parse()
        }

        let config: Config = load("delta_t = 25.0\n").unwrap();
        assert_eq!(config.delta_t, Some(25.0));

        let err = load::<Config>("delta_t = \"warm\"\n").unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("Failed to parse TOML configuration"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("piston.toml");
        std::fs::write(&path, "[fit]\ngtol = 1e-10\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.fit.gtol, Some(1e-10));
        assert!(Config::from_file(&dir.path().join("missing.toml")).is_err());
    }
}
