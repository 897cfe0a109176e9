//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - validated physical constants (`SimulationParameters`, `ParametersBuilder`)
//! - sampled series (`TimeSeries`, `Phase1Series`, `Phase2Series`)
//! - fit outputs (`ModelKind`, `FitResult`, `SelectionResult`)
//! - the run configuration consumed by the pipeline (`RunConfig`)

pub mod types;

pub use types::*;
