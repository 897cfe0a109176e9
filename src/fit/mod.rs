//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - fit one candidate model to a pressure series and score it (R²)
//! - fit every candidate (parallel) and pick the winner by the chained R² rule

pub mod fitter;
pub mod selection;

pub use fitter::*;
pub use selection::*;
