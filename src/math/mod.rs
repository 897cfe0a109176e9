//! Mathematical utilities: least squares (linear and non-linear) and summary statistics.

pub mod lm;
pub mod ols;
pub mod stats;

pub use lm::*;
pub use ols::*;
pub use stats::*;
