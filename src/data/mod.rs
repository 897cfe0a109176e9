//! Measurement-side data helpers.
//!
//! The simulated series are exact. Noise is only added on request, to
//! exercise the fitter against something closer to a sensor trace.

pub mod noise;

pub use noise::*;
