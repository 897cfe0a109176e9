//! Closed piston–cylinder process model.
//!
//! - `phase1`: sealed-vessel heating (heat, temperature, pressure)
//! - `phase2`: piston release (driving pressure, displacement, cumulative work)
//! - `work`: trapezoidal work integral
//! - `heat`: sensible/latent heat budget
//!
//! Everything here is a pure function of `SimulationParameters`.

pub mod heat;
pub mod phase1;
pub mod phase2;
pub mod work;

pub use heat::*;
pub use phase1::*;
pub use phase2::*;
pub use work::*;

use crate::domain::SimulationParameters;
use crate::error::SimError;

/// `steps` evenly spaced samples over `[0, duration]`, both ends inclusive.
pub fn time_grid(params: &SimulationParameters) -> Vec<f64> {
    linspace(0.0, params.duration(), params.steps())
}

/// numpy-style `linspace`; the last sample is exactly `end`.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n as f64 - 1.0);
            let mut out: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            out[n - 1] = end;
            out
        }
    }
}

/// Surface the first non-finite value as a numeric error.
fn ensure_finite(context: &str, values: &[f64]) -> Result<(), SimError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(SimError::numeric(
            context,
            format!("non-finite value {} at step {i}", values[i]),
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_includes_endpoints() {
        let v = linspace(0.0, 10.0, 1000);
        assert_eq!(v.len(), 1000);
        assert_eq!(v[0], 0.0);
        assert_eq!(v[999], 10.0);
        assert!(v.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn time_grid_uses_parameters() {
        let params = SimulationParameters::builder();
        let params = crate::domain::ParametersBuilder {
            steps: 5,
            duration: 2.0,
            ..params
        }
        .build()
        .unwrap();
        assert_eq!(time_grid(&params), vec![0.0, 0.5, 1.0, 1.5, 2.0]);
    }

    #[test]
    fn ensure_finite_reports_index() {
        let err = ensure_finite("phase 1 pressure", &[1.0, f64::NAN]).unwrap_err();
        assert!(err.to_string().contains("step 1"));
    }
}
