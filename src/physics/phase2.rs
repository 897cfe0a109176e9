//! Phase 2: piston release.
//!
//! Only the final Phase 1 pressure feeds this phase. The driving pressure is
//! that anchor plus the static piston load, constant over every step:
//!
//! ```text
//! P[t] = P1_end + m_p · g / A
//! h[t] = h[t-1] + (P[t] · A / (m_p · g)) / steps
//! W[t] = W[t-1] + P[t] · A · h[t]
//! ```
//!
//! This is a simplified closed-form recurrence, not a coupled ODE; it is kept
//! exactly so output matches the reference runs. Index 0 is the release
//! instant: `P = h = W = 0`.

use crate::domain::{Phase2Series, SimulationParameters, TimeSeries};
use crate::error::SimError;
use crate::physics::{ensure_finite, time_grid};

/// Driving pressure for Phase 2 given the final Phase 1 pressure.
pub fn driving_pressure(phase1_end: f64, params: &SimulationParameters) -> f64 {
    phase1_end + params.piston_mass() * params.gravity() / params.piston_area()
}

pub fn simulate_phase2(
    phase1_pressure: &TimeSeries,
    params: &SimulationParameters,
) -> Result<Phase2Series, SimError> {
    if phase1_pressure.is_empty() {
        return Err(SimError::InvalidInput("Phase 1 pressure series is empty.".to_string()));
    }

    let n = params.steps();
    let area = params.piston_area();
    let load = params.piston_mass() * params.gravity();
    let p_drive = driving_pressure(phase1_pressure.last_value(), params);

    let mut pressure = vec![0.0; n];
    let mut h = vec![0.0; n];
    let mut work = vec![0.0; n];

    for t in 1..n {
        pressure[t] = p_drive;
        h[t] = h[t - 1] + (pressure[t] * area / load) * (1.0 / n as f64);
        work[t] = work[t - 1] + pressure[t] * area * h[t];
    }

    ensure_finite("phase 2 pressure", &pressure)?;
    ensure_finite("phase 2 displacement", &h)?;
    ensure_finite("phase 2 work", &work)?;

    log::debug!(
        "phase 2: P_drive={p_drive:.4} h_end={:.6} W_end={:.6}",
        h[n - 1],
        work[n - 1]
    );

    let time = time_grid(params);
    Ok(Phase2Series {
        pressure: TimeSeries::new(time.clone(), pressure)?,
        displacement: TimeSeries::new(time.clone(), h)?,
        work: TimeSeries::new(time, work)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParametersBuilder;
    use crate::physics::simulate_phase1;

    #[test]
    fn phase2_small_grid_by_hand() {
        // m_p·g = 2, A = 0.5, steps = 4 → P = P1_end + 4.
        let params = ParametersBuilder {
            steps: 4,
            piston_mass: 1.0,
            gravity: 2.0,
            piston_area: 0.5,
            duration: 3.0,
            ..Default::default()
        }
        .build()
        .unwrap();
        let p1 = TimeSeries::new(vec![0.0, 1.0], vec![1.0, 4.0]).unwrap();
        let out = simulate_phase2(&p1, &params).unwrap();

        assert_eq!(out.pressure.values(), &[0.0, 8.0, 8.0, 8.0]);
        // dh = 8 · 0.5 / 2 / 4 = 0.5
        assert_eq!(out.displacement.values(), &[0.0, 0.5, 1.0, 1.5]);
        // dW = 8 · 0.5 · h = 4h
        assert_eq!(out.work.values(), &[0.0, 2.0, 6.0, 12.0]);
    }

    #[test]
    fn phase2_uses_only_final_phase1_pressure() {
        let params = SimulationParameters::default();
        let phase1 = simulate_phase1(&params).unwrap();
        let out = simulate_phase2(&phase1.pressure, &params).unwrap();

        let expected = phase1.pressure.last_value() + 1.0 * 9.81 / 0.01;
        assert_eq!(out.pressure.values()[0], 0.0);
        assert!(out.pressure.values()[1..].iter().all(|&p| (p - expected).abs() < 1e-12));
        assert_eq!(out.displacement.len(), params.steps());
        assert!(out.displacement.values().windows(2).all(|w| w[1] > w[0]));
        assert!(out.work.values().windows(2).all(|w| w[1] > w[0]));

        let anchor_only = TimeSeries::new(vec![0.0], vec![phase1.pressure.last_value()]).unwrap();
        assert_eq!(simulate_phase2(&anchor_only, &params).unwrap(), out);
    }
}
