//! Phase 1: heat input into a sealed, rigid, water-filled chamber.
//!
//! For step `t = 1 … steps-1`:
//!
//! ```text
//! Q[t] = Q[t-1] + heat_rate / steps
//! T[t] = Q[t] / (m_w · cp)
//! P[t] = P_atm + Q[t] / (m_w · cv)
//! ```
//!
//! Index 0 is the boundary: `Q = T = 0`, `P = P_atm`.

use crate::domain::{Phase1Series, SimulationParameters, TimeSeries};
use crate::error::SimError;
use crate::physics::{ensure_finite, time_grid};

pub fn simulate_phase1(params: &SimulationParameters) -> Result<Phase1Series, SimError> {
    let n = params.steps();
    let dq = params.heat_rate() * (1.0 / n as f64);
    let heat_capacity_p = params.water_mass() * params.specific_heat_cp();
    let heat_capacity_v = params.water_mass() * params.specific_heat_cv();

    let mut q = vec![0.0; n];
    let mut temp = vec![0.0; n];
    let mut pressure = vec![0.0; n];
    pressure[0] = params.atm_pressure();

    for t in 1..n {
        q[t] = q[t - 1] + dq;
        temp[t] = q[t] / heat_capacity_p;
        pressure[t] = params.atm_pressure() + q[t] / heat_capacity_v;
    }

    ensure_finite("phase 1 heat", &q)?;
    ensure_finite("phase 1 temperature", &temp)?;
    ensure_finite("phase 1 pressure", &pressure)?;

    log::debug!(
        "phase 1: n={n} Q_end={:.4} T_end={:.4} P_end={:.4}",
        q[n - 1],
        temp[n - 1],
        pressure[n - 1]
    );

    let time = time_grid(params);
    Ok(Phase1Series {
        heat: TimeSeries::new(time.clone(), q)?,
        temperature: TimeSeries::new(time.clone(), temp)?,
        pressure: TimeSeries::new(time, pressure)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParametersBuilder;
    use proptest::prelude::*;

    #[test]
    fn phase1_boundary_and_final_values() {
        let params = SimulationParameters::default();
        let out = simulate_phase1(&params).unwrap();

        assert_eq!(out.heat.len(), 1000);
        assert_eq!(out.heat.values()[0], 0.0);
        assert_eq!(out.temperature.values()[0], 0.0);
        assert_eq!(out.pressure.values()[0], 101.325);

        // Q_end = 999 · (10 / 1000)
        let q_end = out.heat.last_value();
        assert!((q_end - 9.99).abs() < 1e-9);
        assert!((out.temperature.last_value() - 9.99 / (0.1 * 4.18)).abs() < 1e-9);
        assert!((out.pressure.last_value() - (101.325 + 9.99 / (0.1 * 2.09))).abs() < 1e-9);
    }

    #[test]
    fn phase1_small_grid_by_hand() {
        let params = ParametersBuilder {
            steps: 4,
            heat_rate: 8.0,
            water_mass: 1.0,
            specific_heat_cp: 2.0,
            specific_heat_cv: 1.0,
            atm_pressure: 100.0,
            duration: 3.0,
            ..Default::default()
        }
        .build()
        .unwrap();
        let out = simulate_phase1(&params).unwrap();

        assert_eq!(out.heat.values(), &[0.0, 2.0, 4.0, 6.0]);
        assert_eq!(out.temperature.values(), &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(out.pressure.values(), &[100.0, 102.0, 104.0, 106.0]);
        assert_eq!(out.pressure.time(), &[0.0, 1.0, 2.0, 3.0]);
    }

    fn arb_params() -> impl Strategy<Value = SimulationParameters> {
        (
            2usize..400,
            0.01f64..100.0,
            0.01f64..10.0,
            0.1f64..10.0,
            0.1f64..10.0,
            1.0f64..500.0,
        )
            .prop_map(|(steps, heat_rate, water_mass, cp, cv, atm)| {
                ParametersBuilder {
                    steps,
                    heat_rate,
                    water_mass,
                    specific_heat_cp: cp,
                    specific_heat_cv: cv,
                    atm_pressure: atm,
                    ..Default::default()
                }
                .build()
                .unwrap()
            })
    }

    proptest! {
        /// Every valid parameter set yields full-length, non-decreasing series.
        #[test]
        fn phase1_series_are_monotone(params in arb_params()) {
            let out = simulate_phase1(&params).unwrap();
            let n = params.steps();
            prop_assert_eq!(out.heat.len(), n);
            prop_assert_eq!(out.temperature.len(), n);
            prop_assert_eq!(out.pressure.len(), n);
            prop_assert_eq!(out.heat.values()[0], 0.0);
            prop_assert_eq!(out.temperature.values()[0], 0.0);
            prop_assert_eq!(out.pressure.values()[0], params.atm_pressure());
            for series in [&out.heat, &out.temperature, &out.pressure] {
                prop_assert!(series.values().windows(2).all(|w| w[1] >= w[0]));
            }
        }
    }
}
