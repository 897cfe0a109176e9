//! Heat budget for bringing the charge up to temperature and boiling some off.

use crate::domain::{HeatBudget, SimulationParameters};
use crate::error::SimError;

/// Sensible + latent heat for a temperature rise `delta_t`, and the matching
/// change in internal energy of the liquid.
pub fn heat_budget(params: &SimulationParameters, delta_t: f64) -> Result<HeatBudget, SimError> {
    if !delta_t.is_finite() {
        return Err(SimError::InvalidInput(format!(
            "Temperature rise must be finite, got {delta_t}."
        )));
    }

    let sensible = params.water_mass() * params.specific_heat_cp() * delta_t;
    let latent = params.evaporated_mass() * params.latent_heat();
    let internal_energy = params.water_mass() * params.specific_heat_cv() * delta_t;

    Ok(HeatBudget {
        delta_t,
        sensible,
        latent,
        total: sensible + latent,
        internal_energy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_budget() {
        let b = heat_budget(&SimulationParameters::default(), 50.0).unwrap();
        assert!((b.sensible - 0.1 * 4.18 * 50.0).abs() < 1e-12);
        assert!((b.latent - 0.01 * 2257.0).abs() < 1e-12);
        assert!((b.total - (20.9 + 22.57)).abs() < 1e-9);
        assert!((b.internal_energy - 0.1 * 2.09 * 50.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_non_finite_rise() {
        assert!(heat_budget(&SimulationParameters::default(), f64::NAN).is_err());
    }
}
