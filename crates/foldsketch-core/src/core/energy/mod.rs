//! # Energy Module
//!
//! The folding-energy model behind all scoring decisions: a capability trait
//! for folding oracles plus the built-in stacked-pair model.
//!
//! ## Overview
//!
//! Every thermodynamic quantity the optimizer consumes flows through the
//! [`EnergyOracle`] trait: the minimum-free-energy fold, the free energy of a
//! sequence constrained to a given structure, and the ensemble (partition
//! function) free energy. Implementations must be deterministic for a fixed
//! sequence, structure and temperature; the optimizer relies on replaying
//! evaluations after reverts.
//!
//! The backend is chosen once, at design-construction time, through the
//! [`Backend`] enum. The built-in [`stacked_pair::StackedPairModel`] is an
//! exact dynamic program over canonical base pairs with stacking bonuses; it
//! guarantees the ordering `pf <= mfe <= eos(any structure)` that the
//! optimizer's energy-gap logic assumes.

pub mod stacked_pair;

use crate::core::models::sequence::Sequence;
use crate::core::models::structure::Structure;
use serde::{Deserialize, Serialize};

/// Gas constant in kcal/(mol.K).
pub const GAS_CONSTANT: f64 = 1.98717e-3;

/// Thermal energy kT in kcal/mol at a temperature in degrees Celsius.
#[inline]
pub fn kt(temperature: f64) -> f64 {
    (temperature + 273.15) * GAS_CONSTANT
}

/// A folding-energy backend.
///
/// All energies are in kcal/mol; temperatures in degrees Celsius.
pub trait EnergyOracle: Send + Sync {
    /// The minimum-free-energy structure and its energy.
    fn fold_mfe(&self, sequence: &Sequence, temperature: f64) -> (Structure, f64);

    /// Free energy of the sequence constrained to the given structure.
    fn energy_of_structure(
        &self,
        sequence: &Sequence,
        structure: &Structure,
        temperature: f64,
    ) -> f64;

    /// Ensemble free energy over all structures of the sequence.
    fn partition_free_energy(&self, sequence: &Sequence, temperature: f64) -> f64;

    /// A per-position ensemble pairedness string (`.` mostly unpaired, `,`
    /// undecided, `|` mostly paired), used for reporting only.
    ///
    /// The default falls back to the MFE structure for backends without
    /// pairing probabilities.
    fn ensemble_pairedness(&self, sequence: &Sequence, temperature: f64) -> String {
        self.fold_mfe(sequence, temperature).0.as_str().to_string()
    }

    /// Equilibrium probability of observing the given structure.
    fn probability_of_structure(
        &self,
        sequence: &Sequence,
        structure: &Structure,
        temperature: f64,
    ) -> f64 {
        let pf = self.partition_free_energy(sequence, temperature);
        let eos = self.energy_of_structure(sequence, structure, temperature);
        ((pf - eos) / kt(temperature)).exp()
    }
}

/// Selects a folding backend once at design-construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// The built-in canonical-pair model with stacking.
    #[default]
    StackedPair,
}

impl Backend {
    pub fn oracle(self) -> Box<dyn EnergyOracle> {
        match self {
            Backend::StackedPair => Box::new(stacked_pair::StackedPairModel::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kt_matches_reference_value_at_37_degrees() {
        // kT = ((37 + 273.15) * 1.98717) / 1000 kcal/mol.
        assert!((kt(37.0) - 0.616_321).abs() < 1e-4);
    }

    #[test]
    fn backend_default_is_stacked_pair() {
        assert_eq!(Backend::default(), Backend::StackedPair);
    }
}
