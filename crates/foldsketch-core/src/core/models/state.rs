use super::sequence::{Sequence, SequenceConstraint};
use super::structure::Structure;
use crate::core::energy::{kt, EnergyOracle};
use serde::{Deserialize, Serialize};

/// A ligand annotation for a state: binding-pocket sequence/structure motif
/// and binding free energy. Reporting metadata only; the built-in energy
/// model does not evaluate ligand contributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ligand {
    pub sequence: String,
    pub structure: String,
    pub energy: f64,
}

/// Lazily computed fold results for one state. Each field is filled at most
/// once per sequence assignment.
#[derive(Debug, Clone, Default)]
struct FoldCache {
    mfe: Option<(Structure, f64)>,
    pf_energy: Option<f64>,
    pf_structure: Option<String>,
    eos: Option<f64>,
}

/// One functional configuration of the molecule: a named target structure
/// with its folding conditions and cached fold results.
///
/// The target structure is immutable after creation. All derived metrics are
/// computed against the design's shared sequence through the energy oracle
/// and cached until [`State::reset`] is called (which the design does on
/// every sequence change).
#[derive(Debug, Clone)]
pub struct State {
    name: String,
    structure: Structure,
    temperature: f64,
    ligand: Option<Ligand>,
    constraint: Option<SequenceConstraint>,
    cache: FoldCache,
}

impl State {
    pub fn new(name: impl Into<String>, structure: Structure) -> Self {
        Self {
            name: name.into(),
            structure,
            temperature: 37.0,
            ligand: None,
            constraint: None,
            cache: FoldCache::default(),
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_ligand(mut self, ligand: Ligand) -> Self {
        self.ligand = Some(ligand);
        self
    }

    pub fn with_constraint(mut self, constraint: SequenceConstraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The target structure of this state.
    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn ligand(&self) -> Option<&Ligand> {
        self.ligand.as_ref()
    }

    pub fn constraint(&self) -> Option<&SequenceConstraint> {
        self.constraint.as_ref()
    }

    /// Drops all cached fold results. Called whenever the shared sequence
    /// changes.
    pub(crate) fn reset(&mut self) {
        self.cache = FoldCache::default();
    }

    fn mfe(&mut self, sequence: &Sequence, oracle: &dyn EnergyOracle) -> &(Structure, f64) {
        if self.cache.mfe.is_none() {
            self.cache.mfe = Some(oracle.fold_mfe(sequence, self.temperature));
        }
        self.cache.mfe.as_ref().unwrap()
    }

    pub fn mfe_structure(&mut self, sequence: &Sequence, oracle: &dyn EnergyOracle) -> Structure {
        self.mfe(sequence, oracle).0.clone()
    }

    pub fn mfe_energy(&mut self, sequence: &Sequence, oracle: &dyn EnergyOracle) -> f64 {
        self.mfe(sequence, oracle).1
    }

    pub fn pf_energy(&mut self, sequence: &Sequence, oracle: &dyn EnergyOracle) -> f64 {
        if self.cache.pf_energy.is_none() {
            self.cache.pf_energy = Some(oracle.partition_free_energy(sequence, self.temperature));
        }
        self.cache.pf_energy.unwrap()
    }

    pub fn pf_structure(&mut self, sequence: &Sequence, oracle: &dyn EnergyOracle) -> String {
        if self.cache.pf_structure.is_none() {
            self.cache.pf_structure =
                Some(oracle.ensemble_pairedness(sequence, self.temperature));
        }
        self.cache.pf_structure.clone().unwrap()
    }

    /// Energy of the shared sequence constrained to this state's target.
    pub fn eos(&mut self, sequence: &Sequence, oracle: &dyn EnergyOracle) -> f64 {
        if self.cache.eos.is_none() {
            self.cache.eos =
                Some(oracle.energy_of_structure(sequence, &self.structure, self.temperature));
        }
        self.cache.eos.unwrap()
    }

    /// Gap between the target's energy and the MFE energy; zero exactly when
    /// the target is as stable as the minimum-energy fold.
    pub fn eos_diff_mfe(&mut self, sequence: &Sequence, oracle: &dyn EnergyOracle) -> f64 {
        self.eos(sequence, oracle) - self.mfe_energy(sequence, oracle)
    }

    pub fn eos_reached_mfe(&mut self, sequence: &Sequence, oracle: &dyn EnergyOracle) -> bool {
        self.eos_diff_mfe(sequence, oracle) == 0.0
    }

    /// Equilibrium probability of the target structure.
    pub fn probability(&mut self, sequence: &Sequence, oracle: &dyn EnergyOracle) -> f64 {
        let pf = self.pf_energy(sequence, oracle);
        let eos = self.eos(sequence, oracle);
        ((pf - eos) / kt(self.temperature)).exp()
    }

    /// Ensemble defect approximated from the target probability.
    pub fn ensemble_defect(&mut self, sequence: &Sequence, oracle: &dyn EnergyOracle) -> f64 {
        sequence.len() as f64 * (1.0 - self.probability(sequence, oracle))
    }
}
