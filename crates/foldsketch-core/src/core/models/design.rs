use super::sequence::Sequence;
use super::state::State;
use super::structure::Structure;
use super::DesignError;
use crate::core::energy::{Backend, EnergyOracle};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as _;

/// All reportable metrics of one state for a folded sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMetrics {
    pub name: String,
    pub structure: Structure,
    pub mfe_energy: f64,
    pub mfe_structure: Structure,
    pub pf_energy: f64,
    pub pf_structure: String,
    pub eos: f64,
    pub diff_eos_mfe: f64,
    pub mfe_reached: bool,
    pub probability: f64,
}

/// A collection of named states sharing one candidate sequence.
///
/// Target structures are fixed at construction and must all have the same
/// length; the shared sequence may be assigned and re-assigned any number of
/// times, each assignment invalidating every state's cached fold results.
/// The energy backend is selected once, here.
pub struct Design {
    states: Vec<State>,
    sequence: Option<Sequence>,
    backend: Backend,
    oracle: Box<dyn EnergyOracle>,
    // Distinct target structures in first-seen order; count derived from it.
    distinct_structures: Vec<Structure>,
}

impl fmt::Debug for Design {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Design")
            .field("states", &self.states)
            .field("sequence", &self.sequence)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl Clone for Design {
    fn clone(&self) -> Self {
        Self {
            states: self.states.clone(),
            sequence: self.sequence.clone(),
            backend: self.backend,
            oracle: self.backend.oracle(),
            distinct_structures: self.distinct_structures.clone(),
        }
    }
}

impl Design {
    /// Builds a design from anonymous structures, named "0", "1", ...
    pub fn from_structures(
        structures: Vec<Structure>,
        backend: Backend,
    ) -> Result<Self, DesignError> {
        let states = structures
            .into_iter()
            .enumerate()
            .map(|(i, s)| State::new(i.to_string(), s))
            .collect();
        Self::from_states(states, backend)
    }

    /// Builds a design from fully configured states.
    pub fn from_states(states: Vec<State>, backend: Backend) -> Result<Self, DesignError> {
        let first_len = states
            .first()
            .map(|s| s.structure().len())
            .ok_or(DesignError::NoStructures)?;
        for state in &states {
            if state.structure().len() != first_len {
                return Err(DesignError::LengthMismatch {
                    sequence_len: first_len,
                    structure_len: state.structure().len(),
                });
            }
        }

        let mut distinct_structures: Vec<Structure> = Vec::new();
        for state in &states {
            if !distinct_structures.contains(state.structure()) {
                distinct_structures.push(state.structure().clone());
            }
        }

        Ok(Self {
            states,
            sequence: None,
            backend,
            oracle: backend.oracle(),
            distinct_structures,
        })
    }

    /// Structure length shared by every state (and any assigned sequence).
    pub fn length(&self) -> usize {
        self.states[0].structure().len()
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Distinct target structures in first-seen order.
    pub fn structures(&self) -> &[Structure] {
        &self.distinct_structures
    }

    /// Number of distinct target structures (cached at construction).
    pub fn number_of_structures(&self) -> usize {
        self.distinct_structures.len()
    }

    pub fn sequence(&self) -> Option<&Sequence> {
        self.sequence.as_ref()
    }

    /// Parses and assigns a sequence; the empty string unsets it. Every
    /// assignment clears all cached fold results.
    pub fn set_sequence(&mut self, text: &str) -> Result<(), DesignError> {
        if text.is_empty() {
            self.clear_sequence();
            return Ok(());
        }
        self.assign(Sequence::parse(text)?)
    }

    /// Assigns an already validated sequence, checking only length.
    pub fn assign(&mut self, sequence: Sequence) -> Result<(), DesignError> {
        if sequence.len() != self.length() {
            return Err(DesignError::LengthMismatch {
                sequence_len: sequence.len(),
                structure_len: self.length(),
            });
        }
        self.sequence = Some(sequence);
        for state in &mut self.states {
            state.reset();
        }
        Ok(())
    }

    pub fn clear_sequence(&mut self) {
        self.sequence = None;
        for state in &mut self.states {
            state.reset();
        }
    }

    fn folded_parts(
        &mut self,
    ) -> Result<(&mut Vec<State>, &Sequence, &dyn EnergyOracle), DesignError> {
        let Self {
            states,
            sequence,
            oracle,
            ..
        } = self;
        let sequence = sequence.as_ref().ok_or(DesignError::SequenceUnset)?;
        Ok((states, sequence, &**oracle))
    }

    /// Energy-of-structure per state, in state order.
    pub fn eos(&mut self) -> Result<Vec<f64>, DesignError> {
        let (states, sequence, oracle) = self.folded_parts()?;
        Ok(states.iter_mut().map(|s| s.eos(sequence, oracle)).collect())
    }

    /// Partition-function free energy per state.
    pub fn pf_energy(&mut self) -> Result<Vec<f64>, DesignError> {
        let (states, sequence, oracle) = self.folded_parts()?;
        Ok(states
            .iter_mut()
            .map(|s| s.pf_energy(sequence, oracle))
            .collect())
    }

    /// The MFE fold of the shared sequence, evaluated at the first state's
    /// conditions (the design's reference state).
    pub fn mfe(&mut self) -> Result<(Structure, f64), DesignError> {
        let (states, sequence, oracle) = self.folded_parts()?;
        let state = &mut states[0];
        Ok((
            state.mfe_structure(sequence, oracle),
            state.mfe_energy(sequence, oracle),
        ))
    }

    /// Energy of the shared sequence folded into an arbitrary structure,
    /// at the reference state's temperature. Unlike the per-state metrics
    /// this is not cached; callers evaluate transient structures with it.
    pub fn energy_of(&mut self, structure: &Structure) -> Result<f64, DesignError> {
        let (states, sequence, oracle) = self.folded_parts()?;
        let temperature = states[0].temperature();
        Ok(oracle.energy_of_structure(sequence, structure, temperature))
    }

    /// Whether the sequence's MFE fold equals one of the target structures.
    pub fn mfe_reaches_target(&mut self) -> Result<bool, DesignError> {
        let (mfe_structure, _) = self.mfe()?;
        Ok(self.distinct_structures.contains(&mfe_structure))
    }

    /// All reportable metrics, per state.
    pub fn state_metrics(&mut self) -> Result<Vec<StateMetrics>, DesignError> {
        let (states, sequence, oracle) = self.folded_parts()?;
        Ok(states
            .iter_mut()
            .map(|state| StateMetrics {
                name: state.name().to_string(),
                structure: state.structure().clone(),
                mfe_energy: state.mfe_energy(sequence, oracle),
                mfe_structure: state.mfe_structure(sequence, oracle),
                pf_energy: state.pf_energy(sequence, oracle),
                pf_structure: state.pf_structure(sequence, oracle),
                eos: state.eos(sequence, oracle),
                diff_eos_mfe: state.eos_diff_mfe(sequence, oracle),
                mfe_reached: state.eos_reached_mfe(sequence, oracle),
                probability: state.probability(sequence, oracle),
            })
            .collect())
    }

    /// Human-readable block with the sequence, score and per-state metrics.
    pub fn write_out(&mut self, score: f64) -> Result<String, DesignError> {
        let sequence = self
            .sequence
            .clone()
            .ok_or(DesignError::SequenceUnset)?;
        let metrics = self.state_metrics()?;

        let mut out = format!("{}\t{:9.4}", sequence, score);
        for m in &metrics {
            let _ = write!(
                out,
                "\n{}\n{}\t{:9.4}\t{:+9.4}\t{:9.4}\n{}\t{:9.4}\n{}\t{:9.4}",
                m.name,
                m.structure,
                m.eos,
                m.diff_eos_mfe,
                m.probability,
                m.mfe_structure,
                m.mfe_energy,
                m.pf_structure,
                m.pf_energy,
            );
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri_stable() -> Design {
        let structures = [
            "((((....))))....((((....))))........",
            "........((((....((((....))))....))))",
            "((((((((....))))((((....))))....))))",
        ]
        .iter()
        .map(|s| Structure::parse(s).unwrap())
        .collect();
        Design::from_structures(structures, Backend::StackedPair).unwrap()
    }

    #[test]
    fn from_structures_names_states_by_index() {
        let design = tri_stable();
        assert_eq!(design.states()[0].name(), "0");
        assert_eq!(design.states()[2].name(), "2");
        assert_eq!(design.length(), 36);
    }

    #[test]
    fn empty_design_is_rejected() {
        assert!(matches!(
            Design::from_structures(vec![], Backend::StackedPair),
            Err(DesignError::NoStructures)
        ));
    }

    #[test]
    fn differing_structure_lengths_are_rejected() {
        let structures = vec![
            Structure::parse("(((...)))").unwrap(),
            Structure::parse("((.....))...").unwrap(),
        ];
        assert!(matches!(
            Design::from_structures(structures, Backend::StackedPair),
            Err(DesignError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn duplicate_structures_counted_once() {
        let structures = vec![
            Structure::parse("(((...)))").unwrap(),
            Structure::parse("(((...)))").unwrap(),
            Structure::parse("((.....))").unwrap(),
        ];
        let design = Design::from_structures(structures, Backend::StackedPair).unwrap();
        assert_eq!(design.number_of_structures(), 2);
        assert_eq!(design.states().len(), 3);
    }

    #[test]
    fn set_sequence_validates_alphabet_and_length() {
        let mut design = tri_stable();
        assert!(matches!(
            design.set_sequence("ACGX"),
            Err(DesignError::MalformedSequence { .. })
        ));
        assert!(matches!(
            design.set_sequence("ACGU"),
            Err(DesignError::LengthMismatch { .. })
        ));
        design
            .set_sequence(&"A".repeat(36))
            .expect("valid sequence accepted");
        assert!(design.sequence().is_some());
    }

    #[test]
    fn empty_sequence_means_unset() {
        let mut design = tri_stable();
        design.set_sequence(&"G".repeat(36)).unwrap();
        design.set_sequence("").unwrap();
        assert!(design.sequence().is_none());
        assert!(matches!(design.eos(), Err(DesignError::SequenceUnset)));
    }

    #[test]
    fn reassigning_sequence_invalidates_fold_results() {
        let mut design = Design::from_structures(
            vec![Structure::parse("((((....))))").unwrap()],
            Backend::StackedPair,
        )
        .unwrap();
        design.set_sequence("GGGGAAAACCCC").unwrap();
        let eos_before = design.eos().unwrap()[0];
        design.set_sequence("AAAAAAAAAAAA").unwrap();
        let eos_after = design.eos().unwrap()[0];
        assert_ne!(eos_before, eos_after);
    }

    #[test]
    fn reimposing_the_same_sequence_changes_nothing() {
        let mut design = Design::from_structures(
            vec![Structure::parse("((((....))))").unwrap()],
            Backend::StackedPair,
        )
        .unwrap();
        design.set_sequence("GGGGAAAACCCC").unwrap();
        let before = design.state_metrics().unwrap();
        design.set_sequence("GGGGAAAACCCC").unwrap();
        let after = design.state_metrics().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn mfe_reaches_target_for_perfect_hairpin() {
        let mut design = Design::from_structures(
            vec![Structure::parse("((((....))))").unwrap()],
            Backend::StackedPair,
        )
        .unwrap();
        design.set_sequence("GGGGAAAACCCC").unwrap();
        assert!(design.mfe_reaches_target().unwrap());
    }

    #[test]
    fn state_metrics_report_zero_gap_when_target_is_mfe() {
        let mut design = Design::from_structures(
            vec![Structure::parse("((((....))))").unwrap()],
            Backend::StackedPair,
        )
        .unwrap();
        design.set_sequence("GGGGAAAACCCC").unwrap();
        let metrics = design.state_metrics().unwrap();
        assert!(metrics[0].mfe_reached);
        assert_eq!(metrics[0].diff_eos_mfe, 0.0);
    }

    #[test]
    fn write_out_contains_sequence_and_structures() {
        let mut design = tri_stable();
        design.set_sequence(&"G".repeat(36)).unwrap();
        let text = design.write_out(-1.5).unwrap();
        assert!(text.contains(&"G".repeat(36)));
        assert!(text.contains("((((....))))....((((....))))........"));
    }
}
