use crate::core::models::sequence::Sequence;
use crate::core::models::structure::Structure;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SamplerError {
    #[error("no sequence satisfies the pairing and constraint requirements at positions {positions:?}")]
    Infeasible { positions: Vec<usize> },

    #[error("dependency graph construction exceeded the {seconds:.1} s deadline")]
    ConstructionTimeout { seconds: f64 },

    #[error("sequence length {sequence_len} does not match graph length {graph_len}")]
    LengthMismatch {
        sequence_len: usize,
        graph_len: usize,
    },

    #[error("sequence '{text}' violates the dependency graph: {reason}")]
    IncompatibleSequence { text: String, reason: String },

    #[error("mutation token does not refer to the most recent retained mutation")]
    NothingToRevert,
}

/// How a mutation explores the solution space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplingMode {
    /// Resample every position from scratch.
    Full,
    /// Resample a number of whole connected components.
    #[default]
    Global,
    /// Resample a bounded neighborhood around one random position.
    Local,
}

impl fmt::Display for SamplingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Full => "full",
            Self::Global => "global",
            Self::Local => "local",
        })
    }
}

impl FromStr for SamplingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Self::Full),
            "global" => Ok(Self::Global),
            "local" => Ok(Self::Local),
            other => Err(format!("unknown sampling mode '{}'", other)),
        }
    }
}

/// Handle for undoing the mutation that produced it. Valid only while that
/// mutation is the newest retained history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationToken(pub(crate) u64);

#[derive(Debug, Clone, PartialEq)]
pub struct MutateOutcome {
    /// Number of sequences the mutated subspace admits.
    pub solutions: f64,
    pub token: MutationToken,
}

/// Stateful source of constraint-compatible sequences.
///
/// Implementations hold a current sequence at all times after construction;
/// every mutation moves to another sequence compatible with all target
/// structures and the IUPAC constraint, and can be undone through its token
/// while the bounded history still retains it.
pub trait SequenceSampler: Send {
    /// Draws a fresh sequence, ignoring the current one.
    fn sample_unconditioned(&mut self) -> Result<MutateOutcome, SamplerError>;

    /// Perturbs the current sequence according to `mode`, touching at most
    /// `steps` components (global) or positions (local).
    fn mutate(&mut self, mode: SamplingMode, steps: usize) -> Result<MutateOutcome, SamplerError>;

    /// Undoes the mutation identified by `token`.
    fn revert(&mut self, token: MutationToken) -> Result<(), SamplerError>;

    /// Replaces the current sequence, validating it against the graph.
    /// Clears the undo history.
    fn set_sequence(&mut self, sequence: &Sequence) -> Result<(), SamplerError>;

    /// The current sequence.
    fn sequence(&self) -> Sequence;

    /// Grows or shrinks the undo history; shrinking drops oldest entries.
    fn set_history_capacity(&mut self, capacity: usize);

    /// Exact size of the full solution space.
    fn solution_count(&self) -> f64;
}

/// Whether a sequence can in principle fold into a structure: every demanded
/// pair must be canonical (Watson-Crick or GU).
pub fn is_compatible(sequence: &Sequence, structure: &Structure) -> bool {
    if sequence.len() != structure.len() {
        return false;
    }
    structure.pairs().iter().all(|&(i, j)| {
        match (sequence.base(i), sequence.base(j)) {
            (Some(a), Some(b)) => a.pairs_with(b),
            _ => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compatibility_requires_canonical_pairs() {
        let structure = Structure::parse("((....))").unwrap();
        assert!(is_compatible(
            &Sequence::parse("GCAAAAGC").unwrap(),
            &structure
        ));
        assert!(is_compatible(
            &Sequence::parse("GUAAAAGU").unwrap(),
            &structure
        ));
        assert!(!is_compatible(
            &Sequence::parse("GAAAAAGC").unwrap(),
            &structure
        ));
        assert!(!is_compatible(&Sequence::parse("GCAAGC").unwrap(), &structure));
    }

    #[test]
    fn sampling_mode_parses_and_prints() {
        assert_eq!("global".parse::<SamplingMode>().unwrap(), SamplingMode::Global);
        assert_eq!(SamplingMode::Local.to_string(), "local");
        assert!("samples".parse::<SamplingMode>().is_err());
    }
}
