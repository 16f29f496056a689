//! # Core Models Module
//!
//! Data structures representing a design problem: target secondary
//! structures in dot-bracket notation, candidate nucleotide sequences, the
//! per-state fold results, and the [`design::Design`] container that holds
//! one shared sequence alongside all of its named states.
//!
//! ## Key Components
//!
//! - [`structure`] - Dot-bracket secondary structures with pair tables
//! - [`sequence`] - Nucleotide sequences and IUPAC sequence constraints
//! - [`state`] - One named target state with lazily cached fold metrics
//! - [`design`] - The shared-sequence container over all states

pub mod design;
pub mod sequence;
pub mod state;
pub mod structure;

use thiserror::Error;

/// Errors arising while constructing or mutating a design.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DesignError {
    #[error("Malformed structure '{text}': {reason}")]
    MalformedStructure { text: String, reason: String },

    #[error("Malformed sequence '{text}': expected IUPAC nucleotides [ACGU] with optional strand separators")]
    MalformedSequence { text: String },

    #[error("Malformed constraint '{text}': expected IUPAC codes [ACGUTNRYSWKMBDHV] with optional strand separators")]
    MalformedConstraint { text: String },

    #[error("Length mismatch: sequence of length {sequence_len} against structure of length {structure_len}")]
    LengthMismatch {
        sequence_len: usize,
        structure_len: usize,
    },

    #[error("A design requires at least one target structure")]
    NoStructures,

    #[error("No sequence assigned to the design")]
    SequenceUnset,
}
