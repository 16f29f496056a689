use super::IoError;
use crate::core::models::sequence::{Sequence, SequenceConstraint};
use crate::core::models::structure::Structure;
use std::fs;
use std::path::Path;

/// A parsed design problem: target structures plus optional sequence
/// constraint and start sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignInput {
    pub structures: Vec<Structure>,
    pub constraint: Option<SequenceConstraint>,
    pub start_sequence: Option<Sequence>,
}

impl DesignInput {
    /// The constraint, or all-`N` over the structure length when none was
    /// given.
    pub fn constraint_or_default(&self) -> SequenceConstraint {
        self.constraint
            .clone()
            .unwrap_or_else(|| SequenceConstraint::unconstrained(self.structures[0].len()))
    }
}

fn is_structure_line(line: &str) -> bool {
    line.chars().all(|c| matches!(c, '(' | ')' | '.' | '&' | '+'))
}

fn is_concrete_sequence_line(line: &str) -> bool {
    line.chars()
        .all(|c| matches!(c.to_ascii_uppercase(), 'A' | 'C' | 'G' | 'U' | 'T' | '&' | '+'))
}

fn is_constraint_line(line: &str) -> bool {
    line.chars().all(|c| {
        matches!(
            c.to_ascii_uppercase(),
            'A' | 'C'
                | 'G'
                | 'U'
                | 'T'
                | 'N'
                | 'R'
                | 'Y'
                | 'S'
                | 'W'
                | 'K'
                | 'M'
                | 'B'
                | 'D'
                | 'H'
                | 'V'
                | '&'
                | '+'
                | ' '
        )
    })
}

/// Parses the free-form input format of design problems.
///
/// Dot-bracket lines are target structures. The first IUPAC line is the
/// sequence constraint (spaces are shorthand for `N`, the `.inp` convention);
/// a second, concrete `[ACGU]` line is a start sequence. Lines starting with
/// `>` or `#` are comments; a line starting with `@` or `;` terminates the
/// input.
///
/// # Errors
///
/// Returns [`IoError::InvalidInput`] when a line fits no category or no
/// structure was found, and propagates structure/constraint parse errors.
pub fn read_input(text: &str) -> Result<DesignInput, IoError> {
    let mut structures = Vec::new();
    let mut constraint: Option<SequenceConstraint> = None;
    let mut start_sequence: Option<Sequence> = None;

    for raw in text.lines() {
        let line = raw.trim_end();
        if line.trim().is_empty() || line.starts_with('>') || line.starts_with('#') {
            continue;
        }
        if line.starts_with('@') || line.starts_with(';') {
            break;
        }

        if is_structure_line(line) {
            structures.push(Structure::parse(line)?);
        } else if constraint.is_some() && is_concrete_sequence_line(line) {
            if start_sequence.is_some() {
                return Err(IoError::InvalidInput(format!(
                    "more than one start sequence: '{}'",
                    line
                )));
            }
            start_sequence = Some(Sequence::parse(line)?);
        } else if constraint.is_none() && is_constraint_line(line) {
            let filled = line.replace(' ', "N");
            constraint = Some(SequenceConstraint::parse(&filled)?);
        } else {
            return Err(IoError::InvalidInput(format!(
                "unrecognized line: '{}'",
                line
            )));
        }
    }

    if structures.is_empty() {
        return Err(IoError::InvalidInput(
            "input contains no target structures".to_string(),
        ));
    }
    let len = structures[0].len();
    if structures.iter().any(|s| s.len() != len) {
        return Err(IoError::InvalidInput(
            "target structures differ in length".to_string(),
        ));
    }
    if let Some(c) = &constraint {
        if c.len() != len {
            return Err(IoError::InvalidInput(format!(
                "constraint length {} does not match structure length {}",
                c.len(),
                len
            )));
        }
    }
    if let Some(s) = &start_sequence {
        if s.len() != len {
            return Err(IoError::InvalidInput(format!(
                "start sequence length {} does not match structure length {}",
                s.len(),
                len
            )));
        }
    }

    Ok(DesignInput {
        structures,
        constraint,
        start_sequence,
    })
}

/// Reads a design problem from an `.inp`-style file.
pub fn read_inp_file<P: AsRef<Path>>(path: P) -> Result<DesignInput, IoError> {
    let text = fs::read_to_string(path)?;
    read_input(&text)
}
