use super::DesignError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A nucleic-acid secondary structure in dot-bracket notation.
///
/// Allowed symbols are `(`, `)`, `.` and the strand separators `&`/`+`.
/// Brackets must balance; separators count towards the length but are never
/// paired. A `Structure` is immutable after parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Structure {
    text: String,
}

impl Structure {
    /// Parses and validates a dot-bracket string.
    ///
    /// # Errors
    ///
    /// Returns [`DesignError::MalformedStructure`] on disallowed symbols or
    /// unbalanced brackets.
    pub fn parse(text: &str) -> Result<Self, DesignError> {
        if text.is_empty() {
            return Err(DesignError::MalformedStructure {
                text: text.to_string(),
                reason: "empty structure".to_string(),
            });
        }

        let mut depth = 0usize;
        for (i, c) in text.chars().enumerate() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth = depth.checked_sub(1).ok_or_else(|| {
                        DesignError::MalformedStructure {
                            text: text.to_string(),
                            reason: format!("unmatched ')' at position {}", i),
                        }
                    })?;
                }
                '.' | '&' | '+' => {}
                other => {
                    return Err(DesignError::MalformedStructure {
                        text: text.to_string(),
                        reason: format!("disallowed symbol '{}' at position {}", other, i),
                    });
                }
            }
        }
        if depth != 0 {
            return Err(DesignError::MalformedStructure {
                text: text.to_string(),
                reason: format!("{} unmatched '('", depth),
            });
        }

        Ok(Self {
            text: text.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Partner index per position, `None` for unpaired positions and strand
    /// separators.
    pub fn pair_table(&self) -> Vec<Option<usize>> {
        let mut table = vec![None; self.text.len()];
        let mut stack = Vec::new();
        for (i, c) in self.text.chars().enumerate() {
            match c {
                '(' => stack.push(i),
                ')' => {
                    // Balance was verified at parse time.
                    let j = stack.pop().unwrap();
                    table[i] = Some(j);
                    table[j] = Some(i);
                }
                _ => {}
            }
        }
        table
    }

    /// All base pairs as `(i, j)` with `i < j`.
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        let mut stack = Vec::new();
        for (i, c) in self.text.chars().enumerate() {
            match c {
                '(' => stack.push(i),
                ')' => {
                    let j = stack.pop().unwrap();
                    pairs.push((j, i));
                }
                _ => {}
            }
        }
        pairs.sort_unstable();
        pairs
    }

    /// Number of base pairs in the structure.
    pub fn pair_count(&self) -> usize {
        self.text.chars().filter(|&c| c == '(').count()
    }
}

impl FromStr for Structure {
    type Err = DesignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_balanced_dot_bracket() {
        let s = Structure::parse("((((....))))....").unwrap();
        assert_eq!(s.len(), 16);
        assert_eq!(s.pair_count(), 4);
    }

    #[test]
    fn parse_accepts_strand_separators() {
        let s = Structure::parse("((..&..))").unwrap();
        assert_eq!(s.pairs(), vec![(0, 8), (1, 7)]);
    }

    #[test]
    fn parse_rejects_unmatched_closing_bracket() {
        let err = Structure::parse("..)..").unwrap_err();
        assert!(matches!(err, DesignError::MalformedStructure { .. }));
    }

    #[test]
    fn parse_rejects_unmatched_opening_bracket() {
        let err = Structure::parse("((.)").unwrap_err();
        assert!(matches!(err, DesignError::MalformedStructure { .. }));
    }

    #[test]
    fn parse_rejects_disallowed_symbols() {
        let err = Structure::parse("((x))").unwrap_err();
        if let DesignError::MalformedStructure { reason, .. } = err {
            assert!(reason.contains('x'));
        } else {
            panic!("expected MalformedStructure");
        }
    }

    #[test]
    fn parse_rejects_empty_structure() {
        assert!(Structure::parse("").is_err());
    }

    #[test]
    fn pair_table_is_symmetric() {
        let s = Structure::parse("(((...)))").unwrap();
        let table = s.pair_table();
        assert_eq!(table[0], Some(8));
        assert_eq!(table[8], Some(0));
        assert_eq!(table[2], Some(6));
        assert_eq!(table[4], None);
    }

    #[test]
    fn pairs_are_sorted_and_nested() {
        let s = Structure::parse("((((....))))....((((....))))........").unwrap();
        let pairs = s.pairs();
        assert_eq!(pairs.len(), 8);
        assert_eq!(pairs[0], (0, 11));
        assert_eq!(pairs[4], (16, 27));
    }
}
