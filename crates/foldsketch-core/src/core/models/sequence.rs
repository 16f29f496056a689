use super::DesignError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the four RNA nucleotides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Nucleotide {
    A,
    C,
    G,
    U,
}

pub const NUCLEOTIDES: [Nucleotide; 4] = [Nucleotide::A, Nucleotide::C, Nucleotide::G, Nucleotide::U];

impl Nucleotide {
    /// Parses a nucleotide character; `T`/`t` is normalized to `U`.
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(Self::A),
            'C' => Some(Self::C),
            'G' => Some(Self::G),
            'U' | 'T' => Some(Self::U),
            _ => None,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Self::A => 'A',
            Self::C => 'C',
            Self::G => 'G',
            Self::U => 'U',
        }
    }

    /// Whether two nucleotides form a canonical pair (Watson-Crick or GU
    /// wobble).
    pub fn pairs_with(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::A, Self::U)
                | (Self::U, Self::A)
                | (Self::G, Self::C)
                | (Self::C, Self::G)
                | (Self::G, Self::U)
                | (Self::U, Self::G)
        )
    }
}

/// A concrete candidate sequence over `[ACGU]` with optional `&`/`+` strand
/// separators. Position indices line up one-to-one with structure positions;
/// separator positions carry no base.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sequence {
    text: String,
}

impl Sequence {
    /// Parses and validates a sequence string. `T` is normalized to `U`.
    ///
    /// # Errors
    ///
    /// Returns [`DesignError::MalformedSequence`] on any symbol outside
    /// `[ACGUTacgut&+]`.
    pub fn parse(text: &str) -> Result<Self, DesignError> {
        let mut normalized = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '&' | '+' => normalized.push(c),
                _ => match Nucleotide::from_char(c) {
                    Some(n) => normalized.push(n.to_char()),
                    None => {
                        return Err(DesignError::MalformedSequence {
                            text: text.to_string(),
                        });
                    }
                },
            }
        }
        Ok(Self { text: normalized })
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

    /// The base at a position, `None` for strand separators.
    pub fn base(&self, i: usize) -> Option<Nucleotide> {
        self.text[i..].chars().next().and_then(Nucleotide::from_char)
    }

    /// All bases with their positions, skipping separators.
    pub fn bases(&self) -> impl Iterator<Item = (usize, Nucleotide)> + '_ {
        self.text
            .char_indices()
            .filter_map(|(i, c)| Nucleotide::from_char(c).map(|n| (i, n)))
    }

}

impl FromStr for Sequence {
    type Err = DesignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// One IUPAC degeneracy code restricting a single sequence position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IupacCode(char);

impl IupacCode {
    pub fn from_char(c: char) -> Option<Self> {
        let c = match c.to_ascii_uppercase() {
            'T' => 'U',
            up @ ('A' | 'C' | 'G' | 'U' | 'R' | 'Y' | 'S' | 'W' | 'K' | 'M' | 'B' | 'D' | 'H'
            | 'V' | 'N') => up,
            _ => return None,
        };
        Some(Self(c))
    }

    pub fn to_char(self) -> char {
        self.0
    }

    /// The set of nucleotides this code admits.
    pub fn options(self) -> &'static [Nucleotide] {
        use Nucleotide::{A, C, G, U};
        match self.0 {
            'A' => &[A],
            'C' => &[C],
            'G' => &[G],
            'U' => &[U],
            'R' => &[A, G],
            'Y' => &[C, U],
            'S' => &[C, G],
            'W' => &[A, U],
            'K' => &[G, U],
            'M' => &[A, C],
            'B' => &[C, G, U],
            'D' => &[A, G, U],
            'H' => &[A, C, U],
            'V' => &[A, C, G],
            'N' => &[A, C, G, U],
            _ => unreachable!("validated at construction"),
        }
    }

    pub fn allows(self, base: Nucleotide) -> bool {
        self.options().contains(&base)
    }
}

/// A hard per-position sequence constraint in IUPAC notation, aligned with
/// the structure positions of a design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceConstraint {
    text: String,
}

impl SequenceConstraint {
    pub fn parse(text: &str) -> Result<Self, DesignError> {
        let mut normalized = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '&' | '+' => normalized.push(c),
                _ => match IupacCode::from_char(c) {
                    Some(code) => normalized.push(code.to_char()),
                    None => {
                        return Err(DesignError::MalformedConstraint {
                            text: text.to_string(),
                        });
                    }
                },
            }
        }
        Ok(Self { text: normalized })
    }

    /// An unconstrained all-`N` constraint of the given length.
    pub fn unconstrained(len: usize) -> Self {
        Self {
            text: "N".repeat(len),
        }
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

    /// The code at a position, `None` for strand separators.
    pub fn code(&self, i: usize) -> Option<IupacCode> {
        self.text[i..].chars().next().and_then(IupacCode::from_char)
    }

    /// Whether a concrete sequence satisfies this constraint position-wise.
    pub fn admits(&self, sequence: &Sequence) -> bool {
        if sequence.len() != self.len() {
            return false;
        }
        sequence
            .bases()
            .all(|(i, base)| self.code(i).is_some_and(|code| code.allows(base)))
    }
}

impl fmt::Display for SequenceConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_t_to_u() {
        let s = Sequence::parse("ACGTacgt").unwrap();
        assert_eq!(s.as_str(), "ACGUACGU");
    }

    #[test]
    fn parse_rejects_non_nucleotide_symbols() {
        assert!(matches!(
            Sequence::parse("ACGX"),
            Err(DesignError::MalformedSequence { .. })
        ));
    }

    #[test]
    fn parse_keeps_strand_separators() {
        let s = Sequence::parse("AC&GU").unwrap();
        assert_eq!(s.base(2), None);
        assert_eq!(s.base(3), Some(Nucleotide::G));
    }

    #[test]
    fn canonical_pairs_include_wobble() {
        assert!(Nucleotide::G.pairs_with(Nucleotide::U));
        assert!(Nucleotide::U.pairs_with(Nucleotide::G));
        assert!(Nucleotide::G.pairs_with(Nucleotide::C));
        assert!(!Nucleotide::A.pairs_with(Nucleotide::G));
        assert!(!Nucleotide::C.pairs_with(Nucleotide::U));
    }

    #[test]
    fn iupac_code_options_match_degeneracy() {
        assert_eq!(IupacCode::from_char('N').unwrap().options().len(), 4);
        assert_eq!(IupacCode::from_char('R').unwrap().options().len(), 2);
        assert!(IupacCode::from_char('K')
            .unwrap()
            .allows(Nucleotide::U));
        assert!(!IupacCode::from_char('K')
            .unwrap()
            .allows(Nucleotide::A));
        assert!(IupacCode::from_char('X').is_none());
    }

    #[test]
    fn constraint_admits_matching_sequence() {
        let c = SequenceConstraint::parse("NNGC").unwrap();
        assert!(c.admits(&Sequence::parse("AUGC").unwrap()));
        assert!(!c.admits(&Sequence::parse("AUGG").unwrap()));
        assert!(!c.admits(&Sequence::parse("AUG").unwrap()));
    }

    #[test]
    fn unconstrained_is_all_n() {
        let c = SequenceConstraint::unconstrained(5);
        assert_eq!(c.as_str(), "NNNNN");
        assert!(c.admits(&Sequence::parse("GGGGG").unwrap()));
    }
}
