use super::kt;
use crate::core::models::sequence::{Nucleotide, Sequence};
use crate::core::models::structure::Structure;

/// Minimum number of unpaired positions enclosed by a hairpin pair.
const MIN_HAIRPIN: usize = 3;

/// The built-in folding backend: an exact dynamic program over canonical
/// base pairs (Watson-Crick plus GU wobble) with a bonus for stacked helical
/// pairs.
///
/// This is intentionally a toy thermodynamic model; its value is that the
/// minimum-energy fold, the energy of an arbitrary structure and the
/// partition function are all computed from the same decomposition, so the
/// ordering `pf <= mfe <= eos(structure)` holds exactly. The optimizer's
/// energy-gap rejection depends on that consistency, not on the absolute
/// numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackedPairModel {
    /// Energy of a GC/CG pair.
    pub pair_gc: f64,
    /// Energy of an AU/UA pair.
    pub pair_au: f64,
    /// Energy of a GU/UG wobble pair.
    pub pair_gu: f64,
    /// Bonus when a pair sits directly inside another pair.
    pub stack: f64,
    /// Penalty for a demanded pair the sequence cannot form.
    pub mismatch: f64,
}

impl Default for StackedPairModel {
    fn default() -> Self {
        Self {
            pair_gc: -3.0,
            pair_au: -2.0,
            pair_gu: -1.0,
            stack: -1.0,
            mismatch: 4.0,
        }
    }
}

impl StackedPairModel {
    fn pair_energy(&self, a: Nucleotide, b: Nucleotide) -> Option<f64> {
        use Nucleotide::{A, C, G, U};
        match (a, b) {
            (G, C) | (C, G) => Some(self.pair_gc),
            (A, U) | (U, A) => Some(self.pair_au),
            (G, U) | (U, G) => Some(self.pair_gu),
            _ => None,
        }
    }

    /// A pair `(i, j)` the model admits: two canonical bases separated by at
    /// least the hairpin minimum.
    fn admissible(&self, bases: &[Option<Nucleotide>], i: usize, j: usize) -> Option<f64> {
        if j < i + MIN_HAIRPIN + 1 {
            return None;
        }
        match (bases[i], bases[j]) {
            (Some(a), Some(b)) => self.pair_energy(a, b),
            _ => None,
        }
    }

    /// Runs the minimum-energy dynamic program.
    ///
    /// `w[i][j]` is the minimum energy of segment `[i, j]`; `v[i][j]` the
    /// minimum given that `i` pairs `j` (infinity when inadmissible).
    fn mfe_tables(&self, bases: &[Option<Nucleotide>]) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
        let n = bases.len();
        let mut w = vec![vec![0.0_f64; n]; n];
        let mut v = vec![vec![f64::INFINITY; n]; n];

        for i in (0..n).rev() {
            for j in (i + 1)..n {
                if let Some(pe) = self.admissible(bases, i, j) {
                    let open = w[i + 1][j - 1];
                    let stacked = v[i + 1][j - 1] + self.stack;
                    v[i][j] = pe + open.min(stacked);
                }

                let mut best = w[i + 1][j];
                for k in (i + MIN_HAIRPIN + 1)..=j {
                    if v[i][k].is_finite() {
                        let rest = if k + 1 <= j { w[k + 1][j] } else { 0.0 };
                        best = best.min(v[i][k] + rest);
                    }
                }
                w[i][j] = best;
            }
        }
        (w, v)
    }

    /// The minimum-free-energy structure and energy of a sequence.
    ///
    /// Ties are broken deterministically, so repeated calls yield the same
    /// structure.
    pub fn mfe(&self, sequence: &Sequence) -> (Structure, f64) {
        let bases: Vec<Option<Nucleotide>> = (0..sequence.len())
            .map(|i| sequence.base(i))
            .collect();
        let n = bases.len();
        debug_assert!(n > 0, "cannot fold an empty sequence");

        let mut brackets: Vec<char> = sequence
            .as_str()
            .chars()
            .map(|c| if c == '&' || c == '+' { c } else { '.' })
            .collect();

        if n > 1 {
            let (w, v) = self.mfe_tables(&bases);

            // Traceback. The stacked branch is checked before the open branch
            // so every adjacent pair traced also carried its bonus in the
            // table; the reported energy then matches energy_of_structure on
            // the reported fold.
            enum Frame {
                W(usize, usize),
                V(usize, usize),
            }
            let mut stack = vec![Frame::W(0, n - 1)];
            while let Some(frame) = stack.pop() {
                match frame {
                    Frame::W(i, j) => {
                        if i >= j {
                            continue;
                        }
                        if w[i][j] == w[i + 1][j] {
                            stack.push(Frame::W(i + 1, j));
                            continue;
                        }
                        for k in (i + MIN_HAIRPIN + 1)..=j {
                            if !v[i][k].is_finite() {
                                continue;
                            }
                            let rest = if k + 1 <= j { w[k + 1][j] } else { 0.0 };
                            if w[i][j] == v[i][k] + rest {
                                stack.push(Frame::V(i, k));
                                if k + 1 <= j {
                                    stack.push(Frame::W(k + 1, j));
                                }
                                break;
                            }
                        }
                    }
                    Frame::V(i, j) => {
                        brackets[i] = '(';
                        brackets[j] = ')';
                        let pe = self
                            .admissible(&bases, i, j)
                            .expect("traced pair is admissible");
                        let stacked = v[i + 1][j - 1] + self.stack;
                        if v[i][j] == pe + stacked {
                            stack.push(Frame::V(i + 1, j - 1));
                        } else {
                            stack.push(Frame::W(i + 1, j - 1));
                        }
                    }
                }
            }

            let structure = Structure::parse(&brackets.iter().collect::<String>())
                .expect("traceback emits valid dot-bracket");
            return (structure, w[0][n - 1]);
        }

        let structure = Structure::parse(&brackets.iter().collect::<String>())
            .expect("single-position structure is valid");
        (structure, 0.0)
    }

    /// Energy of a sequence constrained to a given structure.
    ///
    /// Pairs the sequence cannot form (non-canonical bases, strand
    /// separators, sub-minimal hairpins) are charged the mismatch penalty
    /// instead, so infeasible targets score strictly worse than feasible
    /// ones.
    pub fn energy_of(&self, sequence: &Sequence, structure: &Structure) -> f64 {
        debug_assert_eq!(sequence.len(), structure.len());
        let bases: Vec<Option<Nucleotide>> = (0..sequence.len())
            .map(|i| sequence.base(i))
            .collect();
        let table = structure.pair_table();

        let mut energy = 0.0;
        for (i, j) in structure.pairs() {
            match self.admissible(&bases, i, j) {
                Some(pe) => {
                    energy += pe;
                    let inner_stacked = i + 1 < j
                        && table[i + 1] == Some(j - 1)
                        && self.admissible(&bases, i + 1, j - 1).is_some();
                    if inner_stacked {
                        energy += self.stack;
                    }
                }
                None => energy += self.mismatch,
            }
        }
        energy
    }

    /// The full partition function Z over segment `[0, n-1]`.
    fn partition_z(&self, bases: &[Option<Nucleotide>], kt: f64) -> f64 {
        let n = bases.len();
        if n == 0 {
            return 1.0;
        }
        let w_stack = (-self.stack / kt).exp();

        // Mirrors mfe_tables with (min, +) replaced by (+, *).
        let mut z = vec![vec![1.0_f64; n]; n];
        let mut zb = vec![vec![0.0_f64; n]; n];

        for i in (0..n).rev() {
            for j in (i + 1)..n {
                if let Some(pe) = self.admissible(bases, i, j) {
                    let inner = z[i + 1][j - 1] + (w_stack - 1.0) * zb[i + 1][j - 1];
                    zb[i][j] = (-pe / kt).exp() * inner;
                }

                let mut total = z[i + 1][j];
                for k in (i + MIN_HAIRPIN + 1)..=j {
                    if zb[i][k] > 0.0 {
                        let rest = if k + 1 <= j { z[k + 1][j] } else { 1.0 };
                        total += zb[i][k] * rest;
                    }
                }
                z[i][j] = total;
            }
        }
        z[0][n - 1]
    }

    /// Ensemble free energy `-kT ln Z` over all admissible structures.
    pub fn partition(&self, sequence: &Sequence, temperature: f64) -> f64 {
        let bases: Vec<Option<Nucleotide>> = (0..sequence.len())
            .map(|i| sequence.base(i))
            .collect();
        if bases.is_empty() {
            return 0.0;
        }
        let kt = kt(temperature);
        -kt * self.partition_z(&bases, kt).ln()
    }

    /// Ensemble pairedness per position, from exact unpaired probabilities:
    /// Z with position `i` barred from pairing, over Z.
    pub fn pairedness(&self, sequence: &Sequence, temperature: f64) -> String {
        let bases: Vec<Option<Nucleotide>> = (0..sequence.len())
            .map(|i| sequence.base(i))
            .collect();
        let kt = kt(temperature);
        let z_full = self.partition_z(&bases, kt);

        sequence
            .as_str()
            .chars()
            .enumerate()
            .map(|(i, c)| {
                if bases[i].is_none() {
                    return c;
                }
                let mut masked = bases.clone();
                masked[i] = None;
                let p_paired = (1.0 - self.partition_z(&masked, kt) / z_full).clamp(0.0, 1.0);
                if p_paired < 1.0 / 3.0 {
                    '.'
                } else if p_paired < 2.0 / 3.0 {
                    ','
                } else {
                    '|'
                }
            })
            .collect()
    }
}

impl super::EnergyOracle for StackedPairModel {
    fn fold_mfe(&self, sequence: &Sequence, _temperature: f64) -> (Structure, f64) {
        self.mfe(sequence)
    }

    fn energy_of_structure(
        &self,
        sequence: &Sequence,
        structure: &Structure,
        _temperature: f64,
    ) -> f64 {
        self.energy_of(sequence, structure)
    }

    fn partition_free_energy(&self, sequence: &Sequence, temperature: f64) -> f64 {
        self.partition(sequence, temperature)
    }

    fn ensemble_pairedness(&self, sequence: &Sequence, temperature: f64) -> String {
        self.pairedness(sequence, temperature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::energy::EnergyOracle;

    fn seq(s: &str) -> Sequence {
        Sequence::parse(s).unwrap()
    }

    fn st(s: &str) -> Structure {
        Structure::parse(s).unwrap()
    }

    #[test]
    fn hairpin_sequence_folds_into_hairpin() {
        let model = StackedPairModel::default();
        let (structure, energy) = model.mfe(&seq("GGGGAAAACCCC"));
        assert!(energy < 0.0);
        assert!(structure.pair_count() >= 3);
        // The fold's own energy-of-structure must reproduce the MFE energy.
        assert_eq!(model.energy_of(&seq("GGGGAAAACCCC"), &structure), energy);
    }

    #[test]
    fn unpairable_sequence_folds_open() {
        let model = StackedPairModel::default();
        let (structure, energy) = model.mfe(&seq("AAAAAAAA"));
        assert_eq!(structure.pair_count(), 0);
        assert_eq!(energy, 0.0);
    }

    #[test]
    fn mfe_is_deterministic() {
        let model = StackedPairModel::default();
        let s = seq("GGGCGCAAAAGCGCCCAAAA");
        assert_eq!(model.mfe(&s), model.mfe(&s));
    }

    #[test]
    fn mfe_lower_bounds_energy_of_any_structure() {
        let model = StackedPairModel::default();
        let s = seq("GGGGAAAACCCCAAAA");
        let (_, mfe) = model.mfe(&s);
        for text in ["(((....)))......", "((((....))))....", "................"] {
            assert!(mfe <= model.energy_of(&s, &st(text)), "violated for {}", text);
        }
    }

    #[test]
    fn partition_lower_bounds_mfe() {
        let model = StackedPairModel::default();
        for text in ["GGGGAAAACCCC", "ACGUACGUACGUACGU", "AAAA"] {
            let s = seq(text);
            let (_, mfe) = model.mfe(&s);
            let pf = model.partition(&s, 37.0);
            assert!(pf <= mfe + 1e-9, "pf {} > mfe {} for {}", pf, mfe, text);
        }
    }

    #[test]
    fn demanded_impossible_pairs_are_penalized() {
        let model = StackedPairModel::default();
        // AA cannot pair; the demanded pair costs the mismatch penalty.
        let e = model.energy_of(&seq("AAAAAA"), &st("(....)"));
        assert_eq!(e, model.mismatch);
    }

    #[test]
    fn stacked_helix_is_rewarded_over_isolated_pairs() {
        let model = StackedPairModel::default();
        let s = seq("GGAAAACC");
        let stacked = model.energy_of(&s, &st("((....))"));
        let single = model.energy_of(&s, &st("(......)"));
        assert!(stacked < 2.0 * single);
    }

    #[test]
    fn probability_of_structure_is_a_probability() {
        let model = StackedPairModel::default();
        let s = seq("GGGGAAAACCCC");
        let (mfe_structure, _) = model.mfe(&s);
        let p = model.probability_of_structure(&s, &mfe_structure, 37.0);
        assert!(p > 0.0 && p <= 1.0, "p = {}", p);
    }

    #[test]
    fn pairedness_marks_a_stable_helix() {
        let model = StackedPairModel::default();
        let p = model.pairedness(&seq("GGGGGAAAACCCCC"), 37.0);
        assert_eq!(p.len(), 14);
        assert_eq!(&p[0..2], "||");
        assert_eq!(&p[12..14], "||");
    }

    #[test]
    fn separators_never_pair() {
        let model = StackedPairModel::default();
        let (structure, _) = model.mfe(&seq("GGGG&CCCC"));
        assert_eq!(structure.as_str().as_bytes()[4], b'&');
    }
}
