use crate::core::models::design::Design;
use crate::core::models::DesignError;
use serde::Deserialize;

/// How the pairwise eos differences enter the objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifferencePenalty {
    #[default]
    Squared,
    Absolute,
}

impl DifferencePenalty {
    fn apply(self, diff: f64) -> f64 {
        match self {
            Self::Squared => diff * diff,
            Self::Absolute => diff.abs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectiveConfig {
    pub penalty: DifferencePenalty,
    pub weight: f64,
}

impl Default for ObjectiveConfig {
    fn default() -> Self {
        Self {
            penalty: DifferencePenalty::default(),
            weight: 1.0,
        }
    }
}

/// One scoring function over a folded design. Lower is better. Evaluation
/// may fill fold caches through the oracle but never mutates the sequence.
pub type ObjectiveFn = Box<dyn Fn(&mut Design) -> Result<f64, DesignError> + Send + Sync>;

impl ObjectiveConfig {
    pub fn to_objective(self) -> ObjectiveFn {
        Box::new(move |design| score(design, &self))
    }
}

/// The reference objective:
///
/// ```text
/// Σ_s eos(s)  −  n_states · pf  +  weight · Σ_{i<j} penalty(eos_i − eos_j)
/// ```
///
/// The first term pulls every target down in energy, the second rewards a
/// concentrated ensemble, the third keeps the targets energetically close
/// to each other.
pub fn score(design: &mut Design, config: &ObjectiveConfig) -> Result<f64, DesignError> {
    let eos = design.eos()?;
    let pf = design.pf_energy()?[0];
    let n = eos.len() as f64;

    let mut difference_part = 0.0;
    for (i, a) in eos.iter().enumerate() {
        for b in &eos[i + 1..] {
            difference_part += config.penalty.apply(a - b);
        }
    }

    Ok(eos.iter().sum::<f64>() - n * pf + config.weight * difference_part)
}

/// Strict multi-objective dominance: no component worse and at least one
/// strictly lower. Equal score vectors never dominate.
pub fn dominates(candidate: &[f64], incumbent: &[f64]) -> bool {
    let mut strictly_lower = false;
    for (c, b) in candidate.iter().zip(incumbent) {
        if c > b {
            return false;
        }
        if c < b {
            strictly_lower = true;
        }
    }
    strictly_lower
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::energy::Backend;
    use crate::core::models::structure::Structure;

    fn hairpin_design(sequence: &str) -> Design {
        let mut design = Design::from_structures(
            vec![
                Structure::parse("((((....))))").unwrap(),
                Structure::parse("..((....))..").unwrap(),
            ],
            Backend::StackedPair,
        )
        .unwrap();
        design.set_sequence(sequence).unwrap();
        design
    }

    #[test]
    fn score_is_finite_and_bounded_below_by_zero_gap() {
        let mut design = hairpin_design("GGGGAAAACCCC");
        let config = ObjectiveConfig::default();
        let value = score(&mut design, &config).unwrap();
        assert!(value.is_finite());
        // eos ≥ pf for every state, so the first two terms are nonnegative,
        // and both penalty kinds are nonnegative.
        assert!(value >= 0.0);
    }

    #[test]
    fn absolute_penalty_scores_lower_than_squared_for_large_gaps() {
        let mut design = hairpin_design("GGGGAAAACCCC");
        let squared = score(
            &mut design,
            &ObjectiveConfig {
                penalty: DifferencePenalty::Squared,
                weight: 1.0,
            },
        )
        .unwrap();
        let absolute = score(
            &mut design,
            &ObjectiveConfig {
                penalty: DifferencePenalty::Absolute,
                weight: 1.0,
            },
        )
        .unwrap();
        // The two targets differ by more than 1 kcal/mol on this sequence.
        assert!(squared > absolute);
    }

    #[test]
    fn zero_weight_drops_the_difference_part() {
        let mut design = hairpin_design("GGGGAAAACCCC");
        let eos = design.eos().unwrap();
        let pf = design.pf_energy().unwrap()[0];
        let expected = eos.iter().sum::<f64>() - eos.len() as f64 * pf;
        let got = score(
            &mut design,
            &ObjectiveConfig {
                penalty: DifferencePenalty::Squared,
                weight: 0.0,
            },
        )
        .unwrap();
        assert!((got - expected).abs() < 1e-12);
    }

    #[test]
    fn dominance_requires_strict_improvement() {
        assert!(dominates(&[1.0, 2.0], &[1.0, 3.0]));
        assert!(dominates(&[0.5], &[1.0]));
        assert!(!dominates(&[1.0, 2.0], &[1.0, 2.0]));
        assert!(!dominates(&[0.5, 4.0], &[1.0, 3.0]));
        assert!(!dominates(&[2.0], &[1.0]));
    }
}
