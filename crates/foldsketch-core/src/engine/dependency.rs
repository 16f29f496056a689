use super::sampler::{MutateOutcome, MutationToken, SamplerError, SamplingMode, SequenceSampler};
use crate::core::models::sequence::{IupacCode, Nucleotide, Sequence, SequenceConstraint};
use crate::core::models::structure::Structure;
use rand::prelude::*;
use rand::rngs::StdRng;
use std::collections::{HashMap, VecDeque};
use std::fmt::Write as _;
use std::time::{Duration, Instant};
use tracing::debug;

// Initial undo depth: step size 1 plus headroom, grown by the optimizer as
// its step size escalates.
const DEFAULT_HISTORY_CAPACITY: usize = 101;

#[derive(Debug, Clone)]
struct HistoryEntry {
    token: u64,
    positions: Vec<usize>,
    previous: Vec<Nucleotide>,
}

/// Sampler over the union dependency graph of all target structures.
///
/// Every base pair demanded by any structure becomes an undirected edge;
/// positions therefore fall into connected components that must be sampled
/// jointly. Assignments respect the per-position IUPAC constraint and make
/// every edge a canonical pair. The exact number of admissible assignments
/// is computed per component at construction time.
pub struct DependencySampler {
    constraint: SequenceConstraint,
    domains: Vec<Option<IupacCode>>,
    adjacency: Vec<Vec<usize>>,
    components: Vec<Vec<usize>>,
    component_solutions: Vec<f64>,
    current: Vec<Option<Nucleotide>>,
    history: VecDeque<HistoryEntry>,
    history_capacity: usize,
    next_token: u64,
    rng: StdRng,
}

impl DependencySampler {
    pub fn new(
        structures: &[Structure],
        constraint: &SequenceConstraint,
        seed: Option<u64>,
        deadline: Option<Duration>,
    ) -> Result<Self, SamplerError> {
        let start = Instant::now();
        let len = constraint.len();
        let domains: Vec<Option<IupacCode>> = (0..len).map(|i| constraint.code(i)).collect();

        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); len];
        for structure in structures {
            if structure.len() != len {
                return Err(SamplerError::LengthMismatch {
                    sequence_len: structure.len(),
                    graph_len: len,
                });
            }
            for (i, j) in structure.pairs() {
                if domains[i].is_none() || domains[j].is_none() {
                    return Err(SamplerError::Infeasible {
                        positions: vec![i, j],
                    });
                }
                if !adjacency[i].contains(&j) {
                    adjacency[i].push(j);
                    adjacency[j].push(i);
                }
            }
        }

        // Connected components, each in BFS order so that during sampling
        // every position after the first touches an already assigned one.
        let mut components: Vec<Vec<usize>> = Vec::new();
        let mut visited = vec![false; len];
        for root in 0..len {
            if visited[root] || domains[root].is_none() {
                continue;
            }
            let mut order = Vec::new();
            let mut queue = VecDeque::from([root]);
            visited[root] = true;
            while let Some(p) = queue.pop_front() {
                order.push(p);
                for &n in &adjacency[p] {
                    if !visited[n] {
                        visited[n] = true;
                        queue.push_back(n);
                    }
                }
            }
            components.push(order);
        }

        let unfixed = vec![None; len];
        let mut component_solutions = Vec::with_capacity(components.len());
        for component in &components {
            if let Some(deadline) = deadline {
                if start.elapsed() > deadline {
                    return Err(SamplerError::ConstructionTimeout {
                        seconds: deadline.as_secs_f64(),
                    });
                }
            }
            let count = count_assignments(component, &domains, &adjacency, &unfixed);
            if count == 0.0 {
                return Err(SamplerError::Infeasible {
                    positions: component.clone(),
                });
            }
            component_solutions.push(count);
        }

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut current: Vec<Option<Nucleotide>> = vec![None; len];
        for component in &components {
            if !sample_assignment(component, &domains, &adjacency, &mut current, 0, &mut rng) {
                // Unreachable: each component was just counted nonzero.
                return Err(SamplerError::Infeasible {
                    positions: component.clone(),
                });
            }
        }

        debug!(
            components = components.len(),
            solutions = component_solutions.iter().product::<f64>(),
            "dependency graph constructed"
        );

        Ok(Self {
            constraint: constraint.clone(),
            domains,
            adjacency,
            components,
            component_solutions,
            current,
            history: VecDeque::new(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            next_token: 0,
            rng,
        })
    }

    pub fn number_of_components(&self) -> usize {
        self.components.len()
    }

    /// Positions of one component, in its sampling order.
    pub fn component_positions(&self, index: usize) -> &[usize] {
        &self.components[index]
    }

    /// Minimal GraphML rendering of the dependency graph.
    pub fn to_graphml(&self) -> String {
        let mut out = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">\n\
             \x20 <graph id=\"dependencies\" edgedefault=\"undirected\">\n",
        );
        for (i, domain) in self.domains.iter().enumerate() {
            if domain.is_some() {
                let _ = writeln!(out, "    <node id=\"n{}\"/>", i);
            }
        }
        for (i, neighbors) in self.adjacency.iter().enumerate() {
            for &j in neighbors {
                if i < j {
                    let _ = writeln!(out, "    <edge source=\"n{}\" target=\"n{}\"/>", i, j);
                }
            }
        }
        out.push_str("  </graph>\n</graphml>\n");
        out
    }

    fn resample_components(&mut self, indices: &[usize]) -> Result<MutateOutcome, SamplerError> {
        let mut assigned = self.current.clone();
        let mut solutions = 1.0;
        for &c in indices {
            for &p in &self.components[c] {
                assigned[p] = None;
            }
            if !sample_assignment(
                &self.components[c],
                &self.domains,
                &self.adjacency,
                &mut assigned,
                0,
                &mut self.rng,
            ) {
                return Err(SamplerError::Infeasible {
                    positions: self.components[c].clone(),
                });
            }
            solutions *= self.component_solutions[c];
        }

        let mut positions = Vec::new();
        let mut previous = Vec::new();
        for &c in indices {
            for &p in &self.components[c] {
                if let Some(base) = self.current[p] {
                    positions.push(p);
                    previous.push(base);
                }
            }
        }
        self.current = assigned;
        Ok(self.finish_mutation(positions, previous, solutions))
    }

    fn mutate_local(&mut self, steps: usize) -> Result<MutateOutcome, SamplerError> {
        let base_positions: Vec<usize> = (0..self.domains.len())
            .filter(|&i| self.domains[i].is_some())
            .collect();
        let Some(&seed_pos) = base_positions.choose(&mut self.rng) else {
            return Err(SamplerError::Infeasible { positions: vec![] });
        };

        // BFS neighborhood of at most `steps` positions around the seed;
        // everything outside stays fixed and acts as a boundary.
        let mut region = Vec::new();
        let mut queue = VecDeque::from([seed_pos]);
        let mut seen = vec![false; self.domains.len()];
        seen[seed_pos] = true;
        while let Some(p) = queue.pop_front() {
            if region.len() == steps {
                break;
            }
            region.push(p);
            for &n in &self.adjacency[p] {
                if !seen[n] {
                    seen[n] = true;
                    queue.push_back(n);
                }
            }
        }

        let mut boundary = self.current.clone();
        for &p in &region {
            boundary[p] = None;
        }
        let solutions = count_assignments(&region, &self.domains, &self.adjacency, &boundary);

        let mut assigned = boundary;
        if !sample_assignment(
            &region,
            &self.domains,
            &self.adjacency,
            &mut assigned,
            0,
            &mut self.rng,
        ) {
            // Unreachable: the current assignment itself solves the region.
            return Err(SamplerError::Infeasible { positions: region });
        }

        let mut positions = Vec::new();
        let mut previous = Vec::new();
        for &p in &region {
            if let Some(base) = self.current[p] {
                positions.push(p);
                previous.push(base);
            }
        }
        self.current = assigned;
        Ok(self.finish_mutation(positions, previous, solutions))
    }

    fn finish_mutation(
        &mut self,
        positions: Vec<usize>,
        previous: Vec<Nucleotide>,
        solutions: f64,
    ) -> MutateOutcome {
        let token = self.next_token;
        self.next_token += 1;
        self.history.push_back(HistoryEntry {
            token,
            positions,
            previous,
        });
        while self.history.len() > self.history_capacity {
            self.history.pop_front();
        }
        MutateOutcome {
            solutions,
            token: MutationToken(token),
        }
    }
}

impl SequenceSampler for DependencySampler {
    fn sample_unconditioned(&mut self) -> Result<MutateOutcome, SamplerError> {
        let all: Vec<usize> = (0..self.components.len()).collect();
        self.resample_components(&all)
    }

    fn mutate(&mut self, mode: SamplingMode, steps: usize) -> Result<MutateOutcome, SamplerError> {
        match mode {
            SamplingMode::Full => self.sample_unconditioned(),
            SamplingMode::Global => {
                let k = steps.clamp(1, self.components.len());
                let chosen = rand::seq::index::sample(&mut self.rng, self.components.len(), k);
                self.resample_components(&chosen.into_vec())
            }
            SamplingMode::Local => self.mutate_local(steps.max(1)),
        }
    }

    fn revert(&mut self, token: MutationToken) -> Result<(), SamplerError> {
        match self.history.back() {
            Some(entry) if entry.token == token.0 => {}
            _ => return Err(SamplerError::NothingToRevert),
        }
        if let Some(entry) = self.history.pop_back() {
            for (&p, &base) in entry.positions.iter().zip(&entry.previous) {
                self.current[p] = Some(base);
            }
        }
        Ok(())
    }

    fn set_sequence(&mut self, sequence: &Sequence) -> Result<(), SamplerError> {
        if sequence.len() != self.domains.len() {
            return Err(SamplerError::LengthMismatch {
                sequence_len: sequence.len(),
                graph_len: self.domains.len(),
            });
        }
        let mut next: Vec<Option<Nucleotide>> = vec![None; self.domains.len()];
        for (i, domain) in self.domains.iter().enumerate() {
            match (domain, sequence.base(i)) {
                (Some(code), Some(base)) if code.allows(base) => next[i] = Some(base),
                (Some(code), Some(base)) => {
                    return Err(SamplerError::IncompatibleSequence {
                        text: sequence.to_string(),
                        reason: format!(
                            "base {} at position {} violates constraint {}",
                            base.to_char(),
                            i,
                            code.to_char()
                        ),
                    });
                }
                (None, None) => {}
                _ => {
                    return Err(SamplerError::IncompatibleSequence {
                        text: sequence.to_string(),
                        reason: format!("strand separators do not line up at position {}", i),
                    });
                }
            }
        }
        for (i, neighbors) in self.adjacency.iter().enumerate() {
            for &j in neighbors {
                if i < j {
                    match (next[i], next[j]) {
                        (Some(a), Some(b)) if a.pairs_with(b) => {}
                        _ => {
                            return Err(SamplerError::IncompatibleSequence {
                                text: sequence.to_string(),
                                reason: format!("positions {} and {} must form a pair", i, j),
                            });
                        }
                    }
                }
            }
        }
        self.current = next;
        self.history.clear();
        Ok(())
    }

    fn sequence(&self) -> Sequence {
        let text: String = self
            .constraint
            .as_str()
            .chars()
            .zip(&self.current)
            .map(|(c, base)| match base {
                Some(b) => b.to_char(),
                None => c, // strand separator
            })
            .collect();
        match Sequence::parse(&text) {
            Ok(sequence) => sequence,
            Err(_) => unreachable!("assignments only ever hold ACGU"),
        }
    }

    fn set_history_capacity(&mut self, capacity: usize) {
        self.history_capacity = capacity;
        while self.history.len() > self.history_capacity {
            self.history.pop_front();
        }
    }

    fn solution_count(&self) -> f64 {
        self.component_solutions.iter().product()
    }
}

fn consistent(
    adjacency: &[Vec<usize>],
    assigned: &[Option<Nucleotide>],
    pos: usize,
    base: Nucleotide,
) -> bool {
    adjacency[pos]
        .iter()
        .all(|&n| assigned[n].is_none_or(|b| base.pairs_with(b)))
}

/// Depth-first search for one admissible assignment of `order`, visiting the
/// base options of each position in random order. Positions outside `order`
/// that already carry a base act as a fixed boundary.
fn sample_assignment(
    order: &[usize],
    domains: &[Option<IupacCode>],
    adjacency: &[Vec<usize>],
    assigned: &mut [Option<Nucleotide>],
    idx: usize,
    rng: &mut StdRng,
) -> bool {
    if idx == order.len() {
        return true;
    }
    let pos = order[idx];
    let Some(code) = domains[pos] else {
        return false;
    };
    let mut options = code.options().to_vec();
    options.shuffle(rng);
    for base in options {
        if consistent(adjacency, assigned, pos, base) {
            assigned[pos] = Some(base);
            if sample_assignment(order, domains, adjacency, assigned, idx + 1, rng) {
                return true;
            }
            assigned[pos] = None;
        }
    }
    false
}

/// Exact number of admissible assignments of `order`, given a fixed boundary
/// in `fixed`. Sweep DP over the order: the state is the assignment of the
/// frontier (processed positions that still have unprocessed neighbors), so
/// the cost is linear in the order length for path- and cycle-shaped
/// components rather than exponential in the solution count.
fn count_assignments(
    order: &[usize],
    domains: &[Option<IupacCode>],
    adjacency: &[Vec<usize>],
    fixed: &[Option<Nucleotide>],
) -> f64 {
    let rank: HashMap<usize, usize> = order.iter().enumerate().map(|(r, &p)| (p, r)).collect();

    let mut states: HashMap<Vec<(usize, Nucleotide)>, f64> = HashMap::new();
    states.insert(Vec::new(), 1.0);

    for (r, &pos) in order.iter().enumerate() {
        let Some(code) = domains[pos] else {
            return 0.0;
        };
        let mut next: HashMap<Vec<(usize, Nucleotide)>, f64> = HashMap::new();
        for (frontier, count) in &states {
            'options: for &base in code.options() {
                for &n in &adjacency[pos] {
                    let partner = if rank.contains_key(&n) {
                        frontier.iter().find(|(p, _)| *p == n).map(|(_, b)| *b)
                    } else {
                        fixed[n]
                    };
                    // Unassigned neighbors are checked when their turn comes.
                    if let Some(b) = partner {
                        if !base.pairs_with(b) {
                            continue 'options;
                        }
                    }
                }
                let mut frontier = frontier.clone();
                frontier.push((pos, base));
                frontier.retain(|(p, _)| {
                    adjacency[*p]
                        .iter()
                        .any(|q| rank.get(q).is_some_and(|&rq| rq > r))
                });
                frontier.sort_unstable_by_key(|(p, _)| *p);
                *next.entry(frontier).or_insert(0.0) += count;
            }
        }
        states = next;
    }
    states.values().sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sampler::is_compatible;

    fn sampler(structures: &[&str], constraint: &str, seed: u64) -> DependencySampler {
        let structures: Vec<Structure> =
            structures.iter().map(|s| Structure::parse(s).unwrap()).collect();
        let constraint = SequenceConstraint::parse(constraint).unwrap();
        DependencySampler::new(&structures, &constraint, Some(seed), None).unwrap()
    }

    #[test]
    fn solution_count_is_exact_for_a_single_pair() {
        // One pair (6 canonical orientations) and one free position.
        let s = sampler(&["(.)"], "NNN", 1);
        assert_eq!(s.solution_count(), 24.0);
        assert_eq!(s.number_of_components(), 2);
    }

    #[test]
    fn solution_count_handles_stems() {
        // Two independent pairs: 6 * 6, times 4^4 unpaired.
        let s = sampler(&["((....))"], "NNNNNNNN", 1);
        assert_eq!(s.solution_count(), 6.0 * 6.0 * 4.0f64.powi(4));
    }

    #[test]
    fn construction_rejects_unpairable_constraint() {
        let structures = vec![Structure::parse("(...)").unwrap()];
        let constraint = SequenceConstraint::parse("AANNA").unwrap();
        assert!(matches!(
            DependencySampler::new(&structures, &constraint, Some(1), None),
            Err(SamplerError::Infeasible { .. })
        ));
    }

    #[test]
    fn construction_rejects_length_mismatch() {
        let structures = vec![Structure::parse("(...)").unwrap()];
        let constraint = SequenceConstraint::parse("NNN").unwrap();
        assert!(matches!(
            DependencySampler::new(&structures, &constraint, Some(1), None),
            Err(SamplerError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn construction_rejects_an_expired_deadline() {
        let structures = vec![Structure::parse("((((....))))").unwrap()];
        let constraint = SequenceConstraint::unconstrained(12);
        assert!(matches!(
            DependencySampler::new(&structures, &constraint, Some(1), Some(Duration::ZERO)),
            Err(SamplerError::ConstructionTimeout { .. })
        ));
    }

    #[test]
    fn samples_satisfy_all_structures_and_the_constraint() {
        let structures = [
            "((((....))))....((((....))))........",
            "........((((....((((....))))....))))",
            "((((((((....))))((((....))))....))))",
        ];
        let constraint = SequenceConstraint::unconstrained(36);
        let mut s = sampler(&structures, constraint.as_str(), 7);
        for _ in 0..20 {
            s.sample_unconditioned().unwrap();
            let sequence = s.sequence();
            assert!(constraint.admits(&sequence));
            for text in structures {
                assert!(is_compatible(&sequence, &Structure::parse(text).unwrap()));
            }
        }
    }

    #[test]
    fn revert_restores_the_exact_sequence() {
        let mut s = sampler(&["((((....))))"], "NNNNNNNNNNNN", 11);
        let before = s.sequence();
        let outcome = s.mutate(SamplingMode::Global, 2).unwrap();
        s.revert(outcome.token).unwrap();
        assert_eq!(s.sequence(), before);
    }

    #[test]
    fn revert_rejects_stale_tokens() {
        let mut s = sampler(&["((((....))))"], "NNNNNNNNNNNN", 11);
        let first = s.mutate(SamplingMode::Global, 1).unwrap();
        let second = s.mutate(SamplingMode::Global, 1).unwrap();
        assert!(matches!(
            s.revert(first.token),
            Err(SamplerError::NothingToRevert)
        ));
        s.revert(second.token).unwrap();
    }

    #[test]
    fn history_capacity_evicts_oldest_entries() {
        let mut s = sampler(&["((((....))))"], "NNNNNNNNNNNN", 11);
        s.set_history_capacity(1);
        s.mutate(SamplingMode::Global, 1).unwrap();
        let latest = s.mutate(SamplingMode::Global, 1).unwrap();
        s.revert(latest.token).unwrap();
        assert!(matches!(
            s.revert(latest.token),
            Err(SamplerError::NothingToRevert)
        ));
    }

    #[test]
    fn local_mutation_touches_a_bounded_neighborhood() {
        let mut s = sampler(&["((((....))))...."], "NNNNNNNNNNNNNNNN", 3);
        let before = s.sequence();
        s.mutate(SamplingMode::Local, 2).unwrap();
        let after = s.sequence();
        let changed = before
            .as_str()
            .chars()
            .zip(after.as_str().chars())
            .filter(|(a, b)| a != b)
            .count();
        assert!(changed <= 2);
    }

    #[test]
    fn set_sequence_validates_pairing() {
        let mut s = sampler(&["((....))"], "NNNNNNNN", 5);
        s.set_sequence(&Sequence::parse("GCAAAAGC").unwrap()).unwrap();
        assert_eq!(s.sequence().as_str(), "GCAAAAGC");
        assert!(matches!(
            s.set_sequence(&Sequence::parse("GAAAAAGC").unwrap()),
            Err(SamplerError::IncompatibleSequence { .. })
        ));
        // A failed assignment leaves the previous sequence in place.
        assert_eq!(s.sequence().as_str(), "GCAAAAGC");
    }

    #[test]
    fn seeded_samplers_are_reproducible() {
        let constraint = "NNNNNNNNNNNN";
        let mut a = sampler(&["((((....))))"], constraint, 42);
        let mut b = sampler(&["((((....))))"], constraint, 42);
        assert_eq!(a.sequence(), b.sequence());
        a.mutate(SamplingMode::Global, 1).unwrap();
        b.mutate(SamplingMode::Global, 1).unwrap();
        assert_eq!(a.sequence(), b.sequence());
    }

    #[test]
    fn graphml_lists_nodes_and_edges() {
        let s = sampler(&["(.)"], "NNN", 1);
        let xml = s.to_graphml();
        assert!(xml.contains("<node id=\"n0\"/>"));
        assert!(xml.contains("<edge source=\"n0\" target=\"n2\"/>"));
    }
}
