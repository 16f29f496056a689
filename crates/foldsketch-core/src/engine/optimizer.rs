use super::config::OptimizeConfig;
use super::error::EngineError;
use super::ledger::ConstraintLedger;
use super::objective::{dominates, ObjectiveFn};
use super::progress::{Progress, ProgressReporter};
use super::sampler::{is_compatible, MutationToken, SamplingMode, SequenceSampler};
use crate::core::models::design::Design;
use crate::core::models::structure::Structure;
use std::time::Instant;
use tracing::{debug, instrument, trace};

// Consecutive ledger rejections tolerated before the mutation step size is
// widened to escape the blocked neighborhood.
const STALL_LIMIT: u64 = 10_000;

// Undo depth headroom kept above the current step size.
const HISTORY_HEADROOM: usize = 100;

/// Per-run work counters. Monotone within a run, reset only at run start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    /// Mutations drawn from the sampler.
    pub samples: u64,
    /// MFE folds computed.
    pub mfe_evaluations: u64,
    /// Energy-of-structure evaluations (targets and ledger entries).
    pub eos_evaluations: u64,
    /// Objective function evaluations.
    pub objective_evaluations: u64,
    /// Accepted strict improvements.
    pub improvements: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeOutcome {
    /// Best score per objective, in objective order. The design holds the
    /// sequence that achieved them.
    pub scores: Vec<f64>,
    pub counters: RunCounters,
    /// Negative constraints retained at run end, newest first. Empty for
    /// optimizers that keep no ledger.
    pub negatives: Vec<Structure>,
}

/// Seeds the sampler from the design (drawing a fresh sequence when the
/// design carries none) and evaluates the starting scores.
fn initialize<S: SequenceSampler + ?Sized>(
    sampler: &mut S,
    design: &mut Design,
    objectives: &[ObjectiveFn],
    counters: &mut RunCounters,
) -> Result<Vec<f64>, EngineError> {
    match design.sequence().cloned() {
        None => {
            sampler.sample_unconditioned()?;
            design.assign(sampler.sequence())?;
        }
        Some(sequence) => sampler.set_sequence(&sequence)?,
    }
    let mut scores = Vec::with_capacity(objectives.len());
    for objective in objectives {
        scores.push(objective(design)?);
        counters.objective_evaluations += 1;
    }
    Ok(scores)
}

/// Undoes the latest mutation and restores the design to the sampler's
/// (previous) sequence.
fn reject<S: SequenceSampler + ?Sized>(
    sampler: &mut S,
    design: &mut Design,
    token: MutationToken,
) -> Result<(), EngineError> {
    sampler.revert(token)?;
    design.assign(sampler.sequence())?;
    Ok(())
}

/// Plain stochastic local search: mutate, score, keep strict improvements.
///
/// Used on its own and as the random-jump warm-up before constraint
/// generation, where full resampling spreads the starting points over the
/// whole solution space.
#[instrument(level = "debug", skip_all, fields(exit_after, mode = %mode))]
pub fn classic_optimize<S: SequenceSampler + ?Sized>(
    sampler: &mut S,
    design: &mut Design,
    objectives: &[ObjectiveFn],
    exit_after: u64,
    mode: SamplingMode,
    reporter: &ProgressReporter,
) -> Result<OptimizeOutcome, EngineError> {
    let mut counters = RunCounters::default();
    let mut scores = initialize(sampler, design, objectives, &mut counters)?;

    let mut non_improving = 0u64;
    while non_improving <= exit_after {
        counters.samples += 1;
        let outcome = sampler.mutate(mode, 1)?;
        design.assign(sampler.sequence())?;

        let mut candidate = Vec::with_capacity(objectives.len());
        for objective in objectives {
            candidate.push(objective(design)?);
            counters.objective_evaluations += 1;
        }

        if dominates(&candidate, &scores) {
            scores = candidate;
            counters.improvements += 1;
            non_improving = 0;
        } else {
            reject(sampler, design, outcome.token)?;
            non_improving += 1;
        }

        reporter.report(Progress::Status {
            samples: counters.samples,
            non_improving,
            step_size: 1,
            scores: scores.clone(),
            solutions: outcome.solutions,
        });
    }

    debug!(samples = counters.samples, ?scores, "warm-up finished");
    Ok(OptimizeOutcome {
        scores,
        counters,
        negatives: Vec::new(),
    })
}

/// Constraint-generation optimization.
///
/// Alternates two phases. The inner loop mutates until it finds a candidate
/// whose energy gap against every remembered negative fold is at least
/// `max_eos_diff` above every target eos; candidates failing the check are
/// reverted, and after [`STALL_LIMIT`] consecutive rejections the step size
/// grows (with matching undo depth). The outer body then folds the
/// candidate: if its MFE structure is one of the targets, the objectives
/// decide acceptance by strict dominance; otherwise the fold is remembered
/// in the ledger as a new negative constraint. The run ends after
/// `exit_after` consecutive candidates without improvement, or when the
/// configured wall-clock deadline passes.
#[instrument(level = "debug", skip_all, fields(exit_after = config.exit_after, mode = %config.mode))]
pub fn constrained_generation<S: SequenceSampler + ?Sized>(
    sampler: &mut S,
    design: &mut Design,
    objectives: &[ObjectiveFn],
    config: &OptimizeConfig,
    reporter: &ProgressReporter,
) -> Result<OptimizeOutcome, EngineError> {
    let mut counters = RunCounters::default();
    let mut scores = initialize(sampler, design, objectives, &mut counters)?;

    let mut ledger = ConstraintLedger::new(config.ledger_capacity);
    let mut non_improving = 0u64;
    let mut step_size = 1usize;
    let mut stall = 0u64;
    let started = Instant::now();
    let out_of_time = |now: Instant| {
        config
            .deadline
            .is_some_and(|deadline| now.duration_since(started) > deadline)
    };

    'run: loop {
        // Inner loop: find a candidate clearing every negative constraint.
        let token = 'generation: loop {
            if out_of_time(Instant::now()) {
                break 'run;
            }
            counters.samples += 1;
            if stall > STALL_LIMIT {
                stall = 0;
                step_size += 1;
                sampler.set_history_capacity(step_size + HISTORY_HEADROOM);
                trace!(step_size, "widening mutation step");
            }
            stall += 1;

            let outcome = sampler.mutate(config.mode, step_size)?;
            design.assign(sampler.sequence())?;
            counters.eos_evaluations += design.number_of_structures() as u64;
            let target_eos = design.eos()?;

            reporter.report(Progress::Status {
                samples: counters.samples,
                non_improving,
                step_size,
                scores: scores.clone(),
                solutions: outcome.solutions,
            });

            let candidate = sampler.sequence();
            let mut rejected_by = None;
            for negative in ledger.iter_newest_first() {
                if !is_compatible(&candidate, negative) {
                    continue;
                }
                counters.eos_evaluations += 1;
                let neg_eos = design.energy_of(negative)?;
                if target_eos
                    .iter()
                    .any(|&eos| neg_eos - eos < config.max_eos_diff)
                {
                    rejected_by = Some(negative.clone());
                    break;
                }
            }

            match rejected_by {
                Some(negative) => {
                    trace!(%negative, "candidate blocked by negative constraint");
                    reject(sampler, design, outcome.token)?;
                }
                None => break 'generation outcome.token,
            }
        };

        non_improving += 1;
        counters.mfe_evaluations += 1;
        let (mfe_structure, _) = design.mfe()?;

        if design.structures().contains(&mfe_structure) {
            let mut candidate = Vec::with_capacity(objectives.len());
            for objective in objectives {
                candidate.push(objective(design)?);
                counters.objective_evaluations += 1;
            }
            if dominates(&candidate, &scores) {
                scores = candidate;
                counters.improvements += 1;
                non_improving = 0;
                step_size = 1;
                stall = 0;
            } else {
                reject(sampler, design, token)?;
            }
        } else {
            // A fold the candidate prefers over the targets: remember it so
            // later candidates steer clear of it. Targets never enter here.
            if ledger.add(mfe_structure.clone()) {
                debug!(%mfe_structure, size = ledger.len(), "new negative constraint");
                reporter.report(Progress::Message(format!(
                    "new negative constraint {}",
                    mfe_structure
                )));
            }
            reject(sampler, design, token)?;
        }

        if non_improving > config.exit_after || out_of_time(Instant::now()) {
            break;
        }
    }

    debug!(
        samples = counters.samples,
        improvements = counters.improvements,
        negatives = ledger.len(),
        ?scores,
        "constrained generation finished"
    );
    Ok(OptimizeOutcome {
        scores,
        counters,
        negatives: ledger.iter_newest_first().cloned().collect(),
    })
}
