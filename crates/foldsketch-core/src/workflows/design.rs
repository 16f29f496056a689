use crate::core::energy::Backend;
use crate::core::io::input::DesignInput;
use crate::core::io::report::RunRecord;
use crate::core::models::design::Design;
use crate::core::models::sequence::SequenceConstraint;
use crate::engine::config::OptimizeConfig;
use crate::engine::dependency::DependencySampler;
use crate::engine::error::EngineError;
use crate::engine::objective::ObjectiveConfig;
use crate::engine::optimizer::{classic_optimize, constrained_generation};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::sampler::{SamplingMode, SequenceSampler};
use rayon::prelude::*;
use std::time::{Duration, Instant};
use tracing::{info, instrument};

/// Everything a design campaign needs beyond the input itself.
#[derive(Debug, Clone)]
pub struct DesignConfig {
    /// Number of independent designs to produce.
    pub number: usize,
    pub backend: Backend,
    pub objective: ObjectiveConfig,
    pub optimize: OptimizeConfig,
    /// Budget for building the dependency graph, separate from the run
    /// deadline in `optimize`.
    pub construction_timeout: Option<Duration>,
}

/// Structural facts about the dependency graph backing a campaign.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphDiagnostics {
    /// Exact number of sequences compatible with structures and constraint.
    pub solution_count: f64,
    /// Positions per connected component.
    pub components: Vec<Vec<usize>>,
    pub graphml: String,
}

/// The outcome of a whole campaign: one record and one final design per run.
#[derive(Debug)]
pub struct DesignReport {
    pub records: Vec<RunRecord>,
    pub designs: Vec<Design>,
    pub diagnostics: GraphDiagnostics,
    pub construction_time: f64,
}

/// Runs a full design campaign: builds the dependency graph, then produces
/// `number` independent designs in parallel, each with its own sampler and
/// an optional random-jump warm-up before constrained generation.
///
/// Graph construction failures (infeasible constraint, construction
/// timeout) are fatal and reported once, before any run starts.
#[instrument(level = "info", skip_all, fields(number = config.number, structures = input.structures.len()))]
pub fn run(
    input: &DesignInput,
    config: &DesignConfig,
    reporter: &ProgressReporter,
) -> Result<DesignReport, EngineError> {
    let constraint = input.constraint_or_default();

    let mut prototype = Design::from_structures(input.structures.clone(), config.backend)?;
    if let Some(start) = &input.start_sequence {
        prototype.assign(start.clone())?;
    }

    let construction_started = Instant::now();
    let probe = DependencySampler::new(
        &input.structures,
        &constraint,
        config.optimize.seed,
        config.construction_timeout,
    )?;
    let construction_time = construction_started.elapsed().as_secs_f64();

    let diagnostics = GraphDiagnostics {
        solution_count: probe.solution_count(),
        components: (0..probe.number_of_components())
            .map(|i| probe.component_positions(i).to_vec())
            .collect(),
        graphml: probe.to_graphml(),
    };
    info!(
        solutions = diagnostics.solution_count,
        components = diagnostics.components.len(),
        construction_time,
        "dependency graph ready"
    );
    drop(probe);

    reporter.report(Progress::RunStart {
        total_runs: config.number as u64,
    });

    let results: Vec<(RunRecord, Design)> = (0..config.number)
        .into_par_iter()
        .map(|run_index| {
            let outcome = single_run(
                run_index,
                input,
                &constraint,
                &prototype,
                config,
                construction_time,
                reporter,
            );
            reporter.report(Progress::RunIncrement);
            outcome
        })
        .collect::<Result<_, _>>()?;

    reporter.report(Progress::RunFinish);

    let (records, designs) = results.into_iter().unzip();
    Ok(DesignReport {
        records,
        designs,
        diagnostics,
        construction_time,
    })
}

fn single_run(
    run_index: usize,
    input: &DesignInput,
    constraint: &SequenceConstraint,
    prototype: &Design,
    config: &DesignConfig,
    construction_time: f64,
    reporter: &ProgressReporter,
) -> Result<(RunRecord, Design), EngineError> {
    let mut design = prototype.clone();
    // Decorrelate parallel runs while keeping the campaign reproducible.
    let seed = config
        .optimize
        .seed
        .map(|s| s.wrapping_add(run_index as u64));
    let mut sampler = DependencySampler::new(
        &input.structures,
        constraint,
        seed,
        config.construction_timeout,
    )?;
    let objectives = vec![config.objective.to_objective()];

    let run_started = Instant::now();
    let mut mutations = 0u64;
    if config.optimize.jump > 0 {
        let warmup = classic_optimize(
            &mut sampler,
            &mut design,
            &objectives,
            config.optimize.jump,
            SamplingMode::Full,
            reporter,
        )?;
        mutations += warmup.counters.samples;
    }
    let outcome = constrained_generation(
        &mut sampler,
        &mut design,
        &objectives,
        &config.optimize,
        reporter,
    )?;
    mutations += outcome.counters.samples;
    let sample_time = run_started.elapsed().as_secs_f64();

    let sequence = design
        .sequence()
        .ok_or_else(|| EngineError::Internal("run finished without a sequence".into()))?
        .to_string();
    let states = design.state_metrics()?;
    info!(
        run = run_index,
        score = outcome.scores[0],
        samples = outcome.counters.samples,
        %sequence,
        "design run finished"
    );

    let record = RunRecord {
        jump: config.optimize.jump as usize,
        exit: config.optimize.exit_after as usize,
        mode: config.optimize.mode.to_string(),
        score: outcome.scores[0],
        num_mutations: mutations,
        construction_time,
        sample_time,
        num_samples: outcome.counters.samples,
        num_mfes: outcome.counters.mfe_evaluations,
        num_eos: outcome.counters.eos_evaluations,
        num_objectives: outcome.counters.objective_evaluations,
        sequence,
        seq_length: design.length(),
        number_of_structures: design.number_of_structures(),
        states,
    };
    Ok((record, design))
}
