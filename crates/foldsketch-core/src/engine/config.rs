use super::sampler::SamplingMode;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
}

/// Parameters of one constrained-generation optimization run.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeConfig {
    /// Stop after this many consecutive candidates without improvement.
    pub exit_after: u64,
    pub mode: SamplingMode,
    /// Maximum number of rejected folds kept as negative constraints.
    pub ledger_capacity: usize,
    /// Minimal energy margin a stored negative fold must keep above every
    /// target's eos for a candidate to pass.
    pub max_eos_diff: f64,
    /// Full-resample warm-up trials before constraint generation starts.
    pub jump: u64,
    /// Optional wall-clock budget for the whole run.
    pub deadline: Option<Duration>,
    /// Seed for the sampler's generator; fresh entropy when absent.
    pub seed: Option<u64>,
}

#[derive(Default)]
pub struct OptimizeConfigBuilder {
    exit_after: Option<u64>,
    mode: Option<SamplingMode>,
    ledger_capacity: Option<usize>,
    max_eos_diff: Option<f64>,
    jump: u64,
    deadline: Option<Duration>,
    seed: Option<u64>,
}

impl OptimizeConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exit_after(mut self, trials: u64) -> Self {
        self.exit_after = Some(trials);
        self
    }
    pub fn mode(mut self, mode: SamplingMode) -> Self {
        self.mode = Some(mode);
        self
    }
    pub fn ledger_capacity(mut self, capacity: usize) -> Self {
        self.ledger_capacity = Some(capacity);
        self
    }
    pub fn max_eos_diff(mut self, margin: f64) -> Self {
        self.max_eos_diff = Some(margin);
        self
    }
    pub fn jump(mut self, trials: u64) -> Self {
        self.jump = trials;
        self
    }
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<OptimizeConfig, ConfigError> {
        Ok(OptimizeConfig {
            exit_after: self
                .exit_after
                .ok_or(ConfigError::MissingParameter("exit_after"))?,
            mode: self.mode.ok_or(ConfigError::MissingParameter("mode"))?,
            ledger_capacity: self
                .ledger_capacity
                .ok_or(ConfigError::MissingParameter("ledger_capacity"))?,
            max_eos_diff: self
                .max_eos_diff
                .ok_or(ConfigError::MissingParameter("max_eos_diff"))?,
            jump: self.jump,
            deadline: self.deadline,
            seed: self.seed,
        })
    }
}
