use crate::cli::DesignArgs;
use crate::error::{CliError, Result};
use foldsketch::core::energy::Backend;
use foldsketch::engine::config::OptimizeConfigBuilder;
use foldsketch::engine::objective::{DifferencePenalty, ObjectiveConfig};
use foldsketch::engine::sampler::SamplingMode;
use foldsketch::workflows::design::DesignConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_NUMBER: usize = 4;
const DEFAULT_JUMP: u64 = 300;
const DEFAULT_EXIT: u64 = 500;
const DEFAULT_LEDGER_CAPACITY: usize = 100;

/// Optional values read from a TOML configuration file. Every field can be
/// overridden by the matching command-line flag.
#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub number: Option<usize>,
    pub jump: Option<u64>,
    pub exit: Option<u64>,
    pub mode: Option<String>,
    pub max_eos_diff: Option<f64>,
    pub ledger_capacity: Option<usize>,
    pub timeout: Option<u64>,
    pub seed: Option<u64>,
    pub penalty: Option<DifferencePenalty>,
    pub weight: Option<f64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}

/// Merges flags over file values over built-in defaults.
pub fn resolve(args: &DesignArgs) -> Result<DesignConfig> {
    let file = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };

    let mode: SamplingMode = args
        .mode
        .clone()
        .or(file.mode)
        .unwrap_or_else(|| "global".to_string())
        .parse()
        .map_err(CliError::Argument)?;

    let penalty = match args.penalty.as_deref() {
        Some("squared") => DifferencePenalty::Squared,
        Some("absolute") => DifferencePenalty::Absolute,
        Some(other) => {
            return Err(CliError::Argument(format!(
                "unknown penalty kind '{}', expected 'squared' or 'absolute'",
                other
            )));
        }
        None => file.penalty.unwrap_or_default(),
    };

    let construction_timeout = args
        .timeout
        .or(file.timeout)
        .filter(|&secs| secs > 0)
        .map(Duration::from_secs);

    let mut optimize = OptimizeConfigBuilder::new()
        .exit_after(args.exit.or(file.exit).unwrap_or(DEFAULT_EXIT))
        .mode(mode)
        .ledger_capacity(
            args.ledger_capacity
                .or(file.ledger_capacity)
                .unwrap_or(DEFAULT_LEDGER_CAPACITY),
        )
        .max_eos_diff(args.max_eos_diff.or(file.max_eos_diff).unwrap_or(0.0))
        .jump(args.jump.or(file.jump).unwrap_or(DEFAULT_JUMP));
    if let Some(seed) = args.seed.or(file.seed) {
        optimize = optimize.seed(seed);
    }

    Ok(DesignConfig {
        number: args.number.or(file.number).unwrap_or(DEFAULT_NUMBER),
        backend: Backend::StackedPair,
        objective: ObjectiveConfig {
            penalty,
            weight: file.weight.unwrap_or(1.0),
        },
        optimize: optimize
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?,
        construction_timeout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::DesignArgs;
    use std::io::Write;

    #[test]
    fn defaults_apply_without_file_or_flags() {
        let config = resolve(&DesignArgs::default()).unwrap();
        assert_eq!(config.number, DEFAULT_NUMBER);
        assert_eq!(config.optimize.exit_after, DEFAULT_EXIT);
        assert_eq!(config.optimize.jump, DEFAULT_JUMP);
        assert_eq!(config.optimize.mode, SamplingMode::Global);
        assert_eq!(config.objective.penalty, DifferencePenalty::Squared);
        assert!(config.construction_timeout.is_none());
    }

    #[test]
    fn flags_override_file_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "number = 2\nexit = 100\nmode = \"local\"").unwrap();

        let args = DesignArgs {
            config: Some(file.path().to_path_buf()),
            exit: Some(250),
            ..DesignArgs::default()
        };
        let config = resolve(&args).unwrap();
        assert_eq!(config.number, 2);
        assert_eq!(config.optimize.exit_after, 250);
        assert_eq!(config.optimize.mode, SamplingMode::Local);
    }

    #[test]
    fn penalty_kind_deserializes_from_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "penalty = \"absolute\"").unwrap();
        let args = DesignArgs {
            config: Some(file.path().to_path_buf()),
            ..DesignArgs::default()
        };
        let config = resolve(&args).unwrap();
        assert_eq!(config.objective.penalty, DifferencePenalty::Absolute);
    }

    #[test]
    fn unknown_penalty_is_rejected() {
        let args = DesignArgs {
            penalty: Some("cubic".to_string()),
            ..DesignArgs::default()
        };
        assert!(matches!(resolve(&args), Err(CliError::Argument(_))));
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "numbre = 2").unwrap();
        let args = DesignArgs {
            config: Some(file.path().to_path_buf()),
            ..DesignArgs::default()
        };
        assert!(matches!(resolve(&args), Err(CliError::FileParsing { .. })));
    }

    #[test]
    fn zero_timeout_means_no_deadline() {
        let args = DesignArgs {
            timeout: Some(0),
            ..DesignArgs::default()
        };
        let config = resolve(&args).unwrap();
        assert!(config.construction_timeout.is_none());
    }
}
