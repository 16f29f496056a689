use thiserror::Error;

use super::config::ConfigError;
use super::sampler::SamplerError;
use crate::core::models::DesignError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid design: {source}")]
    Design {
        #[from]
        source: DesignError,
    },

    #[error("Sampler error: {source}")]
    Sampler {
        #[from]
        source: SamplerError,
    },

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
