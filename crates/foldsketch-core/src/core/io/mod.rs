//! Provides input/output functionality for design problems and results.
//!
//! This module reads target structures, sequence constraints, and optional
//! start sequences from free-form text (stdin paste or `.inp` files), and
//! writes per-run design metrics as delimited records that can be read back
//! losslessly.

pub mod input;
pub mod report;

use crate::core::models::DesignError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Design(#[from] DesignError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
