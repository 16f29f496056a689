//! The stateful optimization machinery: sequence samplers over the
//! dependency graph, the negative-constraint ledger, objective evaluation
//! and the constrained-generation search loop itself.

pub mod config;
pub mod dependency;
pub mod error;
pub mod ledger;
pub mod objective;
pub mod optimizer;
pub mod progress;
pub mod sampler;

pub use error::EngineError;
