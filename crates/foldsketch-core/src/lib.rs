//! # foldsketch Core Library
//!
//! A library for designing nucleic-acid sequences that fold into several
//! prescribed secondary structures at once, using a constraint-generation
//! local search over the space of compatible sequences.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to ensure a
//! clear separation of concerns, making it modular, testable, and extensible.
//!
//! - **[`core`]: The Foundation.** Contains stateless data models
//!   ([`core::models::design::Design`], dot-bracket structures, sequences),
//!   the pure folding-energy model behind the
//!   [`core::energy::EnergyOracle`] capability, and I/O utilities.
//!
//! - **[`engine`]: The Logic Core.** This stateful layer orchestrates the
//!   optimization process. It includes the dependency-graph sequence sampler,
//!   the bounded negative-constraint ledger, the multistability objective,
//!   and the constraint-generation optimizer itself.
//!
//! - **[`workflows`]: The Public API.** This is the highest-level,
//!   user-facing layer. It ties the `engine` and `core` together to execute
//!   complete design campaigns (N independent optimization runs over one set
//!   of target structures) and collect their metrics.

pub mod core;
pub mod engine;
pub mod workflows;
