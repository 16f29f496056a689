//! # Core Module
//!
//! This module provides the fundamental building blocks for multi-stable
//! nucleic-acid design, serving as the computational foundation of the
//! library.
//!
//! ## Overview
//!
//! The core module implements the essential data structures and pure
//! algorithms required for sequence design against multiple target secondary
//! structures. Everything here is stateless or value-like: structures,
//! sequences, the design container with its cached fold metrics, the folding
//! energy model, and file I/O.
//!
//! ## Architecture
//!
//! - **Design Representation** ([`models`]) - Dot-bracket structures,
//!   nucleotide sequences, per-state fold data, and the shared-sequence
//!   design container
//! - **Energy Calculations** ([`energy`]) - The folding-energy oracle
//!   capability and the built-in stacked-pair model
//! - **File I/O** ([`io`]) - Structure/constraint input parsing and the
//!   delimited metrics report

pub mod energy;
pub mod io;
pub mod models;
