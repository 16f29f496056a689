//! Public entry points that tie the engine and core layers together.

pub mod design;
