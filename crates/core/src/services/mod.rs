//! Services that drive the fact model: source parsing and repository analysis.

pub mod analysis;
pub mod parsers;
