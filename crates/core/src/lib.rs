//! popchain-core
//!
//! Core library for discovering PHP object-injection (POP) gadget chains.
//!
//! This crate holds every piece of reasoning: the fact model, the parser
//! strategies that produce it, trampoline heuristics, chain composition, the
//! native serialization encoder and the lifecycle simulator. Frontends (the CLI,
//! tool transports) stay thin wrappers around these functions.

pub mod analysis;
pub mod config;
pub mod constraints;
pub mod knowledge_base;
pub mod model;
pub mod payload;
pub mod services;
pub mod simulator;

/// Returns the library version as encoded at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
