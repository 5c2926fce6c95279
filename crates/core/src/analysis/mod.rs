//! Reasoning over the fact model: trampoline heuristics and chain composition.
//!
//! Both halves are pure functions of the classes they receive. Scores come from
//! `scoring` so the policy can be read and tested in one place.

pub mod chains;
pub mod gadgets;
pub mod scoring;
