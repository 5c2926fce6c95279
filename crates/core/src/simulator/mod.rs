//! Replay of the lifecycle calls `unserialize()` triggers on a payload.
//!
//! The trace is fixed: the object is revived, woken up and later destroyed. The
//! simulator does not consult the fact model, so `reached_sink` is always false.

use serde::{Deserialize, Serialize};

use crate::payload::PayloadSpec;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationEvent {
    pub step: String,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub events: Vec<SimulationEvent>,
    pub reached_sink: bool,
}

const LIFECYCLE: &[&str] = &["unserialize", "__wakeup", "__destruct"];

pub fn simulate_unserialize(spec: &PayloadSpec) -> SimulationReport {
    let events = LIFECYCLE
        .iter()
        .map(|step| SimulationEvent { step: step.to_string(), detail: spec.class_name.clone() })
        .collect();
    SimulationReport { events, reached_sink: false }
}
