use serde::{Deserialize, Serialize};
use tracing::debug;

use super::scoring::{
    direct_chain_score, STAGE_GET_RETURNS_CALLABLE, STAGE_INVOKE, STAGE_TOSTRING_UNDEFINED_PROPERTY,
    STAGE_WAKEUP_STRING_CONTEXT,
};
use crate::model::ClassDeclaration;

/// Entry point description. Accepted for symmetry with `SinkSpec`; it does not
/// narrow the direct-sink search.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceSpec {
    pub entry: String,
    #[serde(default)]
    pub controllable_properties: serde_json::Map<String, serde_json::Value>,
}

impl SourceSpec {
    pub fn unserialize() -> Self {
        Self { entry: "unserialize".to_string(), controllable_properties: Default::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkSpec {
    pub name: String,
}

impl SinkSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStep {
    pub class_name: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ChainStep {
    fn new(class_name: &str, method: &str, note: Option<&str>) -> Self {
        Self {
            class_name: class_name.to_string(),
            method: method.to_string(),
            note: note.map(str::to_string),
        }
    }
}

/// One hypothesised exploitation path ending at `sink`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainCandidate {
    pub id: String,
    pub steps: Vec<ChainStep>,
    pub sink: String,
    pub score: f64,
}

/// Single-step chains for every method that calls `sink` directly.
pub fn build_direct_chains(
    classes: &[ClassDeclaration],
    _source: &SourceSpec,
    sink: &SinkSpec,
) -> Vec<ChainCandidate> {
    let mut items = Vec::new();
    for class in classes {
        for method in class.methods.iter().filter(|m| m.calls_function(&sink.name)) {
            items.push(ChainCandidate {
                id: format!("{}:{}:{}", class.name, method.name, sink.name),
                steps: vec![ChainStep::new(&class.name, &method.name, None)],
                sink: sink.name.clone(),
                score: direct_chain_score(&method.name, !class.properties.is_empty()),
            });
        }
    }
    sort_by_score(&mut items);
    debug!(sink = %sink.name, chains = items.len(), "direct chains built");
    items
}

/// Per-class chains through the `__wakeup → __toString → __get → __invoke` trampoline stages.
///
/// Stages are evaluated in that fixed order and each contributes only when its
/// condition holds; a class with no firing stage yields nothing.
pub fn build_trampoline_chains(classes: &[ClassDeclaration]) -> Vec<ChainCandidate> {
    let mut items = Vec::new();
    for class in classes {
        let mut steps = Vec::new();
        let mut score = 0.0;

        if let Some(wakeup) = class.method("__wakeup") {
            if wakeup.calls_string_context() {
                steps.push(ChainStep::new(&class.name, "__wakeup", Some("string_context")));
                score += STAGE_WAKEUP_STRING_CONTEXT;
            }
        }
        if let Some(to_string) = class.method("__toString") {
            if !class.undeclared_uses(to_string).is_empty() {
                steps.push(ChainStep::new(
                    &class.name,
                    "__toString",
                    Some("access_undefined_property"),
                ));
                score += STAGE_TOSTRING_UNDEFINED_PROPERTY;
            }
        }
        if let Some(get) = class.method("__get") {
            if !get.invokes.is_empty() {
                steps.push(ChainStep::new(&class.name, "__get", Some("returns_callable_property")));
                score += STAGE_GET_RETURNS_CALLABLE;
            }
        }
        if class.method("__invoke").is_some() {
            steps.push(ChainStep::new(&class.name, "__invoke", None));
            score += STAGE_INVOKE;
        }

        if !steps.is_empty() {
            items.push(ChainCandidate {
                id: format!("{}:trampoline", class.name),
                steps,
                sink: "__invoke".to_string(),
                score,
            });
        }
    }
    sort_by_score(&mut items);
    items
}

fn sort_by_score(items: &mut [ChainCandidate]) {
    items.sort_by(|a, b| b.score.total_cmp(&a.score));
}
