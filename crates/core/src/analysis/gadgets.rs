use serde::{Deserialize, Serialize};

use super::scoring::{INVOKE_GADGET, STRING_CONTEXT_GADGET, UNDEFINED_PROPERTY_GADGET};
use crate::model::ClassDeclaration;

/// One class/method flagged by one rule.
///
/// `sink` names the magic-method role the rule points at (`__toString`,
/// `__invoke`, `__get`) or, for direct sink lookups, the sink function itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GadgetCandidate {
    pub name: String,
    pub class_name: String,
    pub method: String,
    pub sink: String,
    pub file: String,
    pub line: usize,
    pub score: f64,
}

/// Which heuristic produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrampolineRule {
    StringContext,
    InvokeProperty,
    UndefinedProperty,
}

impl TrampolineRule {
    pub fn role(&self) -> &'static str {
        match self {
            TrampolineRule::StringContext => "__toString",
            TrampolineRule::InvokeProperty => "__invoke",
            TrampolineRule::UndefinedProperty => "__get",
        }
    }

    pub fn score(&self) -> f64 {
        match self {
            TrampolineRule::StringContext => STRING_CONTEXT_GADGET,
            TrampolineRule::InvokeProperty => INVOKE_GADGET,
            TrampolineRule::UndefinedProperty => UNDEFINED_PROPERTY_GADGET,
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            TrampolineRule::StringContext => "toString",
            TrampolineRule::InvokeProperty => "invoke",
            TrampolineRule::UndefinedProperty => "get",
        }
    }
}

/// Scan every method for trampoline patterns.
///
/// Rules are independent, so one method may yield up to three candidates. The
/// result is sorted by descending score; equal scores keep input order.
pub fn detect_trampolines(classes: &[ClassDeclaration]) -> Vec<GadgetCandidate> {
    let mut items = Vec::new();
    for class in classes {
        for method in &class.methods {
            let mut fired = Vec::new();
            if method.calls_string_context() {
                fired.push(TrampolineRule::StringContext);
            }
            if !method.invokes.is_empty() {
                fired.push(TrampolineRule::InvokeProperty);
            }
            if !class.undeclared_uses(method).is_empty() {
                fired.push(TrampolineRule::UndefinedProperty);
            }

            for rule in fired {
                items.push(GadgetCandidate {
                    name: format!("{}:{}:{}", class.name, method.name, rule.suffix()),
                    class_name: class.name.clone(),
                    method: method.name.clone(),
                    sink: rule.role().to_string(),
                    file: class.file.clone(),
                    line: method.line,
                    score: rule.score(),
                });
            }
        }
    }
    items.sort_by(|a, b| b.score.total_cmp(&a.score));
    items
}
