//! Scoring policy for gadget candidates and chain candidates.

/// Gadget rule: a method calls a string-context function (fires `__toString`).
pub const STRING_CONTEXT_GADGET: f64 = 0.6;
/// Gadget rule: a method invokes a property value as a callable (fires `__invoke`).
pub const INVOKE_GADGET: f64 = 0.7;
/// Gadget rule: a method reads a property the class never declares (fires `__get`).
pub const UNDEFINED_PROPERTY_GADGET: f64 = 0.5;
/// Uniform score for a method that calls the requested sink directly.
pub const DIRECT_SINK_GADGET: f64 = 1.0;

/// Direct-sink chain: base score for any method calling the sink.
pub const DIRECT_BASE: f64 = 1.0;
pub const DIRECT_WAKEUP_BONUS: f64 = 0.5;
pub const DIRECT_DESTRUCT_BONUS: f64 = 0.2;
/// Added when the declaring class has at least one declared property.
pub const DIRECT_PROPERTIES_BONUS: f64 = 0.1;

/// Trampoline chain stage contributions, in stage order.
pub const STAGE_WAKEUP_STRING_CONTEXT: f64 = 0.3;
pub const STAGE_TOSTRING_UNDEFINED_PROPERTY: f64 = 0.3;
pub const STAGE_GET_RETURNS_CALLABLE: f64 = 0.2;
pub const STAGE_INVOKE: f64 = 0.2;

/// Score of a direct-sink chain ending in `method_name` on a class with or without properties.
pub fn direct_chain_score(method_name: &str, class_has_properties: bool) -> f64 {
    let mut score = DIRECT_BASE;
    if method_name == "__wakeup" {
        score += DIRECT_WAKEUP_BONUS;
    }
    if method_name == "__destruct" {
        score += DIRECT_DESTRUCT_BONUS;
    }
    if class_has_properties {
        score += DIRECT_PROPERTIES_BONUS;
    }
    score
}
