//! Environment checks that decide whether a chain can fire at all on the target.

use serde::{Deserialize, Serialize};

/// What is known about the target runtime.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnvHints {
    #[serde(default)]
    pub php_version: Option<String>,
    #[serde(default)]
    pub autoload: Option<bool>,
    /// Raw `php.ini` style settings (e.g. `allow_url_include`).
    #[serde(default)]
    pub config: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintIssue {
    pub name: String,
    pub severity: Severity,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConstraintReport {
    pub issues: Vec<ConstraintIssue>,
}

pub fn check_constraints(env: &EnvHints) -> ConstraintReport {
    let mut issues = Vec::new();
    if env.php_version.as_deref().is_some_and(|v| v.starts_with("5.")) {
        issues.push(issue("old_php", Severity::Medium, "legacy"));
    }
    if env.autoload == Some(false) {
        issues.push(issue("autoload_disabled", Severity::High, "classes_may_not_load"));
    }
    let url_include = env
        .config
        .as_ref()
        .and_then(|c| c.get("allow_url_include"))
        .is_some_and(is_enabled);
    if url_include {
        issues.push(issue("allow_url_include_enabled", Severity::Info, "remote_include_possible"));
    }
    ConstraintReport { issues }
}

fn issue(name: &str, severity: Severity, detail: &str) -> ConstraintIssue {
    ConstraintIssue { name: name.to_string(), severity, detail: detail.to_string() }
}

/// ini flags arrive as booleans, numbers or strings such as `"On"`.
fn is_enabled(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        serde_json::Value::String(s) => {
            matches!(s.to_ascii_lowercase().as_str(), "1" | "on" | "true" | "yes")
        }
        _ => false,
    }
}
