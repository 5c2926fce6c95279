use popchain_core::constraints::{check_constraints, EnvHints, Severity};
use serde_json::json;

#[test]
fn legacy_runtime_without_autoload_reports_both_issues_in_order() {
    let env = EnvHints { php_version: Some("5.6".into()), autoload: Some(false), config: None };
    let report = check_constraints(&env);

    let names: Vec<_> = report.issues.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["old_php", "autoload_disabled"]);
    assert_eq!(report.issues[0].severity, Severity::Medium);
    assert_eq!(report.issues[0].detail, "legacy");
    assert_eq!(report.issues[1].severity, Severity::High);
    assert_eq!(report.issues[1].detail, "classes_may_not_load");
}

#[test]
fn modern_runtime_has_no_issues() {
    let env = EnvHints { php_version: Some("8.2".into()), autoload: Some(true), config: None };
    assert!(check_constraints(&env).issues.is_empty());
    assert!(check_constraints(&EnvHints::default()).issues.is_empty());
}

#[test]
fn url_include_flag_accepts_ini_spellings() {
    for value in [json!(true), json!(1), json!("On"), json!("yes")] {
        let config = json!({ "allow_url_include": value });
        let env = EnvHints { config: config.as_object().cloned(), ..Default::default() };
        let report = check_constraints(&env);
        assert_eq!(report.issues.len(), 1, "value {value}");
        assert_eq!(report.issues[0].name, "allow_url_include_enabled");
        assert_eq!(report.issues[0].severity, Severity::Info);
    }

    let off = json!({ "allow_url_include": "Off" });
    let env = EnvHints { config: off.as_object().cloned(), ..Default::default() };
    assert!(check_constraints(&env).issues.is_empty());
}
