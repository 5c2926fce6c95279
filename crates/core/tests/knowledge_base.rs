use popchain_core::knowledge_base::{framework_for_package, match_by_packages, search};
use popchain_core::model::{AnalysisSummary, ComposerPackage};

fn summary_with(packages: &[(&str, Option<&str>)]) -> AnalysisSummary {
    let mut summary = AnalysisSummary::from_classes(Vec::new(), 0);
    summary.packages = packages
        .iter()
        .map(|(name, version)| ComposerPackage {
            name: name.to_string(),
            version: version.map(str::to_string),
        })
        .collect();
    summary
}

#[test]
fn installed_framework_matches_known_chain() {
    let summary =
        summary_with(&[("laravel/framework", Some("v8.83.0")), ("psr/log", Some("1.1.4"))]);
    let items = match_by_packages(&summary);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].framework, "Laravel");
    assert_eq!(items[0].name, "MonologHandler");
    assert_eq!(items[0].sink, "system");
}

#[test]
fn declared_and_installed_entries_are_reported_once() {
    let summary = summary_with(&[
        ("laravel/framework", Some("^8.0")),
        ("laravel/framework", Some("v8.83.0")),
        ("symfony/yaml", None),
    ]);
    let names: Vec<_> = match_by_packages(&summary).into_iter().map(|i| i.name).collect();
    assert_eq!(names, vec!["MonologHandler", "YamlParse"]);
}

#[test]
fn unknown_packages_match_nothing() {
    assert!(match_by_packages(&summary_with(&[("acme/tool", None)])).is_empty());
    assert_eq!(framework_for_package("topthink/framework"), Some("ThinkPHP"));
    assert_eq!(framework_for_package("Laravel/Framework"), None);
}

#[test]
fn search_by_sink_free_keyword() {
    let items = search("think", None);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].sink, "file_put_contents");
}
