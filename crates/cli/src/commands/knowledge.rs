use anyhow::{anyhow, Result};
use popchain_core::constraints::{check_constraints, EnvHints};
use popchain_core::knowledge_base::{match_by_packages, search, KbItem};
use serde_json::{Map, Value};

use super::util::{load_summary, print_json, SourceArgs};

pub fn kb_search_command(keyword: &str, version: Option<&str>, json: bool) -> Result<()> {
    let items = search(keyword, version);
    if json {
        return print_json(&items);
    }
    print_items(&format!("Known chains matching '{keyword}'"), &items);
    Ok(())
}

/// Known chains for the frameworks found in the repository's composer manifests.
pub fn kb_match_command(source: &SourceArgs, json: bool) -> Result<()> {
    let summary = load_summary(source)?;
    let items = match_by_packages(&summary);
    if json {
        return print_json(&items);
    }
    print_items("Known chains for installed packages", &items);
    Ok(())
}

/// Check runtime hints. `ini` entries are `key=value` pairs.
pub fn constraints_command(
    php_version: Option<&str>,
    autoload: Option<bool>,
    ini: &[String],
    json: bool,
) -> Result<()> {
    let config = if ini.is_empty() { None } else { Some(parse_ini_pairs(ini)?) };
    let env = EnvHints { php_version: php_version.map(str::to_string), autoload, config };
    let report = check_constraints(&env);

    if json {
        return print_json(&report);
    }
    println!("Constraint issues ({}):", report.issues.len());
    if report.issues.is_empty() {
        println!("  (none)");
    }
    for issue in &report.issues {
        println!("  - {} [{:?}] {}", issue.name, issue.severity, issue.detail);
    }
    Ok(())
}

pub fn parse_ini_pairs(pairs: &[String]) -> Result<Map<String, Value>> {
    let mut map = Map::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("Invalid --ini '{}'. Expected key=value", pair))?;
        map.insert(key.trim().to_string(), Value::String(value.trim().to_string()));
    }
    Ok(map)
}

fn print_items(title: &str, items: &[KbItem]) {
    println!("{title} ({}):", items.len());
    if items.is_empty() {
        println!("  (none)");
    }
    for item in items {
        let version = item.version.as_deref().unwrap_or("any");
        println!("  - {} / {} [{}] -> {}", item.framework, item.name, version, item.sink);
    }
}
