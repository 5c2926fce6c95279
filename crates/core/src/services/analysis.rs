use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::analysis::gadgets::GadgetCandidate;
use crate::analysis::scoring::DIRECT_SINK_GADGET;
use crate::config::ScanConfig;
use crate::model::{
    AnalysisSummary, ClassDeclaration, ComposerPackage, MethodDeclaration, SourceUnit,
};
use crate::services::parsers::SourceParser;

/// Analyse every matching source unit under `root` plus its composer manifests.
///
/// Never fails. A missing root, unreadable directories or files and malformed
/// manifests are logged and contribute nothing.
pub fn analyze_repository(root: &Path, config: &ScanConfig) -> AnalysisSummary {
    if !root.is_dir() {
        warn!(root = %root.display(), "analysis root not found; returning empty summary");
        return AnalysisSummary::from_classes(Vec::new(), 0);
    }

    let units = read_source_units(root, config);
    let parser = SourceParser::for_preference(config.strategy);
    let mut classes: Vec<ClassDeclaration> = Vec::new();
    for unit in &units {
        let outcome = parser.parse(unit);
        classes.extend(outcome.classes);
    }

    let mut summary = AnalysisSummary::from_classes(classes, units.len());
    summary.packages = read_composer_packages(root);
    info!(
        root = %root.display(),
        files = summary.files_scanned,
        classes = summary.classes.len(),
        sinks = summary.sinks.len(),
        packages = summary.packages.len(),
        "repository analysed"
    );
    summary
}

/// Walk `root` in sorted order and read every file matching the config filters.
///
/// Symlinked directories are not followed.
pub fn read_source_units(root: &Path, config: &ScanConfig) -> Vec<SourceUnit> {
    let mut units = Vec::new();
    walk_dir(root, config, &mut units);
    units
}

fn walk_dir(dir: &Path, config: &ScanConfig, units: &mut Vec<SourceUnit>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(path = %dir.display(), error = %err, "skipping unreadable directory");
            return;
        }
    };

    let mut entries: Vec<fs::DirEntry> = entries.filter_map(Result::ok).collect();
    entries.sort_by_key(|entry| entry.path());

    for entry in entries {
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping entry of unknown type");
                continue;
            }
        };
        if file_type.is_dir() {
            walk_dir(&path, config, units);
            continue;
        }
        if file_type.is_symlink() && path.is_dir() {
            debug!(path = %path.display(), "not following symlinked directory");
            continue;
        }
        if !config.matches_extension(&path) || !config.matches_includes(&path) {
            continue;
        }
        match fs::read(&path) {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes).into_owned();
                units.push(SourceUnit::new(path.to_string_lossy(), text));
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable file");
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ComposerManifest {
    #[serde(default)]
    require: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, rename = "require-dev")]
    require_dev: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InstalledManifest {
    Wrapped { packages: Vec<InstalledPackage> },
    Bare(Vec<InstalledPackage>),
}

#[derive(Debug, Deserialize)]
struct InstalledPackage {
    name: Option<String>,
    version: Option<String>,
    pretty_version: Option<String>,
}

/// Declared (`composer.json`) then installed (`vendor/composer/installed.json`) packages.
pub fn read_composer_packages(root: &Path) -> Vec<ComposerPackage> {
    let mut packages = Vec::new();
    packages.extend(read_declared_packages(&root.join("composer.json")));
    let installed = root.join("vendor").join("composer").join("installed.json");
    packages.extend(read_installed_packages(&installed));
    packages
}

fn read_declared_packages(path: &Path) -> Vec<ComposerPackage> {
    let Some(manifest) = read_json::<ComposerManifest>(path) else {
        return Vec::new();
    };
    let mut packages = Vec::new();
    for section in [manifest.require, manifest.require_dev].into_iter().flatten() {
        for (name, version) in section {
            let version = match version {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            packages.push(ComposerPackage { name, version: Some(version) });
        }
    }
    packages
}

fn read_installed_packages(path: &Path) -> Vec<ComposerPackage> {
    let Some(manifest) = read_json::<InstalledManifest>(path) else {
        return Vec::new();
    };
    let list = match manifest {
        InstalledManifest::Wrapped { packages } => packages,
        InstalledManifest::Bare(packages) => packages,
    };
    list.into_iter()
        .filter_map(|p| {
            let name = p.name?;
            Some(ComposerPackage { name, version: p.version.or(p.pretty_version) })
        })
        .collect()
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Option<T> {
    if !path.is_file() {
        return None;
    }
    let body = match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "skipping unreadable manifest");
            return None;
        }
    };
    match serde_json::from_str(&body) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "skipping malformed manifest");
            None
        }
    }
}

/// Every magic method across the summary, in class order.
pub fn list_magic_methods(summary: &AnalysisSummary) -> Vec<MethodDeclaration> {
    summary.classes.iter().flat_map(|c| c.magic_methods().cloned()).collect()
}

/// Methods that call `sink` directly, each with a uniform score.
pub fn find_gadgets_by_sink(summary: &AnalysisSummary, sink: &str) -> Vec<GadgetCandidate> {
    let mut items = Vec::new();
    for class in &summary.classes {
        for method in class.methods.iter().filter(|m| m.calls_function(sink)) {
            items.push(GadgetCandidate {
                name: format!("{}:{}", class.name, method.name),
                class_name: class.name.clone(),
                method: method.name.clone(),
                sink: sink.to_string(),
                file: class.file.clone(),
                line: method.line,
                score: DIRECT_SINK_GADGET,
            });
        }
    }
    debug!(sink, matches = items.len(), "direct sink gadgets");
    items
}
