//! Static table of previously published gadget chains, keyed by framework.

use serde::{Deserialize, Serialize};

use crate::model::AnalysisSummary;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KbItem {
    pub framework: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub name: String,
    pub sink: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

struct KbEntry {
    framework: &'static str,
    version: Option<&'static str>,
    name: &'static str,
    sink: &'static str,
    note: Option<&'static str>,
}

impl KbEntry {
    fn to_item(&self) -> KbItem {
        KbItem {
            framework: self.framework.to_string(),
            version: self.version.map(str::to_string),
            name: self.name.to_string(),
            sink: self.sink.to_string(),
            note: self.note.map(str::to_string),
        }
    }
}

const KNOWLEDGE_BASE: &[KbEntry] = &[
    KbEntry {
        framework: "Laravel",
        version: None,
        name: "MonologHandler",
        sink: "system",
        note: None,
    },
    KbEntry { framework: "Symfony", version: None, name: "YamlParse", sink: "eval", note: None },
    KbEntry {
        framework: "ThinkPHP",
        version: None,
        name: "LogGadget",
        sink: "file_put_contents",
        note: None,
    },
];

/// Composer package name → framework label used in the table.
const PACKAGE_FRAMEWORKS: &[(&str, &str)] = &[
    ("laravel/framework", "Laravel"),
    ("symfony/yaml", "Symfony"),
    ("topthink/framework", "ThinkPHP"),
];

pub fn framework_for_package(package: &str) -> Option<&'static str> {
    PACKAGE_FRAMEWORKS.iter().find(|(name, _)| *name == package).map(|(_, fw)| *fw)
}

/// Entries whose framework or gadget name contains `keyword` (case-insensitive).
/// With `version`, only entries pinned to exactly that version are kept.
pub fn search(keyword: &str, version: Option<&str>) -> Vec<KbItem> {
    let needle = keyword.to_lowercase();
    KNOWLEDGE_BASE
        .iter()
        .filter(|e| {
            e.framework.to_lowercase().contains(&needle) || e.name.to_lowercase().contains(&needle)
        })
        .filter(|e| version.is_none() || e.version == version)
        .map(KbEntry::to_item)
        .collect()
}

/// Entries for frameworks implied by the summary's packages, each reported once.
pub fn match_by_packages(summary: &AnalysisSummary) -> Vec<KbItem> {
    let mut items: Vec<KbItem> = Vec::new();
    for package in &summary.packages {
        let Some(framework) = framework_for_package(&package.name) else {
            continue;
        };
        for entry in KNOWLEDGE_BASE.iter().filter(|e| e.framework == framework) {
            let version_ok = entry.version.is_none() || package.version.as_deref() == entry.version;
            if !version_ok {
                continue;
            }
            let item = entry.to_item();
            let seen = items.iter().any(|i| {
                i.framework == item.framework && i.name == item.name && i.version == item.version
            });
            if !seen {
                items.push(item);
            }
        }
    }
    items
}
