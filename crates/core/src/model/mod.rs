//! Core fact model produced by the parser strategies and consumed by the
//! heuristics, the chain solver and the repository services.
//!
//! The vocabularies (magic methods, sinks, string-context functions) are
//! process-wide constants. Nothing in the crate mutates them, so analyses may
//! share them freely across threads.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Methods the runtime invokes implicitly during deserialization or object lifecycle.
pub const MAGIC_METHODS: &[&str] = &["__wakeup", "__destruct", "__toString", "__call", "__invoke"];

/// Dangerous functions that terminate a chain.
pub const SINKS: &[&str] = &[
    "system",
    "exec",
    "passthru",
    "shell_exec",
    "popen",
    "proc_open",
    "pcntl_exec",
    "eval",
    "assert",
    "include",
    "include_once",
    "require",
    "require_once",
    "file_put_contents",
];

/// Functions that coerce an argument to string and therefore fire `__toString`.
pub const STRING_CONTEXT_FUNCTIONS: &[&str] = &["preg_match", "preg_replace", "printf", "sprintf"];

/// Returns true if `name` is one of the fixed magic-method names (case-sensitive).
pub fn is_magic_method(name: &str) -> bool {
    MAGIC_METHODS.contains(&name)
}

/// Resolve a called function name to its canonical sink spelling, ignoring case.
pub fn canonical_sink(name: &str) -> Option<&'static str> {
    SINKS.iter().copied().find(|sink| sink.eq_ignore_ascii_case(name))
}

pub fn is_sink(name: &str) -> bool {
    canonical_sink(name).is_some()
}

pub fn is_string_context_function(name: &str) -> bool {
    STRING_CONTEXT_FUNCTIONS.iter().any(|f| f.eq_ignore_ascii_case(name))
}

/// One unit of source text, identified by its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub path: String,
    pub text: String,
}

impl SourceUnit {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self { path: path.into(), text: text.into() }
    }
}

/// A call to a sink-vocabulary function at a concrete location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkReference {
    pub name: String,
    pub file: String,
    pub line: usize,
}

/// A method and the facts observed in its body.
///
/// `calls`, `uses` and `invokes` are sets; they serialize as sorted sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDeclaration {
    pub name: String,
    pub file: String,
    /// 1-based source line.
    pub line: usize,
    #[serde(default)]
    pub calls: BTreeSet<String>,
    #[serde(default, rename = "uses_properties")]
    pub uses: BTreeSet<String>,
    #[serde(default, rename = "invokes_properties")]
    pub invokes: BTreeSet<String>,
    #[serde(default)]
    pub sinks: Vec<SinkReference>,
}

impl MethodDeclaration {
    pub fn new(name: impl Into<String>, file: impl Into<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            line,
            calls: BTreeSet::new(),
            uses: BTreeSet::new(),
            invokes: BTreeSet::new(),
            sinks: Vec::new(),
        }
    }

    pub fn is_magic(&self) -> bool {
        is_magic_method(&self.name)
    }

    /// Case-insensitive membership test against the called function names.
    pub fn calls_function(&self, name: &str) -> bool {
        self.calls.iter().any(|call| call.eq_ignore_ascii_case(name))
    }

    pub fn calls_string_context(&self) -> bool {
        self.calls.iter().any(|call| is_string_context_function(call))
    }

    /// Record a called function; sink-vocabulary calls also produce a sink reference at `line`.
    pub fn record_call(&mut self, name: &str, line: usize) {
        match canonical_sink(name) {
            Some(sink) => {
                self.calls.insert(sink.to_string());
                self.sinks.push(SinkReference {
                    name: sink.to_string(),
                    file: self.file.clone(),
                    line,
                });
            }
            None => {
                self.calls.insert(name.to_string());
            }
        }
    }
}

/// A class, its declared instance properties and its methods in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDeclaration {
    pub name: String,
    pub file: String,
    pub methods: Vec<MethodDeclaration>,
    /// Declared property names, unique, in declaration order.
    pub properties: Vec<String>,
}

impl ClassDeclaration {
    pub fn new(name: impl Into<String>, file: impl Into<String>) -> Self {
        Self { name: name.into(), file: file.into(), methods: Vec::new(), properties: Vec::new() }
    }

    pub fn declare_property(&mut self, name: &str) {
        if !self.properties.iter().any(|p| p == name) {
            self.properties.push(name.to_string());
        }
    }

    pub fn declares_property(&self, name: &str) -> bool {
        self.properties.iter().any(|p| p == name)
    }

    /// First method with exactly this name.
    pub fn method(&self, name: &str) -> Option<&MethodDeclaration> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Properties read through `$this` in `method` that the class never declares.
    pub fn undeclared_uses<'a>(&'a self, method: &'a MethodDeclaration) -> Vec<&'a str> {
        method.uses.iter().map(String::as_str).filter(|p| !self.declares_property(p)).collect()
    }

    pub fn magic_methods(&self) -> impl Iterator<Item = &MethodDeclaration> {
        self.methods.iter().filter(|m| m.is_magic())
    }
}

/// A `{name, version}` pair read from a dependency manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposerPackage {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Result of analysing a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub classes: Vec<ClassDeclaration>,
    pub sinks: Vec<SinkReference>,
    pub files_scanned: usize,
    #[serde(default)]
    pub packages: Vec<ComposerPackage>,
}

impl AnalysisSummary {
    pub fn from_classes(classes: Vec<ClassDeclaration>, files_scanned: usize) -> Self {
        let sinks = classes
            .iter()
            .flat_map(|c| c.methods.iter())
            .flat_map(|m| m.sinks.iter().cloned())
            .collect();
        Self { classes, sinks, files_scanned, packages: Vec::new() }
    }
}
