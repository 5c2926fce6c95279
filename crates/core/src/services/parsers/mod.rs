//! Source parser strategies.
//!
//! Two interchangeable strategies turn a `SourceUnit` into class facts:
//! - `structural`: a tree-sitter walk over the concrete syntax tree (feature `tree-sitter-backend`)
//! - `pattern`: a regex scan with brace-span tracking, always available
//!
//! `SourceParser` tries them in order and keeps the first non-empty result.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::model::{ClassDeclaration, SourceUnit};

pub mod pattern;
#[cfg(feature = "tree-sitter-backend")]
pub mod structural;

pub use pattern::PatternStrategy;
#[cfg(feature = "tree-sitter-backend")]
pub use structural::StructuralStrategy;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Parser backend unavailable: {0}")]
    Unavailable(String),
    #[error("Failed to parse {path}: {reason}")]
    Failed { path: String, reason: String },
}

/// Trait implemented by parser strategies.
pub trait ParseStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn parse(&self, unit: &SourceUnit) -> Result<Vec<ClassDeclaration>, ParseError>;
}

/// Which strategies a `SourceParser` is allowed to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyPreference {
    /// Structural first, pattern fallback.
    #[default]
    Auto,
    Structural,
    Pattern,
}

impl StrategyPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyPreference::Auto => "auto",
            StrategyPreference::Structural => "structural",
            StrategyPreference::Pattern => "pattern",
        }
    }

    pub fn parse_str(value: &str) -> Option<Self> {
        match value {
            "auto" => Some(StrategyPreference::Auto),
            "structural" => Some(StrategyPreference::Structural),
            "pattern" => Some(StrategyPreference::Pattern),
            _ => None,
        }
    }
}

/// Classes extracted from one unit and the strategy that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome {
    pub classes: Vec<ClassDeclaration>,
    /// `None` when every strategy came back empty.
    pub strategy: Option<&'static str>,
}

/// Ordered strategy chain.
pub struct SourceParser {
    strategies: Vec<Box<dyn ParseStrategy>>,
}

impl SourceParser {
    pub fn new() -> Self {
        Self { strategies: Vec::new() }
    }

    pub fn with_strategy<S: ParseStrategy + 'static>(mut self, strategy: S) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Parser honouring `preference`, built from the strategies compiled into this crate.
    pub fn for_preference(preference: StrategyPreference) -> Self {
        let parser = SourceParser::new();
        match preference {
            StrategyPreference::Auto => {
                with_structural(parser).with_strategy(PatternStrategy::new())
            }
            StrategyPreference::Structural => with_structural(parser),
            StrategyPreference::Pattern => parser.with_strategy(PatternStrategy::new()),
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Never fails: a strategy error degrades to an empty result and the next strategy runs.
    pub fn parse(&self, unit: &SourceUnit) -> ParseOutcome {
        for strategy in &self.strategies {
            match strategy.parse(unit) {
                Ok(classes) if !classes.is_empty() => {
                    debug!(
                        path = %unit.path,
                        strategy = strategy.name(),
                        classes = classes.len(),
                        "parsed unit"
                    );
                    return ParseOutcome { classes, strategy: Some(strategy.name()) };
                }
                Ok(_) => {
                    debug!(path = %unit.path, strategy = strategy.name(), "no classes found");
                }
                Err(err) => {
                    debug!(
                        path = %unit.path,
                        strategy = strategy.name(),
                        error = %err,
                        "strategy failed"
                    );
                }
            }
        }
        ParseOutcome { classes: Vec::new(), strategy: None }
    }
}

impl Default for SourceParser {
    fn default() -> Self {
        Self::for_preference(StrategyPreference::Auto)
    }
}

#[cfg(feature = "tree-sitter-backend")]
fn with_structural(parser: SourceParser) -> SourceParser {
    parser.with_strategy(StructuralStrategy)
}

#[cfg(not(feature = "tree-sitter-backend"))]
fn with_structural(parser: SourceParser) -> SourceParser {
    parser
}

/// Parse an in-memory snippet as if it were a file named `snippet.php`.
pub fn parse_code_structure(code: &str, preference: StrategyPreference) -> Vec<ClassDeclaration> {
    let unit = SourceUnit::new("snippet.php", code);
    SourceParser::for_preference(preference).parse(&unit).classes
}

/// 1-based line of a byte offset.
pub(crate) fn line_at(text: &str, offset: usize) -> usize {
    text.as_bytes()[..offset.min(text.len())].iter().filter(|b| **b == b'\n').count() + 1
}
