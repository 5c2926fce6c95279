use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use popchain_core::config::ScanConfig;
use popchain_core::model::AnalysisSummary;
use popchain_core::payload::{Encoder, PayloadSpec, StringLengths};
use popchain_core::services::analysis::analyze_repository;
use popchain_core::services::parsers::StrategyPreference;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::canonicalize_or_current;

/// Where a summary comes from: a live scan of `--root` or a saved `analyze --json` file.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Repository root to analyse.
    #[arg(long, conflicts_with = "summary")]
    pub root: Option<String>,

    /// Previously saved analysis summary (output of `analyze --json`).
    #[arg(long)]
    pub summary: Option<String>,

    /// Explicit scan config file. Defaults to popchain.{yaml,yml,json} in the root.
    #[arg(long)]
    pub config: Option<String>,

    /// Parser strategy: auto, structural or pattern.
    #[arg(long)]
    pub strategy: Option<String>,

    /// Only scan paths containing this substring (repeatable).
    #[arg(long = "include")]
    pub includes: Vec<String>,
}

/// Resolve the scan config for `root`, applying CLI overrides on top of the file.
pub fn load_scan_config(root: &Path, args: &SourceArgs) -> Result<ScanConfig> {
    let mut config = match &args.config {
        Some(path) => ScanConfig::load(Path::new(path))?,
        None => ScanConfig::discover(root)?,
    };
    if let Some(strategy) = &args.strategy {
        config.strategy = parse_strategy(strategy)?;
    }
    if !args.includes.is_empty() {
        config.includes = args.includes.clone();
    }
    Ok(config)
}

/// Load a summary from `--summary`, or analyse `--root` (default: current directory).
pub fn load_summary(args: &SourceArgs) -> Result<AnalysisSummary> {
    if let Some(path) = &args.summary {
        let body = fs::read_to_string(path)
            .with_context(|| format!("Failed to read summary file {path}"))?;
        return serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse summary file {path}"));
    }
    let root = canonicalize_or_current(args.root.as_deref().unwrap_or("."))?;
    if !root.is_dir() {
        return Err(anyhow!("Analysis root not found at {}", root.display()));
    }
    let config = load_scan_config(&root, args)?;
    Ok(analyze_repository(&root, &config))
}

pub fn parse_strategy(value: &str) -> Result<StrategyPreference> {
    StrategyPreference::parse_str(value).ok_or_else(|| {
        anyhow!("Invalid strategy '{}'. Allowed: auto, structural, pattern", value)
    })
}

pub fn parse_string_lengths(value: &str) -> Result<StringLengths> {
    match value {
        "chars" => Ok(StringLengths::Chars),
        "bytes" => Ok(StringLengths::Bytes),
        other => Err(anyhow!("Invalid string length mode '{}'. Allowed: chars, bytes", other)),
    }
}

/// Parse a JSON object given on the command line.
pub fn parse_json_object(text: &str, what: &str) -> Result<Map<String, Value>> {
    let value: Value =
        serde_json::from_str(text).with_context(|| format!("Failed to parse {what} as JSON"))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(anyhow!("{what} must be a JSON object")),
    }
}

/// Build a payload spec and encoder from the shared payload flags.
///
/// Without `--string-lengths`, the mode comes from a config in the current directory.
pub fn payload_inputs(
    class_name: &str,
    props: &str,
    string_lengths: Option<&str>,
) -> Result<(PayloadSpec, Encoder)> {
    let properties = parse_json_object(props, "--props")?;
    let string_lengths = match string_lengths {
        Some(mode) => parse_string_lengths(mode)?,
        None => ScanConfig::discover(&canonicalize_or_current(".")?)?.string_lengths,
    };
    let encoder = Encoder::new(string_lengths);
    Ok((PayloadSpec { class_name: class_name.to_string(), properties }, encoder))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let serialized = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
    println!("{}", serialized);
    Ok(())
}
