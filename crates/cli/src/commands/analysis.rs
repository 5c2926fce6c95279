use std::fs;

use anyhow::{Context, Result};
use popchain_core::analysis::gadgets::{detect_trampolines, GadgetCandidate};
use popchain_core::model::{canonical_sink, ClassDeclaration, SourceUnit};
use popchain_core::services::analysis::{find_gadgets_by_sink, list_magic_methods};
use popchain_core::services::parsers::SourceParser;

use super::util::{load_summary, parse_strategy, print_json, SourceArgs};

/// Analyse a repository (or re-read a saved summary) and report what was found.
pub fn analyze_command(source: &SourceArgs, output: Option<&str>, json: bool) -> Result<()> {
    let summary = load_summary(source)?;

    if let Some(path) = output {
        let serialized =
            serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write summary to {path}"))?;
    }

    if json {
        return print_json(&summary);
    }

    println!("Analysis summary");
    println!("================");
    println!("Files scanned: {}", summary.files_scanned);
    println!("Classes: {}", summary.classes.len());
    println!("Sink references: {}", summary.sinks.len());
    println!("Packages: {}", summary.packages.len());
    if !summary.sinks.is_empty() {
        println!();
        println!("Sinks:");
        for sink in &summary.sinks {
            println!("  - {} at {}:{}", sink.name, sink.file, sink.line);
        }
    }
    if let Some(path) = output {
        println!();
        println!("Summary written to {path}");
    }
    Ok(())
}

/// Parse one file and print the classes it declares.
pub fn parse_command(file: &str, strategy: &str, json: bool) -> Result<()> {
    let code = fs::read_to_string(file).with_context(|| format!("Failed to read {file}"))?;
    let parser = SourceParser::for_preference(parse_strategy(strategy)?);
    let classes = parser.parse(&SourceUnit::new(file, code)).classes;

    if json {
        return print_json(&classes);
    }
    print_classes(&classes);
    Ok(())
}

pub fn magic_methods_command(source: &SourceArgs, json: bool) -> Result<()> {
    let summary = load_summary(source)?;
    let methods = list_magic_methods(&summary);

    if json {
        return print_json(&methods);
    }

    println!("Magic methods ({}):", methods.len());
    if methods.is_empty() {
        println!("  (none)");
    }
    for method in methods {
        println!("  - {} ({}:{})", method.name, method.file, method.line);
    }
    Ok(())
}

/// Methods calling `sink` directly.
pub fn gadgets_command(source: &SourceArgs, sink: &str, json: bool) -> Result<()> {
    if canonical_sink(sink).is_none() {
        tracing::warn!(sink, "not a known sink; matching on call name only");
    }
    let summary = load_summary(source)?;
    let gadgets = find_gadgets_by_sink(&summary, sink);

    if json {
        return print_json(&gadgets);
    }
    print_gadgets(&format!("Gadgets calling {sink}"), &gadgets);
    Ok(())
}

pub fn trampolines_command(source: &SourceArgs, json: bool) -> Result<()> {
    let summary = load_summary(source)?;
    let gadgets = detect_trampolines(&summary.classes);

    if json {
        return print_json(&gadgets);
    }
    print_gadgets("Trampoline gadgets", &gadgets);
    Ok(())
}

fn print_classes(classes: &[ClassDeclaration]) {
    println!("Classes ({}):", classes.len());
    if classes.is_empty() {
        println!("  (none)");
    }
    for class in classes {
        println!("  - {}", class.name);
        if !class.properties.is_empty() {
            println!("    properties: {}", class.properties.join(", "));
        }
        for method in &class.methods {
            let calls: Vec<&str> = method.calls.iter().map(String::as_str).collect();
            if calls.is_empty() {
                println!("    {} (line {})", method.name, method.line);
            } else {
                println!("    {} (line {}) calls {}", method.name, method.line, calls.join(", "));
            }
        }
    }
}

fn print_gadgets(title: &str, gadgets: &[GadgetCandidate]) {
    println!("{title} ({}):", gadgets.len());
    if gadgets.is_empty() {
        println!("  (none)");
    }
    for gadget in gadgets {
        println!(
            "  - {} -> {} [score {:.2}] {}:{}",
            gadget.name, gadget.sink, gadget.score, gadget.file, gadget.line
        );
    }
}
