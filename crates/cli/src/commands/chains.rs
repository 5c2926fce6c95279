use anyhow::Result;
use popchain_core::analysis::chains::{
    build_direct_chains, build_trampoline_chains, ChainCandidate, SinkSpec, SourceSpec,
};

use super::util::{load_summary, print_json, SourceArgs};

/// Single-step chains from any method that calls `sink`.
pub fn chain_command(source: &SourceArgs, sink: &str, json: bool) -> Result<()> {
    let summary = load_summary(source)?;
    let chains =
        build_direct_chains(&summary.classes, &SourceSpec::unserialize(), &SinkSpec::new(sink));

    if json {
        return print_json(&chains);
    }
    print_chains(&format!("Chains to {sink}"), &chains);
    Ok(())
}

pub fn trampoline_chains_command(source: &SourceArgs, json: bool) -> Result<()> {
    let summary = load_summary(source)?;
    let chains = build_trampoline_chains(&summary.classes);

    if json {
        return print_json(&chains);
    }
    print_chains("Trampoline chains", &chains);
    Ok(())
}

fn print_chains(title: &str, chains: &[ChainCandidate]) {
    println!("{title} ({}):", chains.len());
    if chains.is_empty() {
        println!("  (none)");
        return;
    }
    for chain in chains {
        println!("  - {} [score {:.2}] -> {}", chain.id, chain.score, chain.sink);
        for step in &chain.steps {
            match &step.note {
                Some(note) => println!("      {}::{} ({})", step.class_name, step.method, note),
                None => println!("      {}::{}", step.class_name, step.method),
            }
        }
    }
}
