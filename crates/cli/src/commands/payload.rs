use std::fs;

use anyhow::{Context, Result};
use popchain_core::payload::{generate_payload, payload_script, PayloadSpec};
use popchain_core::simulator::simulate_unserialize;
use serde_json::json;

use super::util::{parse_json_object, payload_inputs, print_json};

/// Print the serialized object for `class_name` with the given JSON properties.
pub fn encode_command(
    class_name: &str,
    props: &str,
    string_lengths: Option<&str>,
    json: bool,
) -> Result<()> {
    let (spec, encoder) = payload_inputs(class_name, props, string_lengths)?;
    let result = generate_payload(&spec, encoder);

    if json {
        return print_json(&result);
    }
    println!("{}", result.serialized);
    Ok(())
}

/// Emit a PHP script that prints the payload; written to `output` when given.
pub fn payload_script_command(
    class_name: &str,
    props: &str,
    string_lengths: Option<&str>,
    output: Option<&str>,
    json: bool,
) -> Result<()> {
    let (spec, encoder) = payload_inputs(class_name, props, string_lengths)?;
    let script = payload_script(&spec, encoder);

    if let Some(path) = output {
        fs::write(path, &script).with_context(|| format!("Failed to write script to {path}"))?;
        if json {
            return print_json(&json!({ "path": path }));
        }
        println!("Payload script written to {path}");
        return Ok(());
    }

    if json {
        return print_json(&json!({ "script": script }));
    }
    print!("{script}");
    Ok(())
}

pub fn simulate_command(class_name: &str, props: &str, json: bool) -> Result<()> {
    let properties = parse_json_object(props, "--props")?;
    let spec = PayloadSpec { class_name: class_name.to_string(), properties };
    let report = simulate_unserialize(&spec);

    if json {
        return print_json(&report);
    }
    println!("Lifecycle of {}:", spec.class_name);
    for (index, event) in report.events.iter().enumerate() {
        println!("  {}. {} ({})", index + 1, event.step, event.detail);
    }
    println!("Reached sink: {}", if report.reached_sink { "yes" } else { "no" });
    Ok(())
}
