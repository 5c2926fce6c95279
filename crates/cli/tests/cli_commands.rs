use std::fs;
use std::path::Path;

use predicates::prelude::*;
use serde_json::Value;
use tempfile::tempdir;

const LOGGER: &str = r#"<?php
class Logger {
    public $cmd;
    public function __wakeup() {
        system($this->cmd);
    }
}
"#;

const TRAMPOLINE: &str = r#"<?php
class Relay {
    public $pattern;
    public function __wakeup() { preg_match($this->pattern, "x"); }
    public function __toString() { return $this->missing; }
    public function __get($name) { return ($this->handler)(); }
    public function __invoke() { return 1; }
}
"#;

fn write_fixture(root: &Path) {
    fs::create_dir_all(root.join("app")).expect("create app dir");
    fs::write(root.join("app").join("Logger.php"), LOGGER).expect("write Logger.php");
    fs::write(root.join("app").join("Relay.php"), TRAMPOLINE).expect("write Relay.php");
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

/// Analyze with --json should report the scanned files and the system sink.
#[test]
fn analyze_json_reports_sinks() {
    let tmp = tempdir().expect("tempdir");
    write_fixture(tmp.path());

    let output = assert_cmd::cargo::cargo_bin_cmd!("popchain")
        .arg("analyze")
        .arg("--root")
        .arg(tmp.path())
        .arg("--json")
        .output()
        .expect("run analyze");
    assert!(output.status.success());

    let summary = stdout_json(&output);
    assert_eq!(summary["files_scanned"], 2);
    assert_eq!(summary["sinks"][0]["name"], "system");
    assert_eq!(summary["sinks"][0]["line"], 5);
}

#[test]
fn analyze_human_output_lists_counts() {
    let tmp = tempdir().expect("tempdir");
    write_fixture(tmp.path());

    assert_cmd::cargo::cargo_bin_cmd!("popchain")
        .arg("analyze")
        .arg("--root")
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Files scanned: 2"))
        .stdout(predicate::str::contains("Classes: 2"));
}

#[test]
fn chain_ranks_wakeup_with_properties() {
    let tmp = tempdir().expect("tempdir");
    write_fixture(tmp.path());

    let output = assert_cmd::cargo::cargo_bin_cmd!("popchain")
        .arg("chain")
        .arg("--root")
        .arg(tmp.path())
        .arg("--sink")
        .arg("system")
        .arg("--json")
        .output()
        .expect("run chain");
    assert!(output.status.success());

    let chains = stdout_json(&output);
    assert_eq!(chains.as_array().map(Vec::len), Some(1));
    assert_eq!(chains[0]["id"], "Logger:__wakeup:system");
    assert_eq!(chains[0]["score"], 1.6);
}

#[test]
fn trampoline_chains_cover_all_four_stages() {
    let tmp = tempdir().expect("tempdir");
    write_fixture(tmp.path());

    let output = assert_cmd::cargo::cargo_bin_cmd!("popchain")
        .arg("trampoline-chains")
        .arg("--root")
        .arg(tmp.path())
        .arg("--strategy")
        .arg("pattern")
        .arg("--json")
        .output()
        .expect("run trampoline-chains");
    assert!(output.status.success());

    let chains = stdout_json(&output);
    assert_eq!(chains[0]["id"], "Relay:trampoline");
    let methods: Vec<&str> = chains[0]["steps"]
        .as_array()
        .expect("steps")
        .iter()
        .filter_map(|s| s["method"].as_str())
        .collect();
    assert_eq!(methods, vec!["__wakeup", "__toString", "__get", "__invoke"]);
}

/// A summary saved by `analyze --output` can feed later commands without a rescan.
#[test]
fn saved_summary_feeds_gadgets() {
    let tmp = tempdir().expect("tempdir");
    write_fixture(tmp.path());
    let summary_path = tmp.path().join("summary.json");

    assert_cmd::cargo::cargo_bin_cmd!("popchain")
        .arg("analyze")
        .arg("--root")
        .arg(tmp.path())
        .arg("--output")
        .arg(&summary_path)
        .assert()
        .success();
    assert!(summary_path.is_file());

    assert_cmd::cargo::cargo_bin_cmd!("popchain")
        .arg("gadgets")
        .arg("--summary")
        .arg(&summary_path)
        .arg("--sink")
        .arg("system")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logger:__wakeup"));
}

#[test]
fn magic_methods_lists_wakeup() {
    let tmp = tempdir().expect("tempdir");
    write_fixture(tmp.path());

    assert_cmd::cargo::cargo_bin_cmd!("popchain")
        .arg("magic-methods")
        .arg("--root")
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("__wakeup"))
        .stdout(predicate::str::contains("__invoke"));
}

#[test]
fn encode_prints_serialized_object() {
    assert_cmd::cargo::cargo_bin_cmd!("popchain")
        .arg("encode")
        .arg("--class")
        .arg("A")
        .arg("--props")
        .arg(r#"{"x":"id"}"#)
        .assert()
        .success()
        .stdout(predicate::eq("O:1:\"A\":1:{s:1:\"x\";s:2:\"id\";}}\n"));
}

#[test]
fn encode_rejects_malformed_props() {
    assert_cmd::cargo::cargo_bin_cmd!("popchain")
        .arg("encode")
        .arg("--class")
        .arg("A")
        .arg("--props")
        .arg("{not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse --props as JSON"));
}

#[test]
fn payload_script_writes_file() {
    let tmp = tempdir().expect("tempdir");
    let script_path = tmp.path().join("payload.php");

    assert_cmd::cargo::cargo_bin_cmd!("popchain")
        .arg("payload-script")
        .arg("--class")
        .arg("Logger")
        .arg("--props")
        .arg(r#"{"cmd":"id"}"#)
        .arg("--output")
        .arg(&script_path)
        .assert()
        .success();

    let script = fs::read_to_string(&script_path).expect("read script");
    assert!(script.starts_with("<?php\n"));
    assert!(script.contains(r#"O:6:"Logger":1:{s:3:"cmd";s:2:"id";}}"#));
    assert!(script.contains("base64_encode($payload)"));
}

#[test]
fn simulate_reports_fixed_lifecycle() {
    assert_cmd::cargo::cargo_bin_cmd!("popchain")
        .arg("simulate")
        .arg("--class")
        .arg("Logger")
        .assert()
        .success()
        .stdout(predicate::str::contains("3. __destruct (Logger)"))
        .stdout(predicate::str::contains("Reached sink: no"));
}

#[test]
fn kb_match_reads_composer_manifest() {
    let tmp = tempdir().expect("tempdir");
    fs::write(
        tmp.path().join("composer.json"),
        r#"{"require": {"laravel/framework": "^8.0"}}"#,
    )
    .expect("write composer.json");

    assert_cmd::cargo::cargo_bin_cmd!("popchain")
        .arg("kb-match")
        .arg("--root")
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Laravel / MonologHandler"));
}

#[test]
fn kb_search_finds_symfony_entry() {
    assert_cmd::cargo::cargo_bin_cmd!("popchain")
        .arg("kb-search")
        .arg("symfony")
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("YamlParse"));
}

#[test]
fn constraints_flags_legacy_runtime() {
    let output = assert_cmd::cargo::cargo_bin_cmd!("popchain")
        .arg("constraints")
        .arg("--php-version")
        .arg("5.6")
        .arg("--autoload")
        .arg("false")
        .arg("--ini")
        .arg("allow_url_include=On")
        .arg("--json")
        .output()
        .expect("run constraints");
    assert!(output.status.success());

    let report = stdout_json(&output);
    let names: Vec<&str> = report["issues"]
        .as_array()
        .expect("issues")
        .iter()
        .filter_map(|i| i["name"].as_str())
        .collect();
    assert_eq!(names, vec!["old_php", "autoload_disabled", "allow_url_include_enabled"]);
}

#[test]
fn missing_root_fails_with_context() {
    let tmp = tempdir().expect("tempdir");

    assert_cmd::cargo::cargo_bin_cmd!("popchain")
        .arg("analyze")
        .arg("--root")
        .arg(tmp.path().join("nope"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Analysis root not found"));
}

#[test]
fn invalid_strategy_is_rejected() {
    let tmp = tempdir().expect("tempdir");
    write_fixture(tmp.path());

    assert_cmd::cargo::cargo_bin_cmd!("popchain")
        .arg("trampolines")
        .arg("--root")
        .arg(tmp.path())
        .arg("--strategy")
        .arg("fast")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid strategy 'fast'"));
}

/// Without --string-lengths, encode follows the config in the working directory.
#[test]
fn encode_uses_byte_lengths_from_config() {
    let tmp = tempdir().expect("tempdir");
    fs::write(tmp.path().join("popchain.yaml"), "string_lengths: bytes\n").expect("write config");

    assert_cmd::cargo::cargo_bin_cmd!("popchain")
        .current_dir(tmp.path())
        .arg("encode")
        .arg("--class")
        .arg("A")
        .arg("--props")
        .arg(r#"{"v":"é"}"#)
        .assert()
        .success()
        .stdout(predicate::eq("O:1:\"A\":1:{s:1:\"v\";s:2:\"é\";}}\n"));
}

/// Classes parsed from a file carry that file's path.
#[test]
fn parse_reports_the_real_file_path() {
    let tmp = tempdir().expect("tempdir");
    write_fixture(tmp.path());
    let file = tmp.path().join("app").join("Logger.php");

    let output = assert_cmd::cargo::cargo_bin_cmd!("popchain")
        .arg("parse")
        .arg("--file")
        .arg(&file)
        .arg("--strategy")
        .arg("pattern")
        .arg("--json")
        .output()
        .expect("run parse");
    assert!(output.status.success());

    let classes = stdout_json(&output);
    assert_eq!(classes[0]["name"], "Logger");
    assert_eq!(classes[0]["file"], file.to_string_lossy().as_ref());
}

#[test]
fn simulate_rejects_non_object_props() {
    assert_cmd::cargo::cargo_bin_cmd!("popchain")
        .arg("simulate")
        .arg("--class")
        .arg("Logger")
        .arg("--props")
        .arg("[1]")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--props must be a JSON object"));
}
