use assert_cmd::Command;
use serde_json::Value;
use std::fs;

const CHAIN: &str = r#"{
  "vertices": [
    {"id": "a", "width": 40, "height": 20},
    {"id": "b", "width": 40, "height": 20},
    {"id": "c", "width": 40, "height": 20}
  ],
  "edges": [
    {"id": "ab", "source": "a", "target": "b"},
    {"id": "bc", "source": "b", "target": "c"},
    {"id": "ac", "source": "a", "target": "c"}
  ]
}"#;

fn cli() -> Command {
    Command::new(assert_cmd::cargo_bin!("strata-cli"))
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn cli_lays_out_a_diagram_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = tmp.path().join("chain.json");
    fs::write(&input, CHAIN).expect("write input");

    let assert = cli()
        .args(["layout", input.to_string_lossy().as_ref()])
        .assert()
        .success();
    let json = stdout_json(assert.get_output());

    assert_eq!(json["vertices"]["a"]["y"], 0.0);
    assert_eq!(json["vertices"]["b"]["y"], 120.0);
    assert_eq!(json["vertices"]["c"]["y"], 240.0);
    assert_eq!(json["vertices"]["a"]["width"], 40.0);
    assert_eq!(json["edges"]["ac"].as_array().unwrap().len(), 4);
    assert_eq!(json["report"]["hierarchies"][0]["layers"]["c"], 2);
}

#[test]
fn cli_reads_stdin_and_applies_the_orientation_flag() {
    let assert = cli()
        .args(["--orientation", "w", "-"])
        .write_stdin(CHAIN)
        .assert()
        .success();
    let json = stdout_json(assert.get_output());

    assert_eq!(json["vertices"]["a"]["x"], 0.0);
    assert_eq!(json["vertices"]["b"]["x"], 140.0);
}

#[test]
fn cli_logs_to_stderr_at_the_requested_level() {
    let assert = cli()
        .env("STRATA_LOG", "debug")
        .arg("-")
        .write_stdin(CHAIN)
        .assert()
        .success();
    let output = assert.get_output();
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(stderr.contains("diagram loaded"), "{stderr}");
    assert!(!stderr.contains("logging disabled"), "{stderr}");
    stdout_json(output);
}

#[test]
fn cli_takes_the_config_from_a_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = tmp.path().join("config.json");
    fs::write(&config, r#"{"interRankCellSpacing": 50, "edgeStyle": "straight"}"#)
        .expect("write config");

    let assert = cli()
        .args(["--config", config.to_string_lossy().as_ref()])
        .write_stdin(CHAIN)
        .assert()
        .success();
    let json = stdout_json(assert.get_output());

    assert_eq!(json["vertices"]["b"]["y"], 70.0);
    assert!(json["edges"]["ab"].as_array().unwrap().is_empty());
}

#[test]
fn cli_writes_to_the_out_path() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = tmp.path().join("layout.json");

    let assert = cli()
        .args(["--pretty", "--out", out.to_string_lossy().as_ref()])
        .write_stdin(CHAIN)
        .assert()
        .success();
    assert!(assert.get_output().stdout.is_empty());

    let text = fs::read_to_string(&out).expect("read output");
    assert!(text.contains('\n'), "pretty output spans lines");
    let json: Value = serde_json::from_str(&text).expect("output is JSON");
    assert_eq!(json["vertices"]["c"]["y"], 240.0);
}

#[test]
fn cli_reports_vertices_without_bounds() {
    let input = r#"{
      "vertices": [{"id": "a", "width": 40, "height": 20}, {"id": "b"}],
      "edges": [{"id": "ab", "source": "a", "target": "b"}]
    }"#;

    let assert = cli().write_stdin(input).assert().success();
    let json = stdout_json(assert.get_output());

    assert_eq!(json["report"]["missingBounds"][0], "b");
}

#[test]
fn cli_exits_with_usage_on_bad_flags() {
    cli().args(["--orientation", "up"]).assert().code(2);
    cli().args(["--frobnicate"]).assert().code(2);
}

#[test]
fn cli_fails_on_unknown_roots() {
    let input = r#"{
      "vertices": [{"id": "a", "width": 40, "height": 20}],
      "roots": ["nope"]
    }"#;

    let assert = cli().write_stdin(input).assert().code(1);
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("unknown cell: nope"), "{stderr}");
}

#[test]
fn cli_fails_on_malformed_json() {
    cli().write_stdin("{ not json").assert().code(1);
}
