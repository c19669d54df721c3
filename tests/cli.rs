// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("lambda-pipeline").unwrap();
    cmd.current_dir(dir.path()).env("NO_COLOR", "1");
    cmd
}

#[test]
fn version_flag() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn synth_prints_template() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .arg("synth")
        .assert()
        .success()
        .stdout(predicate::str::contains("AWS::CodePipeline::Pipeline"))
        .stdout(predicate::str::contains("\"Name\": \"CodePipelineFastAPILambda\""))
        .stdout(predicate::str::contains("AWSLambda_FullAccess"))
        .stdout(predicate::str::contains(
            "\"lambda-pipeline:path\": \"FastAPILambdaPipelineStack/BuildRole\"",
        ));
}

#[test]
fn synth_writes_yaml_file() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["synth", "-f", "yaml", "-o", "template.yaml"])
        .assert()
        .success();

    let content = std::fs::read_to_string(dir.path().join("template.yaml")).unwrap();
    assert!(content.contains("AWSTemplateFormatVersion"));
    assert!(content.contains("PipelineArtifactBucket"));
}

#[test]
fn synth_rejects_bad_stack_id() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["synth", "--stack-id", "not valid"])
        .assert()
        .failure();
}

#[test]
fn validate_reports_warnings() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pipeline is valid but has warnings."))
        .stdout(predicate::str::contains("fast-api-lambda-repo"))
        .stdout(predicate::str::contains("--context REGION=<value>"));
}

#[test]
fn validate_strict_fails_on_warnings() {
    let dir = TempDir::new().unwrap();
    cmd(&dir).args(["validate", "--strict"]).assert().failure();
}

#[test]
fn graph_mermaid_shows_artifact_edges() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["graph", "-f", "mermaid"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Source -->|SourceArtifact| Build"))
        .stdout(predicate::str::contains("Build -->|BuildArtifact| Deploy"));
}

#[test]
fn plan_json_applies_overrides() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["plan", "--var", "ecrTag=v2", "--var", "branchName=silver", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"ECR_TAG\": \"v2\""))
        .stdout(predicate::str::contains("\"BRANCH_NAME\": \"silver\""));
}

#[test]
fn plan_keeps_token_words_inside_values() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args([
            "plan",
            "--var",
            "ecrTag=TOKEN",
            "--context",
            "TOKEN=secret",
            "-v",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("fast-api-lambda-ecr:TOKEN"))
        .stdout(predicate::str::contains("fast-api-lambda-ecr:secret").not());
}

#[test]
fn plan_rejects_unknown_variable() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["plan", "--var", "region=eu-west-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown variable 'region'"));
}

#[test]
fn plan_require_context_fails_without_values() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["plan", "--require-context"])
        .assert()
        .failure();
}

#[test]
fn roles_json_lists_excess() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["roles", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"role\": \"BuildRole\""))
        .stdout(predicate::str::contains("registry-describe"));
}

#[test]
fn init_writes_options_and_refuses_overwrite() {
    let dir = TempDir::new().unwrap();
    cmd(&dir).arg("init").assert().success();
    assert!(dir.path().join("lambda-pipeline.toml").exists());

    cmd(&dir)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    cmd(&dir).args(["init", "--force"]).assert().success();

    // The generated file is picked up by later commands
    cmd(&dir).arg("validate").assert().success();
}

#[test]
fn options_file_changes_synthesis() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("lambda-pipeline.toml"),
        "function_name = \"orders-api\"\npermissions = \"least-privilege\"\n",
    )
    .unwrap();

    cmd(&dir)
        .arg("synth")
        .assert()
        .success()
        .stdout(predicate::str::contains("--function-name orders-api"))
        .stdout(predicate::str::contains("function:orders-api"))
        .stdout(predicate::str::contains("AWSLambda_FullAccess").not());
}

#[test]
fn explicit_yaml_config() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("stack.yaml"),
        "pipeline_name: OrdersPipeline\ntrigger: events\n",
    )
    .unwrap();

    cmd(&dir)
        .args(["-c", "stack.yaml", "synth"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OrdersPipeline"))
        .stdout(predicate::str::contains("AWS::Events::Rule"));
}

#[test]
fn unknown_option_field_fails() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("lambda-pipeline.toml"), "colour = \"blue\"\n").unwrap();

    cmd(&dir).arg("validate").assert().failure();
}

#[test]
fn missing_config_file_fails() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["-c", "absent.toml", "graph"])
        .assert()
        .failure();
}
