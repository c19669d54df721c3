// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

use std::collections::BTreeMap;

use lambda_pipeline::model::{Capability, CapabilityDomain, PermissionMode};
use lambda_pipeline::pipeline::{ExecutionPlanner, PipelineValidator, RunRequest, WarningKind};
use lambda_pipeline::{PipelineStack, ResourceGraph, Scope, StackError, StackOptions, Template};

fn declare(options: &StackOptions) -> ResourceGraph {
    PipelineStack::synthesize(&Scope::root(), "FastAPILambdaPipelineStack", options).unwrap()
}

fn assignments(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn stage_order_is_fixed_regardless_of_variables() {
    let graph = declare(&StackOptions::default());
    assert_eq!(graph.stage_names(), vec!["Source", "Build", "Deploy"]);

    for overrides in [
        assignments(&[]),
        assignments(&[("branchName", "silver")]),
        assignments(&[("branchName", "gold"), ("ecrTag", "v9")]),
    ] {
        let plan = ExecutionPlanner::new(&graph)
            .unwrap()
            .plan(&RunRequest {
                overrides,
                ..RunRequest::default()
            })
            .unwrap();
        assert_eq!(plan.stage_order(), vec!["Source", "Build", "Deploy"]);
    }
}

#[test]
fn variables_have_documented_defaults() {
    let graph = declare(&StackOptions::default());
    let variables = &graph.pipeline.variables;

    assert_eq!(variables.len(), 2);
    assert_eq!(variables.get("branchName").unwrap().default_value, "bronze");
    assert_eq!(variables.get("ecrTag").unwrap().default_value, "latest");
}

#[test]
fn artifacts_chain_stage_to_stage() {
    let graph = declare(&StackOptions::default());

    let build = &graph.stage("Build").unwrap().actions[0];
    let deploy = &graph.stage("Deploy").unwrap().actions[0];
    assert_eq!(build.inputs.len(), 1);
    assert_eq!(build.inputs[0].name(), "SourceArtifact");
    assert_eq!(deploy.inputs.len(), 1);
    assert_eq!(deploy.inputs[0].name(), "BuildArtifact");
}

#[test]
fn removing_an_input_fails_sealing() {
    for stage in ["Build", "Deploy"] {
        let mut graph = declare(&StackOptions::default());
        graph.stage_mut(stage).unwrap().actions[0].inputs.clear();

        match graph.seal() {
            Err(StackError::InvalidGraph { errors }) => {
                assert!(errors.iter().any(|e| e.contains("has no input artifact")));
            }
            other => panic!("Expected InvalidGraph for {}, got {:?}", stage, other),
        }
    }
}

#[test]
fn roles_are_separated_by_domain() {
    for permissions in [PermissionMode::Managed, PermissionMode::LeastPrivilege] {
        let graph = declare(&StackOptions {
            permissions,
            ..StackOptions::default()
        });
        let build = &graph.roles["BuildRole"];
        let deploy = &graph.roles["DeployRole"];

        for cap in [
            Capability::RegistryAuthenticate,
            Capability::RegistryPull,
            Capability::RegistryPush,
        ] {
            assert!(build.grants_capability(cap));
        }
        assert!(!build.grants_domain(CapabilityDomain::Function));

        assert!(deploy.grants_capability(Capability::FunctionUpdateCode));
        assert!(!deploy.grants_domain(CapabilityDomain::Registry));
    }
}

#[test]
fn overrides_reach_both_build_stages() {
    let graph = declare(&StackOptions::default());
    let plan = ExecutionPlanner::new(&graph)
        .unwrap()
        .plan(&RunRequest {
            overrides: assignments(&[("branchName", "silver"), ("ecrTag", "v2")]),
            ..RunRequest::default()
        })
        .unwrap();

    for stage in ["Build", "Deploy"] {
        let env = plan.step(stage).unwrap().environment().unwrap();
        assert_eq!(env["BRANCH_NAME"], "silver");
        assert_eq!(env["ECR_TAG"], "v2");
    }
}

#[test]
fn construction_is_deterministic() {
    let first = declare(&StackOptions::default());
    let second = declare(&StackOptions::default());
    assert_eq!(first, second);
    assert_eq!(first.fingerprint().unwrap(), second.fingerprint().unwrap());

    let t1 = Template::synthesize(&first).unwrap();
    let t2 = Template::synthesize(&second).unwrap();
    assert_eq!(t1.to_json().unwrap(), t2.to_json().unwrap());
    assert_eq!(t1.fingerprint(), Some(first.fingerprint().unwrap().as_str()));
}

#[test]
fn graph_survives_json_round_trip() {
    let graph = declare(&StackOptions::default());
    let restored = ResourceGraph::from_json(&graph.to_json().unwrap()).unwrap();
    assert_eq!(graph.fingerprint().unwrap(), restored.fingerprint().unwrap());
}

#[test]
fn undeclared_override_fails_planning() {
    let graph = declare(&StackOptions::default());
    let result = ExecutionPlanner::new(&graph).unwrap().plan(&RunRequest {
        overrides: assignments(&[("region", "eu-west-1")]),
        ..RunRequest::default()
    });

    assert!(matches!(result, Err(StackError::UnknownVariable { ref name, .. }) if name == "region"));
}

#[test]
fn least_privilege_reports_no_excess() {
    let graph = declare(&StackOptions {
        permissions: PermissionMode::LeastPrivilege,
        ..StackOptions::default()
    });

    for project in graph.projects.values() {
        let role = graph.role_for(project).unwrap();
        assert!(role.excess_over(&project.required_capabilities).is_empty());
        assert!(role.missing_from(&project.required_capabilities).is_empty());
    }

    let result = PipelineValidator::validate(&graph).unwrap();
    assert!(!result
        .warnings
        .iter()
        .any(|w| matches!(w.kind, WarningKind::ExcessCapability { .. })));
}

#[test]
fn context_substitutes_prefixed_and_bare_tokens() {
    let graph = declare(&StackOptions::default());
    let plan = ExecutionPlanner::new(&graph)
        .unwrap()
        .plan(&RunRequest {
            context: assignments(&[("REGION", "eu-west-1")]),
            ..RunRequest::default()
        })
        .unwrap();

    let commands: Vec<String> = plan
        .steps
        .iter()
        .filter_map(|s| match &s.work {
            lambda_pipeline::pipeline::PlannedWork::Build { commands, .. } => Some(commands),
            _ => None,
        })
        .flatten()
        .map(|c| c.command.clone())
        .collect();

    assert!(commands
        .iter()
        .any(|c| c.contains("git-codecommit.eu-west-1.amazonaws.com")));
    assert!(commands
        .iter()
        .any(|c| c.contains("get-login-password --region eu-west-1")));
    assert!(!plan.unresolved.contains("REGION"));
    assert!(plan.unresolved.contains("ACCOUNT_ID"));
}

#[test]
fn require_context_fails_on_missing_tokens() {
    let graph = declare(&StackOptions::default());
    let result = ExecutionPlanner::new(&graph).unwrap().plan(&RunRequest {
        context: assignments(&[("REGION", "eu-west-1"), ("ACCOUNT_ID", "123456789012")]),
        require_context: true,
        ..RunRequest::default()
    });

    match result {
        Err(StackError::UnresolvedContext { tokens }) => {
            assert_eq!(tokens, vec!["TOKEN".to_string(), "USERNAME".to_string()]);
        }
        other => panic!("Expected UnresolvedContext, got {:?}", other),
    }

    let complete = ExecutionPlanner::new(&graph).unwrap().plan(&RunRequest {
        context: assignments(&[
            ("REGION", "eu-west-1"),
            ("ACCOUNT_ID", "123456789012"),
            ("USERNAME", "ci"),
            ("TOKEN", "secret"),
        ]),
        require_context: true,
        ..RunRequest::default()
    });
    assert!(complete.unwrap().unresolved.is_empty());
}

#[test]
fn invalid_stack_id_is_rejected() {
    let result = PipelineStack::synthesize(&Scope::root(), "1bad id", &StackOptions::default());
    assert!(matches!(result, Err(StackError::InvalidStackId { .. })));
}
