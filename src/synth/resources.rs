// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

//! Per-resource CloudFormation fragments

use serde_json::{json, Value};

use crate::errors::StackResult;
use crate::model::{
    Action, ActionKind, ArtifactStore, BuildProject, Grant, PipelineDecl, Principal,
    RepositoryRef, ResourceScope, Role, SourceTrigger, TriggerRule,
};

const POLICY_VERSION: &str = "2012-10-17";

fn get_att_arn(logical_id: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, "Arn"] })
}

fn sub(template: String) -> Value {
    json!({ "Fn::Sub": template })
}

fn regional_arn(service: &str, resource: &str) -> Value {
    sub(format!(
        "arn:${{AWS::Partition}}:{}:${{AWS::Region}}:${{AWS::AccountId}}:{}",
        service, resource
    ))
}

pub(super) fn bucket(store: &ArtifactStore) -> Value {
    let policy = if store.retain_on_delete {
        "Retain"
    } else {
        "Delete"
    };

    json!({
        "Type": "AWS::S3::Bucket",
        "UpdateReplacePolicy": policy,
        "DeletionPolicy": policy,
    })
}

/// ARNs a grant applies to
pub(super) fn scope_resources(scope: &ResourceScope) -> Value {
    match scope {
        ResourceScope::Any => json!("*"),
        ResourceScope::Repository(name) => regional_arn("ecr", &format!("repository/{}", name)),
        ResourceScope::Function(name) => regional_arn("lambda", &format!("function:{}", name)),
        ResourceScope::SourceRepository(name) => regional_arn("codecommit", name),
        ResourceScope::Pipeline(name) => regional_arn("codepipeline", name),
        ResourceScope::Project(id) => get_att_arn(id),
        ResourceScope::Bucket(id) => json!([
            get_att_arn(id),
            { "Fn::Join": ["", [get_att_arn(id), "/*"]] },
        ]),
        ResourceScope::BuildLogs => regional_arn("logs", "log-group:/aws/codebuild/*"),
    }
}

fn statement(grant: &Grant) -> Value {
    let mut actions: Vec<&str> = grant
        .capabilities
        .iter()
        .flat_map(|c| c.actions().iter().copied())
        .collect();
    actions.sort_unstable();
    actions.dedup();

    json!({
        "Effect": "Allow",
        "Action": actions,
        "Resource": scope_resources(&grant.resource),
    })
}

pub(super) fn role(role: &Role) -> Value {
    let Principal::Service(ref service) = role.principal;

    let mut properties = json!({
        "AssumeRolePolicyDocument": {
            "Version": POLICY_VERSION,
            "Statement": [{
                "Action": "sts:AssumeRole",
                "Effect": "Allow",
                "Principal": { "Service": service },
            }],
        },
    });

    if !role.managed_policies.is_empty() {
        let arns: Vec<Value> = role
            .managed_policies
            .iter()
            .map(|p| {
                json!({
                    "Fn::Join": ["", ["arn:", { "Ref": "AWS::Partition" }, ":iam::aws:policy/", p.name()]]
                })
            })
            .collect();
        properties["ManagedPolicyArns"] = json!(arns);
    }

    if !role.grants.is_empty() {
        let statements: Vec<Value> = role.grants.iter().map(statement).collect();
        properties["Policies"] = json!([{
            "PolicyName": format!("{}DefaultPolicy", role.logical_id),
            "PolicyDocument": {
                "Version": POLICY_VERSION,
                "Statement": statements,
            },
        }]);
    }

    json!({
        "Type": "AWS::IAM::Role",
        "Properties": properties,
    })
}

pub(super) fn project(project: &BuildProject) -> StackResult<Value> {
    let build_spec = serde_json::to_string_pretty(&project.spec.to_document())?;
    let env = &project.environment;

    Ok(json!({
        "Type": "AWS::CodeBuild::Project",
        "Properties": {
            "Artifacts": { "Type": "CODEPIPELINE" },
            "Environment": {
                "ComputeType": env.compute_type.as_str(),
                "Image": env.image,
                "ImagePullCredentialsType": "CODEBUILD",
                "PrivilegedMode": env.privileged,
                "Type": "LINUX_CONTAINER",
            },
            "ServiceRole": get_att_arn(&project.role),
            "Source": {
                "BuildSpec": build_spec,
                "Type": "CODEPIPELINE",
            },
        },
        "DependsOn": [project.role],
    }))
}

fn action(action: &Action) -> StackResult<Value> {
    let configuration = match &action.kind {
        ActionKind::Source {
            repository,
            branch,
            trigger,
        } => json!({
            "RepositoryName": repository,
            "BranchName": branch.expression(),
            "PollForSourceChanges": *trigger == SourceTrigger::Poll,
        }),
        ActionKind::Build {
            project,
            environment,
        } => {
            let entries: Vec<Value> = environment
                .iter()
                .map(|(name, value)| {
                    json!({
                        "name": name,
                        "type": "PLAINTEXT",
                        "value": value.expression(),
                    })
                })
                .collect();
            json!({
                "ProjectName": { "Ref": project },
                "EnvironmentVariables": serde_json::to_string(&entries)?,
            })
        }
    };

    let artifacts = |handles: &[crate::model::ArtifactHandle]| -> Vec<Value> {
        handles.iter().map(|h| json!({ "Name": h.name() })).collect()
    };

    let mut value = json!({
        "Name": action.name,
        "ActionTypeId": {
            "Category": action.category(),
            "Owner": "AWS",
            "Provider": action.provider(),
            "Version": "1",
        },
        "Configuration": configuration,
        "RunOrder": action.run_order,
    });
    if !action.inputs.is_empty() {
        value["InputArtifacts"] = json!(artifacts(&action.inputs));
    }
    if !action.outputs.is_empty() {
        value["OutputArtifacts"] = json!(artifacts(&action.outputs));
    }

    Ok(value)
}

pub(super) fn pipeline(decl: &PipelineDecl) -> StackResult<Value> {
    let variables: Vec<Value> = decl
        .variables
        .iter()
        .map(|v| {
            let mut var = json!({
                "Name": v.name,
                "DefaultValue": v.default_value,
            });
            if let Some(ref description) = v.description {
                var["Description"] = json!(description);
            }
            var
        })
        .collect();

    let stages = decl
        .stages
        .iter()
        .map(|stage| -> StackResult<Value> {
            let actions = stage.actions.iter().map(action).collect::<StackResult<Vec<_>>>()?;
            Ok(json!({ "Name": stage.name, "Actions": actions }))
        })
        .collect::<StackResult<Vec<_>>>()?;

    Ok(json!({
        "Type": "AWS::CodePipeline::Pipeline",
        "Properties": {
            "Name": decl.name,
            "PipelineType": "V2",
            "RoleArn": get_att_arn(&decl.role),
            "ArtifactStore": {
                "Location": { "Ref": decl.artifact_store.logical_id },
                "Type": "S3",
            },
            "Variables": variables,
            "Stages": stages,
        },
        "DependsOn": [decl.role],
    }))
}

pub(super) fn trigger_rule(
    rule: &TriggerRule,
    repository: &RepositoryRef,
    pipeline: &PipelineDecl,
) -> Value {
    json!({
        "Type": "AWS::Events::Rule",
        "Properties": {
            "EventPattern": {
                "source": ["aws.codecommit"],
                "resources": [regional_arn("codecommit", &repository.name)],
                "detail-type": ["CodeCommit Repository State Change"],
                "detail": {
                    "event": ["referenceCreated", "referenceUpdated"],
                    "referenceName": [rule.branch],
                },
            },
            "State": "ENABLED",
            "Targets": [{
                "Id": "Target0",
                "Arn": regional_arn("codepipeline", &pipeline.name),
                "RoleArn": get_att_arn(&rule.role),
            }],
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_scope_covers_objects() {
        let value = scope_resources(&ResourceScope::Bucket("Store".into()));
        assert_eq!(value[0], json!({ "Fn::GetAtt": ["Store", "Arn"] }));
        assert_eq!(value[1]["Fn::Join"][1][1], json!("/*"));
    }

    #[test]
    fn test_function_scope_is_regional() {
        let value = scope_resources(&ResourceScope::Function("fn".into()));
        assert_eq!(
            value["Fn::Sub"],
            "arn:${AWS::Partition}:lambda:${AWS::Region}:${AWS::AccountId}:function:fn"
        );
    }

    #[test]
    fn test_bucket_retention() {
        let retained = bucket(&ArtifactStore::bucket("B"));
        assert_eq!(retained["DeletionPolicy"], "Retain");

        let mut store = ArtifactStore::bucket("B");
        store.retain_on_delete = false;
        assert_eq!(bucket(&store)["UpdateReplacePolicy"], "Delete");
    }
}
