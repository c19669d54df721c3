// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

//! CloudFormation synthesis
//!
//! Renders a validated [`ResourceGraph`] into a deployable template. Keys
//! are emitted in sorted order, so identical graphs give identical bytes.

mod resources;

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::errors::StackResult;
use crate::model::ResourceGraph;

/// Template format version understood by CloudFormation
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Metadata key holding a resource's construct path
pub const PATH_METADATA_KEY: &str = "lambda-pipeline:path";

/// Metadata key holding the graph fingerprint
pub const FINGERPRINT_METADATA_KEY: &str = "lambda-pipeline:fingerprint";

/// Synthesized CloudFormation template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    document: Value,
}

impl Template {
    /// Render a resource graph
    pub fn synthesize(graph: &ResourceGraph) -> StackResult<Self> {
        let mut declared = Map::new();
        let mut add = |logical_id: &str, mut resource: Value| {
            resource["Metadata"] = json!({
                PATH_METADATA_KEY: format!("{}/{}", graph.path, logical_id),
            });
            declared.insert(logical_id.to_string(), resource);
        };

        let store = &graph.pipeline.artifact_store;
        add(&store.logical_id, resources::bucket(store));

        for role in graph.roles.values() {
            add(&role.logical_id, resources::role(role));
        }

        for project in graph.projects.values() {
            add(&project.logical_id, resources::project(project)?);
        }

        add(&graph.pipeline.logical_id, resources::pipeline(&graph.pipeline)?);

        if let Some(ref rule) = graph.trigger {
            add(
                &rule.logical_id,
                resources::trigger_rule(rule, &graph.repository, &graph.pipeline),
            );
        }

        let fingerprint = graph.fingerprint()?;
        debug!(resources = declared.len(), %fingerprint, "synthesized template");

        let document = json!({
            "AWSTemplateFormatVersion": TEMPLATE_FORMAT_VERSION,
            "Description": format!(
                "Container build and deploy pipeline for function stack {}",
                graph.stack_id
            ),
            "Metadata": {
                PATH_METADATA_KEY: graph.path,
                FINGERPRINT_METADATA_KEY: fingerprint,
            },
            "Resources": declared,
            "Outputs": {
                "PipelineName": {
                    "Value": { "Ref": graph.pipeline.logical_id },
                },
                "ArtifactBucketName": {
                    "Value": { "Ref": store.logical_id },
                },
            },
        });

        Ok(Self { document })
    }

    /// Resource by logical id
    pub fn resource(&self, logical_id: &str) -> Option<&Value> {
        self.document.get("Resources")?.get(logical_id)
    }

    /// Logical ids of every resource of the given type
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<&str> {
        self.document
            .get("Resources")
            .and_then(Value::as_object)
            .map(|resources| {
                resources
                    .iter()
                    .filter(|(_, r)| r["Type"] == resource_type)
                    .map(|(id, _)| id.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Fingerprint recorded in the template metadata
    pub fn fingerprint(&self) -> Option<&str> {
        self.document["Metadata"][FINGERPRINT_METADATA_KEY].as_str()
    }

    pub fn as_value(&self) -> &Value {
        &self.document
    }

    pub fn to_json(&self) -> StackResult<String> {
        serde_json::to_string_pretty(&self.document).map_err(Into::into)
    }

    pub fn to_yaml(&self) -> StackResult<String> {
        serde_yaml::to_string(&self.document).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StackOptions;
    use crate::model::SourceTrigger;
    use crate::stack::{PipelineStack, Scope};

    fn template_with(options: &StackOptions) -> Template {
        let graph = PipelineStack::synthesize(&Scope::root(), "LambdaStack", options).unwrap();
        Template::synthesize(&graph).unwrap()
    }

    fn template() -> Template {
        template_with(&StackOptions::default())
    }

    #[test]
    fn test_resource_inventory() {
        let t = template();
        assert_eq!(t.resources_of_type("AWS::S3::Bucket"), vec!["PipelineArtifactBucket"]);
        assert_eq!(
            t.resources_of_type("AWS::IAM::Role"),
            vec!["BuildRole", "DeployRole", "PipelineRole"]
        );
        assert_eq!(
            t.resources_of_type("AWS::CodeBuild::Project"),
            vec!["BuildProject", "DeployProject"]
        );
        assert_eq!(
            t.resources_of_type("AWS::CodePipeline::Pipeline"),
            vec!["CodePipelineFastAPILambda"]
        );
        assert!(t.resources_of_type("AWS::Events::Rule").is_empty());
    }

    #[test]
    fn test_pipeline_stages_and_variables() {
        let t = template();
        let props = &t.resource("CodePipelineFastAPILambda").unwrap()["Properties"];

        assert_eq!(props["PipelineType"], "V2");
        let stages: Vec<&str> = props["Stages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["Name"].as_str().unwrap())
            .collect();
        assert_eq!(stages, vec!["Source", "Build", "Deploy"]);

        assert_eq!(props["Variables"][0]["Name"], "branchName");
        assert_eq!(props["Variables"][0]["DefaultValue"], "bronze");
        assert_eq!(props["Variables"][1]["Name"], "ecrTag");
        assert_eq!(props["Variables"][1]["DefaultValue"], "latest");

        let source = &props["Stages"][0]["Actions"][0];
        assert_eq!(source["Configuration"]["BranchName"], "bronze");
        assert_eq!(source["Configuration"]["RepositoryName"], "fast-api-lambda");
        assert_eq!(source["OutputArtifacts"][0]["Name"], "SourceArtifact");
    }

    #[test]
    fn test_build_action_environment() {
        let t = template();
        let props = &t.resource("CodePipelineFastAPILambda").unwrap()["Properties"];
        let build = &props["Stages"][1]["Actions"][0];

        assert_eq!(build["Configuration"]["ProjectName"], json!({ "Ref": "BuildProject" }));
        let env: Value =
            serde_json::from_str(build["Configuration"]["EnvironmentVariables"].as_str().unwrap())
                .unwrap();
        assert_eq!(
            env,
            json!([
                { "name": "BRANCH_NAME", "type": "PLAINTEXT", "value": "#{variables.branchName}" },
                { "name": "ECR_TAG", "type": "PLAINTEXT", "value": "#{variables.ecrTag}" },
            ])
        );
    }

    #[test]
    fn test_project_environment() {
        let t = template();
        let build = &t.resource("BuildProject").unwrap()["Properties"];
        assert_eq!(build["Environment"]["Image"], "aws/codebuild/standard:5.0");
        assert_eq!(build["Environment"]["PrivilegedMode"], true);
        assert_eq!(build["ServiceRole"], json!({ "Fn::GetAtt": ["BuildRole", "Arn"] }));

        let spec: Value =
            serde_json::from_str(build["Source"]["BuildSpec"].as_str().unwrap()).unwrap();
        assert_eq!(spec["version"], "0.2");
        assert_eq!(spec["phases"]["install"]["commands"][0], "docker --version");
    }

    #[test]
    fn test_managed_policy_arns() {
        let t = template();
        let arns = &t.resource("DeployRole").unwrap()["Properties"]["ManagedPolicyArns"];
        assert_eq!(arns[0]["Fn::Join"][1][3], "AWSLambda_FullAccess");

        let trust = &t.resource("DeployRole").unwrap()["Properties"]["AssumeRolePolicyDocument"];
        assert_eq!(trust["Statement"][0]["Principal"]["Service"], "codebuild.amazonaws.com");
    }

    #[test]
    fn test_metadata_paths_and_fingerprint() {
        let t = template();
        assert_eq!(
            t.resource("BuildRole").unwrap()["Metadata"][PATH_METADATA_KEY],
            "LambdaStack/BuildRole"
        );
        assert_eq!(t.fingerprint().map(str::len), Some(64));
    }

    #[test]
    fn test_events_trigger_adds_rule() {
        let t = template_with(&StackOptions {
            trigger: SourceTrigger::Events,
            ..StackOptions::default()
        });
        assert_eq!(t.resources_of_type("AWS::Events::Rule"), vec!["SourceChangeRule"]);
        let rule = &t.resource("SourceChangeRule").unwrap()["Properties"];
        assert_eq!(rule["EventPattern"]["detail"]["referenceName"][0], "bronze");
        assert_eq!(
            rule["Targets"][0]["RoleArn"],
            json!({ "Fn::GetAtt": ["PipelineEventsRole", "Arn"] })
        );
    }

    #[test]
    fn test_poll_trigger_sets_flag() {
        let t = template_with(&StackOptions {
            trigger: SourceTrigger::Poll,
            ..StackOptions::default()
        });
        let source = &t.resource("CodePipelineFastAPILambda").unwrap()["Properties"]["Stages"][0]
            ["Actions"][0];
        assert_eq!(source["Configuration"]["PollForSourceChanges"], true);
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        assert_eq!(template().to_json().unwrap(), template().to_json().unwrap());
        assert!(template().to_yaml().unwrap().contains("AWSTemplateFormatVersion"));
    }
}
