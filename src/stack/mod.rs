// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

//! Stack declaration
//!
//! [`PipelineStack::synthesize`] is the single entry point: a pure function
//! from `(scope, id, options)` to a validated [`ResourceGraph`].

pub mod scripts;

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::config::{BranchBindingMode, StackOptions};
use crate::errors::{StackError, StackResult};
use crate::model::{
    Action, ArtifactHandle, ArtifactStore, BranchBinding, BuildEnvironment, BuildProject,
    Capability, EnvValue, Grant, ManagedPolicy, PermissionMode, PipelineDecl, Principal,
    RepositoryRef, ResourceGraph, ResourceScope, Role, RuntimeVariable, SourceTrigger, Stage,
    TriggerRule, VariableSet, BRANCH_VARIABLE, CODEBUILD_SERVICE, CODEPIPELINE_SERVICE,
    ECR_TAG_VARIABLE, EVENTS_SERVICE,
};
use crate::pipeline::find_context_tokens;

pub const SOURCE_STAGE: &str = "Source";
pub const BUILD_STAGE: &str = "Build";
pub const DEPLOY_STAGE: &str = "Deploy";

pub const SOURCE_ARTIFACT: &str = "SourceArtifact";
pub const BUILD_ARTIFACT: &str = "BuildArtifact";

pub const ARTIFACT_BUCKET_ID: &str = "PipelineArtifactBucket";
pub const REPOSITORY_ID: &str = "CodeCommitRepo";
pub const BUILD_ROLE_ID: &str = "BuildRole";
pub const DEPLOY_ROLE_ID: &str = "DeployRole";
pub const BUILD_PROJECT_ID: &str = "BuildProject";
pub const DEPLOY_PROJECT_ID: &str = "DeployProject";
pub const PIPELINE_ID: &str = "CodePipelineFastAPILambda";
pub const PIPELINE_ROLE_ID: &str = "PipelineRole";
pub const TRIGGER_RULE_ID: &str = "SourceChangeRule";
pub const TRIGGER_ROLE_ID: &str = "PipelineEventsRole";

/// Position of a construct in the declaration tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    path: Vec<String>,
}

impl Scope {
    /// The application root
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            path: vec![name.into()],
        }
    }

    pub fn child(&self, id: &str) -> Self {
        let mut path = self.path.clone();
        path.push(id.to_string());
        Self { path }
    }

    pub fn path(&self) -> String {
        self.path.join("/")
    }
}

/// Source → Build → Deploy pipeline for a container-image function
pub struct PipelineStack;

impl PipelineStack {
    /// Declare the full resource graph
    pub fn synthesize(scope: &Scope, id: &str, options: &StackOptions) -> StackResult<ResourceGraph> {
        validate_stack_id(id)?;
        options.validate()?;

        let stack_scope = scope.child(id);
        info!(stack = %stack_scope.path(), "declaring pipeline stack");

        let variables = declare_variables(options)?;
        let (branch_var, tag_var) = match (
            variables.get(BRANCH_VARIABLE),
            variables.get(ECR_TAG_VARIABLE),
        ) {
            (Some(b), Some(t)) => (b.clone(), t.clone()),
            _ => {
                return Err(StackError::invalid_options(
                    "runtime variables were not declared",
                    "This is a bug in the stack declaration",
                ))
            }
        };

        let source_artifact = ArtifactHandle::new(SOURCE_ARTIFACT);
        let build_artifact = ArtifactHandle::new(BUILD_ARTIFACT);

        let projects = declare_projects(options);
        let mut roles = declare_build_roles(options);

        let branch = match options.branch_binding {
            BranchBindingMode::Fixed => BranchBinding::Fixed(options.source_branch.clone()),
            BranchBindingMode::Variable => BranchBinding::Variable(branch_var.name.clone()),
        };

        let stages = vec![
            Stage::new(SOURCE_STAGE).with_action(
                Action::source("CodeCommit_Source", &options.repository, branch)
                    .with_trigger(options.trigger)
                    .with_output(&source_artifact),
            ),
            Stage::new(BUILD_STAGE).with_action(
                Action::build("Build", BUILD_PROJECT_ID)
                    .with_input(&source_artifact)
                    .with_output(&build_artifact)
                    .with_env(scripts::BRANCH_ENV, EnvValue::variable(&branch_var))
                    .with_env(scripts::ECR_TAG_ENV, EnvValue::variable(&tag_var)),
            ),
            Stage::new(DEPLOY_STAGE).with_action(
                Action::build("Deploy", DEPLOY_PROJECT_ID)
                    .with_input(&build_artifact)
                    .with_env(scripts::BRANCH_ENV, EnvValue::variable(&branch_var))
                    .with_env(scripts::ECR_TAG_ENV, EnvValue::variable(&tag_var)),
            ),
        ];

        let pipeline_role = Role::new(PIPELINE_ROLE_ID, Principal::service(CODEPIPELINE_SERVICE))
            .with_grant(Grant::new(
                [Capability::ArtifactStoreReadWrite],
                ResourceScope::Bucket(ARTIFACT_BUCKET_ID.to_string()),
            ))
            .with_grant(Grant::new(
                [Capability::SourceRead],
                ResourceScope::SourceRepository(options.repository.clone()),
            ))
            .with_grant(Grant::new(
                [Capability::ProjectStart],
                ResourceScope::Project(BUILD_PROJECT_ID.to_string()),
            ))
            .with_grant(Grant::new(
                [Capability::ProjectStart],
                ResourceScope::Project(DEPLOY_PROJECT_ID.to_string()),
            ));
        roles.insert(PIPELINE_ROLE_ID.to_string(), pipeline_role);

        let trigger = if options.trigger == SourceTrigger::Events {
            let events_role = Role::new(TRIGGER_ROLE_ID, Principal::service(EVENTS_SERVICE))
                .with_grant(Grant::new(
                    [Capability::PipelineStart],
                    ResourceScope::Pipeline(options.pipeline_name.clone()),
                ));
            roles.insert(TRIGGER_ROLE_ID.to_string(), events_role);
            Some(TriggerRule {
                logical_id: TRIGGER_RULE_ID.to_string(),
                role: TRIGGER_ROLE_ID.to_string(),
                branch: options.source_branch.clone(),
            })
        } else {
            None
        };

        let mut required_context = BTreeSet::new();
        for project in projects.values() {
            for (_, command) in project.spec.commands() {
                required_context.extend(find_context_tokens(command)?);
            }
        }
        debug!(tokens = ?required_context, "context tokens left for the execution environment");

        let graph = ResourceGraph {
            stack_id: id.to_string(),
            path: stack_scope.path(),
            pipeline: PipelineDecl {
                logical_id: PIPELINE_ID.to_string(),
                name: options.pipeline_name.clone(),
                role: PIPELINE_ROLE_ID.to_string(),
                artifact_store: ArtifactStore::bucket(ARTIFACT_BUCKET_ID),
                variables,
                stages,
            },
            repository: RepositoryRef {
                logical_id: REPOSITORY_ID.to_string(),
                name: options.repository.clone(),
            },
            roles,
            projects,
            trigger,
            required_context,
        };

        graph.seal()
    }
}

fn validate_stack_id(id: &str) -> StackResult<()> {
    let re = Regex::new(r"^[A-Za-z][A-Za-z0-9-]{0,127}$")?;
    if re.is_match(id) {
        Ok(())
    } else {
        Err(StackError::InvalidStackId {
            id: id.to_string(),
            reason: if id.is_empty() {
                "id is empty".to_string()
            } else {
                "id contains characters outside [A-Za-z0-9-] or is too long".to_string()
            },
        })
    }
}

fn declare_variables(options: &StackOptions) -> StackResult<VariableSet> {
    let mut variables = VariableSet::new();
    variables.declare(
        RuntimeVariable::new(BRANCH_VARIABLE, &options.variables.branch_name)
            .with_description("The branch to use for the pipeline"),
    )?;
    variables.declare(
        RuntimeVariable::new(ECR_TAG_VARIABLE, &options.variables.ecr_tag)
            .with_description("The ECR tag to use for the Docker image"),
    )?;
    Ok(variables)
}

fn declare_projects(options: &StackOptions) -> BTreeMap<String, BuildProject> {
    let build = BuildProject {
        logical_id: BUILD_PROJECT_ID.to_string(),
        role: BUILD_ROLE_ID.to_string(),
        environment: BuildEnvironment::standard(&options.build_image).privileged(),
        spec: scripts::build_spec(options),
        required_capabilities: scripts::build_requirements(),
    };

    let deploy = BuildProject {
        logical_id: DEPLOY_PROJECT_ID.to_string(),
        role: DEPLOY_ROLE_ID.to_string(),
        environment: BuildEnvironment::standard(&options.build_image),
        spec: scripts::deploy_spec(options),
        required_capabilities: scripts::deploy_requirements(),
    };

    BTreeMap::from([
        (build.logical_id.clone(), build),
        (deploy.logical_id.clone(), deploy),
    ])
}

fn declare_build_roles(options: &StackOptions) -> BTreeMap<String, Role> {
    let with_baseline = |role: Role| {
        role.with_grant(Grant::new([Capability::LogsWrite], ResourceScope::BuildLogs))
            .with_grant(Grant::new(
                [Capability::ArtifactStoreReadWrite],
                ResourceScope::Bucket(ARTIFACT_BUCKET_ID.to_string()),
            ))
    };

    let build = Role::new(BUILD_ROLE_ID, Principal::service(CODEBUILD_SERVICE));
    let deploy = Role::new(DEPLOY_ROLE_ID, Principal::service(CODEBUILD_SERVICE));

    let (build, deploy) = match options.permissions {
        PermissionMode::Managed => (
            build.with_managed_policy(ManagedPolicy::ContainerRegistryPowerUser),
            deploy.with_managed_policy(ManagedPolicy::LambdaFullAccess),
        ),
        PermissionMode::LeastPrivilege => (
            build
                .with_grant(Grant::new(
                    [Capability::RegistryAuthenticate],
                    ResourceScope::Any,
                ))
                .with_grant(Grant::new(
                    [Capability::RegistryPull, Capability::RegistryPush],
                    ResourceScope::Repository(options.ecr_repository.clone()),
                )),
            deploy.with_grant(Grant::new(
                [Capability::FunctionUpdateCode],
                ResourceScope::Function(options.function_name.clone()),
            )),
        ),
    };

    BTreeMap::from([
        (BUILD_ROLE_ID.to_string(), with_baseline(build)),
        (DEPLOY_ROLE_ID.to_string(), with_baseline(deploy)),
    ])
}
