// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

//! Resource graph validation
//!
//! Errors make a graph unusable and fail construction. Warnings flag
//! declarations that are valid but leave a gap the operator should know
//! about.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

use crate::errors::StackError;
use crate::model::{
    Action, ActionKind, BranchBinding, BuildProject, Capability, CapabilityDomain, Principal,
    ResourceGraph, Role, BRANCH_VARIABLE, CODEBUILD_SERVICE, CODEPIPELINE_SERVICE,
    EVENTS_SERVICE,
};
use crate::pipeline::DagBuilder;

/// Resource graph validator
pub struct PipelineValidator;

impl PipelineValidator {
    /// Validate a resource graph
    pub fn validate(graph: &ResourceGraph) -> Result<ValidationResult, StackError> {
        let mut result = ValidationResult::new();
        let stages = &graph.pipeline.stages;

        // Check stage count
        if stages.is_empty() {
            result.add_error("Pipeline has no stages defined");
        } else if stages.len() < 2 {
            result.add_error("Pipeline needs at least two stages");
        }

        // Check for duplicate stage names
        let mut seen_names = HashSet::new();
        for stage in stages {
            if !seen_names.insert(&stage.name) {
                result.add_error(&format!("Duplicate stage name: '{}'", stage.name));
            }
        }

        // Validate DAG structure (checks for cycles and unknown artifacts)
        match DagBuilder::build(graph) {
            Ok(_) => {}
            Err(StackError::CircularDependency { stages }) => {
                result.add_error(&format!(
                    "Circular dependency: {} consume artifacts produced at or after their own position",
                    stages.join(", ")
                ));
            }
            Err(StackError::UnknownArtifact { stage, artifact }) => {
                result.add_error(&format!(
                    "Stage '{}' consumes artifact '{}' which no stage produces",
                    stage, artifact
                ));
            }
            Err(e) => {
                result.add_error(&format!("DAG validation error: {}", e));
            }
        }

        Self::validate_artifact_chain(graph, &mut result);

        // Validate each stage and its actions
        for (idx, stage) in stages.iter().enumerate() {
            if stage.actions.is_empty() {
                result.add_error(&format!("Stage '{}' has no actions", stage.name));
            }

            let mut action_names = HashSet::new();
            for action in &stage.actions {
                if !action_names.insert(&action.name) {
                    result.add_error(&format!(
                        "Stage '{}': Duplicate action name '{}'",
                        stage.name, action.name
                    ));
                }
                Self::validate_action(graph, idx, &stage.name, action, &mut result);
            }
        }

        // Validate projects and the roles they run as
        let mut role_users: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for project in graph.projects.values() {
            role_users
                .entry(project.role.as_str())
                .or_default()
                .push(project.logical_id.as_str());
            Self::validate_project(graph, project, &mut result);
        }
        for (role, users) in &role_users {
            if users.len() > 1 {
                result.add_error(&format!(
                    "Role '{}' is shared by projects {}; each role serves exactly one build environment",
                    role,
                    users.join(", ")
                ));
            }
        }

        Self::validate_service_roles(graph, &mut result);

        // Surface tokens the execution environment must provide
        for token in &graph.required_context {
            result.add_warning(
                WarningKind::UnresolvedPlaceholder {
                    token: token.clone(),
                },
                &format!(
                    "Build scripts use placeholder '{}' which this declaration does not supply",
                    token
                ),
            );
        }

        debug!(
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "validated resource graph"
        );

        Ok(result)
    }

    /// Every artifact has one producer and at least one consumer
    fn validate_artifact_chain(graph: &ResourceGraph, result: &mut ValidationResult) {
        let producers = graph.producers();
        let consumers = graph.consumers();

        for (artifact, produced_by) in &producers {
            if produced_by.len() > 1 {
                let names: Vec<&str> = produced_by.iter().map(|(_, a)| *a).collect();
                result.add_error(&format!(
                    "Artifact '{}' has {} producers ({}); exactly one is allowed",
                    artifact,
                    produced_by.len(),
                    names.join(", ")
                ));
            }
            if !consumers.contains_key(artifact) {
                result.add_error(&format!(
                    "Artifact '{}' is produced but never consumed",
                    artifact
                ));
            }
        }
    }

    /// Validate a single action
    fn validate_action(
        graph: &ResourceGraph,
        stage_idx: usize,
        stage_name: &str,
        action: &Action,
        result: &mut ValidationResult,
    ) {
        match &action.kind {
            ActionKind::Source { branch, .. } => {
                if stage_idx != 0 {
                    result.add_error(&format!(
                        "Stage '{}': Source action '{}' must be in the first stage",
                        stage_name, action.name
                    ));
                }
                if !action.inputs.is_empty() {
                    result.add_error(&format!(
                        "Stage '{}': Source action '{}' cannot consume artifacts",
                        stage_name, action.name
                    ));
                }
                if action.outputs.len() != 1 {
                    result.add_error(&format!(
                        "Stage '{}': Source action '{}' must produce exactly one artifact",
                        stage_name, action.name
                    ));
                }

                match branch {
                    BranchBinding::Variable(name) if !graph.pipeline.variables.contains(name) => {
                        result.add_error(&format!(
                            "Stage '{}': Source branch references undeclared variable '{}'",
                            stage_name, name
                        ));
                    }
                    BranchBinding::Fixed(fixed)
                        if graph.pipeline.variables.contains(BRANCH_VARIABLE) =>
                    {
                        result.add_warning(
                            WarningKind::DecoupledBranch {
                                branch: fixed.clone(),
                                variable: BRANCH_VARIABLE.to_string(),
                            },
                            &format!(
                                "Stage '{}': Source branch is fixed to '{}' while variable '{}' \
                                 only reaches build environments",
                                stage_name, fixed, BRANCH_VARIABLE
                            ),
                        );
                    }
                    _ => {}
                }

                if let Some(rule) = &graph.trigger {
                    let fetched = match branch {
                        BranchBinding::Fixed(fixed) => Some(fixed.as_str()),
                        BranchBinding::Variable(name) => graph
                            .pipeline
                            .variables
                            .get(name)
                            .map(|v| v.default_value.as_str()),
                    };
                    if let Some(fetched) = fetched.filter(|b| *b != rule.branch) {
                        result.add_warning(
                            WarningKind::TriggerBranchMismatch {
                                trigger: rule.branch.clone(),
                                source: fetched.to_string(),
                            },
                            &format!(
                                "Stage '{}': Rule '{}' starts runs on pushes to '{}' but \
                                 Source action '{}' fetches '{}' by default",
                                stage_name, rule.logical_id, rule.branch, action.name, fetched
                            ),
                        );
                    }
                }
            }
            ActionKind::Build {
                project,
                environment,
            } => {
                if stage_idx == 0 {
                    result.add_error(&format!(
                        "Stage '{}': The first stage may only contain source actions",
                        stage_name
                    ));
                }
                if action.inputs.is_empty() {
                    result.add_error(&format!(
                        "Stage '{}': Build action '{}' has no input artifact",
                        stage_name, action.name
                    ));
                }

                for (name, value) in environment {
                    if let Some(var) = value.referenced_variable() {
                        if !graph.pipeline.variables.contains(var) {
                            result.add_error(&format!(
                                "Stage '{}': Environment entry '{}' references undeclared variable '{}'",
                                stage_name, name, var
                            ));
                        }
                    }
                }

                match graph.projects.get(project) {
                    None => result.add_error(&format!(
                        "Stage '{}': Action '{}' references unknown build project '{}'",
                        stage_name, action.name, project
                    )),
                    Some(p) if !p.spec.writes_artifacts() => {
                        for artifact in &action.outputs {
                            result.add_warning(
                                WarningKind::UnwrittenArtifact {
                                    artifact: artifact.name().to_string(),
                                    project: p.logical_id.clone(),
                                },
                                &format!(
                                    "Stage '{}': Artifact '{}' is declared as output but project '{}' writes no files to it",
                                    stage_name, artifact, p.logical_id
                                ),
                            );
                        }
                    }
                    Some(_) => {}
                }
            }
        }
    }

    /// Validate a build project against its role
    fn validate_project(
        graph: &ResourceGraph,
        project: &BuildProject,
        result: &mut ValidationResult,
    ) {
        let Some(role) = graph.role_for(project) else {
            let error = StackError::UnknownRole {
                project: project.logical_id.clone(),
                role: project.role.clone(),
            };
            result.add_error(&error.to_string());
            return;
        };

        if role.principal != Principal::service(CODEBUILD_SERVICE) {
            result.add_error(&format!(
                "Role '{}' used by project '{}' is not trusted by {}",
                role.logical_id, project.logical_id, CODEBUILD_SERVICE
            ));
        }

        let missing = role.missing_from(&project.required_capabilities);
        if !missing.is_empty() {
            result.add_error(&format!(
                "Role '{}' lacks capabilities project '{}' needs: {}",
                role.logical_id,
                project.logical_id,
                join_capabilities(&missing)
            ));
        }

        for domain in [CapabilityDomain::Registry, CapabilityDomain::Function] {
            let needed = project
                .required_capabilities
                .iter()
                .any(|c| c.domain() == domain);
            if role.grants_domain(domain) && !needed {
                result.add_error(&format!(
                    "Role '{}' grants {} capabilities but project '{}' needs none",
                    role.logical_id, domain, project.logical_id
                ));
            }
        }

        let excess = role.excess_over(&project.required_capabilities);
        if !excess.is_empty() {
            result.add_warning(
                WarningKind::ExcessCapability {
                    role: role.logical_id.clone(),
                    capabilities: excess.iter().copied().collect(),
                },
                &format!(
                    "Role '{}' grants more than project '{}' uses: {}",
                    role.logical_id,
                    project.logical_id,
                    join_capabilities(&excess)
                ),
            );
        }

        Self::check_clone_directory(project, result);
    }

    /// The pipeline role and the trigger role exist and trust the right service
    fn validate_service_roles(graph: &ResourceGraph, result: &mut ValidationResult) {
        check_service_role(
            graph.roles.get(&graph.pipeline.role),
            &graph.pipeline.role,
            CODEPIPELINE_SERVICE,
            Capability::ArtifactStoreReadWrite,
            result,
        );

        if let Some(ref trigger) = graph.trigger {
            check_service_role(
                graph.roles.get(&trigger.role),
                &trigger.role,
                EVENTS_SERVICE,
                Capability::PipelineStart,
                result,
            );
        }
    }

    /// `git clone <url>` followed by `cd <dir>` must agree on the directory
    fn check_clone_directory(project: &BuildProject, result: &mut ValidationResult) {
        let commands: Vec<&str> = project.spec.commands().map(|(_, c)| c).collect();

        for pair in commands.windows(2) {
            let (clone, next) = (pair[0].trim(), pair[1].trim());
            if !clone.starts_with("git clone ") {
                continue;
            }
            let Some(entered) = next.strip_prefix("cd ").map(str::trim) else {
                continue;
            };
            let Some(target) = clone.split_whitespace().last() else {
                continue;
            };

            let cloned = if target.contains("://") {
                target
                    .trim_end_matches('/')
                    .rsplit('/')
                    .next()
                    .unwrap_or(target)
                    .trim_end_matches(".git")
            } else {
                target
            };

            if cloned != entered {
                result.add_warning(
                    WarningKind::CloneDirectoryMismatch {
                        cloned: cloned.to_string(),
                        entered: entered.to_string(),
                    },
                    &format!(
                        "Project '{}': 'git clone' creates '{}' but the script enters '{}'",
                        project.logical_id, cloned, entered
                    ),
                );
            }
        }
    }
}

fn check_service_role(
    role: Option<&Role>,
    logical_id: &str,
    service: &str,
    capability: Capability,
    result: &mut ValidationResult,
) {
    match role {
        None => result.add_error(&format!("Service role '{}' is not declared", logical_id)),
        Some(role) => {
            if role.principal != Principal::service(service) {
                result.add_error(&format!(
                    "Role '{}' must be trusted by {}",
                    logical_id, service
                ));
            }
            if !role.grants_capability(capability) {
                result.add_error(&format!(
                    "Role '{}' lacks capability {}",
                    logical_id, capability
                ));
            }
        }
    }
}

fn join_capabilities(caps: &BTreeSet<Capability>) -> String {
    caps.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(", ")
}

/// Category of a validation warning, with the details needed to fix it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    /// Source branch is a literal while a branch variable exists
    DecoupledBranch { branch: String, variable: String },
    /// A literal token must come from the execution environment
    UnresolvedPlaceholder { token: String },
    /// A declared output artifact receives no files
    UnwrittenArtifact { artifact: String, project: String },
    /// A role grants more than its project needs
    ExcessCapability {
        role: String,
        capabilities: Vec<Capability>,
    },
    /// The build script enters a directory other than the one it cloned
    CloneDirectoryMismatch { cloned: String, entered: String },
    /// The event rule watches a different branch than the source fetches
    TriggerBranchMismatch { trigger: String, source: String },
}

/// A validation warning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    pub kind: WarningKind,
    pub message: String,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result of graph validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, kind: WarningKind, message: &str) {
        self.warnings.push(ValidationWarning {
            kind,
            message: message.to_string(),
        });
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
