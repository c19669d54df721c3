// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

//! The resource graph
//!
//! A [`ResourceGraph`] is the complete, inert description of one stack:
//! the pipeline with its variables and stages, the build projects, the
//! roles they run as, and the repository they read from. It is a plain
//! value; two graphs built from the same inputs compare equal and share a
//! fingerprint.

use blake3::Hasher;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::errors::{StackError, StackResult};
use crate::model::{Action, ArtifactHandle, ArtifactStore, BuildProject, Role, Stage, VariableSet};
use crate::pipeline::PipelineValidator;

/// Existing source repository the pipeline reads from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub logical_id: String,
    pub name: String,
}

/// Event rule that starts the pipeline on pushes to the source branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRule {
    pub logical_id: String,
    /// Logical id of the role the rule assumes
    pub role: String,
    pub branch: String,
}

/// Pipeline declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDecl {
    /// Logical id of the pipeline resource
    pub logical_id: String,

    /// Physical pipeline name
    pub name: String,

    /// Logical id of the pipeline service role
    pub role: String,

    pub artifact_store: ArtifactStore,

    pub variables: VariableSet,

    /// Stages in execution order
    pub stages: Vec<Stage>,
}

/// Complete resource graph of one stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGraph {
    /// Stack identifier
    pub stack_id: String,

    /// Construct path of the stack (`scope/id`)
    pub path: String,

    pub pipeline: PipelineDecl,

    pub repository: RepositoryRef,

    /// Roles by logical id
    pub roles: BTreeMap<String, Role>,

    /// Build projects by logical id
    pub projects: BTreeMap<String, BuildProject>,

    #[serde(default)]
    pub trigger: Option<TriggerRule>,

    /// Literal tokens the execution environment must supply
    #[serde(default)]
    pub required_context: BTreeSet<String>,
}

impl ResourceGraph {
    /// Validate the graph, returning it only when no errors are found
    pub fn seal(self) -> StackResult<Self> {
        let result = PipelineValidator::validate(&self)?;
        if !result.is_valid() {
            return Err(StackError::InvalidGraph {
                errors: result.errors,
            });
        }
        Ok(self)
    }

    /// Get a stage by name
    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.pipeline.stages.iter().find(|s| s.name == name)
    }

    /// Mutable access to a stage by name
    pub fn stage_mut(&mut self, name: &str) -> Option<&mut Stage> {
        self.pipeline.stages.iter_mut().find(|s| s.name == name)
    }

    /// Stage names in declared order
    pub fn stage_names(&self) -> Vec<&str> {
        self.pipeline.stages.iter().map(|s| s.name.as_str()).collect()
    }

    /// All actions with the index of their stage
    pub fn actions(&self) -> impl Iterator<Item = (usize, &Stage, &Action)> {
        self.pipeline
            .stages
            .iter()
            .enumerate()
            .flat_map(|(i, s)| s.actions.iter().map(move |a| (i, s, a)))
    }

    /// Build project run by an action
    pub fn project_for(&self, action: &Action) -> Option<&BuildProject> {
        action.project().and_then(|p| self.projects.get(p))
    }

    /// Role a build project runs as
    pub fn role_for(&self, project: &BuildProject) -> Option<&Role> {
        self.roles.get(&project.role)
    }

    /// Producers of each artifact, as `(stage index, action name)`
    pub fn producers(&self) -> BTreeMap<&ArtifactHandle, Vec<(usize, &str)>> {
        let mut map: BTreeMap<&ArtifactHandle, Vec<(usize, &str)>> = BTreeMap::new();
        for (idx, _, action) in self.actions() {
            for artifact in &action.outputs {
                map.entry(artifact).or_default().push((idx, action.name.as_str()));
            }
        }
        map
    }

    /// Consumers of each artifact, as `(stage index, action name)`
    pub fn consumers(&self) -> BTreeMap<&ArtifactHandle, Vec<(usize, &str)>> {
        let mut map: BTreeMap<&ArtifactHandle, Vec<(usize, &str)>> = BTreeMap::new();
        for (idx, _, action) in self.actions() {
            for artifact in &action.inputs {
                map.entry(artifact).or_default().push((idx, action.name.as_str()));
            }
        }
        map
    }

    /// BLAKE3 hash of the canonical JSON form
    pub fn fingerprint(&self) -> StackResult<String> {
        let canonical = serde_json::to_vec(self)?;
        let mut hasher = Hasher::new();
        hasher.update(&canonical);
        Ok(hasher.finalize().to_hex().to_string())
    }

    pub fn to_json(&self) -> StackResult<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }

    pub fn from_json(json: &str) -> StackResult<Self> {
        serde_json::from_str(json).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::StackOptions;
    use crate::stack::{PipelineStack, Scope};

    fn graph() -> super::ResourceGraph {
        PipelineStack::synthesize(&Scope::root(), "TestStack", &StackOptions::default()).unwrap()
    }

    #[test]
    fn test_fingerprint_stable() {
        assert_eq!(graph().fingerprint().unwrap(), graph().fingerprint().unwrap());
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let a = graph();
        let mut b = graph();
        b.pipeline.name = "Other".into();
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }

    #[test]
    fn test_json_round_trip_preserves_graph() {
        let g = graph();
        let parsed = super::ResourceGraph::from_json(&g.to_json().unwrap()).unwrap();
        assert_eq!(parsed, g);
    }

    #[test]
    fn test_producers_and_consumers() {
        let g = graph();
        let producers = g.producers();
        let consumers = g.consumers();

        let source = producers
            .iter()
            .find(|(a, _)| a.name() == "SourceArtifact")
            .map(|(_, p)| p.clone())
            .unwrap();
        assert_eq!(source, vec![(0, "CodeCommit_Source")]);

        let build = consumers
            .iter()
            .find(|(a, _)| a.name() == "BuildArtifact")
            .map(|(_, c)| c.clone())
            .unwrap();
        assert_eq!(build, vec![(2, "Deploy")]);
    }
}
