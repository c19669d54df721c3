// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

//! Stages and the actions they run

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{parse_reference, reference_to, ArtifactHandle, RuntimeVariable};

/// Value of a stage environment entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum EnvValue {
    /// Literal text
    Plaintext(String),
    /// Resolved from a runtime variable at execution time
    Variable(String),
}

impl EnvValue {
    pub fn variable(variable: &RuntimeVariable) -> Self {
        Self::Variable(variable.name.clone())
    }

    /// Text handed to the pipeline engine
    pub fn expression(&self) -> String {
        match self {
            Self::Plaintext(v) => v.clone(),
            Self::Variable(name) => reference_to(name),
        }
    }

    /// Variable this value depends on, if any
    pub fn referenced_variable(&self) -> Option<&str> {
        match self {
            Self::Variable(name) => Some(name),
            Self::Plaintext(v) => parse_reference(v),
        }
    }
}

/// Where a source action takes its branch from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum BranchBinding {
    Fixed(String),
    Variable(String),
}

impl BranchBinding {
    pub fn expression(&self) -> String {
        match self {
            Self::Fixed(branch) => branch.clone(),
            Self::Variable(name) => reference_to(name),
        }
    }
}

/// How source changes start a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTrigger {
    /// Wired outside this declaration
    #[default]
    External,
    /// Event rule on pushes to the source branch
    Events,
    /// Engine polls the repository
    Poll,
}

/// What an action does
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ActionKind {
    /// Snapshot a repository branch into the output artifact
    Source {
        repository: String,
        branch: BranchBinding,
        #[serde(default)]
        trigger: SourceTrigger,
    },
    /// Run a build project
    Build {
        project: String,
        #[serde(default)]
        environment: BTreeMap<String, EnvValue>,
    },
}

/// A single unit of work inside a stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,

    #[serde(flatten)]
    pub kind: ActionKind,

    #[serde(default)]
    pub inputs: Vec<ArtifactHandle>,

    #[serde(default)]
    pub outputs: Vec<ArtifactHandle>,

    #[serde(default = "default_run_order")]
    pub run_order: u32,
}

fn default_run_order() -> u32 {
    1
}

impl Action {
    pub fn source(name: impl Into<String>, repository: impl Into<String>, branch: BranchBinding) -> Self {
        Self {
            name: name.into(),
            kind: ActionKind::Source {
                repository: repository.into(),
                branch,
                trigger: SourceTrigger::default(),
            },
            inputs: Vec::new(),
            outputs: Vec::new(),
            run_order: default_run_order(),
        }
    }

    pub fn build(name: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ActionKind::Build {
                project: project.into(),
                environment: BTreeMap::new(),
            },
            inputs: Vec::new(),
            outputs: Vec::new(),
            run_order: default_run_order(),
        }
    }

    pub fn with_trigger(mut self, trigger: SourceTrigger) -> Self {
        if let ActionKind::Source { trigger: ref mut t, .. } = self.kind {
            *t = trigger;
        }
        self
    }

    pub fn with_env(mut self, name: impl Into<String>, value: EnvValue) -> Self {
        if let ActionKind::Build {
            ref mut environment,
            ..
        } = self.kind
        {
            environment.insert(name.into(), value);
        }
        self
    }

    pub fn with_input(mut self, artifact: &ArtifactHandle) -> Self {
        self.inputs.push(artifact.clone());
        self
    }

    pub fn with_output(mut self, artifact: &ArtifactHandle) -> Self {
        self.outputs.push(artifact.clone());
        self
    }

    pub fn category(&self) -> &'static str {
        match self.kind {
            ActionKind::Source { .. } => "Source",
            ActionKind::Build { .. } => "Build",
        }
    }

    pub fn provider(&self) -> &'static str {
        match self.kind {
            ActionKind::Source { .. } => "CodeCommit",
            ActionKind::Build { .. } => "CodeBuild",
        }
    }

    pub fn is_source(&self) -> bool {
        matches!(self.kind, ActionKind::Source { .. })
    }

    /// Build project run by this action
    pub fn project(&self) -> Option<&str> {
        match &self.kind {
            ActionKind::Build { project, .. } => Some(project),
            ActionKind::Source { .. } => None,
        }
    }

    /// Environment entries; empty for source actions
    pub fn environment(&self) -> Option<&BTreeMap<String, EnvValue>> {
        match &self.kind {
            ActionKind::Build { environment, .. } => Some(environment),
            ActionKind::Source { .. } => None,
        }
    }
}

/// An ordered phase of the pipeline, gated on the previous stage's success
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub actions: Vec<Action>,
}

impl Stage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Artifacts consumed by any action in the stage
    pub fn inputs(&self) -> impl Iterator<Item = &ArtifactHandle> {
        self.actions.iter().flat_map(|a| a.inputs.iter())
    }

    /// Artifacts produced by any action in the stage
    pub fn outputs(&self) -> impl Iterator<Item = &ArtifactHandle> {
        self.actions.iter().flat_map(|a| a.outputs.iter())
    }

    pub fn action(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name == name)
    }
}
