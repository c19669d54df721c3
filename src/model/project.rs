// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

//! Build projects
//!
//! A build project is an isolated, ephemeral environment that runs a
//! phased shell script under one role.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::Capability;

/// Build spec schema version understood by the build service
pub const BUILD_SPEC_VERSION: &str = "0.2";

/// Curated image with a Docker daemon available
pub const STANDARD_IMAGE: &str = "aws/codebuild/standard:5.0";

/// Build spec phases, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildPhase {
    Install,
    PreBuild,
    Build,
    PostBuild,
}

impl BuildPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::PreBuild => "pre_build",
            Self::Build => "build",
            Self::PostBuild => "post_build",
        }
    }
}

impl std::fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Files a build spec hands to the output artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFiles {
    pub files: Vec<String>,
}

/// Phased command script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpec {
    pub version: String,

    pub phases: BTreeMap<BuildPhase, Vec<String>>,

    #[serde(default)]
    pub artifacts: Option<ArtifactFiles>,
}

impl Default for BuildSpec {
    fn default() -> Self {
        Self {
            version: BUILD_SPEC_VERSION.to_string(),
            phases: BTreeMap::new(),
            artifacts: None,
        }
    }
}

impl BuildSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append commands to a phase
    pub fn phase<I, S>(mut self, phase: BuildPhase, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.phases
            .entry(phase)
            .or_default()
            .extend(commands.into_iter().map(Into::into));
        self
    }

    pub fn with_artifact_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.artifacts = Some(ArtifactFiles {
            files: files.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// All commands in execution order, tagged with their phase
    pub fn commands(&self) -> impl Iterator<Item = (BuildPhase, &str)> {
        self.phases
            .iter()
            .flat_map(|(phase, cmds)| cmds.iter().map(move |c| (*phase, c.as_str())))
    }

    /// Whether the script hands any files to its output artifact
    pub fn writes_artifacts(&self) -> bool {
        self.artifacts.as_ref().is_some_and(|a| !a.files.is_empty())
    }

    /// Document form consumed by the build service
    pub fn to_document(&self) -> Value {
        let phases: serde_json::Map<String, Value> = self
            .phases
            .iter()
            .map(|(phase, cmds)| (phase.as_str().to_string(), json!({ "commands": cmds })))
            .collect();

        let mut doc = json!({
            "version": self.version,
            "phases": phases,
        });

        if let Some(ref artifacts) = self.artifacts {
            doc["artifacts"] = json!({ "files": artifacts.files });
        }

        doc
    }
}

/// Compute size of the build host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeType {
    #[default]
    Small,
    Medium,
    Large,
}

impl ComputeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Small => "BUILD_GENERAL1_SMALL",
            Self::Medium => "BUILD_GENERAL1_MEDIUM",
            Self::Large => "BUILD_GENERAL1_LARGE",
        }
    }
}

/// Execution environment of a build project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildEnvironment {
    pub image: String,

    #[serde(default)]
    pub compute_type: ComputeType,

    /// Needed to run a Docker daemon inside the build
    #[serde(default)]
    pub privileged: bool,
}

impl BuildEnvironment {
    pub fn standard(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            compute_type: ComputeType::default(),
            privileged: false,
        }
    }

    pub fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }
}

/// Build project bound to one role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildProject {
    /// Logical id of the project resource
    pub logical_id: String,

    /// Logical id of the role the project runs as
    pub role: String,

    pub environment: BuildEnvironment,

    pub spec: BuildSpec,

    /// Capabilities the script needs to succeed
    #[serde(default)]
    pub required_capabilities: BTreeSet<Capability>,
}
