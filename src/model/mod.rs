// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

//! Resource model
//!
//! Typed descriptors for everything a stack declares: variables,
//! artifacts, roles, build projects, stages and the graph tying them
//! together.

mod artifact;
mod graph;
mod project;
mod role;
mod stage;
mod variable;

pub use artifact::{ArtifactHandle, ArtifactStore};
pub use graph::{PipelineDecl, RepositoryRef, ResourceGraph, TriggerRule};
pub use project::{
    ArtifactFiles, BuildEnvironment, BuildPhase, BuildProject, BuildSpec, ComputeType,
    BUILD_SPEC_VERSION, STANDARD_IMAGE,
};
pub use role::{
    Capability, CapabilityDomain, Grant, ManagedPolicy, PermissionMode, Principal, ResourceScope,
    Role, CODEBUILD_SERVICE, CODEPIPELINE_SERVICE, EVENTS_SERVICE,
};
pub use stage::{Action, ActionKind, BranchBinding, EnvValue, SourceTrigger, Stage};
pub use variable::{
    parse_reference, reference_to, ResolvedVariables, RuntimeVariable, VariableSet,
    BRANCH_VARIABLE, ECR_TAG_VARIABLE,
};
