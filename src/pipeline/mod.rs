// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

//! Pipeline analysis
//!
//! Stage ordering, graph validation and execution planning over a
//! declared [`ResourceGraph`](crate::model::ResourceGraph).

mod dag;
mod plan;
mod validation;

pub use dag::{DagBuilder, StageEdge};
pub use plan::{
    find_context_tokens, parse_assignments, ExecutionPlan, ExecutionPlanner, PlannedCommand,
    PlannedStep, PlannedWork, RunRequest,
};
pub use validation::{PipelineValidator, ValidationResult, ValidationWarning, WarningKind};
