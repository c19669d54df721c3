// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

//! # lambda-pipeline - Container build and deploy pipeline declaration
//!
//! `lambda-pipeline` declares a three-stage delivery pipeline (source
//! snapshot, Docker image build and push, function code update) as a
//! validated resource graph and synthesizes it into a CloudFormation
//! template.
//!
//! ## Features
//!
//! - **Runtime variables** - `branchName` and `ecrTag`, overridable per run
//! - **Artifact chain checks** - every stage consumes what the previous one produced
//! - **Capability model** - role grants compared with what each project needs
//! - **Run planning** - preview resolved environments and commands
//!
//! ## Quick Start
//!
//! ```bash
//! # Write default options
//! lambda-pipeline init
//!
//! # Check the declaration
//! lambda-pipeline validate
//!
//! # Emit the template
//! lambda-pipeline synth -o template.json
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod model;
pub mod pipeline;
pub mod stack;
pub mod synth;
pub mod utils;

// Re-export commonly used types
pub use config::StackOptions;
pub use errors::{StackError, StackResult};
pub use model::ResourceGraph;
pub use stack::{PipelineStack, Scope};
pub use synth::Template;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
