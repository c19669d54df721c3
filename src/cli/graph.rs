// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

//! Graph command - visualize stage dependencies

use miette::Result;
use std::path::Path;

use super::{GraphFormat, DEFAULT_STACK_ID};
use crate::pipeline::DagBuilder;

/// Run the graph command
pub async fn run(config: Option<&Path>, format: GraphFormat, _verbose: bool) -> Result<()> {
    let graph = super::declare(config, DEFAULT_STACK_ID)?;

    // Build DAG
    let dag = DagBuilder::build(&graph)?;

    // Output in requested format
    let output = match format {
        GraphFormat::Text => dag.to_text(&graph)?,
        GraphFormat::Dot => dag.to_dot(),
        GraphFormat::Mermaid => dag.to_mermaid(),
    };

    println!("{}", output);

    Ok(())
}
