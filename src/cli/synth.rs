// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

//! Synth command - emit the CloudFormation template

use colored::Colorize;
use miette::Result;
use std::path::{Path, PathBuf};
use tracing::info;

use super::TemplateFormat;
use crate::errors::StackError;
use crate::synth::Template;

/// Run the synth command
pub async fn run(
    config: Option<&Path>,
    stack_id: String,
    format: TemplateFormat,
    output: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    let graph = super::declare(config, &stack_id)?;
    let template = Template::synthesize(&graph)?;

    let rendered = match format {
        TemplateFormat::Json => template.to_json()?,
        TemplateFormat::Yaml => template.to_yaml()?,
    };

    match output {
        Some(path) => {
            tokio::fs::write(&path, &rendered)
                .await
                .map_err(|e| StackError::FileWriteError {
                    path: path.clone(),
                    error: e.to_string(),
                })?;
            info!(path = %path.display(), "wrote template");
            eprintln!("  {} Wrote {}", "✓".green(), path.display());
            if verbose {
                if let Some(fingerprint) = template.fingerprint() {
                    eprintln!("  Fingerprint: {}", fingerprint.dimmed());
                }
            }
        }
        None => println!("{}", rendered),
    }

    Ok(())
}
