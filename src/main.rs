// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

//! lambda-pipeline - Container build and deploy pipeline declaration
//!
//! Declare, check and synthesize a source → build → deploy pipeline.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lambda_pipeline::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; stdout carries templates and reports
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lambda_pipeline=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    lambda_pipeline::utils::configure_colors();

    let cli = Cli::parse();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    let config = cli.config.as_deref();

    // Dispatch to command handlers
    match cli.command {
        Commands::Synth {
            stack_id,
            format,
            output,
        } => lambda_pipeline::cli::synth::run(config, stack_id, format, output, cli.verbose).await,
        Commands::Validate { strict } => {
            lambda_pipeline::cli::validate::run(config, strict, cli.verbose).await
        }
        Commands::Graph { format } => {
            lambda_pipeline::cli::graph::run(config, format, cli.verbose).await
        }
        Commands::Plan {
            vars,
            context,
            require_context,
            format,
        } => {
            lambda_pipeline::cli::plan::run(config, vars, context, require_context, format, cli.verbose)
                .await
        }
        Commands::Roles { format } => {
            lambda_pipeline::cli::roles::run(config, format, cli.verbose).await
        }
        Commands::Init { format, force } => {
            lambda_pipeline::cli::init::run(format, force, cli.verbose).await
        }
    }
}
