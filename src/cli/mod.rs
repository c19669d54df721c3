// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for lambda-pipeline.

pub mod graph;
pub mod init;
pub mod plan;
pub mod roles;
pub mod synth;
pub mod validate;

use clap::{Parser, Subcommand, ValueEnum};
use miette::Result;
use std::path::{Path, PathBuf};

use crate::config::{StackOptions, DEFAULT_CONFIG_FILE};
use crate::model::ResourceGraph;
use crate::stack::{PipelineStack, Scope};

/// Stack id used when none is given
pub const DEFAULT_STACK_ID: &str = "FastAPILambdaPipelineStack";

/// Source to container image to function pipeline
///
/// Declares, checks and synthesizes the pipeline resource graph.
#[derive(Parser, Debug)]
#[clap(
    name = "lambda-pipeline",
    version,
    about = "Declare a source → Docker build → Lambda deploy pipeline and synthesize it",
    long_about = None,
    after_help = "Examples:\n\
        lambda-pipeline init                     Write a default lambda-pipeline.toml\n\
        lambda-pipeline validate                 Check the declaration\n\
        lambda-pipeline synth -o template.json   Emit the CloudFormation template\n\
        lambda-pipeline plan --var ecrTag=v2     Preview one run\n\n\
        See 'lambda-pipeline <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Options file (default: lambda-pipeline.toml when present)
    #[clap(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Synthesize the CloudFormation template
    Synth {
        /// Stack identifier
        #[clap(long, default_value = DEFAULT_STACK_ID)]
        stack_id: String,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = TemplateFormat::Json)]
        format: TemplateFormat,

        /// Output file (default: stdout)
        #[clap(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate the declared resource graph
    Validate {
        /// Treat warnings as failures
        #[clap(long)]
        strict: bool,
    },

    /// Show stage dependencies as a graph
    Graph {
        /// Output format
        #[clap(short, long, value_enum, default_value_t = GraphFormat::Text)]
        format: GraphFormat,
    },

    /// Resolve variables and commands for one run
    Plan {
        /// Runtime variable override (NAME=VALUE)
        #[clap(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,

        /// Value for a context placeholder (TOKEN=VALUE)
        #[clap(long = "context", value_name = "TOKEN=VALUE")]
        context: Vec<String>,

        /// Fail when a placeholder stays unresolved
        #[clap(long)]
        require_context: bool,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show role capabilities against project needs
    Roles {
        /// Output format
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Write a default options file
    Init {
        /// File format
        #[clap(long, value_enum, default_value_t = ConfigFormat::Toml)]
        format: ConfigFormat,

        /// Overwrite an existing file
        #[clap(long)]
        force: bool,
    },
}

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

/// Template output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TemplateFormat {
    Json,
    Yaml,
}

/// Options file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Toml,
    Yaml,
}

impl ConfigFormat {
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Toml => DEFAULT_CONFIG_FILE,
            Self::Yaml => "lambda-pipeline.yaml",
        }
    }
}

/// Load stack options from an explicit file or the working directory
pub fn load_options(config: Option<&Path>) -> Result<StackOptions> {
    let options = match config {
        Some(path) => StackOptions::from_file(path)?,
        None => {
            let cwd = std::env::current_dir()
                .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;
            StackOptions::discover(&cwd)?
        }
    };
    Ok(options)
}

/// Declare the resource graph from the loaded options
pub fn declare(config: Option<&Path>, stack_id: &str) -> Result<ResourceGraph> {
    let options = load_options(config)?;
    let graph = PipelineStack::synthesize(&Scope::root(), stack_id, &options)?;
    Ok(graph)
}
