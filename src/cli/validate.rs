// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

//! Validate command - check the declared resource graph

use colored::Colorize;
use miette::Result;
use std::path::Path;

use super::DEFAULT_STACK_ID;
use crate::errors::{RecoverySuggestion, StackError};
use crate::pipeline::PipelineValidator;
use crate::stack::{PipelineStack, Scope};
use crate::utils::{print_error, print_hint, print_section, print_success, print_warning};

/// Run the validate command
pub async fn run(config: Option<&Path>, strict: bool, verbose: bool) -> Result<()> {
    println!("{}", "Validating pipeline...".bold());
    println!();

    let options = super::load_options(config)?;
    print_success("Options loaded");

    let graph = match PipelineStack::synthesize(&Scope::root(), DEFAULT_STACK_ID, &options) {
        Ok(g) => g,
        Err(StackError::InvalidGraph { errors }) => {
            print_section("Errors");
            for error in &errors {
                print_error(error);
            }
            println!();
            return Err(miette::miette!("Pipeline validation failed"));
        }
        Err(e) => return Err(e.into()),
    };

    print_success("Resource graph declared");

    let validation = PipelineValidator::validate(&graph)?;

    if validation.has_warnings() {
        print_section("Warnings");
        for warning in &validation.warnings {
            print_warning(&warning.message);
            print_hint(&RecoverySuggestion::for_warning(&warning.kind).to_string());
        }
    }

    if verbose {
        print_section("Pipeline summary");
        println!("  Name: {}", graph.pipeline.name);
        println!("  Stages: {}", graph.pipeline.stages.len());
        for stage in &graph.pipeline.stages {
            let inputs: Vec<String> = stage.inputs().map(|a| a.to_string()).collect();
            let deps = if inputs.is_empty() {
                String::new()
            } else {
                format!(" [consumes: {}]", inputs.join(", "))
            };
            let providers: Vec<&str> = stage.actions.iter().map(|a| a.provider()).collect();
            println!(
                "    - {} ({}){}",
                stage.name,
                providers.join(", "),
                deps.dimmed()
            );
        }
        println!("  Fingerprint: {}", graph.fingerprint()?.dimmed());
    }

    println!();

    if validation.has_warnings() {
        if strict {
            Err(miette::miette!(
                "Pipeline has {} warning(s) and --strict is set",
                validation.warnings.len()
            ))
        } else {
            println!("{}", "Pipeline is valid but has warnings.".yellow().bold());
            Ok(())
        }
    } else {
        println!("{}", "Pipeline is valid!".green().bold());
        Ok(())
    }
}
