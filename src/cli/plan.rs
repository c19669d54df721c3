// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

//! Plan command - preview one run with variables resolved

use colored::Colorize;
use miette::Result;
use std::path::Path;

use super::{OutputFormat, DEFAULT_STACK_ID};
use crate::errors::RecoverySuggestion;
use crate::pipeline::{parse_assignments, ExecutionPlan, ExecutionPlanner, PlannedWork, RunRequest};
use crate::utils::{print_hint, print_section, print_warning};

/// Run the plan command
pub async fn run(
    config: Option<&Path>,
    vars: Vec<String>,
    context: Vec<String>,
    require_context: bool,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let graph = super::declare(config, DEFAULT_STACK_ID)?;

    let request = RunRequest {
        overrides: parse_assignments(&vars)?,
        context: parse_assignments(&context)?,
        require_context,
    };

    let plan = ExecutionPlanner::new(&graph)?.plan(&request)?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&plan)
                .map_err(|e| miette::miette!("Failed to serialize plan: {}", e))?;
            println!("{}", json);
        }
        OutputFormat::Text => print_text(&plan, verbose),
    }

    Ok(())
}

fn print_text(plan: &ExecutionPlan, verbose: bool) {
    println!("{} {}", "Run plan for".bold(), plan.pipeline.cyan().bold());
    print_section("Variables");
    for (name, value) in plan.variables.iter() {
        println!("  {} = {}", name, value.green());
    }

    for (i, step) in plan.steps.iter().enumerate() {
        println!();
        println!("{}. {} / {}", i + 1, step.stage.bold(), step.action);

        match &step.work {
            PlannedWork::Source { repository, branch } => {
                println!("  Fetch {} @ {}", repository.cyan(), branch.green());
            }
            PlannedWork::Build {
                project,
                role,
                environment,
                commands,
            } => {
                println!("  Project {} as {}", project.cyan(), role.cyan());
                for (name, value) in environment {
                    println!("  {} {}={}", "env".dimmed(), name, value.green());
                }
                if verbose {
                    for cmd in commands {
                        println!("    [{}] {}", cmd.phase.as_str().dimmed(), cmd.command);
                    }
                } else {
                    println!("  {} command(s)", commands.len());
                }
            }
        }

        if !step.inputs.is_empty() {
            let inputs: Vec<&str> = step.inputs.iter().map(|a| a.name()).collect();
            println!("  {} {}", "consumes".dimmed(), inputs.join(", "));
        }
        if !step.outputs.is_empty() {
            let outputs: Vec<&str> = step.outputs.iter().map(|a| a.name()).collect();
            println!("  {} {}", "produces".dimmed(), outputs.join(", "));
        }
    }

    if !plan.unresolved.is_empty() {
        let tokens: Vec<String> = plan.unresolved.iter().cloned().collect();
        println!();
        print_warning(&format!("Unresolved placeholders: {}", tokens.join(", ")));
        print_hint(&RecoverySuggestion::supply_context(&tokens).to_string());
    }
}
