// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

//! Init command - write a default options file

use colored::Colorize;
use miette::Result;
use std::path::Path;

use super::ConfigFormat;
use crate::config::StackOptions;
use crate::errors::StackError;
use crate::utils::print_success;

/// Run the init command
pub async fn run(format: ConfigFormat, force: bool, verbose: bool) -> Result<()> {
    let file_name = format.file_name();

    println!("{}", "Initializing lambda-pipeline options...".bold());
    println!();

    if Path::new(file_name).exists() && !force {
        return Err(miette::miette!(
            "{} already exists. Use --force to overwrite.",
            file_name
        ));
    }

    let options = StackOptions::default();
    let body = match format {
        ConfigFormat::Toml => options.to_toml()?,
        ConfigFormat::Yaml => options.to_yaml()?,
    };
    let content = format!("{}{}", HEADER, body);

    tokio::fs::write(file_name, &content)
        .await
        .map_err(|e| StackError::FileWriteError {
            path: file_name.into(),
            error: e.to_string(),
        })?;

    print_success(&format!("Created {}", file_name));

    println!();
    println!("{}", "Options initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to match your repository and function", file_name.cyan());
    println!("  2. Run {} to check the declaration", "lambda-pipeline validate".cyan());
    println!("  3. Run {} to emit the template", "lambda-pipeline synth".cyan());
    if format == ConfigFormat::Yaml {
        println!(
            "  Pass {} to other commands; only {} is picked up automatically",
            format!("--config {}", file_name).cyan(),
            ConfigFormat::Toml.file_name()
        );
    }
    println!();

    if verbose {
        println!("{}", "Generated options:".dimmed());
        println!("{}", "─".repeat(50).dimmed());
        println!("{}", content.dimmed());
    }

    Ok(())
}

const HEADER: &str = "# lambda-pipeline stack options\n\
    # permissions: \"managed\" or \"least-privilege\"\n\
    # branch_binding: \"fixed\" or \"variable\"\n\
    # trigger: \"external\", \"events\" or \"poll\"\n\n";
