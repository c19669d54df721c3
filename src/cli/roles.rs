// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

//! Roles command - compare granted capabilities with what projects need

use colored::Colorize;
use miette::Result;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

use super::{OutputFormat, DEFAULT_STACK_ID};
use crate::model::{Capability, ManagedPolicy, Principal, ResourceGraph};
use crate::utils::{print_error, print_success, print_warning};

/// Capability report for one role
#[derive(Debug, Serialize)]
pub struct RoleReport {
    pub role: String,
    pub principal: String,
    pub managed_policies: Vec<ManagedPolicy>,
    pub granted: BTreeSet<Capability>,
    /// Project running as this role, if any
    pub project: Option<String>,
    pub required: BTreeSet<Capability>,
    pub missing: BTreeSet<Capability>,
    pub excess: BTreeSet<Capability>,
}

impl RoleReport {
    /// One report per role, in logical id order
    pub fn collect(graph: &ResourceGraph) -> Vec<Self> {
        graph
            .roles
            .values()
            .map(|role| {
                let Principal::Service(ref principal) = role.principal;
                let project = graph.projects.values().find(|p| p.role == role.logical_id);
                let required = project
                    .map(|p| p.required_capabilities.clone())
                    .unwrap_or_default();
                let (missing, excess) = match project {
                    Some(_) => (role.missing_from(&required), role.excess_over(&required)),
                    None => (BTreeSet::new(), BTreeSet::new()),
                };

                Self {
                    role: role.logical_id.clone(),
                    principal: principal.clone(),
                    managed_policies: role.managed_policies.clone(),
                    granted: role.capabilities(),
                    project: project.map(|p| p.logical_id.clone()),
                    required,
                    missing,
                    excess,
                }
            })
            .collect()
    }
}

/// Run the roles command
pub async fn run(config: Option<&Path>, format: OutputFormat, verbose: bool) -> Result<()> {
    let graph = super::declare(config, DEFAULT_STACK_ID)?;
    let reports = RoleReport::collect(&graph);

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&reports)
                .map_err(|e| miette::miette!("Failed to serialize role report: {}", e))?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            for report in &reports {
                print_report(report, verbose);
            }
        }
    }

    Ok(())
}

fn join(caps: &BTreeSet<Capability>) -> String {
    caps.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(", ")
}

fn print_report(report: &RoleReport, verbose: bool) {
    println!("{} {}", report.role.bold(), format!("({})", report.principal).dimmed());

    if !report.managed_policies.is_empty() {
        let names: Vec<&str> = report.managed_policies.iter().map(|p| p.name()).collect();
        println!("  Managed: {}", names.join(", "));
    }

    if let Some(ref project) = report.project {
        println!("  Project: {}", project.cyan());
        if verbose {
            println!("  Required: {}", join(&report.required));
        }
        if report.missing.is_empty() {
            print_success("All required capabilities granted");
        } else {
            print_error(&format!("Missing: {}", join(&report.missing)));
        }
        if !report.excess.is_empty() {
            print_warning(&format!("Excess: {}", join(&report.excess)));
        }
    } else {
        println!("  Granted: {}", join(&report.granted));
    }

    println!();
}
