// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

//! Recovery suggestions
//!
//! Turns validation warnings into concrete next steps.

use crate::model::reference_to;
use crate::pipeline::WarningKind;

/// A recovery suggestion with concrete steps
#[derive(Debug, Clone)]
pub struct RecoverySuggestion {
    /// Brief description of what to do
    pub action: String,
    /// Detailed steps
    pub steps: Vec<String>,
    /// Commands or option snippets to apply
    pub commands: Vec<String>,
}

impl RecoverySuggestion {
    /// Pick the suggestion matching a validation warning
    pub fn for_warning(kind: &WarningKind) -> Self {
        match kind {
            WarningKind::DecoupledBranch { branch, variable } => {
                Self::bind_branch_variable(branch, variable)
            }
            WarningKind::UnresolvedPlaceholder { token } => {
                Self::supply_context(std::slice::from_ref(token))
            }
            WarningKind::UnwrittenArtifact { artifact, project } => {
                Self::write_artifact(artifact, project)
            }
            WarningKind::ExcessCapability { role, .. } => Self::tighten_role(role),
            WarningKind::CloneDirectoryMismatch { cloned, entered } => {
                Self::fix_clone_directory(cloned, entered)
            }
            WarningKind::TriggerBranchMismatch { trigger, source } => {
                Self::align_trigger_branch(trigger, source)
            }
        }
    }

    /// Suggest binding the source branch to the branch variable
    pub fn bind_branch_variable(branch: &str, variable: &str) -> Self {
        Self {
            action: "Bind the source branch to the branch variable".into(),
            steps: vec![
                format!(
                    "The source action always fetches '{}' while builds clone '{}'",
                    branch,
                    reference_to(variable)
                ),
                "Overriding the variable changes what is built but not what triggered the run".into(),
            ],
            commands: vec![
                "# lambda-pipeline.toml".into(),
                "branch_binding = \"variable\"".into(),
            ],
        }
    }

    /// Suggest supplying literal placeholder tokens at plan time
    pub fn supply_context(tokens: &[String]) -> Self {
        Self {
            action: format!("Supply context for {}", tokens.join(", ")),
            steps: vec![
                "Build scripts contain literal placeholder tokens".into(),
                "The execution environment must provide them out-of-band".into(),
            ],
            commands: tokens
                .iter()
                .map(|t| format!("lambda-pipeline plan --context {}=<value>", t))
                .collect(),
        }
    }

    /// Suggest populating a declared output artifact
    pub fn write_artifact(artifact: &str, project: &str) -> Self {
        Self {
            action: format!("Populate artifact '{}'", artifact),
            steps: vec![
                format!(
                    "Project '{}' declares '{}' as output but its build spec lists no files",
                    project, artifact
                ),
                "Downstream stages receive an empty bundle".into(),
            ],
            commands: vec![
                "# lambda-pipeline.toml".into(),
                "emit_image_detail = true".into(),
            ],
        }
    }

    /// Suggest replacing managed policies with explicit grants
    pub fn tighten_role(role: &str) -> Self {
        Self {
            action: format!("Tighten role '{}'", role),
            steps: vec![
                "The role grants capabilities its project never uses".into(),
                "Explicit grants scoped to the repository and function close the gap".into(),
            ],
            commands: vec![
                "# lambda-pipeline.toml".into(),
                "permissions = \"least-privilege\"".into(),
                "".into(),
                "# Inspect grants:".into(),
                "lambda-pipeline roles".into(),
            ],
        }
    }

    /// Suggest aligning the clone target with the directory the script enters
    pub fn fix_clone_directory(cloned: &str, entered: &str) -> Self {
        Self {
            action: "Align the clone directory".into(),
            steps: vec![
                format!("git clone creates '{}' but the script runs 'cd {}'", cloned, entered),
                "The build fails as soon as it changes directory".into(),
            ],
            commands: vec![
                "# lambda-pipeline.toml".into(),
                format!("clone_directory = \"{}\"", cloned),
            ],
        }
    }

    /// Suggest pointing the event rule and the source action at one branch
    pub fn align_trigger_branch(trigger: &str, source: &str) -> Self {
        Self {
            action: "Align the trigger branch with the source branch".into(),
            steps: vec![
                format!("Pushes to '{}' start runs that fetch '{}'", trigger, source),
                "Either the rule or the branch variable default should change".into(),
            ],
            commands: vec![
                "# lambda-pipeline.toml".into(),
                format!("source_branch = \"{}\"", source),
                "".into(),
                "# or".into(),
                "[variables]".into(),
                format!("branch_name = \"{}\"", trigger),
            ],
        }
    }
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "→ {}", self.action)?;

        for step in &self.steps {
            writeln!(f, "  {}", step)?;
        }

        if !self.commands.is_empty() {
            writeln!(f)?;
            for cmd in &self.commands {
                writeln!(f, "  {}", cmd)?;
            }
        }

        Ok(())
    }
}
