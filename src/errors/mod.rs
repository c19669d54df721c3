// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

//! Error types with actionable messages
//!
//! Declaration-time failures are reported before any template is emitted,
//! each with a diagnostic code and, where possible, a hint towards the fix.

mod recovery;

pub use recovery::RecoverySuggestion;

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for stack operations
pub type StackResult<T> = Result<T, StackError>;

/// Main error type for lambda-pipeline
#[derive(Error, Debug, Diagnostic)]
pub enum StackError {
    // ─────────────────────────────────────────────────────────────────────────
    // Declaration Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Invalid stack id '{id}': {reason}")]
    #[diagnostic(
        code(lambda_pipeline::invalid_stack_id),
        help("Stack ids start with a letter and contain only letters, digits and '-'")
    )]
    InvalidStackId { id: String, reason: String },

    #[error("Invalid stack options: {reason}")]
    #[diagnostic(code(lambda_pipeline::invalid_options))]
    InvalidOptions {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Resource graph failed validation with {} error(s)", errors.len())]
    #[diagnostic(
        code(lambda_pipeline::invalid_graph),
        help("Run 'lambda-pipeline validate' for the full report")
    )]
    InvalidGraph { errors: Vec<String> },

    // ─────────────────────────────────────────────────────────────────────────
    // Variable Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Variable '{name}' is declared more than once")]
    #[diagnostic(code(lambda_pipeline::duplicate_variable))]
    DuplicateVariable { name: String },

    #[error("Invalid variable name '{name}'")]
    #[diagnostic(
        code(lambda_pipeline::invalid_variable_name),
        help("Variable names are 1-128 characters of letters, digits, '@', '_' or '-'")
    )]
    InvalidVariableName { name: String },

    #[error("Unknown variable '{name}'")]
    #[diagnostic(code(lambda_pipeline::unknown_variable))]
    UnknownVariable {
        name: String,
        #[help]
        help: Option<String>,
    },

    #[error("Malformed assignment '{input}', expected NAME=VALUE")]
    #[diagnostic(code(lambda_pipeline::malformed_assignment))]
    MalformedAssignment { input: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Topology Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Stage '{stage}' consumes artifact '{artifact}' which no stage produces")]
    #[diagnostic(
        code(lambda_pipeline::unknown_artifact),
        help("Declare '{artifact}' as an output of an earlier stage")
    )]
    UnknownArtifact { stage: String, artifact: String },

    #[error("Circular dependency detected")]
    #[diagnostic(
        code(lambda_pipeline::circular_dependency),
        help("An artifact is consumed before the stage that produces it runs")
    )]
    CircularDependency { stages: Vec<String> },

    #[error("Action '{action}' references unknown build project '{project}'")]
    #[diagnostic(code(lambda_pipeline::unknown_project))]
    UnknownProject { action: String, project: String },

    #[error("Build project '{project}' references unknown role '{role}'")]
    #[diagnostic(code(lambda_pipeline::unknown_role))]
    UnknownRole { project: String, role: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Planning Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Unresolved context tokens: {}", tokens.join(", "))]
    #[diagnostic(
        code(lambda_pipeline::unresolved_context),
        help("Supply each token with --context NAME=VALUE")
    )]
    UnresolvedContext { tokens: Vec<String> },

    // ─────────────────────────────────────────────────────────────────────────
    // File Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Options file not found: {path}")]
    #[diagnostic(
        code(lambda_pipeline::config_not_found),
        help("Create one with 'lambda-pipeline init'")
    )]
    ConfigNotFound { path: PathBuf },

    #[error("Unsupported options file format: {path}")]
    #[diagnostic(
        code(lambda_pipeline::unsupported_config_format),
        help("Supported formats: .toml, .yaml, .yml, .json")
    )]
    UnsupportedConfigFormat { path: PathBuf },

    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(lambda_pipeline::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(lambda_pipeline::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(lambda_pipeline::io_error))]
    Io { message: String },

    #[error("YAML error: {message}")]
    #[diagnostic(code(lambda_pipeline::yaml_error))]
    Yaml { message: String },

    #[error("JSON error: {message}")]
    #[diagnostic(code(lambda_pipeline::json_error))]
    Json { message: String },

    #[error("TOML error: {message}")]
    #[diagnostic(code(lambda_pipeline::toml_error))]
    Toml { message: String },

    #[error("Pattern error: {message}")]
    #[diagnostic(code(lambda_pipeline::pattern_error))]
    Pattern { message: String },
}

impl From<std::io::Error> for StackError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for StackError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for StackError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for StackError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl From<toml::ser::Error> for StackError {
    fn from(e: toml::ser::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl From<regex::Error> for StackError {
    fn from(e: regex::Error) -> Self {
        Self::Pattern { message: e.to_string() }
    }
}

impl StackError {
    /// Create an unknown variable error listing the declared names
    pub fn unknown_variable<'a>(name: &str, declared: impl IntoIterator<Item = &'a str>) -> Self {
        let declared: Vec<&str> = declared.into_iter().collect();
        let help = if declared.is_empty() {
            Some("This pipeline declares no variables".to_string())
        } else {
            Some(format!("Declared variables: {}", declared.join(", ")))
        };

        Self::UnknownVariable {
            name: name.to_string(),
            help,
        }
    }

    /// Create an invalid options error with a hint
    pub fn invalid_options(reason: impl Into<String>, help: impl Into<String>) -> Self {
        Self::InvalidOptions {
            reason: reason.into(),
            help: Some(help.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_variable_lists_declared() {
        let err = StackError::unknown_variable("branch", ["branchName", "ecrTag"]);
        match err {
            StackError::UnknownVariable { name, help } => {
                assert_eq!(name, "branch");
                assert!(help.unwrap().contains("branchName, ecrTag"));
            }
            _ => panic!("Expected UnknownVariable"),
        }
    }

    #[test]
    fn test_invalid_graph_message_counts_errors() {
        let err = StackError::InvalidGraph {
            errors: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.to_string(), "Resource graph failed validation with 2 error(s)");
    }
}
