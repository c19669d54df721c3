// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

//! Stack options
//!
//! Everything a stack declaration can be parameterized with. Every field
//! has a default, so an empty file (or no file) yields the reference
//! pipeline.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::errors::{StackError, StackResult};
use crate::model::{PermissionMode, SourceTrigger, STANDARD_IMAGE};

/// File picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "lambda-pipeline.toml";

/// Where the source action takes its branch from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchBindingMode {
    /// Source branch is the literal `source_branch`
    #[default]
    Fixed,
    /// Source branch follows the `branchName` variable
    Variable,
}

/// Defaults of the two runtime variables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VariableDefaults {
    pub branch_name: String,
    pub ecr_tag: String,
}

impl Default for VariableDefaults {
    fn default() -> Self {
        Self {
            branch_name: "bronze".to_string(),
            ecr_tag: "latest".to_string(),
        }
    }
}

/// Options of one pipeline stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StackOptions {
    /// Physical pipeline name
    pub pipeline_name: String,

    /// Source repository name
    pub repository: String,

    /// Branch the source action fetches
    pub source_branch: String,

    pub branch_binding: BranchBindingMode,

    pub trigger: SourceTrigger,

    /// Repository path cloned by the build script
    pub clone_repository: String,

    /// Directory the build script enters after cloning
    pub clone_directory: String,

    /// Container registry repository receiving the image
    pub ecr_repository: String,

    /// Local image name used during the build
    pub image_name: String,

    /// Function updated by the deploy stage
    pub function_name: String,

    /// Build environment image
    pub build_image: String,

    pub permissions: PermissionMode,

    /// Write `imageDetail.json` into the build artifact
    pub emit_image_detail: bool,

    pub variables: VariableDefaults,
}

impl Default for StackOptions {
    fn default() -> Self {
        Self {
            pipeline_name: "CodePipelineFastAPILambda".to_string(),
            repository: "fast-api-lambda".to_string(),
            source_branch: "bronze".to_string(),
            branch_binding: BranchBindingMode::default(),
            trigger: SourceTrigger::default(),
            clone_repository: "fast-api-lambda-repo".to_string(),
            clone_directory: "fast-api-lambda".to_string(),
            ecr_repository: "fast-api-lambda-ecr".to_string(),
            image_name: "app".to_string(),
            function_name: "fast-api-lambda".to_string(),
            build_image: STANDARD_IMAGE.to_string(),
            permissions: PermissionMode::default(),
            emit_image_detail: false,
            variables: VariableDefaults::default(),
        }
    }
}

impl StackOptions {
    /// Load options from a file, picking the parser by extension
    pub fn from_file(path: &Path) -> StackResult<Self> {
        if !path.exists() {
            return Err(StackError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| StackError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        debug!(path = %path.display(), format = ext, "loading stack options");

        match ext {
            "toml" => Self::from_toml(&content),
            "yaml" | "yml" => Self::from_yaml(&content),
            "json" => serde_json::from_str(&content).map_err(Into::into),
            _ => Err(StackError::UnsupportedConfigFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Load `lambda-pipeline.toml` from `dir` if present, defaults otherwise
    pub fn discover(dir: &Path) -> StackResult<Self> {
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.exists() {
            Self::from_file(&candidate)
        } else {
            debug!("no options file found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> StackResult<Self> {
        toml::from_str(content).map_err(Into::into)
    }

    pub fn from_yaml(content: &str) -> StackResult<Self> {
        serde_yaml::from_str(content).map_err(Into::into)
    }

    pub fn to_toml(&self) -> StackResult<String> {
        toml::to_string_pretty(self).map_err(Into::into)
    }

    pub fn to_yaml(&self) -> StackResult<String> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Check names against the rules of the services they end up in
    pub fn validate(&self) -> StackResult<()> {
        let required = [
            ("pipeline_name", &self.pipeline_name),
            ("repository", &self.repository),
            ("source_branch", &self.source_branch),
            ("clone_repository", &self.clone_repository),
            ("clone_directory", &self.clone_directory),
            ("ecr_repository", &self.ecr_repository),
            ("image_name", &self.image_name),
            ("function_name", &self.function_name),
            ("build_image", &self.build_image),
            ("variables.branch_name", &self.variables.branch_name),
            ("variables.ecr_tag", &self.variables.ecr_tag),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(StackError::invalid_options(
                    format!("'{}' must not be empty", field),
                    format!("Remove '{}' to use the default or give it a value", field),
                ));
            }
        }

        check_pattern(
            "pipeline_name",
            &self.pipeline_name,
            r"^[A-Za-z0-9.@_-]{1,100}$",
            "Pipeline names use letters, digits, '.', '@', '_' or '-' (max 100)",
        )?;
        check_pattern(
            "ecr_repository",
            &self.ecr_repository,
            r"^(?:[a-z0-9]+(?:[._-][a-z0-9]+)*/)*[a-z0-9]+(?:[._-][a-z0-9]+)*$",
            "Registry repository names are lowercase, optionally namespaced with '/'",
        )?;
        check_pattern(
            "function_name",
            &self.function_name,
            r"^[A-Za-z0-9_-]{1,64}$",
            "Function names use letters, digits, '_' or '-' (max 64)",
        )?;
        check_pattern(
            "image_name",
            &self.image_name,
            r"^[a-z0-9]+(?:[._-][a-z0-9]+)*$",
            "Docker image names are lowercase",
        )?;

        Ok(())
    }
}

fn check_pattern(field: &str, value: &str, pattern: &str, help: &str) -> StackResult<()> {
    let re = Regex::new(pattern)?;
    if re.is_match(value) {
        Ok(())
    } else {
        Err(StackError::invalid_options(
            format!("'{}' has invalid value '{}'", field, value),
            help,
        ))
    }
}
