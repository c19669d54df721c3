// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

//! Pipeline-level runtime variables
//!
//! Variables are declared once with a default and resolved fresh on every
//! run. Stage environments refer to them with `#{variables.<name>}`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{StackError, StackResult};

/// Name of the branch variable
pub const BRANCH_VARIABLE: &str = "branchName";

/// Name of the image tag variable
pub const ECR_TAG_VARIABLE: &str = "ecrTag";

const REFERENCE_PREFIX: &str = "#{variables.";
const NAME_PATTERN: &str = r"^[A-Za-z0-9@_-]{1,128}$";

/// A named, pipeline-execution-time value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeVariable {
    /// Variable name
    pub name: String,

    /// Value used when a run supplies no override
    pub default_value: String,

    /// Human readable description
    #[serde(default)]
    pub description: Option<String>,
}

impl RuntimeVariable {
    pub fn new(name: impl Into<String>, default_value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_value: default_value.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Reference expression substituted by the pipeline engine
    pub fn reference(&self) -> String {
        reference_to(&self.name)
    }
}

/// Extract the variable name from a `#{variables.<name>}` expression
pub fn parse_reference(expr: &str) -> Option<&str> {
    let name = expr.strip_prefix(REFERENCE_PREFIX)?.strip_suffix('}')?;
    is_valid_name(name).ok()?.then_some(name)
}

/// Reference expression for a variable name
pub fn reference_to(name: &str) -> String {
    format!("{}{}}}", REFERENCE_PREFIX, name)
}

fn is_valid_name(name: &str) -> StackResult<bool> {
    Ok(Regex::new(NAME_PATTERN)?.is_match(name))
}

/// Ordered set of declared variables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableSet {
    variables: Vec<RuntimeVariable>,
}

impl VariableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a variable; names must be unique and well-formed
    pub fn declare(&mut self, variable: RuntimeVariable) -> StackResult<()> {
        if !is_valid_name(&variable.name)? {
            return Err(StackError::InvalidVariableName {
                name: variable.name,
            });
        }
        if self.get(&variable.name).is_some() {
            return Err(StackError::DuplicateVariable {
                name: variable.name,
            });
        }
        self.variables.push(variable);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&RuntimeVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RuntimeVariable> {
        self.variables.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|v| v.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Resolve the values for one run
    ///
    /// Every declared variable takes its default unless `overrides` names it.
    /// Overriding an undeclared variable is an error.
    pub fn resolve(&self, overrides: &BTreeMap<String, String>) -> StackResult<ResolvedVariables> {
        for name in overrides.keys() {
            if !self.contains(name) {
                return Err(StackError::unknown_variable(name, self.names()));
            }
        }

        let values = self
            .variables
            .iter()
            .map(|v| {
                let value = overrides
                    .get(&v.name)
                    .cloned()
                    .unwrap_or_else(|| v.default_value.clone());
                (v.name.clone(), value)
            })
            .collect();

        Ok(ResolvedVariables { values })
    }
}

/// Variable values fixed for a single run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedVariables {
    values: BTreeMap<String, String>,
}

impl ResolvedVariables {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
