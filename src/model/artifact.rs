// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

//! Artifact handles and the store they live in

use serde::{Deserialize, Serialize};

/// Named reference to a bundle of files passed between stages
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactHandle(String);

impl ArtifactHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Durable storage for intermediate files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactStore {
    /// Logical id of the bucket resource
    pub logical_id: String,

    /// Keep the bucket when the stack is deleted
    #[serde(default = "default_retain")]
    pub retain_on_delete: bool,
}

fn default_retain() -> bool {
    true
}

impl ArtifactStore {
    pub fn bucket(logical_id: impl Into<String>) -> Self {
        Self {
            logical_id: logical_id.into(),
            retain_on_delete: default_retain(),
        }
    }
}
