// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

//! Utility modules
//!
//! Common utilities for the lambda-pipeline CLI.

pub mod colors;

pub use colors::*;
