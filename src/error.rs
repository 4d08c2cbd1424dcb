// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Typed errors for the fallible edges of the crate
//!
//! The counting engine itself never fails; these cover configuration and
//! trace input.

use std::path::PathBuf;
use thiserror::Error;

/// Rejected exercise profile
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("invalid profile for '{exercise}': {reason}")]
    Invalid { exercise: String, reason: String },
}

/// Failure reading a recorded confidence trace
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to read trace {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("unsupported trace format {0:?} (expected .jsonl, .json or .csv)")]
    UnsupportedFormat(PathBuf),
}
