// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error types

use crate::store::StoreError;
use act_actfile::ParseError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from walking the act tree to a resolution
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("act {name} not found in {path}")]
    NotFound { name: String, path: PathBuf },

    #[error("invalid act name pattern '{pattern}' in {path}: {source}")]
    BadPattern {
        pattern: String,
        path: PathBuf,
        #[source]
        source: regex::Error,
    },

    /// A manifest referenced by `redirect` or `include` failed to load.
    #[error(transparent)]
    Manifest(#[from] ParseError),
}

/// Errors that can occur while executing a run
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("command '{command}' failed with exit code {code}")]
    CommandFailed { command: String, code: i32 },

    #[error("invalid flags for act {act}: {message}")]
    Flags { act: String, message: String },

    #[error("could not spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("glob pattern '{pattern}' is invalid: {source}")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("could not open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parent run {id} not found")]
    ParentNotFound { id: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Internal(String),
}

impl RunError {
    /// Process exit code for this error: a failing sequential command
    /// propagates the child's code, everything else exits 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::CommandFailed { code, .. } => *code,
            _ => 1,
        }
    }
}
