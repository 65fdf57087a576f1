// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Actfile loading and top-level validation

use crate::act::{acts_from_value, Act};
use crate::command::{str_field, type_name};
use crate::stage::Stage;
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading a manifest
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("could not read actfile {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse actfile {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid actfile {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

/// A parsed manifest. Identified by its absolute filesystem path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Actfile {
    /// Manifest format version. Required.
    pub version: String,
    /// Namespace used by the prefixing log writer.
    pub namespace: String,
    /// Shared dotenv file, relative to the manifest's directory.
    pub envfile: Option<String>,
    /// Default shell for every act in the manifest.
    pub shell: Option<String>,
    /// Default log mode for every act in the manifest.
    pub log: Option<String>,
    /// Stage run once per manifest before the first act from it.
    pub before_all: Option<Stage>,
    /// Top-level acts, in declaration order.
    pub acts: Vec<Act>,
    /// Absolute location on disk, set by the loader.
    pub location: PathBuf,
}

impl Actfile {
    /// Read and parse a manifest from disk. `path` should be absolute; it
    /// becomes the manifest's identity and the base for relative paths.
    pub fn load(path: &Path) -> Result<Self, ParseError> {
        let content = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut actfile = parse_actfile(&content).map_err(|e| locate(e, path))?;
        actfile.location = path.to_path_buf();
        Ok(actfile)
    }

    /// Directory containing the manifest. Relative `envfile`, `include`,
    /// `redirect`, and `loop.glob` paths resolve against it, and shell
    /// commands run with it as their working directory.
    pub fn dir(&self) -> &Path {
        self.location.parent().unwrap_or(Path::new("."))
    }
}

/// Parse manifest content. The caller sets `location` afterwards.
pub fn parse_actfile(content: &str) -> Result<Actfile, ParseError> {
    let value: Value = serde_yaml::from_str(content).map_err(|source| ParseError::Yaml {
        path: PathBuf::new(),
        source,
    })?;
    from_value(&value).map_err(|message| ParseError::Invalid {
        path: PathBuf::new(),
        message,
    })
}

fn from_value(value: &Value) -> Result<Actfile, String> {
    let mapping = match value {
        Value::Mapping(m) => m,
        other => return Err(format!("expected a mapping, got {}", type_name(other))),
    };

    let mut actfile = Actfile::default();

    for (key, val) in mapping {
        let key = key.as_str().ok_or("non-string top-level key")?;
        match key {
            "version" => actfile.version = top_str(val, key)?,
            "namespace" => actfile.namespace = top_str(val, key)?,
            "envfile" => actfile.envfile = Some(top_str(val, key)?),
            "shell" => actfile.shell = Some(top_str(val, key)?),
            "log" => actfile.log = Some(top_str(val, key)?),
            "before-all" => {
                let mut stage = Stage::from_value(val, "before-all")?;
                stage.name = "before-all".to_string();
                actfile.before_all = Some(stage);
            }
            "acts" => actfile.acts = acts_from_value(val, "actfile")?,
            other => return Err(format!("unknown top-level field '{other}'")),
        }
    }

    if actfile.version.is_empty() {
        return Err("missing required field 'version'".to_string());
    }

    Ok(actfile)
}

fn top_str(value: &Value, key: &str) -> Result<String, String> {
    // Version tags are commonly written unquoted (`version: 1`), which YAML
    // reads as a number.
    if key == "version" {
        if let Value::Number(n) = value {
            return Ok(n.to_string());
        }
    }
    str_field(value, "actfile", key)
}

fn locate(err: ParseError, path: &Path) -> ParseError {
    match err {
        ParseError::Yaml { source, .. } => ParseError::Yaml {
            path: path.to_path_buf(),
            source,
        },
        ParseError::Invalid { message, .. } => ParseError::Invalid {
            path: path.to_path_buf(),
            message,
        },
        other => other,
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
