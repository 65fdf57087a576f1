// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution stages
//!
//! An act executes up to three stages: `before`, `start`, `final`. Each stage
//! decodes from a plain string (one shell line), a sequence of commands, or a
//! mapping `{ parallel, quiet, shell, cmds }`.

use crate::command::{bool_field, str_field, type_name, Command};
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;

/// One stage of an act: an ordered command list plus execution options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stage {
    /// Stage name, filled during normalization (`before`, `start`, `final`).
    pub name: String,
    /// Launch all commands concurrently and wait for the whole group.
    pub parallel: bool,
    /// Suppress output of every command in the stage.
    pub quiet: bool,
    /// Shell override for the stage.
    pub shell: Option<String>,
    /// Commands, executed in declaration order when sequential.
    pub cmds: Vec<Command>,
}

impl Stage {
    pub(crate) fn from_value(value: &Value, location: &str) -> Result<Self, String> {
        match value {
            // A bare string is a single shell-line command.
            Value::String(line) => Ok(Self {
                cmds: vec![Command::shell_line(line.clone())],
                ..Self::default()
            }),
            Value::Sequence(_) => Ok(Self {
                cmds: cmds_from_value(value, location)?,
                ..Self::default()
            }),
            Value::Mapping(mapping) => {
                let mut stage = Self::default();
                for (key, val) in mapping {
                    let key = key
                        .as_str()
                        .ok_or_else(|| format!("{location}: non-string key"))?;
                    match key {
                        "parallel" => stage.parallel = bool_field(val, location, key)?,
                        "quiet" => stage.quiet = bool_field(val, location, key)?,
                        "shell" => stage.shell = Some(str_field(val, location, key)?),
                        "cmds" => stage.cmds = cmds_from_value(val, location)?,
                        other => {
                            return Err(format!("{location}: unknown stage field '{other}'"))
                        }
                    }
                }
                Ok(stage)
            }
            other => Err(format!(
                "{location}: expected a string, sequence, or mapping, got {}",
                type_name(other)
            )),
        }
    }

    /// Stage holding the given commands, used by the legacy `cmds` fold.
    pub(crate) fn from_cmds(cmds: Vec<Command>, parallel: bool) -> Self {
        Self {
            parallel,
            cmds,
            ..Self::default()
        }
    }
}

impl<'de> Deserialize<'de> for Stage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Stage::from_value(&value, "stage").map_err(serde::de::Error::custom)
    }
}

/// Decode an ordered command list. A bare string decodes as a one-command
/// list so `cmds: echo hi` and `cmds: [echo hi]` are equivalent.
pub(crate) fn cmds_from_value(value: &Value, location: &str) -> Result<Vec<Command>, String> {
    match value {
        Value::String(line) => Ok(vec![Command::shell_line(line.clone())]),
        Value::Sequence(seq) => seq
            .iter()
            .enumerate()
            .map(|(i, v)| Command::from_value(v, &format!("{location}[{i}]")))
            .collect(),
        other => Err(format!(
            "{location}: expected a string or sequence, got {}",
            type_name(other)
        )),
    }
}

#[cfg(test)]
#[path = "stage_tests.rs"]
mod tests;
