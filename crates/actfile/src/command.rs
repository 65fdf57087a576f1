// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command definitions
//!
//! A command is the smallest unit of execution inside a stage. In YAML a
//! command is polymorphic: a plain string is a shell line, a mapping carries
//! the full option set. Decoding tries the shapes in that order.

use serde::{Deserialize, Deserializer};
use serde_yaml::Value;

/// Loop expansion attached to a command: either an explicit item list or a
/// filesystem glob rooted at the manifest's directory. The command's other
/// fields act as the per-item template.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CmdLoop {
    pub items: Vec<String>,
    pub glob: String,
}

/// A single executable command.
///
/// Exactly one of `cmd`, `script`, or `act` is meaningful at execution time;
/// empty strings mean "not set". `loop_spec` wraps the command into a loop
/// template regardless of which variant it carries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Command {
    /// Shell line to execute.
    pub cmd: String,
    /// Path to a script file to execute (plus `args`).
    pub script: String,
    /// Shell override for this command.
    pub shell: Option<String>,
    /// Dotted call id of another act to invoke.
    pub act: String,
    /// Manifest path override for `act` lookups.
    pub from: String,
    /// Run the act call as an independently supervised process.
    pub detach: bool,
    /// Arguments passed to the command/script/act.
    pub args: Vec<String>,
    /// Suppress output of this command.
    pub quiet: bool,
    /// Force console logging for detached children.
    pub log: bool,
    /// Loop expansion wrapper.
    pub loop_spec: Option<CmdLoop>,
    /// `"allow"` skips act-resolution misses silently.
    pub mismatch: String,
}

impl Command {
    /// Build a command that runs a single shell line.
    pub fn shell_line(line: impl Into<String>) -> Self {
        Self {
            cmd: line.into(),
            ..Self::default()
        }
    }

    pub(crate) fn from_value(value: &Value, location: &str) -> Result<Self, String> {
        // Most common shape: a plain shell line.
        if let Value::String(line) = value {
            return Ok(Self::shell_line(line.clone()));
        }

        let mapping = match value {
            Value::Mapping(m) => m,
            Value::Null => return Ok(Self::default()),
            other => {
                return Err(format!(
                    "{location}: expected a string or mapping, got {}",
                    type_name(other)
                ))
            }
        };

        let mut cmd = Self::default();

        for (key, val) in mapping {
            let key = key
                .as_str()
                .ok_or_else(|| format!("{location}: non-string key"))?;
            match key {
                "cmd" => cmd.cmd = str_field(val, location, key)?,
                "script" => cmd.script = str_field(val, location, key)?,
                "shell" => cmd.shell = Some(str_field(val, location, key)?),
                "act" => cmd.act = str_field(val, location, key)?,
                "from" => cmd.from = str_field(val, location, key)?,
                "detach" => cmd.detach = bool_field(val, location, key)?,
                "args" => cmd.args = str_seq_field(val, location, key)?,
                "quiet" => cmd.quiet = bool_field(val, location, key)?,
                "log" => cmd.log = bool_field(val, location, key)?,
                "loop" => {
                    cmd.loop_spec = Some(
                        serde_yaml::from_value(val.clone())
                            .map_err(|e| format!("{location}.loop: {e}"))?,
                    )
                }
                "mismatch" => cmd.mismatch = str_field(val, location, key)?,
                other => return Err(format!("{location}: unknown command field '{other}'")),
            }
        }

        // An act line may carry arguments after the call id.
        if !cmd.act.is_empty() {
            let mut parts = cmd.act.split_whitespace().map(str::to_string);
            if let Some(head) = parts.next() {
                let tail: Vec<String> = parts.collect();
                cmd.act = head;
                cmd.args.extend(tail);
            }
        }

        // Same convenience for scripts, after tightening `{{ .X }}` spacing
        // so template placeholders survive the whitespace split.
        if !cmd.script.is_empty() {
            let tightened = tighten_templates(&cmd.script);
            let mut parts = tightened.split_whitespace().map(str::to_string);
            if let Some(head) = parts.next() {
                let tail: Vec<String> = parts.collect();
                cmd.script = head;
                cmd.args.extend(tail);
            }
        }

        Ok(cmd)
    }
}

impl<'de> Deserialize<'de> for Command {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Command::from_value(&value, "command").map_err(serde::de::Error::custom)
    }
}

/// Remove spaces inside `{{ ... }}` placeholders: `{{ .Name }}` → `{{.Name}}`.
fn tighten_templates(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(open) = rest.find("{{") {
        let Some(close) = rest[open..].find("}}") else {
            break;
        };
        out.push_str(&rest[..open]);
        out.push_str("{{");
        out.extend(rest[open + 2..open + close].chars().filter(|c| *c != ' '));
        out.push_str("}}");
        rest = &rest[open + close + 2..];
    }
    out.push_str(rest);
    out
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

pub(crate) fn str_field(value: &Value, location: &str, key: &str) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(format!(
            "{location}.{key}: expected a string, got {}",
            type_name(other)
        )),
    }
}

pub(crate) fn bool_field(value: &Value, location: &str, key: &str) -> Result<bool, String> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(format!(
            "{location}.{key}: expected a bool, got {}",
            type_name(other)
        )),
    }
}

pub(crate) fn str_seq_field(
    value: &Value,
    location: &str,
    key: &str,
) -> Result<Vec<String>, String> {
    let seq = match value {
        Value::Sequence(s) => s,
        other => {
            return Err(format!(
                "{location}.{key}: expected a sequence, got {}",
                type_name(other)
            ))
        }
    };
    seq.iter()
        .map(|v| match v {
            Value::String(s) => Ok(s.clone()),
            other => Err(format!(
                "{location}.{key}: expected string items, got {}",
                type_name(other)
            )),
        })
        .collect()
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
