// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Act definitions
//!
//! An act is a named executable unit. Its name (the YAML mapping key) is a
//! regular expression matched against the call segments the user provides.
//! Acts are kept as an ordered list because declaration order decides which
//! act wins when several names match.

use crate::command::{bool_field, str_field, str_seq_field, type_name};
use crate::stage::{cmds_from_value, Stage};
use serde_yaml::Value;

/// A named, regex-matched executable unit in a manifest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Act {
    /// Regex name from the mapping key, matched anchored (`^name$`).
    pub name: String,
    /// Human description, surfaced by help output.
    pub desc: String,
    /// Ordered flag declarations: `name` or `name:default`. A `true`/`false`
    /// default marks a boolean flag.
    pub flags: Vec<String>,
    /// Per-act dotenv file, relative to the manifest's directory.
    pub envfile: Option<String>,
    /// Shell override for every command of this act.
    pub shell: Option<String>,
    /// Log mode override (`raw` or `prefixed`).
    pub log: Option<String>,
    /// Suppress output of every command of this act.
    pub quiet: bool,
    /// Forward resolution to another manifest, keeping the segment list.
    pub redirect: Option<String>,
    /// Mount another manifest's acts as this act's children.
    pub include: Option<String>,
    /// Nested child acts, in declaration order.
    pub acts: Vec<Act>,
    /// Optional stage run before `start`.
    pub before: Option<Stage>,
    /// The main stage.
    pub start: Option<Stage>,
    /// Stage run on the way out (natural exit, failure, or signal).
    pub final_stage: Option<Stage>,
}

impl Act {
    pub(crate) fn from_value(value: &Value, location: &str) -> Result<Self, String> {
        let mapping = match value {
            Value::Mapping(m) => m,
            // `foo:` with no body is a valid (empty) act.
            Value::Null => return Ok(Self::default()),
            other => {
                return Err(format!(
                    "{location}: expected a mapping, got {}",
                    type_name(other)
                ))
            }
        };

        let mut act = Self::default();
        let mut legacy_cmds = None;
        let mut legacy_parallel = false;
        let mut teardown = None;

        for (key, val) in mapping {
            let key = key
                .as_str()
                .ok_or_else(|| format!("{location}: non-string key"))?;
            match key {
                "desc" => act.desc = str_field(val, location, key)?,
                "flags" => act.flags = str_seq_field(val, location, key)?,
                "envfile" => act.envfile = Some(str_field(val, location, key)?),
                "shell" => act.shell = Some(str_field(val, location, key)?),
                "log" => act.log = Some(str_field(val, location, key)?),
                "quiet" => act.quiet = bool_field(val, location, key)?,
                "redirect" => act.redirect = Some(str_field(val, location, key)?),
                "include" => act.include = Some(str_field(val, location, key)?),
                "acts" => act.acts = acts_from_value(val, location)?,
                "before" => {
                    act.before = Some(Stage::from_value(val, &format!("{location}.before"))?)
                }
                "start" => act.start = Some(Stage::from_value(val, &format!("{location}.start"))?),
                "final" => {
                    act.final_stage = Some(Stage::from_value(val, &format!("{location}.final"))?)
                }
                // Legacy spellings, folded below.
                "teardown" => {
                    teardown = Some(Stage::from_value(val, &format!("{location}.teardown"))?)
                }
                "cmds" => legacy_cmds = Some(cmds_from_value(val, &format!("{location}.cmds"))?),
                "parallel" => legacy_parallel = bool_field(val, location, key)?,
                other => return Err(format!("{location}: unknown act field '{other}'")),
            }
        }

        if act.redirect.is_some() && act.include.is_some() {
            return Err(format!(
                "{location}: 'redirect' and 'include' are mutually exclusive"
            ));
        }

        // Legacy `cmds` (+ `parallel`) is shorthand for the start stage.
        if act.start.is_none() {
            if let Some(cmds) = legacy_cmds {
                act.start = Some(Stage::from_cmds(cmds, legacy_parallel));
            }
        }
        // Legacy `teardown` is an alias of `final`.
        if act.final_stage.is_none() {
            act.final_stage = teardown;
        }

        name_stages(&mut act);

        Ok(act)
    }
}

/// Decode an ordered act list from a YAML mapping, injecting each mapping
/// key into the act's `name` field.
pub(crate) fn acts_from_value(value: &Value, location: &str) -> Result<Vec<Act>, String> {
    let mapping = match value {
        Value::Mapping(m) => m,
        Value::Null => return Ok(Vec::new()),
        other => {
            return Err(format!(
                "{location}.acts: expected a mapping, got {}",
                type_name(other)
            ))
        }
    };

    let mut acts = Vec::with_capacity(mapping.len());
    for (key, val) in mapping {
        let name = key
            .as_str()
            .ok_or_else(|| format!("{location}.acts: non-string act name"))?;
        let mut act = Act::from_value(val, &format!("{location}.acts.{name}"))?;
        act.name = name.to_string();
        acts.push(act);
    }
    Ok(acts)
}

fn name_stages(act: &mut Act) {
    if let Some(stage) = &mut act.before {
        stage.name = "before".to_string();
    }
    if let Some(stage) = &mut act.start {
        stage.name = "start".to_string();
    }
    if let Some(stage) = &mut act.final_stage {
        stage.name = "final".to_string();
    }
}

#[cfg(test)]
#[path = "act_tests.rs"]
mod tests;
