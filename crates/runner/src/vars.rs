// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layered variable resolution
//!
//! Every act invocation sees a single flat name→string mapping, assembled
//! from fixed-precedence layers (lowest to highest): OS environment,
//! manifest env-file, act env-file, run-wide vars, runtime dotenv,
//! parent-local vars, invocation-local vars, act-runtime vars, flag values.

use crate::resolver::Invocation;
use crate::supervisor::Supervisor;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// The flat mapping for one invocation, plus the keys whose exported names
/// convert from camelCase to `SNAKE_UPPER_CASE` (act-runtime and
/// flag-derived values).
#[derive(Debug, Clone, Default)]
pub struct ResolvedVars {
    pub vars: HashMap<String, String>,
    pub upper_keys: HashSet<String>,
}

impl ResolvedVars {
    /// Export as `K=V` pairs for a child process environment. The child's
    /// environment is exactly this export; nothing else is inherited.
    pub fn to_env(&self) -> Vec<(String, String)> {
        self.vars
            .iter()
            .map(|(key, value)| {
                let exported = if self.upper_keys.contains(key) {
                    camel_to_snake_upper(key)
                } else {
                    key.clone()
                };
                (exported, value.clone())
            })
            .collect()
    }
}

/// Compute the variable mapping for an invocation.
pub(crate) fn resolve_vars(inv: &Invocation, sup: &Supervisor) -> ResolvedVars {
    let mut vars: HashMap<String, String> = std::env::vars().collect();
    let manifest_dir = inv.manifest.dir();

    if let Some(envfile) = &inv.manifest.envfile {
        merge(&mut vars, read_dotenv(&resolve_path(manifest_dir, envfile)));
    }
    if let Some(envfile) = &inv.act.envfile {
    eprintln!("DEBUG act.envfile = {:?}", inv.act.envfile);
        merge(&mut vars, read_dotenv(&resolve_path(manifest_dir, envfile)));
    eprintln!("DEBUG after act envfile merge X = {:?}", vars.get("X"));
    }
    merge(&mut vars, sup.run_vars());
    merge(&mut vars, read_dotenv(&sup.runtime_env_path()));
    merge(&mut vars, inv.parent_vars.clone());
    merge(&mut vars, inv.local_vars());

    let mut upper_keys = HashSet::new();
    for (key, value) in sup.act_vars() {
        upper_keys.insert(key.clone());
        vars.insert(key, value);
    }
    for (key, value) in &inv.act_vars {
        upper_keys.insert(key.clone());
        vars.insert(key.clone(), value.clone());
    }
    for (key, value) in inv.flag_vals() {
        upper_keys.insert(key.clone());
        vars.insert(key, value);
    }

    vars.insert("CliArgs".to_string(), inv.rest_args().join(" "));
    upper_keys.insert("CliArgs".to_string());

    // Absolute path of the manifest's env file, when declared.
    if let Some(envfile) = &inv.manifest.envfile {
        vars.insert(
            "ACT_ENV_FILE".to_string(),
            resolve_path(manifest_dir, envfile).display().to_string(),
        );
    }

    ResolvedVars { vars, upper_keys }
}

/// Parse a dotenv-style file. Missing or unreadable files yield an empty
/// map: env files are optional everywhere they appear.
pub(crate) fn read_dotenv(path: &Path) -> HashMap<String, String> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return HashMap::new(),
    };

    let mut map = HashMap::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = trimmed.split_once('=') {
            let key = key.trim();
            if !key.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }
    map
}

/// Resolve a possibly-relative path against a base directory.
pub(crate) fn resolve_path(base: &Path, target: impl AsRef<Path>) -> PathBuf {
    let target = target.as_ref();
    if target.is_absolute() {
        target.to_path_buf()
    } else {
        base.join(target)
    }
}

/// `ActFilePath` → `ACT_FILE_PATH`, `FlagDryRun` → `FLAG_DRY_RUN`.
/// Already-uppercase names pass through unchanged.
pub fn camel_to_snake_upper(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase() || prev.is_ascii_digit() || (prev.is_ascii_uppercase() && next_lower)
            {
                out.push('_');
            }
        }
        out.push(c.to_ascii_uppercase());
    }
    out
}

fn merge(into: &mut HashMap<String, String>, from: HashMap<String, String>) {
    into.extend(from);
}

#[cfg(test)]
#[path = "vars_tests.rs"]
mod tests;
