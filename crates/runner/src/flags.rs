// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Act flag parsing
//!
//! Acts declare flags as `name` (string) or `name:default`; a literal
//! `true`/`false` default marks a boolean. On the command line a flag is
//! written `-name`, `-name=value`, or `-name value` (double dashes are also
//! accepted); parsing stops at the first non-flag token and the remainder
//! becomes the invocation's rest-args.

use std::collections::HashMap;

/// A parsed flag declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagDecl {
    /// Flag name as written on the command line.
    pub name: String,
    /// Variable key the value is exposed under (`Flag<Camel>`, which
    /// exports as `FLAG_<UPPER>`).
    pub key: String,
    /// Declared default value, empty for plain string flags.
    pub default: String,
    /// True when the default is the literal `true` or `false`.
    pub boolean: bool,
}

/// Parse flag declarations (`name` or `name:default`).
pub fn parse_decls(flags: &[String]) -> Vec<FlagDecl> {
    flags
        .iter()
        .map(|decl| {
            let (name, default) = match decl.split_once(':') {
                Some((name, default)) => (name, default),
                None => (decl.as_str(), ""),
            };
            FlagDecl {
                name: name.to_string(),
                key: format!("Flag{}", to_camel(name)),
                default: default.to_string(),
                boolean: default == "true" || default == "false",
            }
        })
        .collect()
}

/// Parse command-line args against flag declarations.
///
/// Returns the flag values keyed by `Flag<Camel>` (every declared flag is
/// present, defaulted when unset) and the rest-args.
pub fn parse_flag_args(
    decls: &[FlagDecl],
    args: &[String],
) -> Result<(HashMap<String, String>, Vec<String>), String> {
    let mut vals: HashMap<String, String> = decls
        .iter()
        .map(|d| {
            let default = if d.boolean && d.default.is_empty() {
                "false".to_string()
            } else {
                d.default.clone()
            };
            (d.key.clone(), default)
        })
        .collect();

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];

        if arg == "--" {
            i += 1;
            break;
        }

        let Some(body) = arg
            .strip_prefix("--")
            .or_else(|| arg.strip_prefix('-'))
            .filter(|b| !b.is_empty())
        else {
            break;
        };

        let (name, inline) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (body, None),
        };

        let Some(decl) = decls.iter().find(|d| d.name == name) else {
            return Err(format!("unknown flag -{name}"));
        };

        let value = if decl.boolean {
            match inline {
                None => "true".to_string(),
                Some("true") => "true".to_string(),
                Some("false") => "false".to_string(),
                Some(other) => {
                    return Err(format!("invalid boolean value '{other}' for flag -{name}"))
                }
            }
        } else {
            match inline {
                Some(value) => value.to_string(),
                None => {
                    i += 1;
                    args.get(i)
                        .cloned()
                        .ok_or_else(|| format!("flag -{name} needs a value"))?
                }
            }
        };

        vals.insert(decl.key.clone(), value);
        i += 1;
    }

    Ok((vals, args[i..].to_vec()))
}

/// `my-flag` / `my_flag` → `MyFlag`.
fn to_camel(name: &str) -> String {
    name.split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "flags_tests.rs"]
mod tests;
