// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Text templating
//!
//! Manifest fields that accept templating (`cmd`, `act`, `from`, `script`,
//! `include`, `redirect`, `loop.glob`, command arguments) use a fixed
//! `{{.Name}}` delimiter. Unknown names expand to empty.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Pattern for `{{.Name}}` placeholders, inner spacing allowed.
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}")
        .expect("constant regex pattern is valid")
});

/// Expand `{{.Name}}` placeholders with values from the vars map.
pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
    if !template.contains("{{") {
        return template.to_string();
    }
    VAR_PATTERN
        .replace_all(template, |caps: &regex::Captures| {
            vars.get(&caps[1]).cloned().unwrap_or_default()
        })
        .to_string()
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
