// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Name resolution
//!
//! Walks a call chain (`foo.bar.baz` split on dots) through the act tree,
//! following `redirect` and `include` edges across manifests. Each segment
//! is matched as an anchored regular expression against candidate acts in
//! declaration order; the first match wins.

use crate::error::ResolveError;
use crate::supervisor::Supervisor;
use crate::template::render;
use crate::vars::{self, resolve_path};
use crate::CALL_ID_SEPARATOR;
use act_actfile::{Act, Actfile, Stage, INDEX_ACT_NAME};
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Default)]
struct FlagState {
    vals: HashMap<String, String>,
    rest: Vec<String>,
}

/// The context of one act invocation, created by resolution and destroyed
/// when the call returns. Children hold an `Arc` back-link to their parent;
/// the supervisor keeps the explicit stack used during teardown.
#[derive(Debug)]
pub struct Invocation {
    /// Manifest where the match was made.
    pub manifest: Arc<Actfile>,
    /// The resolved act.
    pub act: Act,
    /// Parent invocation in the call chain.
    pub parent: Option<Arc<Invocation>>,
    /// Dotted path of segment names from the root of the run.
    pub call_id: String,
    /// Local vars propagated from the parent chain.
    pub parent_vars: HashMap<String, String>,
    /// Act-runtime vars: `ActName`, `ActFilePath`, `ActFileDir`.
    pub act_vars: HashMap<String, String>,
    vars: Mutex<HashMap<String, String>>,
    flags: Mutex<FlagState>,
}

impl Invocation {
    /// Snapshot of this invocation's local vars.
    pub fn local_vars(&self) -> HashMap<String, String> {
        self.vars.lock().clone()
    }

    /// What children inherit: the parent chain's locals overlaid with ours.
    pub fn propagated_vars(&self) -> HashMap<String, String> {
        let mut vars = self.parent_vars.clone();
        vars.extend(self.local_vars());
        vars
    }

    pub fn set_local_vars(&self, vars: HashMap<String, String>) {
        *self.vars.lock() = vars;
    }

    /// Seed the invocation's arguments (before flag parsing).
    pub fn set_args(&self, args: Vec<String>) {
        self.flags.lock().rest = args;
    }

    /// Rest-args after flag parsing.
    pub fn rest_args(&self) -> Vec<String> {
        self.flags.lock().rest.clone()
    }

    /// Parsed flag values, keyed `Flag<Camel>`.
    pub fn flag_vals(&self) -> HashMap<String, String> {
        self.flags.lock().vals.clone()
    }

    pub fn set_flags(&self, vals: HashMap<String, String>, rest: Vec<String>) {
        let mut flags = self.flags.lock();
        flags.vals = vals;
        flags.rest = rest;
    }

    /// Act-level log mode, inherited from the caller chain when this act
    /// does not set one.
    pub fn act_log(&self) -> Option<String> {
        let mut cur = Some(self);
        while let Some(inv) = cur {
            if let Some(log) = &inv.act.log {
                if !log.is_empty() {
                    return Some(log.clone());
                }
            }
            cur = inv.parent.as_deref();
        }
        None
    }
}

/// Resolve a segment list against a manifest into an invocation context.
///
/// An empty segment list resolves the index child `_`.
pub fn resolve(
    segments: &[String],
    manifest: &Arc<Actfile>,
    parent: Option<&Arc<Invocation>>,
    sup: &Supervisor,
) -> Result<Arc<Invocation>, ResolveError> {
    let target = segments
        .first()
        .map(String::as_str)
        .unwrap_or(INDEX_ACT_NAME);

    // Continue matching inside the previously matched act's children when
    // it has any; otherwise match the manifest's top-level acts.
    let (candidates, owner_path): (&[Act], &Path) = match parent {
        Some(p) if !p.act.acts.is_empty() => (&p.act.acts, &p.manifest.location),
        _ => (&manifest.acts, &manifest.location),
    };

    for act in candidates {
        let pattern = format!("^{}$", act.name);
        let re = Regex::new(&pattern).map_err(|source| ResolveError::BadPattern {
            pattern: act.name.clone(),
            path: owner_path.to_path_buf(),
            source,
        })?;
        if !re.is_match(target) {
            continue;
        }

        tracing::debug!(
            target,
            pattern = %act.name,
            manifest = %manifest.location.display(),
            "act matched"
        );

        let call_id = match parent {
            Some(p) => format!("{}{}{}", p.call_id, CALL_ID_SEPARATOR, target),
            None => target.to_string(),
        };

        let mut act_vars = HashMap::new();
        act_vars.insert("ActName".to_string(), target.to_string());
        act_vars.insert(
            "ActFilePath".to_string(),
            manifest.location.display().to_string(),
        );
        act_vars.insert("ActFileDir".to_string(), manifest.dir().display().to_string());

        let ctx = Arc::new(Invocation {
            manifest: Arc::clone(manifest),
            act: act.clone(),
            parent: parent.cloned(),
            call_id,
            parent_vars: parent.map(|p| p.propagated_vars()).unwrap_or_default(),
            act_vars,
            vars: Mutex::new(HashMap::new()),
            flags: Mutex::new(FlagState::default()),
        });

        // A forwarder: look for the same segments in the referenced
        // manifest, with this context as parent.
        if let Some(redirect) = &ctx.act.redirect {
            let vars = vars::resolve_vars(&ctx, sup);
            let path = resolve_path(manifest.dir(), render(redirect, &vars.vars));
            let next = Arc::new(Actfile::load(&path)?);
            return resolve(segments, &next, Some(&ctx), sup);
        }

        // Included manifests answer child lookups; the current segment is
        // consumed.
        if ctx.act.include.is_some() && !segments.is_empty() {
            let include = ctx.act.include.as_deref().unwrap_or_default();
            let vars = vars::resolve_vars(&ctx, sup);
            let path = resolve_path(manifest.dir(), render(include, &vars.vars));
            let next = Arc::new(Actfile::load(&path)?);
            return resolve(&segments[1..], &next, Some(&ctx), sup);
        }

        // Nested acts: keep matching inside the same manifest.
        if !ctx.act.acts.is_empty() && !segments.is_empty() {
            return resolve(&segments[1..], manifest, Some(&ctx), sup);
        }

        return Ok(ctx);
    }

    Err(ResolveError::NotFound {
        name: target.to_string(),
        path: owner_path.to_path_buf(),
    })
}

/// Build the transient invocation that runs a manifest's `before-all`
/// stage. It carries the run-wide vars as its locals and no act-runtime
/// vars, mirroring a top-level call.
pub(crate) fn before_all_invocation(
    manifest: &Arc<Actfile>,
    call_id: String,
    stage: &Stage,
    run_vars: HashMap<String, String>,
) -> Arc<Invocation> {
    let mut start = stage.clone();
    start.name = "start".to_string();
    let act = Act {
        name: "before-all".to_string(),
        start: Some(start),
        ..Act::default()
    };
    Arc::new(Invocation {
        manifest: Arc::clone(manifest),
        act,
        parent: None,
        call_id,
        parent_vars: HashMap::new(),
        act_vars: HashMap::new(),
        vars: Mutex::new(run_vars),
        flags: Mutex::new(FlagState::default()),
    })
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
