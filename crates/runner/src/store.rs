// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run descriptor store
//!
//! All supervision state lives in `<wd>/.actdt/<run-id>/`: a JSON descriptor
//! (`info.json`), the run's log file, and the shared runtime dotenv (`env`).
//! There is no in-memory registry shared across processes; `stop`, `log`,
//! and `list` operate purely on these files.

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directory under the working directory holding one subdirectory per run.
pub const DATA_DIR_NAME: &str = ".actdt";

/// Descriptor file name inside a run directory.
pub const INFO_FILE_NAME: &str = "info.json";

/// Log file name inside a run directory.
pub const LOG_FILE_NAME: &str = "log";

/// Runtime dotenv file name inside a run directory, shared by every command
/// of the run.
pub const ENV_FILE_NAME: &str = "env";

/// Errors from descriptor persistence
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not write run descriptor {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Generate a fresh short run id.
pub fn new_run_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..10].to_string()
}

/// Persisted descriptor of a live runner process.
///
/// Field names keep the historical PascalCase wire format so descriptors are
/// readable across versions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct RunRecord {
    /// Short run id; names the run's data directory.
    pub id: String,
    /// Human-friendly name id: the original call id, prefixed by the parent
    /// run's name id for detached children.
    pub name_id: String,
    /// Run id of the parent process when this run was spawned detached.
    pub parent_act_id: String,
    /// Ordered ids of detached child runs.
    pub child_act_ids: Vec<String>,
    /// Ordered process-group ids (sessions) of currently running commands.
    pub cmd_pgids: Vec<i32>,
    /// Main process id.
    pub pid: i32,
    /// Main process-group id.
    pub pgid: i32,
    /// Set while a kill is in flight so concurrent child-exit handlers
    /// suppress cascading kills.
    pub is_killing: bool,
}

impl RunRecord {
    /// The name id if present, the short id otherwise.
    pub fn name_id_or_id(&self) -> &str {
        if self.name_id.is_empty() {
            &self.id
        } else {
            &self.name_id
        }
    }
}

/// Locator for run directories under one working directory.
#[derive(Debug, Clone)]
pub struct RunStore {
    root: PathBuf,
}

impl RunStore {
    pub fn new(wd: &Path) -> Self {
        Self {
            root: wd.join(DATA_DIR_NAME),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.root
    }

    pub fn run_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    pub fn info_path(&self, id: &str) -> PathBuf {
        self.run_dir(id).join(INFO_FILE_NAME)
    }

    pub fn log_path(&self, id: &str) -> PathBuf {
        self.run_dir(id).join(LOG_FILE_NAME)
    }

    pub fn env_path(&self, id: &str) -> PathBuf {
        self.run_dir(id).join(ENV_FILE_NAME)
    }

    /// Load a descriptor by run id. Absent on missing or malformed JSON;
    /// callers treat absent as stale.
    pub fn load(&self, id: &str) -> Option<RunRecord> {
        let content = std::fs::read_to_string(self.info_path(id)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Find a descriptor by name id or run id, scanning the data directory.
    pub fn find(&self, name_or_id: &str) -> Option<RunRecord> {
        self.list_all()
            .into_iter()
            .find(|r| r.name_id == name_or_id || r.id == name_or_id)
    }

    /// All loadable descriptors. Directories whose descriptor cannot be
    /// loaded are stale leftovers and are pruned.
    pub fn list_all(&self) -> Vec<RunRecord> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut records = Vec::new();
        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().to_string();
            match self.load(&id) {
                Some(record) => records.push(record),
                None => {
                    tracing::debug!(dir = %entry.path().display(), "pruning stale run directory");
                    let _ = std::fs::remove_dir_all(entry.path());
                }
            }
        }
        records
    }

    /// Persist a descriptor: write to a temp file, then rename into place.
    pub fn save(&self, record: &RunRecord) -> Result<(), StoreError> {
        let dir = self.run_dir(&record.id);
        let path = dir.join(INFO_FILE_NAME);
        let write = |p: &Path, r: &RunRecord| -> std::io::Result<()> {
            std::fs::create_dir_all(&dir)?;
            let content = serde_json::to_string_pretty(r).map_err(std::io::Error::other)?;
            let tmp = dir.join(format!("{INFO_FILE_NAME}.tmp"));
            std::fs::write(&tmp, content)?;
            std::fs::rename(&tmp, p)
        };
        write(&path, record).map_err(|source| StoreError::Write { path, source })
    }

    /// Remove a run's data directory.
    pub fn remove_run_dir(&self, id: &str) {
        let _ = std::fs::remove_dir_all(self.run_dir(id));
    }
}

/// Owning handle to the descriptor of the current process's run.
///
/// Every mutation acquires the handle's mutex and rewrites the JSON. Two
/// processes never write the same descriptor: each process owns its own.
pub struct RunHandle {
    store: RunStore,
    record: Mutex<RunRecord>,
}

impl RunHandle {
    /// Persist the initial descriptor and return the handle.
    pub fn create(store: RunStore, record: RunRecord) -> Result<Self, StoreError> {
        store.save(&record)?;
        Ok(Self {
            store,
            record: Mutex::new(record),
        })
    }

    pub fn id(&self) -> String {
        self.record.lock().id.clone()
    }

    pub fn name_id(&self) -> String {
        self.record.lock().name_id.clone()
    }

    pub fn parent_act_id(&self) -> String {
        self.record.lock().parent_act_id.clone()
    }

    pub fn child_act_ids(&self) -> Vec<String> {
        self.record.lock().child_act_ids.clone()
    }

    pub fn cmd_pgids(&self) -> Vec<i32> {
        self.record.lock().cmd_pgids.clone()
    }

    pub fn env_path(&self) -> PathBuf {
        self.store.env_path(&self.record.lock().id)
    }

    pub fn log_path(&self) -> PathBuf {
        self.store.log_path(&self.record.lock().id)
    }

    pub fn add_child_act_id(&self, child_id: &str) {
        self.mutate(|r| {
            if !r.child_act_ids.iter().any(|c| c == child_id) {
                r.child_act_ids.push(child_id.to_string());
                true
            } else {
                false
            }
        });
    }

    pub fn rm_child_act_id(&self, child_id: &str) {
        self.mutate(|r| {
            let before = r.child_act_ids.len();
            r.child_act_ids.retain(|c| c != child_id);
            r.child_act_ids.len() != before
        });
    }

    pub fn add_cmd_pgid(&self, pgid: i32) {
        self.mutate(|r| {
            if !r.cmd_pgids.contains(&pgid) {
                r.cmd_pgids.push(pgid);
                true
            } else {
                false
            }
        });
    }

    pub fn rm_cmd_pgid(&self, pgid: i32) {
        self.mutate(|r| {
            let before = r.cmd_pgids.len();
            r.cmd_pgids.retain(|p| *p != pgid);
            r.cmd_pgids.len() != before
        });
    }

    pub fn set_is_killing(&self) {
        self.mutate(|r| {
            r.is_killing = true;
            true
        });
    }

    pub fn remove_dir(&self) {
        self.store.remove_run_dir(&self.record.lock().id);
    }

    /// Apply a mutation and persist if it changed anything. Descriptor I/O
    /// failures during maintenance are logged, not fatal.
    fn mutate(&self, f: impl FnOnce(&mut RunRecord) -> bool) {
        let mut record = self.record.lock();
        if f(&mut record) {
            if let Err(e) = self.store.save(&record) {
                tracing::warn!(error = %e, "could not persist run descriptor");
            }
        }
    }
}

/// SIGKILL a whole process group. Guarded against pgid values that would
/// address the caller's own group.
pub fn kill_pgid(pgid: i32) {
    if pgid <= 1 {
        return;
    }
    if let Err(e) = kill(Pid::from_raw(-pgid), Signal::SIGKILL) {
        tracing::debug!(pgid, error = %e, "could not kill process group");
    }
}

/// Kill a run and everything below it: detached children first (recursing
/// through their descriptors), then the run's command groups, then the
/// run's own session, then its data directory. Marks the descriptor
/// `IsKilling` up front so the dying children's parent cascade is a no-op.
pub fn kill_run(store: &RunStore, record: &RunRecord) {
    let mut marked = record.clone();
    marked.is_killing = true;
    if let Err(e) = store.save(&marked) {
        tracing::warn!(id = %record.id, error = %e, "could not mark run as killing");
    }

    for child_id in &record.child_act_ids {
        if let Some(child) = store.load(child_id) {
            kill_run(store, &child);
        }
    }

    for pgid in &record.cmd_pgids {
        kill_pgid(*pgid);
    }

    // The run's own session. Without this a daemonized supervisor would
    // outlive its stop.
    kill_pgid(record.pgid);

    store.remove_run_dir(&record.id);

    if !record.parent_act_id.is_empty() {
        cascade_to_parent(store, &record.parent_act_id, &record.id);
    }
}

/// Collapse the tree upward: remove `child_id` from the parent's children
/// and, when the parent has nothing left to supervise, kill its session and
/// recurse to its own parent.
pub fn cascade_to_parent(store: &RunStore, parent_id: &str, child_id: &str) {
    let Some(mut parent) = store.load(parent_id) else {
        return;
    };
    if parent.is_killing {
        return;
    }

    parent.child_act_ids.retain(|c| c != child_id);
    if let Err(e) = store.save(&parent) {
        tracing::warn!(id = %parent_id, error = %e, "could not update parent descriptor");
    }

    // If the parent is still running something, it lives on.
    if !parent.cmd_pgids.is_empty() || !parent.child_act_ids.is_empty() {
        return;
    }

    kill_pgid(parent.pgid);
    store.remove_run_dir(&parent.id);

    if !parent.parent_act_id.is_empty() {
        cascade_to_parent(store, &parent.parent_act_id, &parent.id);
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
