// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run supervision
//!
//! The supervisor owns the top-level run descriptor, the invocation call
//! stack, signal handling, and the ordered teardown of command groups and
//! detached children. It is an explicit object threaded through resolution
//! and execution; the signal watcher thread holds a reference to it.

use crate::error::RunError;
use crate::exec;
use crate::resolver;
use crate::store::{self, new_run_id, RunHandle, RunRecord, RunStore};
use crate::vars::{read_dotenv, resolve_path};
use crate::{color, CALL_ID_SEPARATOR, NAME_ID_SEPARATOR};
use act_actfile::Actfile;
use nix::sys::signal::{SigSet, Signal};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::{self, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Options for a `run` invocation, straight from the CLI.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Manifest path, resolved against the working directory.
    pub manifest_path: PathBuf,
    /// Dotted act name to run.
    pub call_id: String,
    /// Everything after the name: act flags plus rest-args.
    pub args: Vec<String>,
    /// Re-exec into the background and return immediately.
    pub daemon: bool,
    /// Suppress all command output.
    pub quiet: bool,
    /// Log mode override (`raw` or `prefixed`).
    pub log_mode: Option<String>,
}

/// Shared state of one running supervisor process.
pub struct Supervisor {
    wd: PathBuf,
    store: RunStore,
    record: RunHandle,
    run_id: String,
    name_id: String,
    quiet: bool,
    is_daemon: bool,
    log_mode: Option<String>,
    stopped: AtomicBool,
    finishing: AtomicBool,
    run_vars: Mutex<HashMap<String, String>>,
    act_vars: HashMap<String, String>,
    call_stack: Mutex<Vec<Arc<resolver::Invocation>>>,
    before_all_done: Mutex<HashSet<PathBuf>>,
}

impl Supervisor {
    pub fn wd(&self) -> &Path {
        &self.wd
    }

    pub fn store(&self) -> &RunStore {
        &self.store
    }

    pub fn record(&self) -> &RunHandle {
        &self.record
    }

    pub fn run_id(&self) -> String {
        self.run_id.clone()
    }

    pub fn name_id(&self) -> String {
        self.name_id.clone()
    }

    pub fn quiet(&self) -> bool {
        self.quiet
    }

    pub fn is_daemon(&self) -> bool {
        self.is_daemon
    }

    pub fn log_mode(&self) -> Option<String> {
        self.log_mode.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn is_finishing(&self) -> bool {
        self.finishing.load(Ordering::SeqCst)
    }

    /// Run-wide vars, loaded from the root manifest's env file at startup.
    pub fn run_vars(&self) -> HashMap<String, String> {
        self.run_vars.lock().clone()
    }

    /// Run-level act-runtime vars (`ActEnv`).
    pub fn act_vars(&self) -> HashMap<String, String> {
        self.act_vars.clone()
    }

    /// Path of the run's shared runtime dotenv.
    pub fn runtime_env_path(&self) -> PathBuf {
        self.store.env_path(&self.run_id)
    }

    /// Path of the run's log file.
    pub fn log_file_path(&self) -> PathBuf {
        self.store.log_path(&self.run_id)
    }

    pub(crate) fn push_call(&self, inv: Arc<resolver::Invocation>) {
        self.call_stack.lock().push(inv);
    }

    pub(crate) fn pop_call(&self) {
        self.call_stack.lock().pop();
    }

    pub(crate) fn call_depth(&self) -> usize {
        self.call_stack.lock().len()
    }

    /// Mark a manifest's `before-all` as executed. Returns true when the
    /// manifest had not been marked yet.
    pub(crate) fn mark_before_all(&self, manifest: &Path) -> bool {
        self.before_all_done.lock().insert(manifest.to_path_buf())
    }

    /// Best-effort kill of every still-running detached child.
    pub(crate) fn kill_detached_children(&self) {
        for child_id in self.record.child_act_ids() {
            if let Some(child) = self.store.load(&child_id) {
                tracing::debug!(child_id = %child_id, "killing detached child");
                store::kill_run(&self.store, &child);
            }
            self.record.rm_child_act_id(&child_id);
        }
    }

    /// Stop the run: kill every live command group and detached child.
    /// Only acts when running and not already finishing; a second signal
    /// during teardown is a no-op.
    pub fn stop(&self) {
        if self.finishing.load(Ordering::SeqCst) {
            return;
        }
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        tracing::debug!("stopping run");
        self.record.set_is_killing();

        for child_id in self.record.child_act_ids() {
            if let Some(child) = self.store.load(&child_id) {
                store::kill_run(&self.store, &child);
            }
        }
        for pgid in self.record.cmd_pgids() {
            store::kill_pgid(pgid);
        }
    }

    /// Tear the run down. Idempotent. On natural termination the stage
    /// machine already ran the final stages; after a stop, the stages of
    /// every invocation still on the call stack run here, innermost first.
    pub fn finish(self: &Arc<Self>) {
        if self.finishing.swap(true, Ordering::SeqCst) {
            return;
        }

        if !self.stopped.load(Ordering::SeqCst) {
            self.kill_detached_children();
            self.record.remove_dir();
            self.cascade();
            return;
        }

        // Resume so final stages can execute; `finishing` stays set so
        // killed children stay quiet.
        self.stopped.store(false, Ordering::SeqCst);

        let stack: Vec<Arc<resolver::Invocation>> = {
            let mut stack = self.call_stack.lock();
            stack.drain(..).collect()
        };
        for inv in stack.iter().rev() {
            if let Err(e) = exec::final_stage_exec(inv, self) {
                tracing::error!(act = %inv.act.name, error = %e, "final stage failed");
            }
        }

        self.record.remove_dir();
        self.cascade();
    }

    /// When this run was a detached child, collapse the tree upward.
    fn cascade(&self) {
        let parent_id = self.record.parent_act_id();
        if !parent_id.is_empty() {
            store::cascade_to_parent(&self.store, &parent_id, &self.run_id);
        }
    }

    #[cfg(test)]
    pub(crate) fn insert_run_var(&self, key: &str, value: &str) {
        self.run_vars
            .lock()
            .insert(key.to_string(), value.to_string());
    }

    #[cfg(test)]
    pub(crate) fn new_for_tests(wd: &Path) -> Arc<Self> {
        let store = RunStore::new(wd);
        let run_id = new_run_id();
        let record = RunRecord {
            id: run_id.clone(),
            name_id: "test".to_string(),
            pid: nix::unistd::getpid().as_raw(),
            pgid: 0,
            ..RunRecord::default()
        };
        let mut act_vars = HashMap::new();
        act_vars.insert(
            "ActEnv".to_string(),
            store.env_path(&run_id).display().to_string(),
        );
        #[allow(clippy::unwrap_used)]
        let record = RunHandle::create(store.clone(), record).unwrap();
        Arc::new(Self {
            wd: wd.to_path_buf(),
            store,
            record,
            run_id,
            name_id: "test".to_string(),
            quiet: false,
            is_daemon: false,
            log_mode: None,
            stopped: AtomicBool::new(false),
            finishing: AtomicBool::new(false),
            run_vars: Mutex::new(HashMap::new()),
            act_vars,
            call_stack: Mutex::new(Vec::new()),
            before_all_done: Mutex::new(HashSet::new()),
        })
    }
}

/// Execute the `run` sub-command: create the run descriptor, resolve the
/// call, drive execution, and tear down.
pub fn run(wd: &Path, opts: RunOptions) -> Result<(), RunError> {
    let manifest_path = resolve_path(wd, &opts.manifest_path);
    let manifest = Arc::new(Actfile::load(&manifest_path)?);
    let store = RunStore::new(wd);

    // Control variables are consumed so descendants never misread them.
    let run_id = take_env("ACT_RUN_ID").unwrap_or_else(new_run_id);
    let is_daemon = take_env("ACT_DAEMON").is_some();
    let parent_run_id = take_env("ACT_PARENT_RUN_ID");

    let mut name_id = opts.call_id.clone();
    let mut parent_act_id = String::new();
    if let Some(parent_id) = parent_run_id {
        let parent = store.find(&parent_id).ok_or(RunError::ParentNotFound {
            id: parent_id.clone(),
        })?;
        name_id = format!(
            "{}{}{}",
            parent.name_id_or_id(),
            NAME_ID_SEPARATOR,
            name_id
        );
        parent_act_id = parent_id;
    }

    // Daemon launch: re-exec into the background and return. The launcher
    // writes no descriptor; the background process owns it.
    if opts.daemon {
        return daemon_spawn(wd, &store, &manifest_path, &run_id, &opts);
    }

    let pid = nix::unistd::getpid().as_raw();
    let pgid = nix::unistd::getpgid(None)
        .map(nix::unistd::Pid::as_raw)
        .unwrap_or(pid);

    let record = RunRecord {
        id: run_id.clone(),
        name_id: name_id.clone(),
        parent_act_id,
        pid,
        pgid,
        ..RunRecord::default()
    };
    let record = RunHandle::create(store.clone(), record)?;

    let mut run_vars = HashMap::new();
    if let Some(envfile) = &manifest.envfile {
        run_vars = read_dotenv(&resolve_path(manifest.dir(), envfile));
    }

    let mut act_vars = HashMap::new();
    act_vars.insert(
        "ActEnv".to_string(),
        store.env_path(&run_id).display().to_string(),
    );

    let sup = Arc::new(Supervisor {
        wd: wd.to_path_buf(),
        store,
        record,
        run_id,
        name_id,
        quiet: opts.quiet,
        is_daemon,
        log_mode: opts.log_mode.clone(),
        stopped: AtomicBool::new(false),
        finishing: AtomicBool::new(false),
        run_vars: Mutex::new(run_vars),
        act_vars,
        call_stack: Mutex::new(Vec::new()),
        before_all_done: Mutex::new(HashSet::new()),
    });

    install_signal_watcher(&sup);

    let segments: Vec<String> = opts
        .call_id
        .split(CALL_ID_SEPARATOR)
        .map(str::to_string)
        .collect();

    let result = (|| {
        let inv = resolver::resolve(&segments, &manifest, None, &sup)?;
        inv.set_args(opts.args.clone());
        exec::exec_invocation(&inv, &sup)
    })();

    sup.finish();
    result
}

/// Spawn this binary again as a background runner in its own session, with
/// output appended to the run's log file.
fn daemon_spawn(
    wd: &Path,
    store: &RunStore,
    manifest_path: &Path,
    run_id: &str,
    opts: &RunOptions,
) -> Result<(), RunError> {
    let log_path = store.log_path(run_id);
    let open_log = || -> std::io::Result<std::fs::File> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
    };
    let log_file = open_log().map_err(|source| RunError::LogFile {
        path: log_path.clone(),
        source,
    })?;
    let log_err = log_file.try_clone().map_err(|source| RunError::LogFile {
        path: log_path.clone(),
        source,
    })?;

    let exe = exec::current_runner_exe()?;
    let mut command = process::Command::new(exe);
    command
        .arg("run")
        .arg(format!("-f={}", manifest_path.display()));
    if opts.quiet {
        command.arg("-q");
    }
    if let Some(mode) = &opts.log_mode {
        command.arg(format!("-l={mode}"));
    }
    command.arg(&opts.call_id);
    command.args(&opts.args);
    command.current_dir(wd);
    command.env("ACT_RUN_ID", run_id);
    command.env("ACT_DAEMON", "true");
    command
        .stdin(Stdio::null())
        .stdout(log_file)
        .stderr(log_err);
    exec::new_session(&mut command);

    command.spawn().map_err(|source| RunError::Spawn {
        command: format!("act run {}", opts.call_id),
        source,
    })?;

    let id = if color::should_colorize() {
        color::paint_bold(color::SUCCESS, run_id)
    } else {
        run_id.to_string()
    };
    println!("started with id {id}");

    Ok(())
}

/// Block SIGINT/SIGTERM/SIGQUIT process-wide and watch for them on a
/// dedicated thread. The watcher stops the run; Finish happens on the main
/// thread once execution unwinds. Children get a clean signal mask through
/// the spawn path.
fn install_signal_watcher(sup: &Arc<Supervisor>) {
    let mut set = SigSet::empty();
    set.add(Signal::SIGINT);
    set.add(Signal::SIGTERM);
    set.add(Signal::SIGQUIT);

    if let Err(e) = set.thread_block() {
        tracing::warn!(error = %e, "could not block termination signals");
        return;
    }

    let sup = Arc::clone(sup);
    std::thread::spawn(move || loop {
        match set.wait() {
            Ok(signal) => {
                // Keep `^C` from gluing onto the next log line.
                println!();
                tracing::debug!(signal = ?signal, "received termination signal");
                sup.stop();
            }
            Err(_) => break,
        }
    });
}

fn take_env(key: &str) -> Option<String> {
    let value = std::env::var(key).ok()?;
    std::env::remove_var(key);
    Some(value)
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
