// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stage and command execution
//!
//! An invocation executes its stages in order (`before`, `start`, `final`);
//! within a stage, commands run sequentially or fan out on scoped threads.
//! Each command dispatches along one of four branches: loop expansion, an
//! in-process act call, a detached act process, or a shell child started in
//! its own session.

use crate::error::RunError;
use crate::log_writer::LogWriter;
use crate::resolver::{self, Invocation};
use crate::store;
use crate::supervisor::Supervisor;
use crate::template::render;
use crate::vars::{self, resolve_path, ResolvedVars};
use crate::{CALL_ID_SEPARATOR, NAME_ID_SEPARATOR};
use act_actfile::{Actfile, CmdLoop, Command, Stage};
use nix::unistd::Pid;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{self, Stdio};
use std::sync::Arc;

/// Shell used when neither command, stage, act, nor manifest override it.
pub(crate) const DEFAULT_SHELL: &str = "bash";

/// Execute a resolved invocation: parse its flags, run `before-all` hooks
/// that are still pending, then drive the stage machine.
///
/// `final` runs on natural termination, including failure of `before` or
/// `start`; on signal the supervisor drives it instead from the call stack.
pub(crate) fn exec_invocation(inv: &Arc<Invocation>, sup: &Arc<Supervisor>) -> Result<(), RunError> {
    if !inv.act.flags.is_empty() {
        let decls = crate::flags::parse_decls(&inv.act.flags);
        let args = inv.rest_args();
        let (vals, rest) =
            crate::flags::parse_flag_args(&decls, &args).map_err(|message| RunError::Flags {
                act: inv.act.name.clone(),
                message,
            })?;
        inv.set_flags(vals, rest);
    }

    sup.push_call(Arc::clone(inv));

    let result = (|| {
        exec_before_all(inv, sup)?;
        if let Some(stage) = &inv.act.before {
            exec_stage(stage, inv, sup)?;
        }
        if let Some(stage) = &inv.act.start {
            exec_stage(stage, inv, sup)?;
        }
        Ok(())
    })();

    // On the stopped (signal) path the invocation stays on the call stack;
    // Finish drives its final stage from there.
    if !sup.is_stopped() {
        if sup.call_depth() == 1 {
            sup.kill_detached_children();
        }
        let final_result = final_stage_exec(inv, sup);
        sup.pop_call();
        return result.and(final_result);
    }

    result
}

/// Run the `final` stage of an invocation, if it has one.
pub(crate) fn final_stage_exec(inv: &Arc<Invocation>, sup: &Arc<Supervisor>) -> Result<(), RunError> {
    match &inv.act.final_stage {
        Some(stage) => {
            tracing::debug!(act = %inv.act.name, "running final stage");
            exec_stage(stage, inv, sup)
        }
        None => Ok(()),
    }
}

/// Run every pending `before-all` along the parent chain, root manifest
/// first. The supervisor owns the set of manifests already visited, so each
/// manifest's hook runs at most once per run.
fn exec_before_all(inv: &Arc<Invocation>, sup: &Arc<Supervisor>) -> Result<(), RunError> {
    let mut pending = Vec::new();
    let mut cur = Some(Arc::clone(inv));
    while let Some(ctx) = cur {
        if !sup.mark_before_all(&ctx.manifest.location) {
            break;
        }
        if let Some(stage) = &ctx.manifest.before_all {
            let call_id = format!("{}{}before", ctx.call_id, NAME_ID_SEPARATOR);
            pending.insert(
                0,
                resolver::before_all_invocation(&ctx.manifest, call_id, stage, sup.run_vars()),
            );
        }
        cur = ctx.parent.clone();
    }

    for before in pending {
        exec_invocation(&before, sup)?;
    }
    Ok(())
}

/// Execute a stage. Sequential stages stop at the first failing command and
/// propagate its exit code; parallel stages launch every command on its own
/// thread, wait for all of them, and only log failures.
fn exec_stage(stage: &Stage, inv: &Arc<Invocation>, sup: &Arc<Supervisor>) -> Result<(), RunError> {
    if !sup.is_running() {
        return Ok(());
    }

    tracing::debug!(
        stage = %stage.name,
        act = %inv.act.name,
        cmds = stage.cmds.len(),
        parallel = stage.parallel,
        "executing stage"
    );

    if stage.parallel {
        std::thread::scope(|scope| {
            let handles: Vec<_> = stage
                .cmds
                .iter()
                .map(|cmd| scope.spawn(move || exec_command(cmd, stage, inv, sup)))
                .collect();
            for handle in handles {
                match handle.join() {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::error!(stage = %stage.name, error = %e, "parallel command failed")
                    }
                    Err(_) => tracing::error!(stage = %stage.name, "parallel command panicked"),
                }
            }
        });
        Ok(())
    } else {
        for cmd in &stage.cmds {
            if !sup.is_running() {
                break;
            }
            exec_command(cmd, stage, inv, sup)?;
        }
        Ok(())
    }
}

/// Dispatch a single command: loop expansion, act call (in-process or
/// detached), or shell execution.
fn exec_command(
    cmd: &Command,
    stage: &Stage,
    inv: &Arc<Invocation>,
    sup: &Arc<Supervisor>,
) -> Result<(), RunError> {
    if !sup.is_running() {
        return Ok(());
    }

    let resolved = vars::resolve_vars(inv, sup);

    if let Some(lp) = &cmd.loop_spec {
        return exec_loop(cmd, lp, &resolved, stage, inv, sup);
    }
    if !cmd.act.is_empty() {
        if cmd.detach {
            return exec_detached(cmd, &resolved, inv, sup);
        }
        return exec_act_call(cmd, &resolved, inv, sup);
    }
    exec_shell(cmd, &resolved, stage, inv, sup)
}

/// Expand a loop command into per-item commands and run them through the
/// same stage machinery, under the enclosing stage's parallelism.
fn exec_loop(
    cmd: &Command,
    lp: &CmdLoop,
    resolved: &ResolvedVars,
    stage: &Stage,
    inv: &Arc<Invocation>,
    sup: &Arc<Supervisor>,
) -> Result<(), RunError> {
    let items: Vec<String> = if lp.glob.is_empty() {
        lp.items
            .iter()
            .map(|item| render(item, &resolved.vars))
            .collect()
    } else {
        let pattern = render(&lp.glob, &resolved.vars);
        glob_items(inv.manifest.dir(), &pattern)?
    };

    if items.is_empty() {
        tracing::debug!(act = %inv.act.name, "loop expanded to nothing");
        return Ok(());
    }

    let mut cmds = Vec::with_capacity(items.len());
    for item in items {
        let mut item_vars = resolved.vars.clone();
        item_vars.insert("LoopItem".to_string(), item);
        cmds.push(Command {
            cmd: render(&cmd.cmd, &item_vars),
            act: render(&cmd.act, &item_vars),
            from: render(&cmd.from, &item_vars),
            script: cmd.script.clone(),
            shell: cmd.shell.clone(),
            args: cmd.args.clone(),
            detach: cmd.detach,
            quiet: cmd.quiet,
            log: cmd.log,
            mismatch: cmd.mismatch.clone(),
            loop_spec: None,
        });
    }

    let generated = Stage {
        name: stage.name.clone(),
        parallel: stage.parallel,
        quiet: stage.quiet,
        shell: stage.shell.clone(),
        cmds,
    };
    exec_stage(&generated, inv, sup)
}

/// Invoke another act in-process, recursing through resolution.
fn exec_act_call(
    cmd: &Command,
    resolved: &ResolvedVars,
    inv: &Arc<Invocation>,
    sup: &Arc<Supervisor>,
) -> Result<(), RunError> {
    let act_field = render(&cmd.act, &resolved.vars);
    let segments: Vec<String> = act_field
        .split(CALL_ID_SEPARATOR)
        .map(str::to_string)
        .collect();

    let manifest = if cmd.from.is_empty() {
        Arc::clone(&inv.manifest)
    } else {
        let from = render(&cmd.from, &resolved.vars);
        let path = resolve_path(sup.wd(), &from);
        if path == inv.manifest.location {
            Arc::clone(&inv.manifest)
        } else {
            Arc::new(Actfile::load(&path)?)
        }
    };

    let args: Vec<String> = cmd
        .args
        .iter()
        .map(|arg| render(arg, &resolved.vars))
        .collect();

    match resolver::resolve(&segments, &manifest, Some(inv), sup) {
        Ok(next) => {
            next.set_args(args);
            exec_invocation(&next, sup)
        }
        Err(err) if cmd.mismatch == "allow" => {
            tracing::debug!(act = %act_field, error = %err, "skipping unmatched act call");
            Ok(())
        }
        Err(err) => Err(RunError::Resolve(err)),
    }
}

/// Spawn an independent runner process for a detached act call. The child
/// supervises itself through its own run descriptor; the parent only
/// registers the child id and streams its output.
fn exec_detached(
    cmd: &Command,
    resolved: &ResolvedVars,
    inv: &Arc<Invocation>,
    sup: &Arc<Supervisor>,
) -> Result<(), RunError> {
    let manifest_path = if cmd.from.is_empty() {
        inv.manifest.location.clone()
    } else {
        resolve_path(inv.manifest.dir(), render(&cmd.from, &resolved.vars))
    };

    let child_id = store::new_run_id();
    let act_name = render(&cmd.act, &resolved.vars);
    let log_mode = effective_log_mode(inv, sup);

    let mut env = resolved.to_env();
    env.push(("ACT_PARENT_RUN_ID".to_string(), sup.run_id()));
    env.push(("ACT_RUN_ID".to_string(), child_id.clone()));

    let exe = current_runner_exe()?;
    let mut command = process::Command::new(exe);
    command
        .arg("run")
        .arg(format!("-f={}", manifest_path.display()))
        .arg(format!("-l={log_mode}"))
        .arg(&act_name);
    for arg in &cmd.args {
        command.arg(render(arg, &resolved.vars));
    }
    command.current_dir(sup.wd());
    command.env_clear();
    command.envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    new_session(&mut command);

    let quiet = sup.quiet() || inv.act.quiet || cmd.quiet;
    command.stdin(Stdio::null());
    if quiet {
        command.stdout(Stdio::null()).stderr(Stdio::null());
    } else {
        command.stdout(Stdio::piped()).stderr(Stdio::piped());
    }

    let mut child = command.spawn().map_err(|source| RunError::Spawn {
        command: format!("act run {act_name}"),
        source,
    })?;

    if !quiet {
        // The child prefixes its own lines; the parent-side writers pass
        // bytes through and tee them into the parent's log.
        let prefix = writer_prefix(inv, sup);
        if let Some(stdout) = child.stdout.take() {
            spawn_copier(stdout, open_writer(&prefix, sup, true)?.console(cmd.log));
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_copier(stderr, open_writer(&prefix, sup, true)?.console(cmd.log));
        }
    }

    sup.record().add_child_act_id(&child_id);
    tracing::debug!(child_id = %child_id, act = %act_name, "detached child started");

    // Reap the child when it exits; its lifecycle is otherwise its own.
    std::thread::spawn(move || {
        let _ = child.wait();
    });

    Ok(())
}

/// Run a shell line or script as a child process in its own session.
fn exec_shell(
    cmd: &Command,
    resolved: &ResolvedVars,
    stage: &Stage,
    inv: &Arc<Invocation>,
    sup: &Arc<Supervisor>,
) -> Result<(), RunError> {
    let (display_cmd, shell_args) = if cmd.script.is_empty() {
        let line = render(&cmd.cmd, &resolved.vars);
        let mut args = vec!["-c".to_string(), line.clone(), "--".to_string()];
        args.extend(inv.rest_args());
        (line, args)
    } else {
        let script = render(&cmd.script, &resolved.vars);
        let mut args = vec![script.clone()];
        args.extend(cmd.args.iter().map(|arg| render(arg, &resolved.vars)));
        (script, args)
    };

    let shell = cmd
        .shell
        .clone()
        .or_else(|| stage.shell.clone())
        .or_else(|| inv.act.shell.clone())
        .or_else(|| inv.manifest.shell.clone())
        .unwrap_or_else(|| DEFAULT_SHELL.to_string());

    let mut command = process::Command::new(&shell);
    command.args(&shell_args);
    // Commands run relative to the folder holding the manifest where the
    // act was matched.
    command.current_dir(inv.manifest.dir());
    // The child's environment is exactly the resolver's export.
    command.env_clear();
    let env = resolved.to_env();
    command.envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    new_session(&mut command);

    let quiet = sup.quiet() || inv.act.quiet || stage.quiet || cmd.quiet;
    let mode = effective_log_mode(inv, sup);
    let prefixed = !quiet && (sup.is_daemon() || mode == "prefixed");
    if quiet {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
    } else if prefixed {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
    }

    tracing::debug!(act = %inv.act.name, shell = %shell, command = %display_cmd, "spawning command");

    let mut child = command.spawn().map_err(|source| RunError::Spawn {
        command: display_cmd.clone(),
        source,
    })?;

    // The child leads a fresh session, so its pid doubles as the pgid we
    // register for shutdown.
    let pid = child.id() as i32;
    let pgid = nix::unistd::getpgid(Some(Pid::from_raw(pid)))
        .map(Pid::as_raw)
        .unwrap_or(pid);
    sup.record().add_cmd_pgid(pgid);

    let status = if prefixed {
        let prefix = writer_prefix(inv, sup);
        let out_writer = open_writer(&prefix, sup, false)?;
        let err_writer = open_writer(&prefix, sup, false)?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        std::thread::scope(|scope| {
            if let Some(mut stream) = stdout {
                let mut writer = out_writer;
                scope.spawn(move || {
                    let _ = std::io::copy(&mut stream, &mut writer);
                });
            }
            if let Some(mut stream) = stderr {
                let mut writer = err_writer;
                scope.spawn(move || {
                    let _ = std::io::copy(&mut stream, &mut writer);
                });
            }
            child.wait()
        })
    } else {
        child.wait()
    };

    sup.record().rm_cmd_pgid(pgid);

    let status = status.map_err(|source| RunError::Spawn {
        command: display_cmd.clone(),
        source,
    })?;

    match status.code() {
        // A deliberately killed child exits by signal and reports no code;
        // nonzero codes during teardown are suppressed the same way.
        Some(code) if code != 0 && !sup.is_finishing() => Err(RunError::CommandFailed {
            command: display_cmd,
            code,
        }),
        _ => Ok(()),
    }
}

/// Effective log mode: the run-level override wins, then the act chain,
/// then the manifest, defaulting to `raw`.
fn effective_log_mode(inv: &Invocation, sup: &Supervisor) -> String {
    if let Some(mode) = sup.log_mode() {
        if !mode.is_empty() {
            return mode;
        }
    }
    if let Some(mode) = inv.act_log() {
        return mode;
    }
    if let Some(mode) = &inv.manifest.log {
        if !mode.is_empty() {
            return mode.clone();
        }
    }
    "raw".to_string()
}

/// Log prefix for a command: `namespace.act-name` when the manifest
/// declares a namespace, the run's name id otherwise.
fn writer_prefix(inv: &Invocation, sup: &Supervisor) -> String {
    if inv.manifest.namespace.is_empty() {
        sup.name_id()
    } else {
        format!("{}.{}", inv.manifest.namespace, inv.act.name)
    }
}

fn open_writer(prefix: &str, sup: &Supervisor, detached: bool) -> Result<LogWriter, RunError> {
    LogWriter::new(prefix, &sup.log_file_path(), detached).map_err(|source| RunError::LogFile {
        path: sup.log_file_path(),
        source,
    })
}

fn spawn_copier(mut reader: impl Read + Send + 'static, mut writer: LogWriter) {
    std::thread::spawn(move || {
        let _ = std::io::copy(&mut reader, &mut writer);
    });
}

/// Put the child into a fresh session so killing its group never signals
/// the supervisor, and clear the signal mask the supervisor blocks for its
/// own sigwait loop.
pub(crate) fn new_session(command: &mut process::Command) {
    use nix::sys::signal::{SigSet, SigmaskHow};
    use std::os::unix::process::CommandExt;
    unsafe {
        command.pre_exec(|| {
            nix::unistd::setsid().map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;
            nix::sys::signal::sigprocmask(SigmaskHow::SIG_SETMASK, Some(&SigSet::empty()), None)
                .map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;
            Ok(())
        });
    }
}

/// Path of the runner binary used to re-exec for detached and daemon runs.
pub(crate) fn current_runner_exe() -> Result<PathBuf, RunError> {
    std::env::current_exe().map_err(|source| RunError::Spawn {
        command: "act".to_string(),
        source,
    })
}

/// Expand a glob pattern rooted at `base`, returning sorted matches.
fn glob_items(base: &Path, pattern: &str) -> Result<Vec<String>, RunError> {
    let full = resolve_path(base, pattern);
    let full_str = full.display().to_string();
    let matcher = globset::Glob::new(&full_str)
        .map_err(|source| RunError::Glob {
            pattern: pattern.to_string(),
            source,
        })?
        .compile_matcher();

    let root = glob_walk_root(&full);
    let mut items: Vec<String> = walkdir::WalkDir::new(root)
        .into_iter()
        .flatten()
        .filter(|entry| matcher.is_match(entry.path()))
        .map(|entry| entry.path().display().to_string())
        .collect();
    items.sort();
    Ok(items)
}

/// Longest literal directory prefix of a glob pattern, used as the walk
/// root so the walker does not scan unrelated trees.
fn glob_walk_root(pattern: &Path) -> PathBuf {
    let mut root = PathBuf::new();
    for comp in pattern.components() {
        let text = comp.as_os_str().to_string_lossy();
        if text.contains(|c| matches!(c, '*' | '?' | '[' | '{')) {
            break;
        }
        root.push(comp);
    }
    if root.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        root
    }
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;
