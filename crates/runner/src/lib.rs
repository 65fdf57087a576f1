// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Act resolution, execution, and supervision engine
//!
//! The engine is synchronous by design: every execution step is either a
//! blocking wait on a child process or a scoped-thread join, and resolution
//! recurses through manifests on the call stack. Parallel stages fan out on
//! OS threads; detached children are independent processes supervised
//! through their on-disk run descriptors.

pub mod color;
mod error;
mod exec;
mod flags;
mod log_writer;
mod resolver;
mod store;
mod supervisor;
mod template;
mod vars;

pub use error::{ResolveError, RunError};
pub use flags::{parse_decls, parse_flag_args, FlagDecl};
pub use log_writer::LogWriter;
pub use resolver::{resolve, Invocation};
pub use store::{
    cascade_to_parent, kill_pgid, kill_run, new_run_id, RunHandle, RunRecord, RunStore, StoreError,
    DATA_DIR_NAME, ENV_FILE_NAME, INFO_FILE_NAME, LOG_FILE_NAME,
};
pub use supervisor::{run, RunOptions, Supervisor};
pub use template::render;
pub use vars::{camel_to_snake_upper, ResolvedVars};

/// Separator between call segments on the CLI (`foo.bar.baz`).
pub const CALL_ID_SEPARATOR: char = '.';

/// Separator between a parent run's name id and a detached child's
/// (`parent::child`).
pub const NAME_ID_SEPARATOR: &str = "::";
