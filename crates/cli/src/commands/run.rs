// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `act run` - resolve and execute an act

use anyhow::{Context, Result};
use std::path::PathBuf;

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Run the act as a daemon in the background
    #[arg(short = 'd')]
    pub daemon: bool,

    /// Suppress all command output
    #[arg(short = 'q')]
    pub quiet: bool,

    /// Log mode: raw or prefixed
    #[arg(short = 'l', value_name = "MODE")]
    pub log: Option<String>,

    /// Path to the actfile manifest
    #[arg(short = 'f', value_name = "PATH", default_value = "actfile.yml")]
    pub file: PathBuf,

    /// Dotted act name (`foo.bar` runs the bar child of foo)
    pub name: String,

    /// Act flags and arguments, passed through to the act
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

pub fn handle(args: RunArgs) -> Result<()> {
    let wd = std::env::current_dir().context("could not get working directory")?;

    act_runner::run(
        &wd,
        act_runner::RunOptions {
            manifest_path: args.file,
            call_id: args.name,
            args: args.args,
            daemon: args.daemon,
            quiet: args.quiet,
            log_mode: args.log,
        },
    )?;
    Ok(())
}
