// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `act stop` - kill a running act and its children

use act_runner::{color, kill_run, RunStore};
use anyhow::{bail, Context, Result};

#[derive(clap::Args, Debug)]
pub struct StopArgs {
    /// Name id or run id of the act to stop
    pub name: String,
}

pub fn handle(args: StopArgs) -> Result<()> {
    let wd = std::env::current_dir().context("could not get working directory")?;
    let store = RunStore::new(&wd);

    let Some(record) = store.find(&args.name) else {
        bail!("act {} not found", args.name);
    };

    kill_run(&store, &record);

    let name = record.name_id_or_id();
    let name = if color::should_colorize() {
        color::paint_bold(color::SUCCESS, name)
    } else {
        name.to_string()
    };
    println!("act {name} stopped");

    Ok(())
}
