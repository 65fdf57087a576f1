// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `act log` - show the log of a running act

use act_runner::RunStore;
use anyhow::{bail, Context, Result};
use std::io::{Read, Seek, SeekFrom, Write};
use std::time::Duration;

/// How far back the initial tail reaches.
const TAIL_BYTES: u64 = 2048;

/// Poll interval while following.
const FOLLOW_INTERVAL: Duration = Duration::from_millis(200);

#[derive(clap::Args, Debug)]
pub struct LogArgs {
    /// Follow the log while it grows
    #[arg(short = 'f')]
    pub follow: bool,

    /// Name id or run id of the act to log
    pub name: String,
}

pub fn handle(args: LogArgs) -> Result<()> {
    let wd = std::env::current_dir().context("could not get working directory")?;
    let store = RunStore::new(&wd);

    let Some(record) = store.find(&args.name) else {
        bail!("act {} not found", args.name);
    };

    let log_path = store.log_path(&record.id);
    if !log_path.exists() {
        bail!("nothing to log");
    }

    let mut file = std::fs::File::open(&log_path)
        .with_context(|| format!("could not open log file {}", log_path.display()))?;
    let len = file.metadata()?.len();

    // Start near the end; a byte offset can land mid-line, so the first
    // partial line is dropped.
    let start = len.saturating_sub(TAIL_BYTES);
    file.seek(SeekFrom::Start(start))?;
    let mut tail = String::new();
    file.read_to_string(&mut tail)?;
    if start > 0 {
        tail = tail
            .split_once('\n')
            .map(|(_, rest)| rest.to_string())
            .unwrap_or_default();
    }
    print!("{tail}");
    std::io::stdout().flush()?;

    if !args.follow {
        return Ok(());
    }

    // Tail the file while the run lives; the directory disappearing means
    // the run is over.
    let mut offset = len;
    loop {
        std::thread::sleep(FOLLOW_INTERVAL);
        let len = match std::fs::metadata(&log_path) {
            Ok(meta) => meta.len(),
            Err(_) => return Ok(()),
        };
        if len < offset {
            // Truncated; start over from the top.
            offset = 0;
        }
        if len > offset {
            file.seek(SeekFrom::Start(offset))?;
            let mut chunk = String::new();
            file.read_to_string(&mut chunk)?;
            print!("{chunk}");
            std::io::stdout().flush()?;
            offset = len;
        }
    }
}
