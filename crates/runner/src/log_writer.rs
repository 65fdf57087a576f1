// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prefixing line writer
//!
//! Commands whose output is not attached directly to the terminal write
//! through this writer: bytes are buffered, complete newline-terminated
//! lines are emitted with a `<name-id> | <timestamp> ` prefix, and
//! everything is duplicated to the run's log file. A detached child
//! prefixes its own lines, so the parent-side writer passes its bytes
//! through untouched.

use crate::color;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

pub struct LogWriter {
    prefix: String,
    detached: bool,
    console: bool,
    colorize: bool,
    log_file: File,
    buf: Vec<u8>,
}

impl LogWriter {
    /// Open a writer appending to the run's log file.
    pub fn new(prefix: impl Into<String>, log_path: &Path, detached: bool) -> io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let log_file = OpenOptions::new().create(true).append(true).open(log_path)?;
        Ok(Self {
            prefix: prefix.into(),
            detached,
            console: true,
            colorize: color::should_colorize(),
            log_file,
            buf: Vec::new(),
        })
    }

    /// Override the TTY-based color decision.
    pub fn colorize(mut self, on: bool) -> Self {
        self.colorize = on;
        self
    }

    /// Enable or disable console echo; the log file always receives the
    /// output. Detached children default to log-file-only unless their
    /// command sets `log`.
    pub fn console(mut self, on: bool) -> Self {
        self.console = on;
        self
    }

    fn emit(&mut self, line: &str) {
        let rendered = if self.detached {
            line.to_string()
        } else {
            let now = chrono::Local::now()
                .format("%Y-%m-%d %H:%M:%S%.6f")
                .to_string();
            if self.colorize {
                format!(
                    "{} | {} {}",
                    color::paint_bold(color::NAME, &self.prefix),
                    color::paint(color::TIME, &now),
                    line
                )
            } else {
                format!("{} | {} {}", self.prefix, now, line)
            }
        };

        if self.console {
            print!("{rendered}");
            let _ = io::stdout().flush();
        }
        let _ = self.log_file.write_all(rendered.as_bytes());
    }

    fn drain_lines(&mut self) {
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            self.emit(&String::from_utf8_lossy(&line));
        }
    }
}

impl Write for LogWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        self.drain_lines();
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        if !self.buf.is_empty() {
            let rest = std::mem::take(&mut self.buf);
            self.emit(&String::from_utf8_lossy(&rest));
        }
    }
}

#[cfg(test)]
#[path = "log_writer_tests.rs"]
mod tests;
