// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ANSI color helpers (cosmetic only)

use std::io::IsTerminal;

/// Act name prefixes in log lines: yellow
pub const NAME: u8 = 178;
/// Timestamps in log lines: cyan
pub const TIME: u8 = 80;
/// Success messages: green
pub const SUCCESS: u8 = 114;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Determine if color output should be enabled.
///
/// `NO_COLOR` disables, otherwise a TTY check on stdout decides.
pub fn should_colorize() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    std::io::stdout().is_terminal()
}

fn fg256(code: u8) -> String {
    format!("\x1b[38;5;{code}m")
}

/// Wrap text in a 256-color foreground escape.
pub fn paint(code: u8, text: &str) -> String {
    format!("{}{}{}", fg256(code), text, RESET)
}

/// Same, bold.
pub fn paint_bold(code: u8, text: &str) -> String {
    format!("{}{}{}{}", BOLD, fg256(code), text, RESET)
}
