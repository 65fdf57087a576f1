// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! act - project-scoped task runner and process supervisor

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{list, log, run, stop};

#[derive(Parser)]
#[command(
    name = "act",
    version,
    about = "Project-scoped task runner and process supervisor"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an act by its dotted name
    Run(run::RunArgs),
    /// Stop a running act and its children
    Stop(stop::StopArgs),
    /// Show the log of a running act
    Log(log::LogArgs),
    /// List all running acts
    List,
    /// Print version metadata
    Version,
}

fn main() {
    init_tracing();

    if let Err(e) = dispatch() {
        let code = e
            .downcast_ref::<act_runner::RunError>()
            .map_or(1, act_runner::RunError::exit_code);
        eprintln!("Error: {e:#}");
        std::process::exit(code);
    }
}

fn dispatch() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run::handle(args),
        Commands::Stop(args) => stop::handle(args),
        Commands::Log(args) => log::handle(args),
        Commands::List => list::handle(),
        Commands::Version => {
            println!("act {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Engine diagnostics go to stderr. `ACT_DEBUG` turns on debug-level
/// output and is consumed so descendants do not misinterpret it.
fn init_tracing() {
    let debug = std::env::var_os("ACT_DEBUG").is_some();
    if debug {
        std::env::remove_var("ACT_DEBUG");
    }
    let filter = if debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}
