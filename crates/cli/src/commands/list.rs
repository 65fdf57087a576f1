// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `act list` - table of all run descriptors

use act_runner::{RunRecord, RunStore};
use anyhow::{Context, Result};

pub fn handle() -> Result<()> {
    let wd = std::env::current_dir().context("could not get working directory")?;
    let store = RunStore::new(&wd);

    let records = store.list_all();
    if records.is_empty() {
        println!("no acts running");
        return Ok(());
    }

    print!("{}", render_table(&records));
    Ok(())
}

/// Fixed-width table of run descriptors.
fn render_table(records: &[RunRecord]) -> String {
    let headers = ["ID", "NAME", "PID", "PGID", "CHILDREN"];
    let rows: Vec<[String; 5]> = records
        .iter()
        .map(|r| {
            [
                r.id.clone(),
                r.name_id_or_id().to_string(),
                r.pid.to_string(),
                r.pgid.to_string(),
                r.child_act_ids.len().to_string(),
            ]
        })
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let mut out = String::new();
    let render_row = |cells: &[String]| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    out.push_str(&render_row(&header_cells));
    out.push('\n');
    for row in &rows {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out
}
