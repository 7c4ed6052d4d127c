//! `gleaner ledger` — ledger file inspection.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use tabled::{settings::Style, Table, Tabled};

use gleaner_ingest::reconciler::read_ledger_entries;

#[derive(Subcommand, Debug)]
pub enum LedgerCommand {
    /// Print the tracked entries of a ledger file.
    List {
        /// Path to the ledger file.
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Tabled)]
struct LedgerRow {
    #[tabled(rename = "PATH")]
    path: String,
    #[tabled(rename = "INODE")]
    inode: u64,
    #[tabled(rename = "MODIFIED")]
    modified: String,
}

pub fn run(command: LedgerCommand) -> Result<()> {
    match command {
        LedgerCommand::List { file } => {
            let entries = read_ledger_entries(&file)
                .with_context(|| format!("failed to read ledger {}", file.display()))?;

            if entries.is_empty() {
                println!("ledger {} is empty", file.display());
                return Ok(());
            }

            let rows: Vec<LedgerRow> = entries
                .iter()
                .map(|entry| LedgerRow {
                    path: entry.path.display().to_string(),
                    inode: entry.inode,
                    modified: format_mtime(entry.mtime_s, entry.mtime_ns),
                })
                .collect();

            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{table}");
            Ok(())
        }
    }
}

fn format_mtime(mtime_s: i64, mtime_ns: u64) -> String {
    match DateTime::<Utc>::from_timestamp(mtime_s, mtime_ns as u32) {
        Some(when) => when.to_rfc3339(),
        None => format!("{mtime_s}.{mtime_ns}"),
    }
}
