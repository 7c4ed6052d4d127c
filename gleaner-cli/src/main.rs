//! Gleaner — poll-based process-once file ingestion CLI.
//!
//! # Usage
//!
//! ```text
//! gleaner scan --config <watch.yaml>
//! gleaner run --config <watch.yaml>
//! gleaner ledger list --file <path.ledger>
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{ledger::LedgerCommand, run::RunArgs, scan::ScanArgs};

#[derive(Parser, Debug)]
#[command(
    name = "gleaner",
    version,
    about = "Watch file patterns and emit each new file's records exactly once",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a single reconciler pass and exit.
    Scan(ScanArgs),

    /// Run the periodic scan loop in the foreground until ctrl-c.
    Run(RunArgs),

    /// Inspect ledger files.
    Ledger {
        #[command(subcommand)]
        command: LedgerCommand,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Scan(args) => args.run(),
        Commands::Run(args) => args.run(),
        Commands::Ledger { command } => commands::ledger::run(command),
    }
}
