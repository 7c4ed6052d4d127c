//! `gleaner scan` — one reconciler pass.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use gleaner_core::WatchConfig;
use gleaner_ingest::{parser_from_config, JsonLineEmitter, Reconciler};

/// Arguments for `gleaner scan`.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Watcher config file (YAML).
    #[arg(long)]
    pub config: PathBuf,
}

impl ScanArgs {
    pub fn run(self) -> Result<()> {
        let config = WatchConfig::load(&self.config)
            .with_context(|| format!("failed to load config {}", self.config.display()))?;

        let parser_config = config
            .parser
            .clone()
            .context("config validation guarantees a parser section")?;
        let mut reconciler = Reconciler::new(
            &config,
            parser_from_config(&parser_config),
            Box::new(JsonLineEmitter::stdout()),
        )
        .with_context(|| format!("failed to start watcher '{}'", config.tag))?;

        let summary = reconciler.run_pass().context("reconciler pass failed")?;

        eprintln!(
            "{} discovered {}, processed {}, skipped {}, untracked {}, failed {} ({} ms)",
            "scan complete:".green().bold(),
            summary.discovered,
            summary.processed,
            summary.skipped,
            summary.untracked,
            summary.failed,
            summary.duration_ms,
        );
        Ok(())
    }
}
