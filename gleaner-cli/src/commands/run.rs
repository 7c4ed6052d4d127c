//! `gleaner run` — foreground periodic scan loop.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use gleaner_core::WatchConfig;

/// Arguments for `gleaner run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Watcher config file (YAML).
    #[arg(long)]
    pub config: PathBuf,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let config = WatchConfig::load(&self.config)
            .with_context(|| format!("failed to load config {}", self.config.display()))?;

        gleaner_daemon::start_blocking(config).context("scan loop failed")?;
        Ok(())
    }
}
