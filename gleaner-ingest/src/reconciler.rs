//! Per-tick reconciliation: discover → diff → untrack → process.
//!
//! Each pass is stateless beyond what the [`Ledger`] persists. Stale cache
//! entries (key gone, or same key with different attributes) are untracked
//! first, so a file that was deleted and replaced under the same path is
//! forgotten and reprocessed within the same pass. A file is only `add`ed
//! to the ledger after its parser run succeeded end to end; a parse failure
//! leaves it untracked for the next tick to retry.

use std::fs::File;
use std::path::Path;
use std::time::Instant;

use serde_json::Value;

use gleaner_core::{registry, FileIdentity, WatchConfig};
use gleaner_core::registry::LedgerClaim;

use crate::archive::archive_file;
use crate::discovery::Discovery;
use crate::emit::Emitter;
use crate::error::{io_err, IngestError};
use crate::ledger::Ledger;
use crate::parse::Parser;

/// Counts for one reconciler pass, for operator-facing logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassSummary {
    /// Files the discovery step reported this tick.
    pub discovered: usize,
    /// Stale ledger entries forgotten this tick.
    pub untracked: usize,
    /// Files parsed, emitted, and recorded this tick.
    pub processed: usize,
    /// Files already recorded as processed.
    pub skipped: usize,
    /// Files whose parse or ledger update failed; retried next tick.
    pub failed: usize,
    pub duration_ms: u128,
}

/// Drives one watcher: owns the ledger, discovery state, and collaborators.
pub struct Reconciler {
    tag: String,
    path_key: Option<String>,
    archive_to: Option<String>,
    ledger: Ledger,
    discovery: Discovery,
    parser: Box<dyn Parser>,
    emitter: Box<dyn Emitter>,
    _claim: Option<LedgerClaim>,
}

impl Reconciler {
    /// Validate `config`, claim its ledger path, open and replay the ledger.
    pub fn new(
        config: &WatchConfig,
        parser: Box<dyn Parser>,
        emitter: Box<dyn Emitter>,
    ) -> Result<Self, IngestError> {
        config.validate()?;

        let claim = match config.ledger_path.as_deref() {
            Some(path) => Some(registry::register(path, &config.tag)?),
            None => {
                tracing::warn!(
                    tag = %config.tag,
                    "ledger_path is not set; processed-file state will not survive a restart",
                );
                None
            }
        };

        let ledger = Ledger::open(config.ledger_path.as_deref(), config.key_mode())?;

        Ok(Self {
            tag: config.tag.clone(),
            path_key: config.path_key().map(str::to_string),
            archive_to: config.archive_to.clone(),
            ledger,
            discovery: Discovery::from_config(config),
            parser,
            emitter,
            _claim: claim,
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Run one discover → diff → untrack → process pass.
    pub fn run_pass(&mut self) -> Result<PassSummary, IngestError> {
        let started = Instant::now();

        let current = self.discovery.resolve();
        tracing::debug!(tag = %self.tag, discovered = current.len(), "discovery complete");

        let cached = self.ledger.snapshot();
        let to_untrack: Vec<FileIdentity> = cached
            .iter()
            .filter(|&(key, identity)| current.get(key) != Some(identity))
            .map(|(_, identity)| identity.clone())
            .collect();

        for identity in &to_untrack {
            tracing::debug!(tag = %self.tag, path = %identity.path.display(), "untracking stale entry");
            self.ledger.remove(identity)?;
        }

        let mut processed = 0;
        let mut skipped = 0;
        let mut failed = 0;
        // Iteration order across files within a tick is unspecified.
        for identity in current.values() {
            // Re-check against the ledger: an identity can have been removed
            // for one key and re-discovered under another in this same tick.
            if self.ledger.has(identity) {
                skipped += 1;
                continue;
            }
            match self.process_file(identity) {
                Ok(()) => processed += 1,
                Err(err) => {
                    tracing::warn!(
                        tag = %self.tag,
                        path = %identity.path.display(),
                        error = %err,
                        "processing failed; file stays untracked and will be retried",
                    );
                    failed += 1;
                }
            }
        }

        Ok(PassSummary {
            discovered: current.len(),
            untracked: to_untrack.len(),
            processed,
            skipped,
            failed,
            duration_ms: started.elapsed().as_millis(),
        })
    }

    /// Parse and emit one file, then durably record it and archive it.
    fn process_file(&mut self, identity: &FileIdentity) -> Result<(), IngestError> {
        tracing::debug!(tag = %self.tag, path = %identity.path.display(), "processing file");

        let mut file = File::open(&identity.path).map_err(|e| io_err(&identity.path, e))?;

        let tag = &self.tag;
        let path_key = self.path_key.as_deref();
        let source_path = identity.path.display().to_string();
        let emitter = &mut self.emitter;
        self.parser.parse(&identity.path, &mut file, &mut |time, mut record| {
            if let Some(key) = path_key {
                record
                    .entry(key.to_string())
                    .or_insert_with(|| Value::String(source_path.clone()));
            }
            emitter.emit(tag, time, &record)
        })?;

        self.ledger.add(identity)?;

        if let Some(template) = &self.archive_to {
            match archive_file(&identity.path, template) {
                Ok(dest) => {
                    tracing::debug!(
                        tag = %self.tag,
                        from = %identity.path.display(),
                        to = %dest.display(),
                        "archived processed file",
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        tag = %self.tag,
                        path = %identity.path.display(),
                        error = %err,
                        "can't archive processed file",
                    );
                }
            }
        }
        Ok(())
    }
}

/// List the entries of an existing ledger file without claiming it.
///
/// Read-only helper for inspection tooling.
pub fn read_ledger_entries(path: &Path) -> Result<Vec<FileIdentity>, IngestError> {
    let ledger = Ledger::open(Some(path), gleaner_core::KeyMode::Path)?;
    let mut entries: Vec<FileIdentity> = ledger.snapshot().into_values().collect();
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}
