//! Daemon runtime: a single periodic timer driving reconciler passes.
//!
//! One pass runs at a time; ticks that fire while a pass is in flight are
//! skipped, never queued. Shutdown (ctrl-c) is honored between passes, so
//! an in-flight pass always finishes its current file and the ledger handle
//! closes with no mutation half-written.

use std::time::Duration;

use tokio::sync::broadcast;

use gleaner_core::WatchConfig;
use gleaner_ingest::{parser_from_config, JsonLineEmitter, Reconciler};

use crate::error::DaemonError;

/// Build a reconciler from `config` and block the current thread on the
/// scan loop until ctrl-c. Records are emitted as JSON lines on stdout.
pub fn start_blocking(config: WatchConfig) -> Result<(), DaemonError> {
    init_tracing();
    config.validate()?;

    let parser_config = config
        .parser
        .clone()
        .ok_or(gleaner_core::ConfigError::MissingParser)?;
    let reconciler = Reconciler::new(
        &config,
        parser_from_config(&parser_config),
        Box::new(JsonLineEmitter::stdout()),
    )?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c, shutting down after current pass");
            let _ = shutdown_tx.send(());
        }
    });

    runtime.block_on(run(reconciler, config.refresh_interval(), shutdown_rx))
}

/// Run the scan loop until the shutdown channel fires.
pub async fn run(
    reconciler: Reconciler,
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    ticker.tick().await; // consume the first immediate tick

    // The reconciler shuttles through spawn_blocking and back each tick.
    let mut slot = Some(reconciler);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = ticker.tick() => {
                let Some(mut current) = slot.take() else { break };
                let (returned, result) = tokio::task::spawn_blocking(move || {
                    let result = current.run_pass();
                    (current, result)
                })
                .await
                .map_err(|err| DaemonError::Runtime(format!("pass task join error: {err}")))?;
                slot = Some(returned);

                match result {
                    Ok(summary) => {
                        tracing::info!(
                            discovered = summary.discovered,
                            untracked = summary.untracked,
                            processed = summary.processed,
                            skipped = summary.skipped,
                            failed = summary.failed,
                            duration_ms = summary.duration_ms,
                            "reconciler pass completed",
                        );
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "reconciler pass failed");
                    }
                }
            }
        }
    }

    // Dropping the reconciler closes the ledger handle and releases the
    // ledger-path claim after any in-flight mutation completed.
    drop(slot);
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Utc};
    use tempfile::TempDir;

    use gleaner_core::ParserConfig;
    use gleaner_ingest::{CsvParser, Emitter, IngestError, Record};

    use super::*;

    type Events = Arc<Mutex<Vec<(String, Record)>>>;

    struct SharedEmitter(Events);

    impl Emitter for SharedEmitter {
        fn emit(
            &mut self,
            tag: &str,
            _time: Option<DateTime<Utc>>,
            record: &Record,
        ) -> Result<(), IngestError> {
            self.0
                .lock()
                .expect("events lock")
                .push((tag.to_string(), record.clone()));
            Ok(())
        }
    }

    fn watch_config(dir: &TempDir) -> WatchConfig {
        WatchConfig {
            tag: "daemon-test".to_string(),
            path: format!("{}/*.csv", dir.path().display()),
            path_delimiter: ",".to_string(),
            exclude_path: vec![],
            limit_recently_modified: None,
            limit_oldly_modified: None,
            refresh_interval: 30,
            path_key: None,
            ledger_path: Some(dir.path().join("daemon.ledger")),
            follow_inodes: false,
            archive_to: None,
            ignore_repeated_permission_error: false,
            parser: Some(ParserConfig::Csv {
                keys: vec![],
                delimiter: ',',
                has_header: true,
            }),
        }
    }

    #[tokio::test]
    async fn shutdown_before_first_tick_exits_cleanly() {
        let dir = TempDir::new().expect("tempdir");
        let config = watch_config(&dir);
        let reconciler = Reconciler::new(
            &config,
            Box::new(CsvParser::new(vec![], ',', true)),
            Box::new(SharedEmitter(Arc::new(Mutex::new(Vec::new())))),
        )
        .expect("reconciler");

        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
        shutdown_tx.send(()).expect("send shutdown");

        tokio::time::timeout(
            Duration::from_secs(5),
            run(reconciler, Duration::from_secs(3600), shutdown_rx),
        )
        .await
        .expect("loop exits before the first scheduled tick")
        .expect("clean shutdown");
    }

    #[tokio::test]
    async fn ticks_drive_passes_until_shutdown() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("a.csv"), "name,qty\nwidget,3\n").expect("write csv");

        let config = watch_config(&dir);
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let reconciler = Reconciler::new(
            &config,
            Box::new(CsvParser::new(vec![], ',', true)),
            Box::new(SharedEmitter(events.clone())),
        )
        .expect("reconciler");

        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            let _ = shutdown_tx.send(());
        });

        tokio::time::timeout(
            Duration::from_secs(10),
            run(reconciler, Duration::from_millis(50), shutdown_rx),
        )
        .await
        .expect("loop exits on shutdown")
        .expect("clean run");

        assert_eq!(
            events.lock().expect("lock").len(),
            1,
            "file processed once across repeated ticks"
        );
    }
}
