use thiserror::Error;

/// Error surface for the daemon runtime.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("config error: {0}")]
    Config(#[from] gleaner_core::ConfigError),

    #[error("ingest error: {0}")]
    Ingest(#[from] gleaner_ingest::IngestError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("daemon runtime error: {0}")]
    Runtime(String),
}
