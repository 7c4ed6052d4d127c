//! Error types for gleaner-ingest.

use std::path::PathBuf;

use thiserror::Error;

use gleaner_core::ConfigError;

/// All errors that can arise from ledger, discovery, and processing
/// operations.
#[derive(Debug, Error)]
pub enum IngestError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A fatal configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A malformed glob pattern.
    #[error("glob pattern error: {0}")]
    Pattern(#[from] glob::PatternError),

    /// CSV parse failure; fatal to the file being processed, not the pass.
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding failure while emitting a record.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Parser rejected the file for a non-CSV reason.
    #[error("parse error at {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Convenience constructor for [`IngestError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> IngestError {
    IngestError::Io {
        path: path.into(),
        source,
    }
}
