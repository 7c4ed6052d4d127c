//! Error types for gleaner-core.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal configuration errors. Every variant aborts startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure while reading a config file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `path` split on the delimiter produced no patterns.
    #[error("'path' parameter is required and must contain at least one pattern")]
    EmptyPaths,

    /// The path delimiter collides with glob/template syntax.
    #[error("/, *, % are reserved words: {delimiter:?}")]
    ReservedDelimiter { delimiter: String },

    /// Inode keying needs a durable ledger to be meaningful across restarts.
    #[error("can't follow inodes without a ledger_path configuration parameter")]
    InodeWithoutLedger,

    /// No parser section configured.
    #[error("a 'parser' section is required")]
    MissingParser,

    /// A path pattern contains an invalid strftime specifier.
    #[error("invalid time format in pattern {pattern:?}")]
    BadTimeFormat { pattern: String },

    /// Another watcher in this process already owns the ledger path.
    #[error("ledger path {path} is already in use by watcher {holder:?}")]
    LedgerPathInUse { path: PathBuf, holder: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
