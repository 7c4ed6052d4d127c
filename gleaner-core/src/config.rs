//! Watcher configuration surface.
//!
//! A [`WatchConfig`] is deserialized from a YAML document and then
//! [`validate`](WatchConfig::validate)d before anything touches the
//! filesystem. Validation failures are fatal: the watcher refuses to start.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::types::KeyMode;

/// Characters the path delimiter may not use (glob and time-template syntax).
pub const RESERVED_DELIMITER_CHARS: [&str; 3] = ["/", "*", "%"];

const DEFAULT_PATH_DELIMITER: &str = ",";
const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;
const DEFAULT_LIMIT_OLDLY_MODIFIED_SECS: u64 = 5;

fn default_path_delimiter() -> String {
    DEFAULT_PATH_DELIMITER.to_string()
}

fn default_refresh_interval() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

fn default_limit_oldly_modified() -> Option<u64> {
    // Non-zero by default: a safety margin against picking up a file that is
    // still being written, not "no limit".
    Some(DEFAULT_LIMIT_OLDLY_MODIFIED_SECS)
}

fn default_csv_delimiter() -> char {
    ','
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Parser section
// ---------------------------------------------------------------------------

/// The `parser:` section of a watcher config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum ParserConfig {
    /// Whole-file CSV content.
    Csv {
        /// Column names used when the file has no header row. Empty means
        /// 1-based column indices.
        #[serde(default)]
        keys: Vec<String>,
        #[serde(default = "default_csv_delimiter")]
        delimiter: char,
        #[serde(default = "default_true")]
        has_header: bool,
    },
}

// ---------------------------------------------------------------------------
// Watcher config
// ---------------------------------------------------------------------------

/// Full configuration for one watcher instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Tag attached to every emitted record.
    pub tag: String,

    /// Path patterns to watch, separated by `path_delimiter`. Patterns may
    /// contain strftime placeholders and `*` globs.
    pub path: String,
    #[serde(default = "default_path_delimiter")]
    pub path_delimiter: String,
    /// Patterns whose expansion is subtracted from the watch set.
    #[serde(default)]
    pub exclude_path: Vec<String>,

    /// Exclude glob matches whose mtime is older than this many seconds.
    #[serde(default)]
    pub limit_recently_modified: Option<u64>,
    /// Exclude glob matches whose mtime is newer than this many seconds.
    #[serde(default = "default_limit_oldly_modified")]
    pub limit_oldly_modified: Option<u64>,

    /// Seconds between reconciler passes.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,

    /// Record field to carry the source path; `none` disables tagging.
    #[serde(default)]
    pub path_key: Option<String>,

    /// Where processed-file identities are durably recorded. Absent means
    /// in-memory tracking only (lost on restart).
    #[serde(default)]
    pub ledger_path: Option<PathBuf>,
    /// Key ledger entries by inode instead of path.
    #[serde(default)]
    pub follow_inodes: bool,

    /// Destination template for processed files; `%s` is replaced with the
    /// file name, a trailing `/` means "move into this directory".
    #[serde(default)]
    pub archive_to: Option<String>,

    /// Remember unreadable paths so the permission warning fires once.
    #[serde(default)]
    pub ignore_repeated_permission_error: bool,

    pub parser: Option<ParserConfig>,
}

impl WatchConfig {
    /// Load and validate a config from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        let config: WatchConfig =
            serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// The configured patterns, split, trimmed, and deduplicated in order.
    pub fn patterns(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for raw in self.path.split(&self.path_delimiter) {
            let pattern = raw.trim();
            if pattern.is_empty() || seen.iter().any(|s| s == pattern) {
                continue;
            }
            seen.push(pattern.to_string());
        }
        seen
    }

    pub fn key_mode(&self) -> KeyMode {
        if self.follow_inodes {
            KeyMode::Inode
        } else {
            KeyMode::Path
        }
    }

    /// The record field for source-path tagging, `None` when disabled.
    pub fn path_key(&self) -> Option<&str> {
        match self.path_key.as_deref() {
            None | Some("none") => None,
            Some(key) => Some(key),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval)
    }

    pub fn limit_recently_modified(&self) -> Option<Duration> {
        self.limit_recently_modified.map(Duration::from_secs)
    }

    pub fn limit_oldly_modified(&self) -> Option<Duration> {
        self.limit_oldly_modified.map(Duration::from_secs)
    }

    /// Enforce every fatal configuration rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if RESERVED_DELIMITER_CHARS.contains(&self.path_delimiter.as_str()) {
            return Err(ConfigError::ReservedDelimiter {
                delimiter: self.path_delimiter.clone(),
            });
        }

        let patterns = self.patterns();
        if patterns.is_empty() {
            return Err(ConfigError::EmptyPaths);
        }
        for pattern in patterns.iter().chain(self.exclude_path.iter()) {
            validate_time_template(pattern)?;
        }

        if self.follow_inodes && self.ledger_path.is_none() {
            return Err(ConfigError::InodeWithoutLedger);
        }

        if self.parser.is_none() {
            return Err(ConfigError::MissingParser);
        }

        Ok(())
    }
}

/// Reject patterns whose strftime placeholders chrono cannot format.
fn validate_time_template(pattern: &str) -> Result<(), ConfigError> {
    if !pattern.contains('%') {
        return Ok(());
    }
    let bad = StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error));
    if bad {
        return Err(ConfigError::BadTimeFormat {
            pattern: pattern.to_string(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
