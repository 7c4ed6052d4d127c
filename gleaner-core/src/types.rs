//! Domain types for file-identity tracking.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem
//! paths. A [`FileIdentity`] is one observation of a file: value equality
//! (derived `PartialEq`, all four fields) decides "unchanged since last
//! seen", while [`FileIdentity::key`] extracts the one field the ledger
//! indexes by. Keeping those two notions as separate functions keeps the
//! "same key, different content ⇒ changed" semantics visible at call sites.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Key mode
// ---------------------------------------------------------------------------

/// Which field of a [`FileIdentity`] the ledger is keyed by.
///
/// Inode keying keeps a rotated file recognized as the same logical slot
/// even when renamed, at the cost of requiring a durable ledger file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KeyMode {
    #[default]
    Path,
    Inode,
}

/// A ledger key extracted from a [`FileIdentity`] under a [`KeyMode`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    Path(PathBuf),
    Inode(u64),
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKey::Path(path) => write!(f, "{}", path.display()),
            IdentityKey::Inode(ino) => write!(f, "inode:{ino}"),
        }
    }
}

// ---------------------------------------------------------------------------
// File identity
// ---------------------------------------------------------------------------

/// One observation of a file: path, inode, and modification time split into
/// whole seconds and the nanosecond remainder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIdentity {
    pub path: PathBuf,
    pub inode: u64,
    pub mtime_s: i64,
    pub mtime_ns: u64,
}

impl FileIdentity {
    pub fn new(path: impl Into<PathBuf>, inode: u64, mtime_s: i64, mtime_ns: u64) -> Self {
        Self {
            path: path.into(),
            inode,
            mtime_s,
            mtime_ns,
        }
    }

    /// Build an identity from an already-fetched `stat` result.
    #[cfg(unix)]
    pub fn from_metadata(path: &Path, meta: &std::fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self {
            path: path.to_path_buf(),
            inode: meta.ino(),
            mtime_s: meta.mtime(),
            mtime_ns: meta.mtime_nsec() as u64,
        }
    }

    /// Build an identity from an already-fetched `stat` result.
    ///
    /// Non-unix filesystems expose no inode; `0` keeps path-keyed tracking
    /// working and makes inode keying useless there, which is why inode mode
    /// is only meaningful on unix.
    #[cfg(not(unix))]
    pub fn from_metadata(path: &Path, meta: &std::fs::Metadata) -> Self {
        use std::time::UNIX_EPOCH;
        let mtime = meta
            .modified()
            .ok()
            .and_then(|m| m.duration_since(UNIX_EPOCH).ok())
            .unwrap_or_default();
        Self {
            path: path.to_path_buf(),
            inode: 0,
            mtime_s: mtime.as_secs() as i64,
            mtime_ns: u64::from(mtime.subsec_nanos()),
        }
    }

    /// The field this identity is indexed under in the given mode.
    pub fn key(&self, mode: KeyMode) -> IdentityKey {
        match mode {
            KeyMode::Path => IdentityKey::Path(self.path.clone()),
            KeyMode::Inode => IdentityKey::Inode(self.inode),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_requires_all_four_fields() {
        let a = FileIdentity::new("/a", 1, 100, 0);
        assert_eq!(a, FileIdentity::new("/a", 1, 100, 0));
        assert_ne!(a, FileIdentity::new("/a", 1, 101, 0));
        assert_ne!(a, FileIdentity::new("/a", 2, 100, 0));
        assert_ne!(a, FileIdentity::new("/a", 1, 100, 7));
        assert_ne!(a, FileIdentity::new("/b", 1, 100, 0));
    }

    #[test]
    fn key_follows_mode() {
        let id = FileIdentity::new("/var/log/a.csv", 42, 100, 0);
        assert_eq!(
            id.key(KeyMode::Path),
            IdentityKey::Path(PathBuf::from("/var/log/a.csv"))
        );
        assert_eq!(id.key(KeyMode::Inode), IdentityKey::Inode(42));
    }

    #[test]
    fn same_key_different_identity_are_unequal() {
        let old = FileIdentity::new("/a", 1, 100, 0);
        let replaced = FileIdentity::new("/a", 9, 200, 0);
        assert_eq!(old.key(KeyMode::Path), replaced.key(KeyMode::Path));
        assert_ne!(old, replaced);
    }

    #[cfg(unix)]
    #[test]
    fn from_metadata_matches_stat() {
        use std::os::unix::fs::MetadataExt;
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("probe.txt");
        std::fs::write(&path, "x").expect("write");
        let meta = std::fs::metadata(&path).expect("stat");

        let id = FileIdentity::from_metadata(&path, &meta);
        assert_eq!(id.path, path);
        assert_eq!(id.inode, meta.ino());
        assert_eq!(id.mtime_s, meta.mtime());
    }
}
