//! Durable record of processed file identities.
//!
//! ## On-disk grammar
//!
//! One line per tracked identity:
//!
//! ```text
//! <path>\t<inode as 16 hex digits>\t<mtime_s as 16 hex digits>\t<mtime_ns as 16 hex digits>\n
//! ```
//!
//! The grammar is fixed — ledgers written by earlier versions of the system
//! must keep parsing. `add` appends one line; `remove` truncates and
//! rewrites the whole file from the cache, so stale lines for a rotated key
//! never accumulate. Lines that do not parse (partial trailing write from a
//! crash) are skipped on reload, never fatal.
//!
//! The in-memory cache is a derived index over the file: after every
//! operation, parsing the file from scratch yields exactly the cache. One
//! mutex guards cache and file handle together for the full
//! read-modify-write of each operation.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use gleaner_core::{FileIdentity, IdentityKey, KeyMode};

use crate::error::{io_err, IngestError};

struct LedgerInner {
    file: Option<File>,
    path: Option<PathBuf>,
    cache: HashMap<IdentityKey, FileIdentity>,
}

/// Persisted tracker of processed file identities.
pub struct Ledger {
    key_mode: KeyMode,
    inner: Mutex<LedgerInner>,
}

impl Ledger {
    /// Open (creating if absent, mode 0600) the ledger file and replay it
    /// into the cache. `None` means in-memory tracking only.
    pub fn open(path: Option<&Path>, key_mode: KeyMode) -> Result<Self, IngestError> {
        let file = match path {
            Some(path) => {
                if let Some(dir) = path.parent() {
                    if !dir.exists() {
                        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
                    }
                }
                Some(open_ledger_file(path)?)
            }
            None => None,
        };

        let ledger = Self {
            key_mode,
            inner: Mutex::new(LedgerInner {
                file,
                path: path.map(Path::to_path_buf),
                cache: HashMap::new(),
            }),
        };
        ledger.reload()?;
        Ok(ledger)
    }

    pub fn key_mode(&self) -> KeyMode {
        self.key_mode
    }

    /// Clear the cache and rebuild it by replaying the file from offset 0.
    pub fn reload(&self) -> Result<(), IngestError> {
        let mut inner = self.lock();
        inner.cache.clear();

        let path = inner.path.clone();
        let Some(file) = inner.file.as_mut() else {
            return Ok(());
        };

        file.seek(SeekFrom::Start(0))
            .map_err(|e| io_err(path.clone().unwrap_or_default(), e))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| io_err(path.unwrap_or_default(), e))?;

        let key_mode = self.key_mode;
        for line in contents.lines() {
            let Some(identity) = parse_entry(line) else {
                tracing::debug!(line, "skipping unparsable ledger line");
                continue;
            };
            inner.cache.insert(identity.key(key_mode), identity);
        }
        Ok(())
    }

    /// True iff the cache holds an entry for `identity`'s key that is equal
    /// in all four fields. A key match with different attributes means the
    /// file changed and must be reprocessed.
    pub fn has(&self, identity: &FileIdentity) -> bool {
        let inner = self.lock();
        inner.cache.get(&identity.key(self.key_mode)) == Some(identity)
    }

    /// Append one record to the file and insert it into the cache.
    pub fn add(&self, identity: &FileIdentity) -> Result<(), IngestError> {
        let mut inner = self.lock();
        let path = inner.path.clone();
        if let Some(file) = inner.file.as_mut() {
            file.seek(SeekFrom::End(0))
                .map_err(|e| io_err(path.clone().unwrap_or_default(), e))?;
            file.write_all(format_entry(identity).as_bytes())
                .map_err(|e| io_err(path.unwrap_or_default(), e))?;
        }
        inner.cache.insert(identity.key(self.key_mode), identity.clone());
        Ok(())
    }

    /// Delete the entry for `identity`'s key, then truncate and rewrite the
    /// file from the remaining cache contents.
    pub fn remove(&self, identity: &FileIdentity) -> Result<(), IngestError> {
        let mut inner = self.lock();
        inner.cache.remove(&identity.key(self.key_mode));

        let path = inner.path.clone();
        let LedgerInner { file, cache, .. } = &mut *inner;
        if let Some(file) = file.as_mut() {
            let err = |e| io_err(path.clone().unwrap_or_default(), e);
            file.seek(SeekFrom::Start(0)).map_err(err)?;
            file.set_len(0).map_err(err)?;
            for entry in cache.values() {
                file.write_all(format_entry(entry).as_bytes()).map_err(err)?;
            }
        }
        Ok(())
    }

    /// Snapshot of the cache, for diffing against a discovery result.
    pub fn snapshot(&self) -> HashMap<IdentityKey, FileIdentity> {
        self.lock().cache.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().cache.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, LedgerInner> {
        // A panic mid-operation can leave a stale line in the file; reload
        // tolerates that, so continue with the data we have.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(unix)]
fn open_ledger_file(path: &Path) -> Result<File, IngestError> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .mode(0o600)
        .open(path)
        .map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn open_ledger_file(path: &Path) -> Result<File, IngestError> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)
        .map_err(|e| io_err(path, e))
}

/// Serialize one identity as a ledger line. `mtime_s` is written as its
/// two's-complement u64 image so negative timestamps round-trip.
fn format_entry(identity: &FileIdentity) -> String {
    format!(
        "{}\t{:016x}\t{:016x}\t{:016x}\n",
        identity.path.display(),
        identity.inode,
        identity.mtime_s as u64,
        identity.mtime_ns,
    )
}

/// Parse one ledger line; `None` for anything malformed.
fn parse_entry(line: &str) -> Option<FileIdentity> {
    let mut fields = line.split('\t');
    let path = fields.next().filter(|p| !p.is_empty())?;
    let inode = u64::from_str_radix(fields.next()?, 16).ok()?;
    let mtime_s = u64::from_str_radix(fields.next()?, 16).ok()? as i64;
    let mtime_ns = u64::from_str_radix(fields.next()?, 16).ok()?;
    Some(FileIdentity::new(path, inode, mtime_s, mtime_ns))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
