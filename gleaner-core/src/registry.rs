//! Process-wide ledger-path registry.
//!
//! Two watcher instances sharing one ledger file would corrupt each other's
//! state, so ledger paths are claimed here at startup. Registration returns
//! a guard that releases the claim on drop, keeping register/deregister
//! explicit at instance start/stop.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use crate::error::ConfigError;

static CLAIMS: OnceLock<Mutex<HashMap<PathBuf, String>>> = OnceLock::new();

fn claims() -> &'static Mutex<HashMap<PathBuf, String>> {
    CLAIMS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// A held claim on a ledger path. Dropping it releases the path.
#[derive(Debug)]
pub struct LedgerClaim {
    path: PathBuf,
}

impl LedgerClaim {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LedgerClaim {
    fn drop(&mut self) {
        if let Ok(mut map) = claims().lock() {
            map.remove(&self.path);
        }
    }
}

/// Claim `path` for the watcher identified by `holder`.
///
/// Fails with [`ConfigError::LedgerPathInUse`] if another live claim holds
/// the same path.
pub fn register(path: &Path, holder: &str) -> Result<LedgerClaim, ConfigError> {
    let mut map = claims().lock().unwrap_or_else(|poisoned| {
        // A panic while holding the lock leaves the map intact; keep going.
        poisoned.into_inner()
    });
    if let Some(existing) = map.get(path) {
        return Err(ConfigError::LedgerPathInUse {
            path: path.to_path_buf(),
            holder: existing.clone(),
        });
    }
    map.insert(path.to_path_buf(), holder.to_string());
    Ok(LedgerClaim {
        path: path.to_path_buf(),
    })
}

/// The holder of a claim on `path`, if any.
pub fn holder_of(path: &Path) -> Option<String> {
    claims()
        .lock()
        .ok()
        .and_then(|map| map.get(path).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_claim_is_rejected_and_released_on_drop() {
        let path = PathBuf::from("/tmp/gleaner-test/claim-a.ledger");

        let claim = register(&path, "watcher-a").expect("first claim");
        assert_eq!(holder_of(&path).as_deref(), Some("watcher-a"));

        let err = register(&path, "watcher-b").expect_err("second claim");
        match err {
            ConfigError::LedgerPathInUse { holder, .. } => assert_eq!(holder, "watcher-a"),
            other => panic!("expected LedgerPathInUse, got {other:?}"),
        }

        drop(claim);
        assert_eq!(holder_of(&path), None);
        let reclaimed = register(&path, "watcher-b").expect("reclaim after drop");
        assert_eq!(holder_of(&path).as_deref(), Some("watcher-b"));
        drop(reclaimed);
    }

    #[test]
    fn distinct_paths_do_not_conflict() {
        let a = register(Path::new("/tmp/gleaner-test/claim-b.ledger"), "a").expect("a");
        let b = register(Path::new("/tmp/gleaner-test/claim-c.ledger"), "b").expect("b");
        drop(a);
        drop(b);
    }
}
