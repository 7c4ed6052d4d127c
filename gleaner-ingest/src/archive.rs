//! Best-effort post-process archival.
//!
//! The destination template may contain `%s`, replaced with the source file
//! name; a destination ending in `/` is a directory the file is moved into.
//! Intermediate directories are created. The caller logs failures as
//! warnings and never rolls back the ledger entry.

use std::path::{Path, PathBuf};

use crate::error::{io_err, IngestError};

/// Move `path` to the destination described by `template`.
///
/// Returns the final destination path.
pub fn archive_file(path: &Path, template: &str) -> Result<PathBuf, IngestError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| IngestError::Parse {
            path: path.to_path_buf(),
            message: "source path has no file name".to_string(),
        })?
        .to_string_lossy()
        .into_owned();

    let target = if template.contains("%s") {
        template.replace("%s", &file_name)
    } else {
        template.to_string()
    };

    let (dest, base_dir) = if target.ends_with('/') {
        let dir = PathBuf::from(&target);
        (dir.join(&file_name), dir)
    } else {
        let dest = PathBuf::from(&target);
        let dir = dest
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        (dest, dir)
    };

    if !base_dir.exists() {
        std::fs::create_dir_all(&base_dir).map_err(|e| io_err(&base_dir, e))?;
    }
    std::fs::rename(path, &dest).map_err(|e| io_err(path, e))?;
    Ok(dest)
}
