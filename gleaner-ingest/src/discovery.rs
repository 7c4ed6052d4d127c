//! Pattern expansion into the current set of file identities.
//!
//! Each configured pattern goes through strftime templating against the
//! current wall-clock time (date-sharded filenames), then glob expansion if
//! it contains `*`. Glob candidates are filtered: directories, unreadable
//! files, and files outside the configured age window are dropped. Exclude
//! patterns get the same templating + glob treatment and are subtracted
//! before the survivors are stat'ed into [`FileIdentity`] observations.
//!
//! The only state carried across ticks is the permanent permission-ignore
//! list that suppresses repeated unreadable-file warnings.

use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};

use gleaner_core::{FileIdentity, IdentityKey, KeyMode, WatchConfig};

/// Expands configured patterns into the current identity set, once per tick.
pub struct Discovery {
    patterns: Vec<String>,
    excludes: Vec<String>,
    key_mode: KeyMode,
    limit_recently_modified: Option<Duration>,
    limit_oldly_modified: Option<Duration>,
    ignore_repeated_permission_error: bool,
    ignore_list: HashSet<PathBuf>,
}

impl Discovery {
    pub fn from_config(config: &WatchConfig) -> Self {
        Self {
            patterns: config.patterns(),
            excludes: config.exclude_path.clone(),
            key_mode: config.key_mode(),
            limit_recently_modified: config.limit_recently_modified(),
            limit_oldly_modified: config.limit_oldly_modified(),
            ignore_repeated_permission_error: config.ignore_repeated_permission_error,
            ignore_list: HashSet::new(),
        }
    }

    /// Resolve the configured patterns against the filesystem right now.
    pub fn resolve(&mut self) -> HashMap<IdentityKey, FileIdentity> {
        self.resolve_at(Local::now())
    }

    /// Resolve with an explicit wall-clock time for the strftime templates.
    pub fn resolve_at(&mut self, wall: DateTime<Local>) -> HashMap<IdentityKey, FileIdentity> {
        let now = SystemTime::now();

        let mut candidates: Vec<PathBuf> = Vec::new();
        let patterns = self.patterns.clone();
        for pattern in &patterns {
            let rendered = render_time_template(pattern, wall);
            if !rendered.contains('*') {
                // Literal paths skip the glob-stage filters; the stat step
                // below handles their existence.
                candidates.push(PathBuf::from(rendered));
                continue;
            }
            let paths = match glob::glob(&rendered) {
                Ok(paths) => paths,
                Err(err) => {
                    tracing::warn!(pattern = %rendered, error = %err, "invalid glob pattern");
                    continue;
                }
            };
            for entry in paths {
                let path = match entry {
                    Ok(path) => path,
                    Err(err) => {
                        tracing::debug!(error = %err, "glob entry unreadable, skipping");
                        continue;
                    }
                };
                if self.keep_glob_candidate(&path, now) {
                    candidates.push(path);
                }
            }
        }

        let excluded = self.resolve_excludes(wall);

        let mut resolved = HashMap::new();
        for path in candidates {
            if excluded.contains(&path) || !path.exists() {
                continue;
            }
            // The existence check above races with stat: the file can vanish
            // (or lose read permission) in between. Tolerate and skip.
            match std::fs::metadata(&path) {
                Ok(meta) => {
                    let identity = FileIdentity::from_metadata(&path, &meta);
                    resolved.insert(identity.key(self.key_mode), identity);
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "stat failed, skipping file");
                }
            }
        }
        resolved
    }

    /// Filters applied to glob-expanded candidates only.
    fn keep_glob_candidate(&mut self, path: &Path, now: SystemTime) -> bool {
        let meta = match std::fs::metadata(path) {
            Ok(meta) => meta,
            Err(err)
                if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) =>
            {
                tracing::debug!(path = %path.display(), "missing after refreshing file list");
                return false;
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "cannot stat candidate");
                return false;
            }
        };
        if meta.is_dir() {
            return false;
        }

        if !self.is_readable(path) {
            if !self.ignore_list.contains(path) {
                tracing::warn!(
                    path = %path.display(),
                    "unreadable; excluded and will be examined next time",
                );
                if self.ignore_repeated_permission_error {
                    self.ignore_list.insert(path.to_path_buf());
                }
            }
            return false;
        }

        let age = match meta.modified().ok().and_then(|m| now.duration_since(m).ok()) {
            Some(age) => age,
            // mtime in the future: treat as just-modified.
            None => Duration::ZERO,
        };
        if let Some(limit) = self.limit_recently_modified {
            if age > limit {
                return false;
            }
        }
        if let Some(limit) = self.limit_oldly_modified {
            if age < limit {
                return false;
            }
        }
        true
    }

    fn is_readable(&self, path: &Path) -> bool {
        match std::fs::File::open(path) {
            Ok(_) => true,
            Err(err) => !matches!(err.kind(), ErrorKind::PermissionDenied),
        }
    }

    fn resolve_excludes(&self, wall: DateTime<Local>) -> HashSet<PathBuf> {
        let mut excluded = HashSet::new();
        for pattern in &self.excludes {
            let rendered = render_time_template(pattern, wall);
            if !rendered.contains('*') {
                excluded.insert(PathBuf::from(rendered));
                continue;
            }
            let Ok(paths) = glob::glob(&rendered) else {
                tracing::warn!(pattern = %rendered, "invalid exclude glob pattern");
                continue;
            };
            excluded.extend(paths.flatten());
        }
        excluded
    }
}

/// Substitute strftime placeholders against `wall`; patterns without `%`
/// pass through untouched, malformed templates fall back to the raw string.
fn render_time_template(pattern: &str, wall: DateTime<Local>) -> String {
    if !pattern.contains('%') {
        return pattern.to_string();
    }
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        tracing::warn!(pattern, "invalid time format in pattern, using it verbatim");
        return pattern.to_string();
    }
    wall.format_with_items(items.into_iter()).to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use filetime::FileTime;
    use gleaner_core::ParserConfig;
    use tempfile::TempDir;

    fn config_for(dir: &TempDir, path: &str) -> WatchConfig {
        let yaml = format!(
            "tag: t\npath: {}/{}\nlimit_oldly_modified: 0\nparser:\n  format: csv\n",
            dir.path().display(),
            path
        );
        let config: WatchConfig = serde_yaml::from_str(&yaml).expect("config");
        assert_eq!(
            config.parser,
            Some(ParserConfig::Csv {
                keys: vec![],
                delimiter: ',',
                has_header: true
            })
        );
        config
    }

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, "a,b\n1,2\n").expect("write");
        path
    }

    fn backdate(path: &Path, seconds: i64) {
        let meta = std::fs::metadata(path).expect("stat");
        let mtime = FileTime::from_unix_time(
            FileTime::from_last_modification_time(&meta).unix_seconds() - seconds,
            0,
        );
        filetime::set_file_mtime(path, mtime).expect("set mtime");
    }

    #[test]
    fn glob_pattern_finds_files_and_skips_directories() {
        let dir = TempDir::new().expect("tempdir");
        let a = touch(&dir, "a.csv");
        touch(&dir, "b.txt");
        std::fs::create_dir(dir.path().join("sub.csv")).expect("mkdir");

        let mut discovery = Discovery::from_config(&config_for(&dir, "*.csv"));
        let resolved = discovery.resolve();

        assert_eq!(resolved.len(), 1);
        assert!(resolved.contains_key(&IdentityKey::Path(a)));
    }

    #[test]
    fn literal_pattern_requires_no_existence_precheck_until_stat() {
        let dir = TempDir::new().expect("tempdir");
        let mut discovery = Discovery::from_config(&config_for(&dir, "missing.csv"));
        // Absent literal path: dropped at the stat stage, not an error.
        assert!(discovery.resolve().is_empty());

        let present = touch(&dir, "missing.csv");
        let resolved = discovery.resolve();
        assert!(resolved.contains_key(&IdentityKey::Path(present)));
    }

    #[test]
    fn exclude_pattern_wins_over_include() {
        let dir = TempDir::new().expect("tempdir");
        let a = touch(&dir, "a.csv");
        let b = touch(&dir, "b.csv");

        let mut config = config_for(&dir, "*.csv");
        config.exclude_path = vec![format!("{}/b.csv", dir.path().display())];

        let mut discovery = Discovery::from_config(&config);
        let resolved = discovery.resolve();
        assert!(resolved.contains_key(&IdentityKey::Path(a)));
        assert!(!resolved.contains_key(&IdentityKey::Path(b)));
    }

    #[test]
    fn oldly_modified_limit_excludes_fresh_files() {
        let dir = TempDir::new().expect("tempdir");
        let fresh = touch(&dir, "fresh.csv");
        let settled = touch(&dir, "settled.csv");
        backdate(&settled, 1000);

        let mut config = config_for(&dir, "*.csv");
        config.limit_oldly_modified = Some(5);

        let mut discovery = Discovery::from_config(&config);
        let resolved = discovery.resolve();
        assert!(!resolved.contains_key(&IdentityKey::Path(fresh)));
        assert!(resolved.contains_key(&IdentityKey::Path(settled)));
    }

    #[test]
    fn recently_modified_limit_excludes_dormant_files() {
        let dir = TempDir::new().expect("tempdir");
        let recent = touch(&dir, "recent.csv");
        backdate(&recent, 10);
        let dormant = touch(&dir, "dormant.csv");
        backdate(&dormant, 100_000);

        let mut config = config_for(&dir, "*.csv");
        config.limit_recently_modified = Some(3600);

        let mut discovery = Discovery::from_config(&config);
        let resolved = discovery.resolve();
        assert!(resolved.contains_key(&IdentityKey::Path(recent)));
        assert!(!resolved.contains_key(&IdentityKey::Path(dormant)));
    }

    #[test]
    fn time_template_renders_date_sharded_pattern() {
        let wall = Local.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap();
        assert_eq!(
            render_time_template("/drop/%Y-%m-%d/*.csv", wall),
            "/drop/2024-03-07/*.csv"
        );
        assert_eq!(render_time_template("/drop/plain.csv", wall), "/drop/plain.csv");
    }

    #[test]
    fn date_sharded_glob_resolves_against_today() {
        let dir = TempDir::new().expect("tempdir");
        let today = Local::now().format("%Y-%m-%d").to_string();
        std::fs::create_dir(dir.path().join(&today)).expect("mkdir");
        let path = dir.path().join(&today).join("a.csv");
        std::fs::write(&path, "x\n1\n").expect("write");

        let mut discovery = Discovery::from_config(&config_for(&dir, "%Y-%m-%d/*.csv"));
        let resolved = discovery.resolve();
        assert!(resolved.contains_key(&IdentityKey::Path(path)));
    }

    #[test]
    fn inode_key_mode_keys_by_inode() {
        let dir = TempDir::new().expect("tempdir");
        let a = touch(&dir, "a.csv");

        let mut config = config_for(&dir, "*.csv");
        config.follow_inodes = true;
        config.ledger_path = Some(dir.path().join("x.ledger"));

        let mut discovery = Discovery::from_config(&config);
        let resolved = discovery.resolve();
        assert_eq!(resolved.len(), 1);
        let (key, identity) = resolved.iter().next().expect("entry");
        assert_eq!(*key, IdentityKey::Inode(identity.inode));
        assert_eq!(identity.path, a);
    }
}
