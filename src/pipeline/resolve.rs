//! Path resolution: `root / version / date / subfolder / *.csv` with wildcard selectors.
//!
//! Every selector passes [`is_safe_selector`] before it is joined onto a path, and every
//! directory or file that comes back from the filesystem is canonicalized and checked to still
//! be under the root, so neither `..` nor a symlink can lead outside it.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::engine::tools::{
    check_root_and_canonicalize, glob_under, has_wildcard, is_safe_selector, is_under_root,
};
use crate::error::ConfigError;
use crate::utils::config::CSV_GLOB;

use super::observer::PipelineObserver;

/// Which level of the hierarchy a selector addresses. Used in logs and errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectorLevel {
    Version,
    Date,
}

impl SelectorLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            SelectorLevel::Version => "version",
            SelectorLevel::Date => "date",
        }
    }
}

/// Drop unsafe selectors (reported to the observer). Fails when nothing usable remains.
pub fn safe_selectors<'s>(
    level: SelectorLevel,
    selectors: &'s [String],
    observer: &dyn PipelineObserver,
) -> Result<Vec<&'s str>, ConfigError> {
    let safe: Vec<&str> = selectors
        .iter()
        .map(String::as_str)
        .filter(|s| {
            let ok = is_safe_selector(s);
            if !ok {
                observer.unsafe_selector(level.as_str(), s);
            }
            ok
        })
        .collect();
    if safe.is_empty() {
        return Err(ConfigError::NoValidSelectors {
            level: level.as_str(),
            given: selectors.to_vec(),
        });
    }
    Ok(safe)
}

/// Resolves selectors against a canonical root. Holds no state beyond its configuration.
pub struct PathResolver<'o> {
    root: PathBuf,
    subfolder: String,
    observer: &'o dyn PipelineObserver,
}

impl<'o> PathResolver<'o> {
    /// Canonicalize `root` and validate `subfolder` (a single literal component, no wildcard).
    pub fn new(
        root: &Path,
        subfolder: &str,
        observer: &'o dyn PipelineObserver,
    ) -> Result<Self, ConfigError> {
        if !is_safe_selector(subfolder) || has_wildcard(subfolder) {
            return Err(ConfigError::UnsafeSubfolder(subfolder.to_string()));
        }
        let root = check_root_and_canonicalize(root)?;
        Ok(Self {
            root,
            subfolder: subfolder.to_string(),
            observer,
        })
    }

    /// All CSV files under `root/<version>/<date>/<subfolder>/`, deduplicated.
    pub fn resolve(
        &self,
        versions: &[String],
        dates: &[String],
    ) -> Result<BTreeSet<PathBuf>, ConfigError> {
        let versions = safe_selectors(SelectorLevel::Version, versions, self.observer)?;
        let dates = safe_selectors(SelectorLevel::Date, dates, self.observer)?;

        let mut version_dirs = BTreeSet::new();
        for v in &versions {
            version_dirs.extend(self.expand(&self.root, v, SelectorLevel::Version));
        }
        if version_dirs.is_empty() {
            log::warn!("No version directories matched under {}", self.root.display());
        }

        let mut date_dirs = BTreeSet::new();
        for vdir in &version_dirs {
            for d in &dates {
                date_dirs.extend(self.expand(vdir, d, SelectorLevel::Date));
            }
        }

        let mut files = BTreeSet::new();
        for ddir in &date_dirs {
            let target = ddir.join(&self.subfolder);
            if !target.is_dir() {
                self.observer.discovery_miss("subfolder", &target);
                continue;
            }
            files.extend(self.csv_files(&target));
        }
        Ok(files)
    }

    /// Expand one (already safety-checked) selector under `base` into canonical directories.
    fn expand(&self, base: &Path, selector: &str, level: SelectorLevel) -> Vec<PathBuf> {
        let dirs: Vec<PathBuf> = if has_wildcard(selector) {
            self.glob_paths(&glob_under(base, selector))
                .into_iter()
                .filter(|p| p.is_dir())
                .collect()
        } else {
            let dir = base.join(selector);
            if dir.is_dir() { vec![dir] } else { vec![] }
        };

        let dirs: Vec<PathBuf> = dirs
            .into_iter()
            .filter_map(|d| self.confine(&d))
            .collect();
        if dirs.is_empty() {
            self.observer
                .discovery_miss(level.as_str(), &base.join(selector));
        }
        dirs
    }

    /// `*.csv` regular files in `dir`.
    fn csv_files(&self, dir: &Path) -> Vec<PathBuf> {
        let files: Vec<PathBuf> = self
            .glob_paths(&glob_under(dir, CSV_GLOB))
            .into_iter()
            .filter(|p| p.is_file())
            .filter_map(|p| self.confine(&p))
            .collect();
        if files.is_empty() {
            self.observer.discovery_miss("csv files", dir);
        }
        files
    }

    fn glob_paths(&self, pattern: &str) -> Vec<PathBuf> {
        let options = glob::MatchOptions {
            require_literal_leading_dot: true,
            ..glob::MatchOptions::new()
        };
        let entries = match glob::glob_with(pattern, options) {
            Ok(entries) => entries,
            Err(e) => {
                log::debug!("Invalid glob pattern {}: {}", pattern, e);
                return vec![];
            }
        };
        entries
            .filter_map(|entry| match entry {
                Ok(p) => Some(p),
                Err(e) => {
                    log::debug!("Unreadable glob entry for {}: {}", pattern, e);
                    None
                }
            })
            .collect()
    }

    /// Canonicalize and keep only paths still under the root.
    fn confine(&self, path: &Path) -> Option<PathBuf> {
        let canonical = match path.canonicalize() {
            Ok(p) => p,
            Err(e) => {
                log::debug!("Cannot canonicalize {}: {}", path.display(), e);
                return None;
            }
        };
        if is_under_root(&canonical, &self.root) {
            Some(canonical)
        } else {
            self.observer.outside_root(path);
            None
        }
    }
}

/// Resolve `root / versions / dates / subfolder / *.csv`.
pub fn resolve(
    root: &Path,
    versions: &[String],
    dates: &[String],
    subfolder: &str,
    observer: &dyn PipelineObserver,
) -> Result<BTreeSet<PathBuf>, ConfigError> {
    PathResolver::new(root, subfolder, observer)?.resolve(versions, dates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::observer::LogObserver;

    fn touch(root: &Path, rel: &str) {
        let p = root.join(rel);
        std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        std::fs::write(p, "a\n1\n").unwrap();
    }

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn overlapping_selectors_are_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "v1/2023-10-01/region/a.csv");
        let files = resolve(
            dir.path(),
            &strings(&["v1", "*", "v*"]),
            &strings(&["2023-10-01", "2023-*"]),
            "region",
            &LogObserver,
        )
        .unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn non_csv_and_directories_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "v1/d/region/a.csv");
        touch(dir.path(), "v1/d/region/b.txt");
        std::fs::create_dir_all(dir.path().join("v1/d/region/dir.csv")).unwrap();
        let files = resolve(
            dir.path(),
            &strings(&["v1"]),
            &strings(&["d"]),
            "region",
            &LogObserver,
        )
        .unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.csv"]);
    }

    #[test]
    fn wildcards_skip_hidden_entries() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "v1/d/region/a.csv");
        touch(dir.path(), ".snapshot/d/region/b.csv");
        touch(dir.path(), "v1/.staging/region/c.csv");
        touch(dir.path(), "v1/d/region/.partial.csv");
        let files = resolve(
            dir.path(),
            &strings(&["*"]),
            &strings(&["*"]),
            "region",
            &LogObserver,
        )
        .unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.csv"]);
    }

    #[test]
    fn wildcard_subfolder_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = PathResolver::new(dir.path(), "reg*", &LogObserver).err();
        assert!(matches!(err, Some(ConfigError::UnsafeSubfolder(_))));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_escaping_root_is_skipped() {
        let outside = tempfile::tempdir().unwrap();
        touch(outside.path(), "d/region/x.csv");
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("v1")).unwrap();
        touch(dir.path(), "v2/d/region/y.csv");
        let files = resolve(
            dir.path(),
            &strings(&["*"]),
            &strings(&["d"]),
            "region",
            &LogObserver,
        )
        .unwrap();
        assert_eq!(files.len(), 1);
        assert!(files.iter().all(|p| p.ends_with("y.csv")));
    }
}
