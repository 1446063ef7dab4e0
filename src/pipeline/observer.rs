//! Pipeline events. Components report through an injected [`PipelineObserver`] instead of a
//! global logger; [`LogObserver`] forwards to the `log` facade.

use std::path::Path;

use crate::error::{PrecheckError, ReadError};

/// Receives non-fatal events from every stage. All methods default to no-ops.
/// Implementations must be cheap and thread-safe: prechecks report from rayon workers.
pub trait PipelineObserver: Send + Sync {
    /// A selector failed the safety check and was dropped before touching the filesystem.
    fn unsafe_selector(&self, _level: &str, _selector: &str) {}
    /// A selector, directory or subfolder resolved to nothing.
    fn discovery_miss(&self, _what: &str, _path: &Path) {}
    /// A resolved path escaped the root through a symlink.
    fn outside_root(&self, _path: &Path) {}
    /// Header lacks required columns; the file is excluded.
    fn schema_mismatch(&self, _path: &Path, _missing: &[String]) {}
    /// Header could not be read at all; the file is excluded.
    fn precheck_failed(&self, _err: &PrecheckError) {}
    /// A file was read into a table.
    fn file_read(&self, _path: &Path, _rows: usize) {}
    /// A file could not be read; it is excluded.
    fn read_failed(&self, _err: &ReadError) {}
    /// The batch buffer was compacted. `live_chunks` counts chunks held after compaction.
    fn compacted(&self, _files: usize, _rows: usize, _live_chunks: usize) {}
}

/// Default observer: debug for expected misses, warn for unsafe input, error for read failures.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;

impl PipelineObserver for LogObserver {
    fn unsafe_selector(&self, level: &str, selector: &str) {
        log::warn!("Skipping unsafe {} selector: {:?}", level, selector);
    }

    fn discovery_miss(&self, what: &str, path: &Path) {
        log::debug!("No {} at {}", what, path.display());
    }

    fn outside_root(&self, path: &Path) {
        log::warn!("Skipping path outside root: {}", path.display());
    }

    fn schema_mismatch(&self, path: &Path, missing: &[String]) {
        log::debug!("{} lacks required columns {:?}", path.display(), missing);
    }

    fn precheck_failed(&self, err: &PrecheckError) {
        log::debug!("Column check failed: {}", err);
    }

    fn file_read(&self, path: &Path, rows: usize) {
        log::debug!("Read {} rows from {}", rows, path.display());
    }

    fn read_failed(&self, err: &ReadError) {
        log::error!("Failed processing: {}", err);
    }

    fn compacted(&self, files: usize, rows: usize, live_chunks: usize) {
        log::debug!(
            "Compacted {} files ({} rows) into chunk #{}",
            files,
            rows,
            live_chunks
        );
    }
}
