//! Application configuration constants.
//! Tuning, sentinels and thresholds in one place.

use chrono::NaiveDate;
use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    config_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                config_filename: format!(".{pkg}.toml"),
            }
        })
    }

    /// Config file looked up in the root directory when `--config` is not given.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }
}

// ---- Worker threads ----

/// Limits for the reader pool.
/// Use [`WorkerThreadLimits::current()`] to fill `all_threads` from rayon; the rest are const.
#[derive(Clone, Copy, Debug)]
pub struct WorkerThreadLimits {
    /// Available threads (from rayon); set by [`WorkerThreadLimits::current()`].
    pub all_threads: usize,
    /// Workers per available thread. Reads block on I/O, so oversubscribe a little.
    pub per_thread: usize,
    /// Hard ceiling regardless of core count.
    pub max: usize,
}

impl Default for WorkerThreadLimits {
    fn default() -> Self {
        Self {
            all_threads: 0, // use current() to set from rayon
            per_thread: Self::PER_THREAD,
            max: Self::MAX_THREADS,
        }
    }
}

impl WorkerThreadLimits {
    pub const PER_THREAD: usize = 4;
    pub const MAX_THREADS: usize = 32;

    /// Build limits with `all_threads` set from `rayon::current_num_threads()`.
    pub fn current() -> Self {
        Self {
            all_threads: rayon::current_num_threads(),
            ..Self::default()
        }
    }

    /// Default pool size before capping by file count / FD limit.
    pub fn default_workers(&self) -> usize {
        (self.all_threads.max(1) * self.per_thread).min(self.max)
    }
}

// ---- Merge ----

/// Aggregator tuning.
pub struct MergeConsts;

impl MergeConsts {
    /// Completed files buffered before compacting them into one chunk.
    pub const BATCH_SIZE: usize = 100;
    /// How long the collector waits on the result channel before checking cancel/timeouts.
    pub const POLL_INTERVAL: Duration = Duration::from_millis(100);
}

// ---- Reader ----

/// Default field delimiter.
pub const DEFAULT_DELIMITER: u8 = b',';

/// Fixed subfolder under each date directory when none is configured.
pub const DEFAULT_SUBFOLDER: &str = "region";

/// Extension of files discovered in a subfolder.
pub const CSV_GLOB: &str = "*.csv";

/// Date layouts tried in order when coercing a date cell.
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

/// Datetime layouts whose date part is kept.
pub const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

// ---- Sentinel defaults ----

/// Out-of-band values substituted for absent or unparsable cells.
pub struct Sentinels;

impl Sentinels {
    pub const INTEGER: i64 = -9999;
    pub const FLOAT: f64 = -9999.0;

    /// 1970-01-01.
    pub fn date() -> NaiveDate {
        NaiveDate::default()
    }
}
