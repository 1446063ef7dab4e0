//! Public types for the csvgather API and pipeline.

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crate::schema::ColumnSpec;
use crate::table::Table;
use crate::utils::config::{DEFAULT_DELIMITER, DEFAULT_SUBFOLDER, MergeConsts};

/// What to gather: `root/<version>/<date>/<subfolder>/*.csv`, typed by `spec`.
#[derive(Clone, Debug)]
pub struct GatherRequest {
    pub root: PathBuf,
    /// Version directory selectors (literal names or `*` patterns).
    pub versions: Vec<String>,
    /// Date directory selectors, expanded under each version.
    pub dates: Vec<String>,
    /// Appended verbatim under each date directory; never globbed.
    pub subfolder: String,
    pub spec: ColumnSpec,
}

impl GatherRequest {
    pub fn new(
        root: impl Into<PathBuf>,
        versions: Vec<String>,
        dates: Vec<String>,
        spec: ColumnSpec,
    ) -> Self {
        Self {
            root: root.into(),
            versions,
            dates,
            subfolder: DEFAULT_SUBFOLDER.to_string(),
            spec,
        }
    }

    pub fn with_subfolder(mut self, subfolder: impl Into<String>) -> Self {
        self.subfolder = subfolder.into();
        self
    }
}

/// Execution options.
#[derive(Clone, Debug)]
pub struct Opts {
    /// Reader pool size. When None, derived from available parallelism, file count and FD limit.
    pub num_threads: Option<usize>,
    /// Completed files buffered before compaction into one chunk.
    pub batch_size: usize,
    /// Per-file read timeout. A file still reading after this is abandoned and counted as failed.
    pub read_timeout: Option<Duration>,
    /// Field delimiter of the input files.
    pub delimiter: u8,
    /// Show a progress bar while reading.
    pub progress: bool,
    /// Set to true to stop the run; in-flight reads are abandoned.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            num_threads: None,
            batch_size: MergeConsts::BATCH_SIZE,
            read_timeout: None,
            delimiter: DEFAULT_DELIMITER,
            progress: false,
            cancel: None,
        }
    }
}

/// Counters for one run. Suitable for logging or printing as JSON.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunSummary {
    pub files_found: usize,
    pub files_validated: usize,
    pub files_read: usize,
    pub files_failed: usize,
    pub files_timed_out: usize,
    pub rows: usize,
    pub chunks_compacted: usize,
    pub workers: usize,
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    /// Change in resident memory across the run, when the platform reports it.
    pub memory_delta_bytes: Option<i64>,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Output of a run: the merged table plus its summary.
#[derive(Debug)]
pub struct Gathered {
    pub table: Table,
    pub summary: RunSummary,
}
