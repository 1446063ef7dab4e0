use anyhow::Result;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::pipeline::{self, LogObserver, MergeSettings, PipelineObserver};
use crate::table::Table;
use crate::utils::memory::{current_rss_bytes, format_delta, rss_delta};
use crate::{GatherRequest, Gathered, Opts, RunSummary};

/// Resolve → precheck → read → merge, with timing and memory reporting.
pub struct Pipeline {
    opts: Opts,
    observer: Arc<dyn PipelineObserver>,
}

impl Pipeline {
    /// Pipeline reporting through [`LogObserver`].
    pub fn new(opts: Opts) -> Self {
        Self {
            opts,
            observer: Arc::new(LogObserver),
        }
    }

    /// Replace the observer that receives per-file events.
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Candidate files for `request`, sorted. Configuration errors are fatal.
    pub fn resolve(&self, request: &GatherRequest) -> Result<Vec<PathBuf>> {
        let files = pipeline::resolve(
            &request.root,
            &request.versions,
            &request.dates,
            &request.subfolder,
            self.observer.as_ref(),
        )?;
        Ok(files.into_iter().collect())
    }

    /// Run the whole pipeline. Only configuration errors and cancellation are returned as
    /// errors; every per-file problem is absorbed into the summary.
    pub fn run(&self, request: &GatherRequest) -> Result<Gathered> {
        let start = Instant::now();
        let rss_before = current_rss_bytes();

        let paths = self.resolve(request)?;
        let mut summary = RunSummary {
            files_found: paths.len(),
            ..RunSummary::default()
        };
        if paths.is_empty() {
            warn!("No candidate files found under {}", request.root.display());
            summary.elapsed = start.elapsed();
            return Ok(Gathered {
                table: Table::empty(&request.spec),
                summary,
            });
        }
        info!("Found {} potential files", paths.len());

        let settings = MergeSettings::from(&self.opts);
        debug!("Merge settings: {:?}", settings);
        let outcome = pipeline::merge_all(&paths, &request.spec, &settings, self.observer.as_ref())?;
        pipeline::report_failures(&outcome.stats);

        let stats = outcome.stats;
        summary.files_validated = stats.files_validated;
        summary.files_read = stats.files_read;
        summary.files_failed = stats.files_failed;
        summary.files_timed_out = stats.files_timed_out;
        summary.chunks_compacted = stats.chunks_compacted;
        summary.workers = stats.workers;
        summary.rows = outcome.table.num_rows();
        summary.elapsed = start.elapsed();
        summary.memory_delta_bytes = rss_delta(rss_before, current_rss_bytes());

        info!(
            "Processed {} rows from {} files in {:.2}s | Memory: {}",
            summary.rows,
            summary.files_read,
            summary.elapsed.as_secs_f64(),
            format_delta(summary.memory_delta_bytes)
        );
        Ok(Gathered {
            table: outcome.table,
            summary,
        })
    }
}
