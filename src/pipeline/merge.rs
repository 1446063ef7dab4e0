//! Bounded merge: precheck in parallel, read survivors on a fixed reader pool, compact results
//! every `batch_size` completions, concatenate at the end.
//!
//! The collector loop is the only owner of the batch buffer and the chunk list. Workers never see
//! either; they only send [`WorkerEvent`]s.

use anyhow::Result;
use crossbeam_channel::RecvTimeoutError;
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::engine::progress::{ProgressBar, finish_progress_bar, reading_bar, update_progress_bar};
use crate::error::{GatherError, ReadError};
use crate::schema::ColumnSpec;
use crate::table::Table;
use crate::utils::config::MergeConsts;

use super::context::{MergeSettings, ReadTask, WorkerEvent};
use super::observer::PipelineObserver;
use super::precheck::{HeaderCheck, PrecheckOutcome, inspect_header};
use super::workers::ReaderPool;

/// Counters from one merge.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub candidates: usize,
    pub files_validated: usize,
    pub files_read: usize,
    /// Files excluded after passing the precheck (read errors, panics and timeouts).
    pub files_failed: usize,
    /// Subset of `files_failed` abandoned for exceeding the read timeout.
    pub files_timed_out: usize,
    pub chunks_compacted: usize,
    /// Most chunk objects (compacted chunks plus a non-empty buffer) alive at once.
    pub peak_live_chunks: usize,
    pub workers: usize,
    /// Most reads running at once, as seen by the collector. Never above `workers`.
    pub peak_in_flight: usize,
}

#[derive(Debug)]
pub struct MergeOutcome {
    pub table: Table,
    pub stats: MergeStats,
}

/// Precheck every candidate in parallel; returns survivors in input order.
pub fn precheck_all(
    paths: &[PathBuf],
    required: &BTreeSet<String>,
    delimiter: u8,
    observer: &dyn PipelineObserver,
) -> Vec<PathBuf> {
    paths
        .par_iter()
        .map(|p| match inspect_header(p, required, delimiter) {
            Ok(HeaderCheck::Qualified) => PrecheckOutcome::Qualified(p.clone()),
            Ok(check) => PrecheckOutcome::Rejected(p.clone(), check),
            Err(e) => PrecheckOutcome::Failed(e),
        })
        .filter_map(|outcome| match outcome {
            PrecheckOutcome::Qualified(p) => Some(p),
            PrecheckOutcome::Rejected(p, HeaderCheck::Missing(missing)) => {
                observer.schema_mismatch(&p, &missing);
                None
            }
            PrecheckOutcome::Rejected(p, _) => {
                observer.discovery_miss("header", &p);
                None
            }
            PrecheckOutcome::Failed(e) => {
                observer.precheck_failed(&e);
                None
            }
        })
        .collect()
}

/// Completion buffer with periodic compaction. Single owner: the collector loop.
pub struct BatchBuffer<'a> {
    spec: &'a ColumnSpec,
    threshold: usize,
    buffer: Vec<Table>,
    chunks: Vec<Table>,
    compactions: usize,
    peak_live: usize,
}

impl<'a> BatchBuffer<'a> {
    pub fn new(spec: &'a ColumnSpec, threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            spec,
            threshold,
            buffer: Vec::with_capacity(threshold),
            chunks: Vec::new(),
            compactions: 0,
            peak_live: 0,
        }
    }

    fn live_chunks(&self) -> usize {
        self.chunks.len() + usize::from(!self.buffer.is_empty())
    }

    /// Add one completed table; compacts once the buffer reaches the threshold.
    pub fn push(&mut self, table: Table, observer: &dyn PipelineObserver) -> Result<()> {
        self.buffer.push(table);
        if self.buffer.len() >= self.threshold {
            self.compact(observer)?;
        }
        self.peak_live = self.peak_live.max(self.live_chunks());
        Ok(())
    }

    fn compact(&mut self, observer: &dyn PipelineObserver) -> Result<()> {
        let files = self.buffer.len();
        let batch = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.threshold));
        let chunk = Table::concat(self.spec, batch)?;
        let rows = chunk.num_rows();
        self.chunks.push(chunk);
        self.compactions += 1;
        observer.compacted(files, rows, self.chunks.len());
        Ok(())
    }

    pub fn compactions(&self) -> usize {
        self.compactions
    }

    pub fn peak_live_chunks(&self) -> usize {
        self.peak_live
    }

    /// Chunks in compaction order, then the remainder.
    pub fn finish(mut self) -> Result<Table> {
        let remainder = std::mem::take(&mut self.buffer);
        if !remainder.is_empty() {
            self.chunks.push(Table::concat(self.spec, remainder)?);
        }
        Table::concat(self.spec, self.chunks)
    }
}

/// Tracks which tasks are running, settled, or abandoned while the collector waits.
struct TaskLedger {
    settled: Vec<bool>,
    settled_count: usize,
    /// task -> (worker, started at)
    in_flight: HashMap<usize, (usize, Instant)>,
    peak_in_flight: usize,
}

impl TaskLedger {
    fn new(total: usize) -> Self {
        Self {
            settled: vec![false; total],
            settled_count: 0,
            in_flight: HashMap::new(),
            peak_in_flight: 0,
        }
    }

    fn all_settled(&self) -> bool {
        self.settled_count == self.settled.len()
    }

    /// Mark `task` settled. False if it already was (late result of a timed-out task).
    fn settle(&mut self, task: usize) -> bool {
        match self.settled.get_mut(task) {
            Some(s) if !*s => {
                *s = true;
                self.settled_count += 1;
                true
            }
            _ => false,
        }
    }

    fn start(&mut self, task: usize, worker: usize, at: Instant) {
        self.in_flight.insert(task, (worker, at));
        self.peak_in_flight = self.peak_in_flight.max(self.in_flight.len());
    }

    /// `(task, worker)` pairs running longer than `limit`. Nothing changes until the pool
    /// confirms the worker is still inside that read; see [`TaskLedger::time_out`].
    fn overdue(&self, limit: Duration) -> Vec<(usize, usize)> {
        self.in_flight
            .iter()
            .filter(|(_, (_, at))| at.elapsed() > limit)
            .map(|(&task, &(worker, _))| (task, worker))
            .collect()
    }

    /// Settle an overdue task whose worker was retired.
    fn time_out(&mut self, task: usize) -> bool {
        self.in_flight.remove(&task);
        self.settle(task)
    }
}

/// Read every path that passes the precheck and merge the results.
///
/// Per-file failures are reported to `observer` and counted; they never fail the merge.
/// Returns an empty table with `spec`'s columns when nothing survives.
/// The only error besides an internal layout bug is [`GatherError::Cancelled`].
///
/// `settings.read_timeout` bounds the typed read only. The precheck opens every candidate on the
/// rayon pool without a deadline; non-regular files (FIFOs, devices) are rejected before opening,
/// but an `open` that hangs on a stale network mount stalls the run.
pub fn merge_all(
    paths: &[PathBuf],
    spec: &ColumnSpec,
    settings: &MergeSettings,
    observer: &dyn PipelineObserver,
) -> Result<MergeOutcome> {
    let mut stats = MergeStats {
        candidates: paths.len(),
        ..MergeStats::default()
    };

    let survivors = precheck_all(
        paths,
        &spec.required_columns(),
        settings.delimiter,
        observer,
    );
    stats.files_validated = survivors.len();
    if survivors.is_empty() {
        log::info!("No files passed the column check ({} candidates)", paths.len());
        return Ok(MergeOutcome {
            table: Table::empty(spec),
            stats,
        });
    }

    let workers = settings.worker_count(survivors.len());
    stats.workers = workers;
    log::info!(
        "Processing {} files with {} workers",
        survivors.len(),
        workers
    );

    let tasks: Vec<ReadTask> = survivors
        .iter()
        .enumerate()
        .map(|(id, path)| ReadTask {
            id,
            path: path.clone(),
        })
        .collect();
    let pool = ReaderPool::start(tasks, Arc::new(spec.clone()), settings, workers);

    let mut buffer = BatchBuffer::new(spec, settings.batch_size);
    let bar = reading_bar(settings.progress, survivors.len());
    collect_results(
        pool,
        &survivors,
        settings,
        observer,
        &mut buffer,
        &mut stats,
        bar.as_ref(),
    )?;

    stats.chunks_compacted = buffer.compactions();
    stats.peak_live_chunks = buffer.peak_live_chunks();
    let table = buffer.finish()?;
    Ok(MergeOutcome { table, stats })
}

/// Collector loop: the single writer of `buffer`. Waits only for the next event from any worker.
fn collect_results(
    mut pool: ReaderPool,
    survivors: &[PathBuf],
    settings: &MergeSettings,
    observer: &dyn PipelineObserver,
    buffer: &mut BatchBuffer<'_>,
    stats: &mut MergeStats,
    bar: Option<&ProgressBar>,
) -> Result<()> {
    let mut ledger = TaskLedger::new(survivors.len());
    let poll = settings
        .read_timeout
        .map_or(MergeConsts::POLL_INTERVAL, |t| t.min(MergeConsts::POLL_INTERVAL));

    let mut shown = 0usize;
    let mut tick = |n: usize| {
        if let Some(bar) = bar {
            update_progress_bar(bar, n);
            shown += n;
        }
    };

    while !ledger.all_settled() {
        if settings.is_cancelled() {
            let abandoned = ledger.in_flight.len();
            log::warn!("Cancelled; abandoning {} in-flight reads", abandoned);
            pool.abandon();
            return Err(GatherError::Cancelled { abandoned }.into());
        }
        if pool.size() == 0 {
            log::error!("No reader threads available");
            break;
        }

        match pool.events().recv_timeout(poll) {
            Ok(WorkerEvent::Started { task, worker, at }) => {
                ledger.start(task, worker, at);
            }
            Ok(WorkerEvent::Finished {
                task,
                worker: _,
                result,
            }) => {
                ledger.in_flight.remove(&task);
                if !ledger.settle(task) {
                    log::debug!("Discarding late result for {}", survivors[task].display());
                    continue;
                }
                tick(1);
                match result {
                    Ok(table) => {
                        stats.files_read += 1;
                        observer.file_read(&survivors[task], table.num_rows());
                        buffer.push(table, observer)?;
                    }
                    Err(e) => {
                        stats.files_failed += 1;
                        observer.read_failed(&e);
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if let Some(limit) = settings.read_timeout {
            for (task, worker) in ledger.overdue(limit) {
                // Fails when the read just finished; its result is already queued.
                if !pool.retire(worker, task) || !ledger.time_out(task) {
                    continue;
                }
                stats.files_failed += 1;
                stats.files_timed_out += 1;
                tick(1);
                observer.read_failed(&ReadError::Timeout {
                    path: survivors[task].clone(),
                    after: limit,
                });
            }
        }
    }

    // Left unsettled only when no reader could run them.
    for (task, path) in survivors.iter().enumerate() {
        if ledger.settle(task) {
            stats.files_failed += 1;
            observer.read_failed(&ReadError::WorkerPanicked { path: path.clone() });
        }
    }

    stats.peak_in_flight = ledger.peak_in_flight;
    log::debug!("Reader threads started: {}", pool.spawned());
    pool.shutdown();
    if let Some(bar) = bar {
        finish_progress_bar(bar, shown);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::observer::LogObserver;
    use crate::schema::{ColumnDef, ColumnType};
    use crate::table::Column;

    fn spec() -> ColumnSpec {
        ColumnSpec::new(vec![ColumnDef::required("id", ColumnType::Integer)]).unwrap()
    }

    fn one_row(spec: &ColumnSpec, id: i64) -> Table {
        Table::from_columns(spec, vec![Column::Integer(vec![id])])
    }

    #[test]
    fn buffer_compacts_every_threshold() {
        let spec = spec();
        let mut buffer = BatchBuffer::new(&spec, 4);
        for i in 0..10 {
            buffer.push(one_row(&spec, i), &LogObserver).unwrap();
        }
        assert_eq!(buffer.compactions(), 2);
        // 2 chunks + partial buffer
        assert_eq!(buffer.peak_live_chunks(), 3);
        let table = buffer.finish().unwrap();
        assert_eq!(table.num_rows(), 10);
    }

    #[test]
    fn empty_buffer_finishes_to_empty_table() {
        let spec = spec();
        let table = BatchBuffer::new(&spec, 3).finish().unwrap();
        assert!(table.is_empty());
        assert_eq!(table.names(), ["id"]);
    }

    #[test]
    fn ledger_settles_once() {
        let mut ledger = TaskLedger::new(2);
        assert!(ledger.settle(0));
        assert!(!ledger.settle(0));
        assert!(!ledger.all_settled());
        assert!(ledger.settle(1));
        assert!(ledger.all_settled());
        assert!(!ledger.settle(5));
    }

    #[test]
    fn ledger_reports_overdue_without_settling() {
        let mut ledger = TaskLedger::new(2);
        ledger.start(0, 3, Instant::now());
        std::thread::sleep(Duration::from_millis(50));
        ledger.start(1, 4, Instant::now());
        assert_eq!(ledger.peak_in_flight, 2);

        let overdue = ledger.overdue(Duration::from_millis(25));
        assert_eq!(overdue, vec![(0, 3)]);
        // Not settled until the worker is retired.
        assert_eq!(ledger.in_flight.len(), 2);
        assert!(!ledger.all_settled());

        assert!(ledger.time_out(0));
        assert!(!ledger.in_flight.contains_key(&0));
        assert!(ledger.in_flight.contains_key(&1));
        // late Finished for task 0 is discarded
        assert!(!ledger.settle(0));
    }
}
