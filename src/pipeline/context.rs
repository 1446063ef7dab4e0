//! Pipeline context: merge settings, worker events and the channels tying workers to the
//! collector.

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::Opts;
use crate::error::ReadError;
use crate::table::Table;
use crate::utils::config::{DEFAULT_DELIMITER, MergeConsts, WorkerThreadLimits};
use crate::utils::fd_limit::cap_by_fd_limit;

/// Aggregator tuning resolved from [`Opts`].
#[derive(Clone, Debug)]
pub struct MergeSettings {
    /// Requested pool size; None derives it from [`WorkerThreadLimits`].
    pub num_threads: Option<usize>,
    pub batch_size: usize,
    pub read_timeout: Option<Duration>,
    pub delimiter: u8,
    pub progress: bool,
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for MergeSettings {
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

impl From<&Opts> for MergeSettings {
    fn from(o: &Opts) -> Self {
        Self {
            num_threads: o.num_threads,
            batch_size: o.batch_size.max(1),
            read_timeout: o.read_timeout,
            delimiter: o.delimiter,
            progress: o.progress,
            cancel: o.cancel.clone(),
        }
    }
}

impl MergeSettings {
    /// Pool size for `files` surviving files: requested or default, capped by the FD limit and
    /// the file count, never zero.
    pub fn worker_count(&self, files: usize) -> usize {
        let wanted = self
            .num_threads
            .unwrap_or_else(|| WorkerThreadLimits::current().default_workers());
        cap_by_fd_limit(wanted).min(files).max(1)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|c| c.load(Ordering::Relaxed))
    }
}

/// One unit of work: read the file at `path`. `id` indexes the survivor list.
#[derive(Clone, Debug)]
pub struct ReadTask {
    pub id: usize,
    pub path: PathBuf,
}

/// Sent by workers to the collector. `Started` always precedes `Finished` for a task.
pub enum WorkerEvent {
    Started {
        task: usize,
        worker: usize,
        at: Instant,
    },
    Finished {
        task: usize,
        worker: usize,
        result: Result<Table, ReadError>,
    },
}

/// Task and event channels. Task channel is sized to hold every task so filling it never blocks.
pub struct ReaderChannels {
    pub task_tx: Sender<ReadTask>,
    pub task_rx: Receiver<ReadTask>,
    pub event_tx: Sender<WorkerEvent>,
    pub event_rx: Receiver<WorkerEvent>,
}

pub fn create_reader_channels(task_count: usize) -> ReaderChannels {
    let (task_tx, task_rx) = bounded::<ReadTask>(task_count.max(1));
    let (event_tx, event_rx) = unbounded::<WorkerEvent>();
    ReaderChannels {
        task_tx,
        task_rx,
        event_tx,
        event_rx,
    }
}
