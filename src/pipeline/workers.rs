//! Fixed-size reader pool: OS threads pulling [`ReadTask`]s from a queue and reporting
//! [`WorkerEvent`]s to the collector.
//!
//! Each worker publishes the task it is reading in a shared slot. The collector retires a stuck
//! worker by swapping that slot from the task id to [`RETIRED`]; the swap only succeeds while the
//! worker is still inside that read, and a retired worker exits as soon as the read returns. At
//! most `size` pool members ever pull from the queue.

use crossbeam_channel::{Receiver, Sender};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::error::ReadError;
use crate::schema::ColumnSpec;

use super::context::{MergeSettings, ReadTask, WorkerEvent, create_reader_channels};
use super::reader::read_typed_with;

/// Slot value while a worker waits for its next task.
const IDLE: usize = usize::MAX;
/// Slot value once the collector has given up on the worker's current read.
const RETIRED: usize = usize::MAX - 1;

type Slot = Arc<AtomicUsize>;

/// Single reader: take tasks until the queue is drained, the run is cancelled, or the worker is
/// retired. A panic inside the reader is reported as that file's failure; the worker keeps going.
fn reader_worker_loop(
    worker: usize,
    slot: Slot,
    task_rx: Receiver<ReadTask>,
    event_tx: Sender<WorkerEvent>,
    spec: Arc<ColumnSpec>,
    settings: MergeSettings,
) {
    while let Ok(ReadTask { id, path }) = task_rx.recv() {
        if settings.is_cancelled() {
            break;
        }
        // Only the collector writes RETIRED, and only over a task id: IDLE is ours to leave.
        slot.store(id, Ordering::SeqCst);
        let started = WorkerEvent::Started {
            task: id,
            worker,
            at: Instant::now(),
        };
        if event_tx.send(started).is_err() {
            break;
        }
        let result = catch_unwind(AssertUnwindSafe(|| {
            read_typed_with(&path, &spec, settings.delimiter)
        }))
        .unwrap_or_else(|_| Err(ReadError::WorkerPanicked { path: path.clone() }));
        let retired = slot
            .compare_exchange(id, IDLE, Ordering::SeqCst, Ordering::SeqCst)
            .is_err();
        let finished = WorkerEvent::Finished {
            task: id,
            worker,
            result,
        };
        if event_tx.send(finished).is_err() || retired {
            break;
        }
    }
    log::trace!("reader-{} exiting", worker);
}

struct Member {
    worker: usize,
    slot: Slot,
    handle: JoinHandle<()>,
}

/// Running pool. The collector receives from [`ReaderPool::events`]; the pool keeps its own
/// event sender so it can replace workers, which means completion is detected by counting
/// settled tasks rather than by channel close.
pub struct ReaderPool {
    task_rx: Receiver<ReadTask>,
    event_tx: Sender<WorkerEvent>,
    event_rx: Receiver<WorkerEvent>,
    spec: Arc<ColumnSpec>,
    settings: MergeSettings,
    members: Vec<Member>,
    next_worker: usize,
    spawned: usize,
}

impl ReaderPool {
    /// Queue every task, then spawn `size` readers.
    pub fn start(
        tasks: Vec<ReadTask>,
        spec: Arc<ColumnSpec>,
        settings: &MergeSettings,
        size: usize,
    ) -> Self {
        let channels = create_reader_channels(tasks.len());
        for task in tasks {
            // Capacity equals the task count and the receiver is alive: cannot fail.
            let _ = channels.task_tx.send(task);
        }
        // Closing the queue lets idle workers exit once it drains.
        drop(channels.task_tx);

        let mut pool = Self {
            task_rx: channels.task_rx,
            event_tx: channels.event_tx,
            event_rx: channels.event_rx,
            spec,
            settings: settings.clone(),
            members: Vec::with_capacity(size),
            next_worker: 0,
            spawned: 0,
        };
        for _ in 0..size {
            pool.spawn_worker();
        }
        pool
    }

    fn spawn_worker(&mut self) -> bool {
        let worker = self.next_worker;
        self.next_worker += 1;
        let slot: Slot = Arc::new(AtomicUsize::new(IDLE));
        let task_rx = self.task_rx.clone();
        let event_tx = self.event_tx.clone();
        let spec = Arc::clone(&self.spec);
        let settings = self.settings.clone();
        let worker_slot = Arc::clone(&slot);
        match thread::Builder::new()
            .name(format!("reader-{worker}"))
            .spawn(move || {
                reader_worker_loop(worker, worker_slot, task_rx, event_tx, spec, settings)
            }) {
            Ok(handle) => {
                self.members.push(Member {
                    worker,
                    slot,
                    handle,
                });
                self.spawned += 1;
                true
            }
            Err(e) => {
                log::error!("Failed to spawn reader-{}: {}", worker, e);
                false
            }
        }
    }

    pub fn events(&self) -> &Receiver<WorkerEvent> {
        &self.event_rx
    }

    /// Live (non-retired) workers.
    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Threads started over the pool's lifetime, replacements included.
    pub fn spawned(&self) -> usize {
        self.spawned
    }

    /// Give up on `worker`'s read of `task`: retire the worker and spawn a replacement so queued
    /// tasks still get picked up. Returns false when the read already finished (its result is on
    /// the way) or the worker is unknown; nothing changes then.
    pub fn retire(&mut self, worker: usize, task: usize) -> bool {
        let Some(pos) = self.members.iter().position(|m| m.worker == worker) else {
            return false;
        };
        let swapped = self.members[pos]
            .slot
            .compare_exchange(task, RETIRED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if !swapped {
            return false;
        }
        // Detached: it exits on its own once the read returns.
        drop(self.members.swap_remove(pos));
        log::debug!("Retired reader-{} (read timed out)", worker);
        self.spawn_worker();
        true
    }

    /// Close channels and join live workers. They exit once the queue is drained.
    pub fn shutdown(self) {
        let Self {
            task_rx,
            event_tx,
            event_rx,
            members,
            ..
        } = self;
        drop(event_tx);
        drop(event_rx);
        drop(task_rx);
        for m in members {
            if m.handle.join().is_err() {
                log::error!("reader-{} panicked", m.worker);
            }
        }
    }

    /// Leave every worker running detached (cancellation).
    pub fn abandon(self) {
        log::debug!("Abandoning {} reader threads", self.members.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, ColumnType};
    use std::time::Duration;

    fn spec() -> Arc<ColumnSpec> {
        Arc::new(ColumnSpec::new(vec![ColumnDef::required("id", ColumnType::Integer)]).unwrap())
    }

    #[test]
    fn retire_refuses_idle_or_unknown_worker() {
        let mut pool = ReaderPool::start(vec![], spec(), &MergeSettings::default(), 2);
        assert_eq!(pool.size(), 2);
        // Both workers are idle: no read to give up on.
        assert!(!pool.retire(0, 0));
        assert!(!pool.retire(99, 0));
        assert_eq!(pool.size(), 2);
        assert_eq!(pool.spawned(), 2);
        pool.shutdown();
    }

    #[test]
    fn retire_replaces_busy_worker() {
        let mut pool = ReaderPool::start(vec![], spec(), &MergeSettings::default(), 1);
        // Pretend reader-0 is inside task 7.
        pool.members[0].slot.store(7, Ordering::SeqCst);
        assert!(!pool.retire(0, 3));
        assert!(pool.retire(0, 7));
        assert_eq!(pool.size(), 1);
        assert_eq!(pool.spawned(), 2);
        assert_eq!(pool.members[0].worker, 1);
        // Give the detached thread a moment; shutdown only joins the replacement.
        std::thread::sleep(Duration::from_millis(10));
        pool.shutdown();
    }
}
