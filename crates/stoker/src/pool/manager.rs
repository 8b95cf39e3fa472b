//! Worker pool lifecycle and task submission.
//!
//! This module defines the [`WorkerPool`] struct, which owns the shared
//! [`TaskQueue`], the pool-wide cancellation signal, and the completion
//! barrier that [`stop`](WorkerPool::stop) waits on. Workers pull from the
//! queue independently; submission is non-blocking and reports backpressure
//! as [`Error::Busy`](crate::Error::Busy).
//!
//! The lifecycle is linear and single-owner: `Created → Running → Stopping →
//! Stopped`. Starting twice, or stopping a pool that is not running, is a
//! contract violation and panics rather than returning a recoverable error.

use super::worker::worker_loop;
use crate::{Error, Result, Task, TaskQueue};
use core::time::Duration;
use std::sync::{
    Arc, OnceLock,
    atomic::{AtomicU8, AtomicU64, Ordering},
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

/// Sizing knobs for a [`WorkerPool`].
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Number of long-lived worker tasks to spawn.
    pub worker_count: usize,
    /// Maximum number of pending tasks buffered between submitters and
    /// workers. Submissions beyond this are rejected with `Busy`.
    pub queue_capacity: usize,
}

/// Observable lifecycle state of a [`WorkerPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PoolState {
    Created = 0,
    Running = 1,
    Stopping = 2,
    Stopped = 3,
}

impl PoolState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Created,
            1 => Self::Running,
            2 => Self::Stopping,
            3 => Self::Stopped,
            _ => unreachable!("invalid pool state {raw}"),
        }
    }
}

/// Execution counters shared between the pool and its workers.
///
/// Monotonic except for `inflight`, which tracks tasks currently inside a
/// worker's execution step.
#[derive(Debug, Default)]
pub(crate) struct PoolStats {
    pub(crate) executed: AtomicU64,
    pub(crate) discarded: AtomicU64,
    pub(crate) failed: AtomicU64,
    pub(crate) inflight: AtomicU64,
}

/// A fixed-size pool of cooperative workers consuming one bounded queue.
///
/// The pool owns the worker lifecycle and the cancellation signal shared by
/// all workers. The signal is scoped to the pool instance (derived from the
/// parent scope passed to [`start`](WorkerPool::start)), broadcast once at
/// [`stop`](WorkerPool::stop) time, and never reset.
pub struct WorkerPool {
    queue: Arc<TaskQueue>,
    worker_count: usize,
    shutdown_token: OnceLock<CancellationToken>,
    tracker: TaskTracker,
    state: AtomicU8,
    stats: Arc<PoolStats>,
}

impl WorkerPool {
    /// Constructs a pool in the `Created` state. No workers run until
    /// [`start`](WorkerPool::start).
    ///
    /// # Panics
    ///
    /// Panics if `worker_count` or `queue_capacity` is zero.
    pub fn new(config: PoolConfig) -> Self {
        assert!(
            config.worker_count > 0,
            "worker count must be greater than zero"
        );
        Self {
            queue: Arc::new(TaskQueue::bounded(config.queue_capacity)),
            worker_count: config.worker_count,
            shutdown_token: OnceLock::new(),
            tracker: TaskTracker::new(),
            state: AtomicU8::new(PoolState::Created as u8),
            stats: Arc::new(PoolStats::default()),
        }
    }

    /// Transitions `Created → Running` and spawns exactly `worker_count`
    /// workers, each tracked by the completion barrier.
    ///
    /// The pool's cancellation signal is derived as a child of `parent`, so
    /// cancelling the parent scope also stops the workers' waits without
    /// promoting the signal to process-global state.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if the pool has already been started.
    pub fn start(&self, parent: &CancellationToken) {
        self.transition(PoolState::Created, PoolState::Running);
        let token = parent.child_token();
        let _ = self.shutdown_token.set(token.clone());

        for worker_id in 0..self.worker_count {
            self.tracker.spawn(worker_loop(
                worker_id,
                Arc::clone(&self.queue),
                token.clone(),
                Arc::clone(&self.stats),
            ));
        }

        tracing::info!(
            workers = self.worker_count,
            capacity = self.queue.capacity(),
            "worker pool started"
        );
    }

    /// Attempts to enqueue one task. Never blocks and never suspends.
    ///
    /// # Errors
    ///
    /// - [`Error::Busy`] if the queue is at capacity; the caller maps this to
    ///   a backpressure signal and retries later.
    /// - [`Error::Shutdown`] if the pool is shutting down.
    pub fn submit(&self, id: impl Into<String>, duration: Duration) -> Result<()> {
        if self
            .shutdown_token
            .get()
            .is_some_and(CancellationToken::is_cancelled)
        {
            return Err(Error::Shutdown);
        }
        self.queue.try_enqueue(Task::new(id, duration))
    }

    /// Transitions `Running → Stopping → Stopped`.
    ///
    /// Closes the queue so no further submissions are admitted, broadcasts
    /// the one-shot cancellation signal, and blocks until every worker has
    /// exited. The wait is unbounded; a host with a hard shutdown deadline
    /// bounds it externally (e.g. `tokio::time::timeout`).
    ///
    /// # Panics
    ///
    /// Panics if the pool is not running. At most one stop sequence may run
    /// per pool instance.
    pub async fn stop(&self) {
        self.transition(PoolState::Running, PoolState::Stopping);
        tracing::info!("stopping workers");

        self.queue.close();
        if let Some(token) = self.shutdown_token.get() {
            token.cancel();
        }
        self.tracker.close();
        self.tracker.wait().await;

        self.transition(PoolState::Stopping, PoolState::Stopped);
        tracing::info!("all workers exited");
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Number of tasks currently buffered in the queue.
    pub fn pending(&self) -> usize {
        self.queue.pending()
    }

    /// Tasks whose execution step ran to completion (including waits cut
    /// short by cancellation).
    pub fn tasks_executed(&self) -> u64 {
        self.stats.executed.load(Ordering::Relaxed)
    }

    /// Tasks dequeued but dropped because cancellation was already
    /// signalled.
    pub fn tasks_discarded(&self) -> u64 {
        self.stats.discarded.load(Ordering::Relaxed)
    }

    /// Tasks whose body panicked. The owning worker survives.
    pub fn tasks_failed(&self) -> u64 {
        self.stats.failed.load(Ordering::Relaxed)
    }

    /// Tasks currently inside a worker's execution step.
    pub fn tasks_inflight(&self) -> u64 {
        self.stats.inflight.load(Ordering::Relaxed)
    }

    fn transition(&self, from: PoolState, to: PoolState) {
        if self
            .state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            panic!(
                "invalid worker pool transition to {to:?}: pool is not {from:?} (current: {:?})",
                self.state()
            );
        }
    }
}
