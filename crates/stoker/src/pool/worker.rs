use super::manager::PoolStats;
use crate::{Task, TaskQueue};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// The per-worker fetch/execute loop.
///
/// Each worker blocks on the shared queue, checks the pool-wide cancellation
/// signal once per dequeued task, and executes the task body. The loop has
/// exactly two exit paths:
///
/// - the queue is closed and drained (`recv` returns `None`), or
/// - cancellation was observed after a dequeue, in which case the task is
///   discarded and the worker stops fetching further work.
///
/// Cancellation is checked once per task rather than preemptively inside
/// execution; only the timed wait standing in for real work is itself
/// interruptible. A real task body is expected to honor `shutdown_token` in
/// its own blocking waits.
pub(crate) async fn worker_loop(
    worker_id: usize,
    queue: Arc<TaskQueue>,
    shutdown_token: CancellationToken,
    stats: Arc<PoolStats>,
) {
    tracing::trace!("worker {worker_id} started");

    while let Some(task) = queue.recv().await {
        if shutdown_token.is_cancelled() {
            stats.discarded.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(task = %task.id, "worker {worker_id} cancelled, discarding task");
            break;
        }

        stats.inflight.fetch_add(1, Ordering::Relaxed);
        // A panicking task body must not take the worker down with it: the
        // pool's worker count holds for its whole lifetime.
        let outcome = AssertUnwindSafe(execute(worker_id, &task, &shutdown_token))
            .catch_unwind()
            .await;
        stats.inflight.fetch_sub(1, Ordering::Relaxed);

        match outcome {
            Ok(()) => {
                stats.executed.fetch_add(1, Ordering::Relaxed);
            }
            Err(payload) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    task = %task.id,
                    "worker {worker_id}: task body panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    tracing::trace!("worker {worker_id} stopped");
}

/// Runs one task body: a cancellable wait standing in for real work.
///
/// The wait returns early the instant the shutdown signal fires, without
/// completing the full duration.
async fn execute(worker_id: usize, task: &Task, shutdown_token: &CancellationToken) {
    tracing::info!(task = %task.id, "worker {worker_id} executing task");
    tokio::select! {
        () = shutdown_token.cancelled() => {
            tracing::debug!(task = %task.id, "work cut short by shutdown");
        }
        () = sleep(task.duration) => {
            tracing::info!(task = %task.id, "work completed");
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
