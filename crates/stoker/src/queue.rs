//! Bounded hand-off queue between submitters and workers.
//!
//! This module defines [`TaskQueue`], the sole shared buffer mediating
//! between producers (submitters) and a fixed set of consumers (workers).
//! Admission uses `try_send` on a bounded channel, so the capacity check and
//! the append happen as one indivisible step: concurrent producers can never
//! admit more tasks than the configured capacity, and a full queue rejects
//! immediately instead of blocking the caller.
//!
//! Closing the queue stops further admissions while leaving already-buffered
//! tasks deliverable until drained, after which every `recv` observes the
//! end of the stream.

use crate::{Error, Result, Task};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, mpsc};

/// A fixed-capacity multi-producer/multi-consumer task buffer.
///
/// Producers call [`try_enqueue`](TaskQueue::try_enqueue) from any thread and
/// never suspend. Consumers share the receiving side behind an async mutex
/// and block in [`recv`](TaskQueue::recv) until a task arrives or the queue
/// is closed and drained.
pub struct TaskQueue {
    tx: parking_lot::Mutex<Option<mpsc::Sender<Task>>>,
    rx: Mutex<mpsc::Receiver<Task>>,
    capacity: usize,
    depth: AtomicUsize,
}

impl TaskQueue {
    /// Creates a queue that buffers at most `capacity` pending tasks.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn bounded(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be greater than zero");
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx: parking_lot::Mutex::new(Some(tx)),
            rx: Mutex::new(rx),
            capacity,
            depth: AtomicUsize::new(0),
        }
    }

    /// Attempts to append `task` without blocking.
    ///
    /// # Errors
    ///
    /// - [`Error::Busy`] if the buffer is at capacity.
    /// - [`Error::Shutdown`] if the queue has been closed.
    pub fn try_enqueue(&self, task: Task) -> Result<()> {
        let guard = self.tx.lock();
        let Some(tx) = guard.as_ref() else {
            return Err(Error::Shutdown);
        };
        match tx.try_send(task) {
            Ok(()) => {
                self.depth.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => Err(Error::Busy),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(Error::Shutdown),
        }
    }

    /// Blocks the calling worker until a task is available.
    ///
    /// Returns `None` once the queue has been closed and every buffered task
    /// has been delivered. Delivery is FIFO across all consumers.
    pub async fn recv(&self) -> Option<Task> {
        let mut rx = self.rx.lock().await;
        let task = rx.recv().await;
        if task.is_some() {
            self.depth.fetch_sub(1, Ordering::Relaxed);
        }
        task
    }

    /// Marks the queue closed.
    ///
    /// Outstanding tasks remain deliverable via [`recv`](TaskQueue::recv)
    /// until drained. The pool owns the single close call; a redundant close
    /// is a no-op at this level.
    pub fn close(&self) {
        self.tx.lock().take();
    }

    /// Number of tasks currently buffered.
    pub fn pending(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    /// The configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use std::sync::Arc;

    fn task(id: &str) -> Task {
        Task::new(id, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn rejects_when_full_without_blocking() {
        let queue = TaskQueue::bounded(2);
        queue.try_enqueue(task("t1")).unwrap();
        queue.try_enqueue(task("t2")).unwrap();
        assert_eq!(queue.try_enqueue(task("t3")), Err(Error::Busy));
        assert_eq!(queue.pending(), 2);
    }

    #[tokio::test]
    async fn delivers_in_fifo_order() {
        let queue = TaskQueue::bounded(3);
        for id in ["a", "b", "c"] {
            queue.try_enqueue(task(id)).unwrap();
        }
        for id in ["a", "b", "c"] {
            assert_eq!(queue.recv().await.unwrap().id, id);
        }
    }

    #[tokio::test]
    async fn recv_blocks_until_a_task_arrives() {
        let queue = Arc::new(TaskQueue::bounded(1));
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.recv().await })
        };
        // Give the consumer a chance to park in `recv` first.
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.try_enqueue(task("late")).unwrap();
        let received = consumer.await.unwrap().unwrap();
        assert_eq!(received.id, "late");
    }

    #[tokio::test]
    async fn drains_buffered_tasks_after_close() {
        let queue = TaskQueue::bounded(2);
        queue.try_enqueue(task("t1")).unwrap();
        queue.try_enqueue(task("t2")).unwrap();
        queue.close();

        assert_eq!(queue.try_enqueue(task("t3")), Err(Error::Shutdown));
        assert_eq!(queue.recv().await.unwrap().id, "t1");
        assert_eq!(queue.recv().await.unwrap().id, "t2");
        assert!(queue.recv().await.is_none());
        assert!(queue.recv().await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_producers_never_exceed_capacity() {
        const PRODUCERS: usize = 8;
        const ATTEMPTS: usize = 10;
        const CAPACITY: usize = 4;

        // No consumer runs, so the number of successful admissions across
        // all racing producers must be exactly the capacity.
        let queue = Arc::new(TaskQueue::bounded(CAPACITY));
        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let queue = Arc::clone(&queue);
                tokio::spawn(async move {
                    let mut accepted = 0;
                    for i in 0..ATTEMPTS {
                        if queue
                            .try_enqueue(Task::new(format!("p{p}-{i}"), Duration::ZERO))
                            .is_ok()
                        {
                            accepted += 1;
                        }
                    }
                    accepted
                })
            })
            .collect();

        let mut total = 0;
        for handle in producers {
            total += handle.await.unwrap();
        }
        assert_eq!(total, CAPACITY, "admissions must match capacity exactly");
        assert_eq!(queue.pending(), CAPACITY);
    }
}
