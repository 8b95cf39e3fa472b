//! Error types for the task execution engine.
//!
//! This module defines the central `Error` enum, which captures the only
//! conditions that cross the engine's boundary as data. Everything else that
//! can go wrong (double start, double stop, a panicking task body) is either
//! a contract violation enforced with a panic or an event contained inside
//! the worker loop.
//!
//! ## Error Cases
//! - `Busy`: The queue is at capacity at submit time. Expected under load and
//!   surfaced to the caller for retry-later handling; never retried
//!   internally.
//! - `Shutdown`: A submission arrived after the pool closed its queue.

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the task execution engine.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The queue is at capacity; the caller should back off and retry later.
    #[error("workers are busy, try again later")]
    Busy,

    /// The pool is shutting down and no longer accepts tasks.
    #[error("worker pool is shutting down")]
    Shutdown,
}
