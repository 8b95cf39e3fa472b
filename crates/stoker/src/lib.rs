#![doc = include_str!("../README.md")]

mod error;
mod pool;
mod queue;
mod task;

pub use error::{Error, Result};
pub use pool::manager::{PoolConfig, PoolState, WorkerPool};
pub use queue::TaskQueue;
pub use task::Task;

// Public re-export so hosts can construct the parent cancellation scope
// without depending on `tokio-util` directly.
pub use tokio_util::sync::CancellationToken;
