//! Concurrency building blocks for index construction.
//!
//! - [`eager_pool::EagerPool`] - a worker pool that never queues: when no worker is
//!   idle the task runs on the caller's thread, which keeps nested fork-join free
//!   of starvation deadlocks.
//! - [`oneshot`] and [`join_handle`] - single-value hand-off of task results.
//! - [`data_parallel`] - bounded parallel `map` used by the partition planner.
//! - [`semiasync_queue`] - overlaps parallel job preparation with strictly ordered
//!   commits into a single output target.

pub mod data_parallel;
pub mod eager_pool;
pub mod join_handle;
pub mod oneshot;
pub mod semiasync_queue;
