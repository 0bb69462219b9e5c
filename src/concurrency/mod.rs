//! The concurrent engine: per-worker active queues, the worker loop, and
//! termination detection.
//!
//! Lock hierarchy, outermost first:
//! 1. node locks, always in ascending id order (`Graph::lock_pair`);
//! 2. a single worker-queue lock.
//!
//! No code acquires a node lock while holding a queue lock.

pub(crate) mod active_queue;
pub(crate) mod monitor;
pub mod stats;
pub(crate) mod worker;

pub use stats::{RunStats, WorkerStats};
