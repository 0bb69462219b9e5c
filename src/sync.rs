//! Synchronization primitives shared by the graph and the worker queues.
//!
//! Under `--cfg loom` these resolve to loom's model-checked versions so the
//! queue handoff can be explored exhaustively; otherwise they are `std`'s.

#[cfg(loom)]
pub(crate) use loom::sync::{
    atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering},
    Condvar, Mutex, MutexGuard,
};

#[cfg(not(loom))]
pub(crate) use std::sync::{
    atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering},
    Condvar, Mutex, MutexGuard,
};
