//! # `preflow` - Parallel Preflow-Push Maximum Flow
//!
//! Computes the maximum flow of a capacitated network with the push-relabel
//! algorithm, run by a fixed pool of worker threads that each own a private
//! queue of active (excess-carrying) nodes.
//!
//! ## Concurrency Model
//!
//! - **Per-node locks**: height and excess live behind one mutex per node.
//!   A push locks both endpoints, always lower id first; that total order is
//!   what rules out deadlock. There is no global lock.
//! - **Private queues, shared handoff**: a node that gains excess is handed
//!   to a worker chosen round-robin from a shared counter, so it may move to
//!   a different thread than the one that pushed into it. A node is active in
//!   at most one queue at a time.
//! - **Cooperative shutdown**: the orchestrating thread polls source and sink
//!   excess; once `|excess(source)| == excess(sink)` it cancels every worker.
//!   Workers only observe cancellation while blocked on an empty queue.
//! - **Failures are fatal**: a worker that panics or exits early fails the
//!   whole computation instead of yielding a partial flow.
//!
//! ## Algorithm
//!
//! 1. The source is lifted to height `n` and every incident edge is
//!    saturated; each neighbor becomes active.
//! 2. A worker scans its head node's edges, pushing
//!    `min(excess, residual)` to any strictly lower neighbor.
//! 3. A scan that pushes nothing while excess remains raises the node's
//!    height by exactly one; the node stays at the head for another scan.
//! 4. A node whose excess reaches zero leaves the queue.
//!
//! Edges carry signed flow relative to their canonical direction and can be
//! used up to `capacity` in either direction.
//!
//! ## Example
//!
//! ```rust
//! use preflow::Graph;
//!
//! let mut graph = Graph::new(
//!     4,
//!     [(0, 1, 3), (0, 2, 2), (1, 2, 5), (1, 3, 2), (2, 3, 3)],
//! )?;
//! assert_eq!(graph.compute(0, 3, 4)?, 5);
//! # Ok::<(), preflow::FlowError>(())
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod concurrency;
pub mod config;
pub mod error;
pub mod graph;
pub mod input;
pub(crate) mod sync;

pub use concurrency::{RunStats, WorkerStats};
pub use config::PreflowConfig;
pub use error::{FlowError, Result};
pub use graph::{Edge, Graph, LockedPair, Node, NodeState, PreflowOutcome};
pub use input::{parse_graph, read_graph};

// Compile-time layout checks
const _: () = {
    use core::mem;

    // Each worker's queue lock sits on its own cache line.
    assert!(
        mem::align_of::<crossbeam_utils::CachePadded<concurrency::worker::Worker>>()
            >= mem::align_of::<concurrency::worker::Worker>() * 2
    );

    // The locked part of a node stays within two words.
    assert!(mem::size_of::<NodeState>() <= 2 * mem::size_of::<u64>());
};
