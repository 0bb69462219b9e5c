//! Counters collected during a run.

use serde::Serialize;

/// What one worker did over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStats {
    /// Index of the worker in the pool.
    pub worker: usize,
    /// Adjacency scans performed.
    pub discharges: u64,
    /// Successful pushes.
    pub pushes: u64,
    /// Height increments.
    pub relabels: u64,
    /// Nodes this worker placed in some queue after pushing into them.
    pub handoffs: u64,
    /// Nodes removed from this worker's queue with zero excess.
    pub retired: u64,
}

/// Totals for a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Per-worker counters, in pool order.
    pub workers: Vec<WorkerStats>,
    /// Termination checks made by the monitor.
    pub polls: u64,
    /// Allocation requests, including ones that found the node already queued.
    pub jobs: usize,
}

impl RunStats {
    /// Pushes across all workers.
    pub fn pushes(&self) -> u64 {
        self.workers.iter().map(|w| w.pushes).sum()
    }

    /// Relabels across all workers.
    pub fn relabels(&self) -> u64 {
        self.workers.iter().map(|w| w.relabels).sum()
    }

    /// Adjacency scans across all workers.
    pub fn discharges(&self) -> u64 {
        self.workers.iter().map(|w| w.discharges).sum()
    }
}
