//! Worker threads and the pool they form.
//!
//! Each worker owns one [`ActiveQueue`]. Any thread may hand a node to any
//! worker; only the owner processes and retires the nodes in its queue.

use crossbeam_utils::CachePadded;

use super::{active_queue::ActiveQueue, stats::WorkerStats};
use crate::{error::Result, graph::node::Node, graph::Graph};

/// One member of the pool.
pub(crate) struct Worker {
    index: usize,
    queue: ActiveQueue,
}

impl Worker {
    fn new(index: usize) -> Self {
        Self {
            index,
            queue: ActiveQueue::new(),
        }
    }

    #[inline]
    pub(crate) fn index(&self) -> usize {
        self.index
    }

    /// Makes `node` active in this worker's queue.
    ///
    /// A no-op when the node is already active anywhere in the pool.
    pub(crate) fn add_excess(&self, nodes: &[Node], node: usize) -> bool {
        let added = self.queue.push(nodes, node);
        tracing::trace!(worker = self.index, node, added, "add excess");
        added
    }

    /// Number of nodes waiting in this worker's queue.
    pub(crate) fn queued(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn cancel(&self) {
        self.queue.cancel();
    }

    /// Processes nodes until cancelled with an empty queue.
    pub(crate) fn run(&self, graph: &Graph, pool: &Pool) -> Result<WorkerStats> {
        let _span = tracing::debug_span!("worker", index = self.index).entered();
        let mut stats = WorkerStats {
            worker: self.index,
            ..WorkerStats::default()
        };

        while let Some(u) = self.queue.wait_head() {
            self.discharge(graph, pool, u, &mut stats)?;
        }

        tracing::debug!("cancelled");
        Ok(stats)
    }

    /// One full scan of `u`'s adjacency, then relabel or retire.
    ///
    /// The scan always runs to completion; cancellation is only seen by
    /// `wait_head`.
    fn discharge(&self, graph: &Graph, pool: &Pool, u: usize, stats: &mut WorkerStats) -> Result<()> {
        stats.discharges += 1;
        let node = &graph.nodes()[u];
        let mut pushed = false;

        for &index in node.adjacency() {
            let edge = &graph.edges()[index];
            if edge.is_loop() {
                continue;
            }
            let v = edge.other(u);

            let mut pair = graph.lock_pair(u, v)?;
            if graph.push(&mut pair, edge) {
                pushed = true;
                stats.pushes += 1;
                // v's lock is still held, so v cannot be retired between its
                // excess growing and it being (re)queued.
                if graph.allocate_work_to_next_thread(pool, v) {
                    stats.handoffs += 1;
                }
            }
            let remaining = pair.u_state().excess();
            graph.unlock_pair(pair);

            if remaining == 0 {
                break;
            }
        }

        // Only this worker removes excess from u, so a positive reading here
        // stays positive until the relabel.
        if !pushed && node.snapshot()?.excess() > 0 {
            node.relabel()?;
            stats.relabels += 1;
        }

        let state = node.lock()?;
        if state.excess() == 0 {
            self.queue.retire_head(graph.nodes(), u);
            stats.retired += 1;
            tracing::trace!(node = u, "retired");
        }
        drop(state);
        Ok(())
    }
}

/// The fixed set of workers for one run.
pub(crate) struct Pool {
    workers: Vec<CachePadded<Worker>>,
    source: usize,
    sink: usize,
}

impl Pool {
    pub(crate) fn new(workers: usize, source: usize, sink: usize) -> Self {
        debug_assert!(workers > 0, "worker count is validated by the config");
        Self {
            workers: (0..workers).map(|i| CachePadded::new(Worker::new(i))).collect(),
            source,
            sink,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.workers.len()
    }

    #[inline]
    pub(crate) fn worker(&self, index: usize) -> &Worker {
        &self.workers[index]
    }

    #[inline]
    pub(crate) fn workers(&self) -> &[CachePadded<Worker>] {
        &self.workers
    }

    /// Source and sink never enter a queue.
    #[inline]
    pub(crate) fn is_terminal(&self, node: usize) -> bool {
        node == self.source || node == self.sink
    }

    pub(crate) fn cancel_all(&self) {
        tracing::debug!(workers = self.workers.len(), "cancelling workers");
        for worker in &self.workers {
            worker.cancel();
        }
    }

    /// Queue lengths, in pool order.
    pub(crate) fn queue_lengths(&self) -> Vec<usize> {
        self.workers.iter().map(|w| w.queued()).collect()
    }
}
