//! The flow network and the preflow-push orchestration.
//!
//! Topology is fixed at construction; heights, excesses and flows are the
//! only mutable state. Every operation touching two nodes acquires both node
//! locks through [`Graph::lock_pair`], lower id first. That total order is the
//! only deadlock-avoidance mechanism in the crate; there is no global lock.

pub mod edge;
pub mod node;

use std::thread;

use crossbeam_utils::CachePadded;

use crate::{
    concurrency::{
        monitor,
        stats::{RunStats, WorkerStats},
        worker::Pool,
    },
    config::PreflowConfig,
    error::{FlowError, Result},
    sync::{AtomicUsize, MutexGuard, Ordering},
};

pub use edge::Edge;
pub use node::{Node, NodeState};

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PreflowOutcome {
    /// Value of the maximum flow, i.e. the sink's final excess.
    pub flow: i64,
    /// Counters gathered by the workers and the monitor.
    pub stats: RunStats,
}

/// A capacitated network solved by parallel preflow-push.
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    jobs: CachePadded<AtomicUsize>,
}

impl Graph {
    /// Builds a graph with `node_count` nodes from `(u, v, capacity)` triples.
    ///
    /// Every edge is validated before anything is allocated for the run: an
    /// endpoint outside `0..node_count` or a negative capacity is rejected.
    /// A node count the allocator cannot satisfy fails with
    /// [`FlowError::GraphTooLarge`] instead of aborting.
    pub fn new<I>(node_count: usize, edges: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize, i64)>,
    {
        let too_large = |_| FlowError::GraphTooLarge { node_count };
        let mut adjacency: Vec<Vec<usize>> = Vec::new();
        adjacency.try_reserve_exact(node_count).map_err(too_large)?;
        adjacency.resize_with(node_count, Vec::new);
        let mut built = Vec::new();

        for (index, (u, v, capacity)) in edges.into_iter().enumerate() {
            for node in [u, v] {
                if node >= node_count {
                    return Err(FlowError::NodeOutOfRange {
                        edge: index,
                        node,
                        node_count,
                    });
                }
            }
            if capacity < 0 {
                return Err(FlowError::NegativeCapacity { edge: index, capacity });
            }

            adjacency[u].push(index);
            if v != u {
                adjacency[v].push(index);
            }
            built.push(Edge::new(u, v, capacity));
        }

        let mut nodes = Vec::new();
        nodes.try_reserve_exact(node_count).map_err(too_large)?;
        nodes.extend(
            adjacency
                .into_iter()
                .enumerate()
                .map(|(id, adj)| Node::new(id, adj)),
        );

        Ok(Self {
            nodes,
            edges: built,
            jobs: CachePadded::new(AtomicUsize::new(0)),
        })
    }

    /// Number of nodes.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// The node with index `id`.
    pub fn node(&self, id: usize) -> Result<&Node> {
        self.nodes.get(id).ok_or(FlowError::UnknownNode {
            node: id,
            node_count: self.nodes.len(),
        })
    }

    /// The edge with index `index` (input order).
    pub fn edge(&self, index: usize) -> Result<&Edge> {
        self.edges.get(index).ok_or(FlowError::UnknownEdge {
            edge: index,
            edge_count: self.edges.len(),
        })
    }

    /// All nodes, indexed by id.
    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All edges, in input order.
    #[inline]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Current excess of node `id`.
    pub fn excess(&self, id: usize) -> Result<i64> {
        Ok(self.node(id)?.snapshot()?.excess())
    }

    /// Current height of node `id`.
    pub fn height(&self, id: usize) -> Result<usize> {
        Ok(self.node(id)?.snapshot()?.height())
    }

    /// Current flow on edge `index` in its canonical direction.
    pub fn edge_flow(&self, index: usize) -> Result<i64> {
        Ok(self.edge(index)?.flow())
    }

    /// Computes the maximum flow from `source` to `sink` with `workers` threads.
    pub fn compute(&mut self, source: usize, sink: usize, workers: usize) -> Result<i64> {
        let config = PreflowConfig::default().with_workers(workers);
        self.compute_with_stats(source, sink, &config)
            .map(|outcome| outcome.flow)
    }

    /// Computes the maximum flow from the first node to the last one.
    pub fn solve(&mut self, config: &PreflowConfig) -> Result<PreflowOutcome> {
        let sink = self.node_count().checked_sub(1).ok_or(FlowError::InvalidTerminals {
            source_node: 0,
            sink_node: 0,
            node_count: 0,
        })?;
        self.compute_with_stats(0, sink, config)
    }

    /// Computes the maximum flow and returns it with the run's counters.
    ///
    /// Any state left by an earlier run is cleared first, so a graph can be
    /// solved repeatedly.
    pub fn compute_with_stats(
        &mut self,
        source: usize,
        sink: usize,
        config: &PreflowConfig,
    ) -> Result<PreflowOutcome> {
        config.validate()?;
        let node_count = self.node_count();
        if source >= node_count || sink >= node_count || source == sink {
            return Err(FlowError::InvalidTerminals {
                source_node: source,
                sink_node: sink,
                node_count,
            });
        }

        self.check_source_capacity(source)?;
        self.reset()?;
        self.preflow(source, sink, config)
    }

    // Every excess is bounded by what the source sends out, so the run
    // cannot overflow once that total fits.
    fn check_source_capacity(&self, source: usize) -> Result<()> {
        self.nodes[source]
            .adjacency()
            .iter()
            .map(|&index| &self.edges[index])
            .filter(|edge| !edge.is_loop())
            .try_fold(0i64, |total, edge| total.checked_add(edge.capacity()))
            .map(|_| ())
            .ok_or(FlowError::CapacityOverflow { source_node: source })
    }

    fn reset(&mut self) -> Result<()> {
        for node in &self.nodes {
            node.reset(0)?;
        }
        for edge in &self.edges {
            edge.reset();
        }
        self.jobs.store(0, Ordering::Relaxed);
        Ok(())
    }

    /// Runs the algorithm on a freshly reset graph.
    fn preflow(&self, source: usize, sink: usize, config: &PreflowConfig) -> Result<PreflowOutcome> {
        let _span = tracing::debug_span!("preflow", source, sink, workers = config.workers).entered();

        self.nodes[source].lock()?.set_height(self.node_count());
        let pool = Pool::new(config.workers, source, sink);

        let mut saturated = 0;
        for &index in self.nodes[source].adjacency() {
            let edge = &self.edges[index];
            if edge.is_loop() {
                continue;
            }
            let v = edge.other(source);
            let mut pair = self.lock_pair(source, v)?;
            let amount = edge.saturate_from(source);
            let (source_state, v_state) = pair.states_mut();
            source_state.change_excess(-amount);
            v_state.change_excess(amount);
            self.allocate_work_to_next_thread(&pool, v);
            self.unlock_pair(pair);
            saturated += amount;
        }
        tracing::debug!(saturated, queued = self.jobs.load(Ordering::Relaxed), "source saturated");

        let (polls, workers) = thread::scope(|scope| self.run_pool(scope, &pool, source, sink, config))?;

        let flow = self.excess(sink)?;
        let stats = RunStats {
            workers,
            polls,
            jobs: self.jobs.load(Ordering::Relaxed),
        };
        tracing::debug!(flow, pushes = stats.pushes(), relabels = stats.relabels(), "preflow finished");
        Ok(PreflowOutcome { flow, stats })
    }

    /// Starts one thread per worker, waits for termination, cancels and joins.
    fn run_pool<'scope, 'env>(
        &'env self,
        scope: &'scope thread::Scope<'scope, 'env>,
        pool: &'env Pool,
        source: usize,
        sink: usize,
        config: &PreflowConfig,
    ) -> Result<(u64, Vec<WorkerStats>)> {
        let mut handles = Vec::with_capacity(pool.len());
        let mut spawn_error = None;
        for worker in pool.workers() {
            let spawned = thread::Builder::new()
                .name(format!("preflow-worker-{}", worker.index()))
                .spawn_scoped(scope, move || worker.run(self, pool));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    spawn_error = Some(FlowError::Io(err));
                    break;
                }
            }
        }

        let completion = match spawn_error {
            Some(err) => Err(err),
            None => monitor::await_completion(self, pool, &handles, source, sink, config.report_interval()),
        };
        pool.cancel_all();

        let mut stats = Vec::with_capacity(handles.len());
        let mut failure = None;
        for (index, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(Ok(worker_stats)) => {
                    tracing::debug!(
                        worker = index,
                        discharges = worker_stats.discharges,
                        pushes = worker_stats.pushes,
                        relabels = worker_stats.relabels,
                        "worker joined"
                    );
                    stats.push(worker_stats);
                }
                Ok(Err(err)) => {
                    tracing::error!(worker = index, error = %err, "worker failed");
                    failure.get_or_insert(err);
                }
                Err(_) => {
                    tracing::error!(worker = index, "worker panicked");
                    failure.get_or_insert(FlowError::WorkerPanicked { worker: index });
                }
            }
        }

        // A worker's own error explains an early exit better than the monitor can.
        if let Some(err) = failure {
            return Err(err);
        }
        completion.map(|polls| (polls, stats))
    }

    /// Hands `node` to the next worker in round-robin order.
    ///
    /// Source and sink are never queued. Returns `true` if the node was
    /// linked into a queue, `false` if it is a terminal or already queued.
    pub(crate) fn allocate_work_to_next_thread(&self, pool: &Pool, node: usize) -> bool {
        if pool.is_terminal(node) {
            return false;
        }
        let job = self.jobs.fetch_add(1, Ordering::Relaxed) + 1;
        let target = job % pool.len();
        pool.worker(target).add_excess(&self.nodes, node)
    }

    /// Acquires the locks of `u` and `v`, lower id first.
    ///
    /// Self-loops never need a pair lock, so `u == v` is rejected.
    pub fn lock_pair(&self, u: usize, v: usize) -> Result<LockedPair<'_>> {
        if u == v {
            return Err(FlowError::SameNode { node: u });
        }
        let (low, high) = if u < v { (u, v) } else { (v, u) };
        let low_guard = self.node(low)?.lock()?;
        let high_guard = self.node(high)?.lock()?;
        Ok(LockedPair {
            low: low_guard,
            high: high_guard,
            u,
            v,
        })
    }

    /// Releases a pair acquired with [`Graph::lock_pair`], lower id first.
    #[inline]
    pub fn unlock_pair(&self, pair: LockedPair<'_>) {
        drop(pair);
    }

    /// Pushes as much excess as possible from `pair.u()` to `pair.v()` over `edge`.
    ///
    /// Eligible only when `u` is strictly higher than `v`, `u` has positive
    /// excess and `edge` has residual capacity leaving `u`. Returns whether
    /// any flow moved.
    pub fn push(&self, pair: &mut LockedPair<'_>, edge: &Edge) -> bool {
        let (u, v) = (pair.u, pair.v);
        debug_assert_eq!(edge.other(u), v, "edge does not join the locked pair");

        let residual = edge.residual(u);
        let (u_state, v_state) = pair.states_mut();
        if u_state.height() <= v_state.height() || u_state.excess() <= 0 || residual <= 0 {
            return false;
        }

        let amount = u_state.excess().min(residual);
        edge.add_flow_from(u, amount);
        u_state.change_excess(-amount);
        v_state.change_excess(amount);
        tracing::trace!(from = u, to = v, amount, "push");
        true
    }
}

/// Both node locks of a push, held in ascending id order.
///
/// Dropping the pair releases the locks; fields drop in declaration order, so
/// the lower id is released first.
pub struct LockedPair<'a> {
    low: MutexGuard<'a, NodeState>,
    high: MutexGuard<'a, NodeState>,
    u: usize,
    v: usize,
}

impl LockedPair<'_> {
    /// The node flow would leave.
    #[inline]
    pub fn u(&self) -> usize {
        self.u
    }

    /// The node flow would enter.
    #[inline]
    pub fn v(&self) -> usize {
        self.v
    }

    /// State of `u` as seen under the lock.
    pub fn u_state(&self) -> &NodeState {
        if self.u < self.v {
            &self.low
        } else {
            &self.high
        }
    }

    /// State of `v` as seen under the lock.
    pub fn v_state(&self) -> &NodeState {
        if self.u < self.v {
            &self.high
        } else {
            &self.low
        }
    }

    fn states_mut(&mut self) -> (&mut NodeState, &mut NodeState) {
        if self.u < self.v {
            (&mut *self.low, &mut *self.high)
        } else {
            (&mut *self.high, &mut *self.low)
        }
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    fn scenario_a() -> Graph {
        Graph::new(4, [(0, 1, 3), (0, 2, 2), (1, 2, 5), (1, 3, 2), (2, 3, 3)]).unwrap()
    }

    #[test]
    fn test_construction_builds_adjacency_for_both_endpoints() {
        let graph = scenario_a();
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 5);
        assert_eq!(graph.node(0).unwrap().adjacency(), &[0, 1]);
        assert_eq!(graph.node(1).unwrap().adjacency(), &[0, 2, 3]);
        assert_eq!(graph.node(3).unwrap().adjacency(), &[3, 4]);
    }

    #[test]
    fn test_construction_rejects_bad_edges() {
        assert!(matches!(
            Graph::new(3, [(0, 1, 1), (1, 3, 1)]),
            Err(FlowError::NodeOutOfRange { edge: 1, node: 3, node_count: 3 })
        ));
        assert!(matches!(
            Graph::new(3, [(0, 1, -4)]),
            Err(FlowError::NegativeCapacity { edge: 0, capacity: -4 })
        ));
    }

    #[test]
    fn test_lock_pair_maps_states_to_roles() {
        let graph = scenario_a();
        graph.node(2).unwrap().lock().unwrap().change_excess(7);

        let pair = graph.lock_pair(2, 1).unwrap();
        assert_eq!(pair.u(), 2);
        assert_eq!(pair.u_state().excess(), 7);
        assert_eq!(pair.v_state().excess(), 0);
        graph.unlock_pair(pair);

        let pair = graph.lock_pair(1, 2).unwrap();
        assert_eq!(pair.u_state().excess(), 0);
        assert_eq!(pair.v_state().excess(), 7);
    }

    #[test]
    fn test_push_requires_height_excess_and_residual() {
        let graph = scenario_a();
        let edge = graph.edge(2).unwrap(); // 1 -> 2, capacity 5

        graph.node(1).unwrap().lock().unwrap().change_excess(8);
        let mut pair = graph.lock_pair(1, 2).unwrap();
        assert!(!graph.push(&mut pair, edge), "equal heights block the push");
        graph.unlock_pair(pair);

        graph.node(1).unwrap().relabel().unwrap();
        let mut pair = graph.lock_pair(1, 2).unwrap();
        assert!(graph.push(&mut pair, edge));
        assert_eq!(pair.u_state().excess(), 3);
        assert_eq!(pair.v_state().excess(), 5);
        assert_eq!(edge.flow(), 5);

        assert!(!graph.push(&mut pair, edge), "edge is saturated from node 1");
    }

    #[test]
    fn test_push_against_canonical_direction_decrements_flow() {
        let graph = scenario_a();
        let edge = graph.edge(2).unwrap(); // 1 -> 2
        graph.node(2).unwrap().lock().unwrap().change_excess(4);
        graph.node(2).unwrap().relabel().unwrap();

        let mut pair = graph.lock_pair(2, 1).unwrap();
        assert!(graph.push(&mut pair, edge));
        assert_eq!(edge.flow(), -4);
        assert_eq!(pair.v_state().excess(), 4);
    }

    #[test]
    fn test_compute_rejects_invalid_terminals() {
        let mut graph = scenario_a();
        assert!(matches!(
            graph.compute(0, 0, 2),
            Err(FlowError::InvalidTerminals { .. })
        ));
        assert!(matches!(
            graph.compute(0, 4, 2),
            Err(FlowError::InvalidTerminals { .. })
        ));
        assert!(matches!(graph.compute(0, 3, 0), Err(FlowError::NoWorkers)));
    }

    #[test]
    fn test_accessors_reject_unknown_ids() {
        let graph = scenario_a();
        assert!(matches!(graph.node(4), Err(FlowError::UnknownNode { node: 4, node_count: 4 })));
        assert!(matches!(graph.excess(9), Err(FlowError::UnknownNode { node: 9, .. })));
        assert!(matches!(graph.height(4), Err(FlowError::UnknownNode { .. })));
        assert!(matches!(graph.edge(5), Err(FlowError::UnknownEdge { edge: 5, edge_count: 5 })));
        assert!(matches!(graph.edge_flow(7), Err(FlowError::UnknownEdge { .. })));
    }

    #[test]
    fn test_lock_pair_rejects_bad_pairs() {
        let graph = scenario_a();
        assert!(matches!(graph.lock_pair(2, 2), Err(FlowError::SameNode { node: 2 })));
        assert!(matches!(graph.lock_pair(1, 4), Err(FlowError::UnknownNode { node: 4, .. })));
        assert!(matches!(graph.lock_pair(6, 0), Err(FlowError::UnknownNode { node: 6, .. })));

        // nothing stays locked after a rejected request
        let pair = graph.lock_pair(0, 1).unwrap();
        graph.unlock_pair(pair);
    }

    #[test]
    fn test_near_limit_capacities_do_not_overflow() {
        let big = i64::MAX / 2 + 1;
        for workers in [1, 3] {
            let mut graph = Graph::new(3, [(0, 1, big), (1, 2, 1)]).unwrap();
            assert_eq!(graph.compute(0, 2, workers).unwrap(), 1);
            assert_eq!(graph.excess(0).unwrap(), -1);
            assert_eq!(graph.excess(1).unwrap(), 0);
        }

        let mut graph = Graph::new(3, [(0, 1, i64::MAX), (1, 2, i64::MAX), (2, 0, 0)]).unwrap();
        assert_eq!(graph.compute(0, 2, 2).unwrap(), i64::MAX);
    }

    #[test]
    fn test_source_capacity_must_fit_the_flow_type() {
        let mut graph = Graph::new(3, [(0, 1, i64::MAX), (2, 0, 1), (1, 2, 5)]).unwrap();
        assert!(matches!(
            graph.compute(0, 2, 2),
            Err(FlowError::CapacityOverflow { source_node: 0 })
        ));
        // the same network is fine from a source whose edges fit
        assert_eq!(graph.compute(2, 0, 2).unwrap(), 6);
    }

    #[test]
    fn test_source_stays_pinned_at_node_count() {
        let mut graph = scenario_a();
        assert_eq!(graph.compute(0, 3, 2).unwrap(), 5);
        assert_eq!(graph.height(0).unwrap(), 4);
        assert_eq!(graph.excess(0).unwrap(), -5);
        assert_eq!(graph.excess(3).unwrap(), 5);
    }
}
