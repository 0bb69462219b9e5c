//! Nodes: a lock-protected height/excess pair plus queue linkage.

use crate::{
    error::{FlowError, Result},
    sync::{AtomicBool, AtomicUsize, Mutex, MutexGuard, Ordering},
};

/// Sentinel for "no successor" in the intrusive active-queue links.
pub(crate) const NIL: usize = usize::MAX;

/// The mutable label of a node, guarded by the node's lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeState {
    height: usize,
    excess: i64,
}

impl NodeState {
    /// The height label. Never decreases during a run.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Inflow minus outflow.
    #[inline]
    pub fn excess(&self) -> i64 {
        self.excess
    }

    /// Adjusts the excess by `delta`.
    ///
    /// The caller holds the node's lock (that is what `&mut` here means);
    /// nothing else is checked.
    #[inline]
    pub(crate) fn change_excess(&mut self, delta: i64) {
        self.excess += delta;
    }

    /// Raises the height by exactly one, returning the new height.
    #[inline]
    pub(crate) fn relabel(&mut self) -> usize {
        self.height += 1;
        self.height
    }

    #[inline]
    pub(crate) fn set_height(&mut self, height: usize) {
        self.height = height;
    }
}

/// A node of the flow network.
///
/// `adjacency` lists the indices of every incident edge in input order and is
/// fixed once the graph is built. `in_queue` and `next` belong to the active
/// queue that currently holds the node; see `concurrency::active_queue`.
pub struct Node {
    id: usize,
    state: Mutex<NodeState>,
    adjacency: Vec<usize>,
    in_queue: AtomicBool,
    next: AtomicUsize,
}

impl Node {
    pub(crate) fn new(id: usize, adjacency: Vec<usize>) -> Self {
        Self {
            id,
            state: Mutex::new(NodeState::default()),
            adjacency,
            in_queue: AtomicBool::new(false),
            next: AtomicUsize::new(NIL),
        }
    }

    /// Stable index of the node; also its rank in the lock order.
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Indices of the edges incident to this node.
    #[inline]
    pub fn adjacency(&self) -> &[usize] {
        &self.adjacency
    }

    /// Acquires this node's lock.
    ///
    /// Crate code that needs two nodes goes through `Graph::lock_pair`
    /// instead; locking a single node is reserved for one-node operations.
    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, NodeState>> {
        self.state
            .lock()
            .map_err(|_| FlowError::Poisoned { node: self.id })
    }

    /// Copies out the current height and excess.
    pub fn snapshot(&self) -> Result<NodeState> {
        self.lock().map(|state| *state)
    }

    /// Raises the height by one under the node's own lock.
    pub fn relabel(&self) -> Result<usize> {
        let height = self.lock()?.relabel();
        tracing::trace!(node = self.id, height, "relabel");
        Ok(height)
    }

    /// Returns `true` while a reference to this node sits in some worker queue.
    #[inline]
    pub fn is_queued(&self) -> bool {
        self.in_queue.load(Ordering::Acquire)
    }

    /// Claims queue membership. Returns `false` if some queue already holds the node.
    #[inline]
    pub(crate) fn try_mark_queued(&self) -> bool {
        !self.in_queue.swap(true, Ordering::AcqRel)
    }

    #[inline]
    pub(crate) fn clear_queued(&self) {
        self.in_queue.store(false, Ordering::Release);
    }

    #[inline]
    pub(crate) fn next_in_queue(&self) -> usize {
        self.next.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn set_next_in_queue(&self, next: usize) {
        self.next.store(next, Ordering::Relaxed);
    }

    pub(crate) fn reset(&self, height: usize) -> Result<()> {
        let mut state = self.lock()?;
        *state = NodeState::default();
        state.set_height(height);
        drop(state);
        self.clear_queued();
        self.set_next_in_queue(NIL);
        Ok(())
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn test_relabel_increments_by_one() {
        let node = Node::new(3, vec![0, 1]);
        assert_eq!(node.relabel().unwrap(), 1);
        assert_eq!(node.relabel().unwrap(), 2);
        assert_eq!(node.snapshot().unwrap().height(), 2);
    }

    #[test]
    fn test_change_excess_under_lock() {
        let node = Node::new(0, Vec::new());
        {
            let mut state = node.lock().unwrap();
            state.change_excess(5);
            state.change_excess(-2);
        }
        assert_eq!(node.snapshot().unwrap().excess(), 3);
    }

    #[test]
    fn test_queue_mark_is_exclusive() {
        let node = Node::new(1, Vec::new());
        assert!(node.try_mark_queued());
        assert!(!node.try_mark_queued());
        assert!(node.is_queued());
        node.clear_queued();
        assert!(node.try_mark_queued());
    }

    #[test]
    fn test_reset_restores_labels() {
        let node = Node::new(2, Vec::new());
        {
            let mut state = node.lock().unwrap();
            state.change_excess(9);
            state.relabel();
        }
        node.try_mark_queued();
        node.reset(7).unwrap();
        let state = node.snapshot().unwrap();
        assert_eq!(state.height(), 7);
        assert_eq!(state.excess(), 0);
        assert!(!node.is_queued());
    }
}
