//! The per-worker FIFO of active nodes.
//!
//! An intrusive singly-linked list threaded through `Node::next`, guarded by
//! one mutex per queue, with a condition variable for cross-thread handoff.
//! A node sits in at most one queue at a time: membership is claimed through
//! the node's `in_queue` flag before it is linked in, and released only when
//! the owning worker retires it.
//!
//! Lock order: a thread may take a queue lock while holding node locks, never
//! the other way round.

use std::sync::PoisonError;

use crate::{
    graph::node::{Node, NIL},
    sync::{Condvar, Mutex, MutexGuard},
};

struct QueueState {
    head: usize,
    tail: usize,
    len: usize,
    cancelled: bool,
}

/// A blocking FIFO of node indices with idempotent insertion.
pub(crate) struct ActiveQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl ActiveQueue {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                head: NIL,
                tail: NIL,
                len: 0,
                cancelled: false,
            }),
            available: Condvar::new(),
        }
    }

    // The critical sections below only relink indices, so a poisoned queue
    // lock still guards a consistent list.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `id` and wakes the owner if it is waiting.
    ///
    /// Returns `false` without touching the queue when the node already
    /// belongs to a queue (this one or another).
    pub(crate) fn push(&self, nodes: &[Node], id: usize) -> bool {
        let node = &nodes[id];
        if !node.try_mark_queued() {
            return false;
        }
        node.set_next_in_queue(NIL);

        let mut state = self.lock();
        if state.tail == NIL {
            state.head = id;
        } else {
            nodes[state.tail].set_next_in_queue(id);
        }
        state.tail = id;
        state.len += 1;
        drop(state);

        self.available.notify_one();
        true
    }

    /// Blocks until the queue has a head, returning it without unlinking it.
    ///
    /// Cancellation is only observed here, and only once the queue is empty:
    /// returns `None` when cancelled with nothing left to process.
    pub(crate) fn wait_head(&self) -> Option<usize> {
        let mut state = self.lock();
        loop {
            if state.head != NIL {
                return Some(state.head);
            }
            if state.cancelled {
                return None;
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Unlinks the head, which must be `id`, and releases its membership.
    ///
    /// Called with `id`'s node lock held so no push into the node can slip
    /// between the caller's drained-check and the flag being cleared.
    pub(crate) fn retire_head(&self, nodes: &[Node], id: usize) {
        let node = &nodes[id];
        let mut state = self.lock();
        debug_assert_eq!(state.head, id, "only the head can be retired");

        let next = node.next_in_queue();
        state.head = next;
        if next == NIL {
            state.tail = NIL;
        }
        state.len -= 1;
        drop(state);

        node.set_next_in_queue(NIL);
        node.clear_queued();
    }

    /// Requests that the owner exit once its queue is empty.
    pub(crate) fn cancel(&self) {
        self.lock().cancelled = true;
        self.available.notify_all();
    }

    /// Number of nodes currently linked in.
    pub(crate) fn len(&self) -> usize {
        self.lock().len
    }
}


#[cfg(all(test, loom))]
mod loom_tests {
    use super::*;
    use loom::sync::Arc;
    use loom::thread;

    #[test]
    fn test_handoff_and_cancel_never_lose_a_wakeup() {
        loom::model(|| {
            let nodes: Arc<Vec<Node>> = Arc::new((0..3).map(|i| Node::new(i, Vec::new())).collect());
            let queue = Arc::new(ActiveQueue::new());

            let consumer = {
                let nodes = Arc::clone(&nodes);
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    let mut processed = 0;
                    while let Some(id) = queue.wait_head() {
                        queue.retire_head(&nodes, id);
                        processed += 1;
                    }
                    processed
                })
            };

            let producer = {
                let nodes = Arc::clone(&nodes);
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    queue.push(&nodes, 1);
                    queue.push(&nodes, 1);
                })
            };

            queue.push(&nodes, 2);
            producer.join().unwrap();
            queue.cancel();

            let processed = consumer.join().unwrap();
            assert!((2..=3).contains(&processed));
            assert_eq!(queue.len(), 0);
            assert!(nodes.iter().all(|n| !n.is_queued()));
        });
    }
}
