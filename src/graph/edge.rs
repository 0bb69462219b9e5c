//! Capacitated edges carrying a signed flow.
//!
//! The sign of `flow` is relative to the canonical `u -> v` direction fixed at
//! construction: seen from `u` the edge carries `flow`, seen from `v` it
//! carries `-flow`. Either endpoint may push up to `capacity` units through
//! the edge, so `-capacity <= flow <= capacity` at all times.

use core::fmt;

use crate::sync::{AtomicI64, Ordering};

/// An edge between two nodes.
///
/// Endpoints and capacity never change. `flow` is only written while the
/// locks of both endpoints are held, so relaxed atomics are enough: the node
/// locks order every write against every later read.
pub struct Edge {
    u: usize,
    v: usize,
    capacity: i64,
    flow: AtomicI64,
}

impl Edge {
    pub(crate) fn new(u: usize, v: usize, capacity: i64) -> Self {
        debug_assert!(capacity >= 0, "capacity must be validated before construction");
        Self {
            u,
            v,
            capacity,
            flow: AtomicI64::new(0),
        }
    }

    /// The canonical tail of the edge.
    #[inline]
    pub fn u(&self) -> usize {
        self.u
    }

    /// The canonical head of the edge.
    #[inline]
    pub fn v(&self) -> usize {
        self.v
    }

    /// The capacity of the edge.
    #[inline]
    pub fn capacity(&self) -> i64 {
        self.capacity
    }

    /// The current flow in the canonical `u -> v` direction.
    #[inline]
    pub fn flow(&self) -> i64 {
        self.flow.load(Ordering::Relaxed)
    }

    /// Returns `true` when both endpoints are the same node.
    #[inline]
    pub fn is_loop(&self) -> bool {
        self.u == self.v
    }

    /// The endpoint opposite to `node`.
    #[inline]
    pub fn other(&self, node: usize) -> usize {
        if node == self.u {
            self.v
        } else {
            self.u
        }
    }

    /// Flow leaving `node` through this edge.
    #[inline]
    pub fn perspective_flow(&self, node: usize) -> i64 {
        if node == self.u {
            self.flow()
        } else {
            -self.flow()
        }
    }

    /// Capacity still available for pushing out of `node`.
    ///
    /// The true value can reach `2 * capacity`; it saturates at `i64::MAX`,
    /// which no excess can exceed, so `min(excess, residual)` stays exact.
    #[inline]
    pub fn residual(&self, node: usize) -> i64 {
        self.capacity.saturating_sub(self.perspective_flow(node))
    }

    /// Moves `amount` units out of `from` through this edge.
    ///
    /// Callers hold both endpoint locks and have checked `amount <= residual(from)`.
    pub(crate) fn add_flow_from(&self, from: usize, amount: i64) {
        debug_assert!(amount <= self.residual(from));
        let delta = if from == self.u { amount } else { -amount };
        self.flow.fetch_add(delta, Ordering::Relaxed);
        debug_assert!(self.flow().abs() <= self.capacity);
    }

    /// Fills the edge to capacity in the direction leaving `from`, returning
    /// the amount that now departs `from`.
    ///
    /// Only used while saturating the source, before any flow has moved.
    pub(crate) fn saturate_from(&self, from: usize) -> i64 {
        let flow = if from == self.u { self.capacity } else { -self.capacity };
        self.flow.store(flow, Ordering::Relaxed);
        self.capacity
    }

    pub(crate) fn reset(&self) {
        self.flow.store(0, Ordering::Relaxed);
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Edge")
            .field("u", &self.u)
            .field("v", &self.v)
            .field("capacity", &self.capacity)
            .field("flow", &self.flow())
            .finish()
    }
}
