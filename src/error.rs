//! Failure conditions of graph construction and of a preflow run.

use thiserror::Error;

/// Every way building a network or computing its flow can fail.
///
/// Construction problems (`NodeOutOfRange`, `NegativeCapacity`,
/// `GraphTooLarge`, `Parse`, `Io`) surface before any worker thread exists. The remaining variants describe a
/// run that could not be completed and never carry a partial flow value.
#[derive(Debug, Error)]
pub enum FlowError {
    /// An edge names a node index outside `0..node_count`.
    #[error("edge {edge} references node {node}, but the graph has {node_count} nodes")]
    NodeOutOfRange {
        /// Position of the offending edge in input order.
        edge: usize,
        /// The out-of-range node index.
        node: usize,
        /// Number of nodes in the graph.
        node_count: usize,
    },

    /// An edge was declared with a capacity below zero.
    #[error("edge {edge} has negative capacity {capacity}")]
    NegativeCapacity {
        /// Position of the offending edge in input order.
        edge: usize,
        /// The declared capacity.
        capacity: i64,
    },

    /// The graph cannot be allocated for the announced node count.
    #[error("cannot allocate a graph of {node_count} nodes")]
    GraphTooLarge {
        /// The requested number of nodes.
        node_count: usize,
    },

    /// The capacities leaving the source do not fit the flow type.
    #[error("total capacity incident to source {source_node} overflows a 64-bit flow")]
    CapacityOverflow {
        /// The requested source node.
        source_node: usize,
    },

    /// A node index passed to an accessor is outside `0..node_count`.
    #[error("node {node} does not exist in a graph of {node_count} nodes")]
    UnknownNode {
        /// The requested node index.
        node: usize,
        /// Number of nodes in the graph.
        node_count: usize,
    },

    /// An edge index passed to an accessor is outside `0..edge_count`.
    #[error("edge {edge} does not exist in a graph of {edge_count} edges")]
    UnknownEdge {
        /// The requested edge index.
        edge: usize,
        /// Number of edges in the graph.
        edge_count: usize,
    },

    /// A pair lock was requested for a node against itself.
    #[error("cannot lock node {node} against itself")]
    SameNode {
        /// The node named twice.
        node: usize,
    },

    /// Source or sink is out of range, or both name the same node.
    #[error("invalid terminals: source {source_node}, sink {sink_node} in a graph of {node_count} nodes")]
    InvalidTerminals {
        /// Requested source node.
        source_node: usize,
        /// Requested sink node.
        sink_node: usize,
        /// Number of nodes in the graph.
        node_count: usize,
    },

    /// A run was requested with an empty worker pool.
    #[error("at least one worker thread is required")]
    NoWorkers,

    /// The input stream does not follow the `n m c p (u v cap)*` layout.
    #[error("malformed input: {0}")]
    Parse(String),

    /// Reading input or spawning a worker thread failed.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration document could not be decoded.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// A node lock was poisoned because a worker panicked while holding it.
    #[error("lock of node {node} was poisoned")]
    Poisoned {
        /// The node whose lock was poisoned.
        node: usize,
    },

    /// A worker thread panicked.
    #[error("worker {worker} panicked")]
    WorkerPanicked {
        /// Index of the worker in the pool.
        worker: usize,
    },

    /// A worker thread returned before the run was cancelled.
    #[error("worker {worker} exited before the flow was complete")]
    WorkerExited {
        /// Index of the worker in the pool.
        worker: usize,
    },
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, FlowError>;
