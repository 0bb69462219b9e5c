//! Reader for the plain-text network format.
//!
//! ```text
//! n m c p
//! u v capacity    (m times)
//! ```
//!
//! Tokens are whitespace separated and may be split across lines freely.
//! `c` and `p` are legacy fields and are ignored. Node indices are 0-based;
//! by convention node `0` is the source and node `n - 1` the sink.

use std::io::{BufRead, Read};
use std::str::{FromStr, SplitWhitespace};

use crate::{
    error::{FlowError, Result},
    graph::Graph,
};

struct Tokens<'a> {
    inner: SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.split_whitespace(),
        }
    }

    fn next<T: FromStr>(&mut self, what: &str) -> Result<T> {
        let token = self
            .inner
            .next()
            .ok_or_else(|| FlowError::Parse(format!("unexpected end of input, expected {what}")))?;
        token
            .parse()
            .map_err(|_| FlowError::Parse(format!("expected {what}, found `{token}`")))
    }
}

/// Parses a graph from the text format.
///
/// Fails on missing or non-integer tokens, on negative node indices, and with
/// the graph's own validation errors for out-of-range nodes, negative
/// capacities or a node count that cannot be allocated.
pub fn parse_graph(text: &str) -> Result<Graph> {
    let mut tokens = Tokens::new(text);
    let node_count: usize = tokens.next("node count")?;
    let edge_count: usize = tokens.next("edge count")?;
    let _: i64 = tokens.next("legacy field c")?;
    let _: i64 = tokens.next("legacy field p")?;

    // `edge_count` is untrusted; the edge list only grows as triples arrive.
    let mut edges = Vec::new();
    for index in 0..edge_count {
        let u: usize = tokens.next(&format!("tail of edge {index}"))?;
        let v: usize = tokens.next(&format!("head of edge {index}"))?;
        let capacity: i64 = tokens.next(&format!("capacity of edge {index}"))?;
        edges.push((u, v, capacity));
    }

    let graph = Graph::new(node_count, edges)?;
    tracing::debug!(nodes = graph.node_count(), edges = graph.edge_count(), "graph read");
    Ok(graph)
}

/// Reads the whole stream and parses it with [`parse_graph`].
pub fn read_graph<R: BufRead>(mut reader: R) -> Result<Graph> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    parse_graph(&text)
}
