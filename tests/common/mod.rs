//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;

use preflow::Graph;

/// Sequential Edmonds-Karp over the same edge semantics as the engine: each
/// edge can carry up to its capacity in either direction.
pub fn reference_max_flow(node_count: usize, edges: &[(usize, usize, i64)], source: usize, sink: usize) -> i64 {
    // arcs come in pairs; arc `i ^ 1` is the reverse of arc `i`
    let mut head = Vec::new();
    let mut residual = Vec::new();
    let mut out = vec![Vec::new(); node_count];
    for &(u, v, capacity) in edges {
        if u == v {
            continue;
        }
        out[u].push(head.len());
        head.push(v);
        residual.push(capacity);
        out[v].push(head.len());
        head.push(u);
        residual.push(capacity);
    }

    let mut flow = 0;
    loop {
        let mut prev = vec![usize::MAX; node_count];
        let mut visited = vec![false; node_count];
        visited[source] = true;
        let mut queue = VecDeque::from([source]);
        while let Some(u) = queue.pop_front() {
            if u == sink {
                break;
            }
            for &arc in &out[u] {
                let v = head[arc];
                if visited[v] || residual[arc] == 0 {
                    continue;
                }
                visited[v] = true;
                prev[v] = arc;
                queue.push_back(v);
            }
        }

        if !visited[sink] {
            return flow;
        }

        let mut delta = i64::MAX;
        let mut v = sink;
        while v != source {
            let arc = prev[v];
            delta = delta.min(residual[arc]);
            v = head[arc ^ 1];
        }

        let mut v = sink;
        while v != source {
            let arc = prev[v];
            residual[arc] -= delta;
            residual[arc ^ 1] += delta;
            v = head[arc ^ 1];
        }
        flow += delta;
    }
}

/// Asserts every post-run invariant the engine promises.
pub fn assert_valid_flow(graph: &Graph, source: usize, sink: usize, flow: i64) {
    for id in 0..graph.node_count() {
        let excess = graph.excess(id).unwrap();
        if id == source {
            assert_eq!(excess, -flow, "source must have sent exactly the flow value");
        } else if id == sink {
            assert_eq!(excess, flow, "sink excess is the flow value");
        } else {
            assert_eq!(excess, 0, "node {id} kept excess {excess}");
        }
        assert!(!graph.node(id).unwrap().is_queued(), "node {id} left in a queue");
    }

    let mut balance = vec![0i64; graph.node_count()];
    for (index, edge) in graph.edges().iter().enumerate() {
        let f = graph.edge_flow(index).unwrap();
        balance[edge.u()] -= f;
        balance[edge.v()] += f;
        assert!(
            -edge.capacity() <= f && f <= edge.capacity(),
            "edge {index} flow {f} exceeds capacity {}",
            edge.capacity()
        );
    }

    for (id, net) in balance.into_iter().enumerate() {
        assert_eq!(net, graph.excess(id).unwrap(), "edge flows disagree with excess of node {id}");
    }

    assert_eq!(graph.height(source).unwrap(), graph.node_count());
}
