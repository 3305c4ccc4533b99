//! Cycle detection, topological order, and extraction batches.

use crate::graph::DependencyGraph;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Node ids that may be processed concurrently.
pub type ExtractionBatch = Vec<String>;

/// Hard-dependency cycle. Fatal for the run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("dependency cycle detected: {} (declared in {})", render_cycle(.cycle), .meta_files.join(", "))]
pub struct CycleError {
    /// Node ids in traversal order; the edge from the last back to the first
    /// closes the cycle.
    pub cycle: Vec<String>,
    /// Meta files declaring the cycle members, in the same order.
    pub meta_files: Vec<String>,
}

fn render_cycle(cycle: &[String]) -> String {
    let mut parts: Vec<&str> = cycle.iter().map(String::as_str).collect();
    if let Some(first) = cycle.first() {
        parts.push(first);
    }
    parts.join(" -> ")
}

/// Topological order and parallel batches of an acyclic graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub order: Vec<String>,
    pub batches: Vec<ExtractionBatch>,
}

impl Resolution {
    /// Batch index of `id`, if the node is in the graph.
    pub fn batch_of(&self, id: &str) -> Option<usize> {
        self.batches
            .iter()
            .position(|batch| batch.iter().any(|member| member == id))
    }

    pub fn batch_index(&self) -> BTreeMap<&str, usize> {
        self.batches
            .iter()
            .enumerate()
            .flat_map(|(idx, batch)| batch.iter().map(move |id| (id.as_str(), idx)))
            .collect()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Find a hard-dependency cycle, if any.
///
/// Roots and neighbours are visited in id order, so the reported cycle is
/// stable across runs.
pub fn detect_cycle(graph: &DependencyGraph) -> Option<CycleError> {
    let mut color = vec![Color::White; graph.len()];
    // (node, next edge to follow)
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..graph.len() {
        if color[root] != Color::White {
            continue;
        }
        color[root] = Color::Gray;
        stack.push((root, 0));

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            let edges = graph.hard_edges(node);
            if frame.1 >= edges.len() {
                color[node] = Color::Black;
                stack.pop();
                continue;
            }
            let dep = edges[frame.1];
            frame.1 += 1;
            match color[dep] {
                Color::White => {
                    color[dep] = Color::Gray;
                    stack.push((dep, 0));
                }
                Color::Gray => {
                    let start = stack
                        .iter()
                        .position(|&(idx, _)| idx == dep)
                        .unwrap_or(0);
                    let members = &stack[start..];
                    return Some(CycleError {
                        cycle: members
                            .iter()
                            .map(|&(idx, _)| graph.id_at(idx).to_string())
                            .collect(),
                        meta_files: members
                            .iter()
                            .map(|&(idx, _)| graph.meta_file_at(idx).to_string())
                            .collect(),
                    });
                }
                Color::Black => {}
            }
        }
    }
    None
}

/// Resolve the graph into a topological order and extraction batches.
///
/// A node is emitted only after all of its hard dependencies. Among nodes
/// that are ready, one whose soft dependencies are already emitted goes
/// first; remaining ties fall back to id order.
pub fn resolve(graph: &DependencyGraph) -> Result<Resolution, CycleError> {
    if let Some(cycle) = detect_cycle(graph) {
        return Err(cycle);
    }

    let n = graph.len();
    let mut pending: Vec<usize> = (0..n).map(|idx| graph.hard_edges(idx).len()).collect();
    let mut ready: BTreeSet<usize> = (0..n).filter(|&idx| pending[idx] == 0).collect();
    let mut emitted = vec![false; n];
    let mut batch = vec![0usize; n];
    let mut order_idx = Vec::with_capacity(n);

    while !ready.is_empty() {
        let pick = ready
            .iter()
            .copied()
            .find(|&idx| graph.soft_edges(idx).iter().all(|&soft| emitted[soft]))
            .or_else(|| ready.first().copied());
        let Some(node) = pick else { break };
        ready.remove(&node);
        emitted[node] = true;
        order_idx.push(node);

        batch[node] = graph
            .hard_edges(node)
            .iter()
            .map(|&dep| batch[dep] + 1)
            .max()
            .unwrap_or(0);

        for &dependent in graph.dependents_of(node) {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    let mut batches: Vec<ExtractionBatch> = Vec::new();
    let mut order = Vec::with_capacity(order_idx.len());
    for idx in order_idx {
        let level = batch[idx];
        if batches.len() <= level {
            batches.resize_with(level + 1, Vec::new);
        }
        let id = graph.id_at(idx).to_string();
        batches[level].push(id.clone());
        order.push(id);
    }

    tracing::debug!(nodes = order.len(), batches = batches.len(), "resolved dependency graph");
    Ok(Resolution { order, batches })
}
