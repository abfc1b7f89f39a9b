//! Rooted maximum/minimum spanning arborescences (Edmonds' algorithm).
//!
//! Given a root, the maximum spanning arborescence selects for every other
//! activity exactly one incoming arc so that the selection forms a tree of
//! root-to-activity paths with maximal total weight. Cycles induced by the
//! greedy per-activity selection are contracted into synthetic nodes with
//! adjusted entering weights, the algorithm recurses on the contracted
//! graph, and a LIFO stack of contraction records drives the re-expansion.
//!
//! The minimum variant negates all weights on entry; returned arcs are the
//! original graph arcs either way.

use std::collections::HashMap;

use tracing::debug;

use crate::models::activity::WeightedArc;
use crate::models::dfg::DirectlyFollowsGraph;
use crate::{ProcnetError, Result};

/// A working edge over the contraction arena. The id stays stable across
/// rewrites and indexes the original arc list.
#[derive(Debug, Clone)]
struct Edge {
    src: usize,
    dst: usize,
    weight: f64,
    id: usize,
}

/// One cycle contraction: the synthetic node replacing the cycle, the
/// selected arcs that formed the cycle, and the pre-rewrite version of every
/// arc adjusted at this level, keyed by stable arc id.
#[derive(Debug)]
struct Contraction {
    synthetic: usize,
    cycle_edges: Vec<Edge>,
    history: HashMap<usize, Edge>,
}

/// Compute the maximum-weight spanning arborescence rooted at `root`.
///
/// Returns the selected arcs of the input graph. Activities unreachable
/// from the root are absent from the selection; for graphs passing
/// [`validate_dfg`](crate::algorithms::connectivity::validate_dfg) with
/// `root` as the unique source, the selection spans every other activity.
pub fn maximum_arborescence(
    dfg: &DirectlyFollowsGraph,
    root: &str,
) -> Result<Vec<WeightedArc>> {
    arborescence(dfg, root, false)
}

/// Compute the minimum-weight spanning arborescence rooted at `root`.
///
/// Implemented by negating every weight, computing the maximum
/// arborescence, and returning the original arcs.
pub fn minimum_arborescence(
    dfg: &DirectlyFollowsGraph,
    root: &str,
) -> Result<Vec<WeightedArc>> {
    arborescence(dfg, root, true)
}

fn arborescence(dfg: &DirectlyFollowsGraph, root: &str, minimize: bool) -> Result<Vec<WeightedArc>> {
    if !dfg.contains_activity(root) {
        return Err(ProcnetError::UnknownActivity {
            id: root.to_string(),
        });
    }

    let ids: Vec<&str> = dfg.activity_ids().map(String::as_str).collect();
    let index_of: HashMap<&str, usize> = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
    let root_index = index_of[root];

    let mut edges: Vec<Edge> = dfg
        .arcs()
        .iter()
        .enumerate()
        .filter(|(_, arc)| arc.target != root && !arc.is_self_loop())
        .map(|(id, arc)| Edge {
            src: index_of[arc.source.as_str()],
            dst: index_of[arc.target.as_str()],
            weight: if minimize { -arc.weight } else { arc.weight },
            id,
        })
        .collect();

    let mut next_node = ids.len();
    let mut stack: Vec<Contraction> = Vec::new();

    // Contract until the greedy selection is acyclic.
    let selected = loop {
        let best = select_best_incoming(&edges, root_index, next_node);
        match find_selected_cycle(&best, next_node) {
            None => break best,
            Some(cycle_nodes) => {
                let contraction =
                    contract_cycle(&mut edges, &best, &cycle_nodes, next_node);
                debug!(
                    synthetic = contraction.synthetic,
                    cycle_len = cycle_nodes.len(),
                    "contracted arborescence cycle"
                );
                stack.push(contraction);
                next_node += 1;
            }
        }
    };

    let mut selection: Vec<Edge> = selected.into_values().collect();

    // Re-expand in reverse contraction order.
    while let Some(contraction) = stack.pop() {
        for edge in selection.iter_mut() {
            if let Some(original) = contraction.history.get(&edge.id) {
                *edge = original.clone();
            }
        }
        let cycle_targets: Vec<usize> = contraction.cycle_edges.iter().map(|e| e.dst).collect();
        // The one cycle node entered from outside keeps its external arc;
        // its internal arc is the one left out.
        let entered_from_outside = selection
            .iter()
            .find(|e| cycle_targets.contains(&e.dst))
            .map(|e| e.dst);
        let skip_target = entered_from_outside.unwrap_or_else(|| {
            // Unreachable cycle: drop the lightest internal arc instead.
            contraction
                .cycle_edges
                .iter()
                .min_by(|a, b| a.weight.total_cmp(&b.weight))
                .map(|e| e.dst)
                .expect("contracted cycle has at least one edge")
        });
        for edge in &contraction.cycle_edges {
            if edge.dst != skip_target {
                selection.push(edge.clone());
            }
        }
    }

    let mut arcs: Vec<WeightedArc> = selection
        .into_iter()
        .map(|edge| dfg.arcs()[edge.id].clone())
        .collect();
    arcs.sort_by(|a, b| (&a.source, &a.target).cmp(&(&b.source, &b.target)));
    Ok(arcs)
}

/// Pick the maximum-weight incoming edge for every non-root node. Ties are
/// broken towards the lowest arc id, keeping the selection deterministic.
fn select_best_incoming(edges: &[Edge], root: usize, node_count: usize) -> HashMap<usize, Edge> {
    let mut best: Vec<Option<&Edge>> = vec![None; node_count];
    for edge in edges {
        if edge.dst == root {
            continue;
        }
        match best[edge.dst] {
            Some(current) if current.weight >= edge.weight => {}
            _ => best[edge.dst] = Some(edge),
        }
    }
    best.into_iter()
        .flatten()
        .map(|edge| (edge.dst, edge.clone()))
        .collect()
}

/// Find one cycle in the functional graph of selected incoming edges.
fn find_selected_cycle(selected: &HashMap<usize, Edge>, node_count: usize) -> Option<Vec<usize>> {
    let parent: HashMap<usize, usize> = selected
        .iter()
        .map(|(&node, edge)| (node, edge.src))
        .collect();
    let mut state = vec![0u8; node_count]; // 0 unvisited, 1 on walk, 2 done
    for start in 0..node_count {
        if state[start] != 0 {
            continue;
        }
        let mut walk = Vec::new();
        let mut current = start;
        loop {
            state[current] = 1;
            walk.push(current);
            let Some(&next) = parent.get(&current) else {
                break;
            };
            match state[next] {
                0 => current = next,
                1 => {
                    // Trim the walk to the loop itself.
                    let pos = walk
                        .iter()
                        .position(|&n| n == next)
                        .expect("on-walk node is recorded in the walk");
                    return Some(walk[pos..].to_vec());
                }
                _ => break,
            }
        }
        for node in walk {
            state[node] = 2;
        }
    }
    None
}

/// Replace a selected cycle by a synthetic node, rewriting boundary edges.
///
/// Entering edges get `new = old + min_cycle − replaced_cycle_arc`, leaving
/// edges keep their weight and source the synthetic node, internal edges are
/// dropped. Pre-rewrite edges are recorded in the history map.
fn contract_cycle(
    edges: &mut Vec<Edge>,
    selected: &HashMap<usize, Edge>,
    cycle_nodes: &[usize],
    synthetic: usize,
) -> Contraction {
    let in_cycle = |node: usize| cycle_nodes.contains(&node);
    let cycle_edges: Vec<Edge> = cycle_nodes
        .iter()
        .map(|node| selected[node].clone())
        .collect();
    let min_cycle_weight = cycle_edges
        .iter()
        .map(|e| e.weight)
        .fold(f64::INFINITY, f64::min);
    let replaced_weight: HashMap<usize, f64> =
        cycle_edges.iter().map(|e| (e.dst, e.weight)).collect();

    let mut history = HashMap::new();
    let mut rewritten = Vec::with_capacity(edges.len());
    for edge in edges.drain(..) {
        match (in_cycle(edge.src), in_cycle(edge.dst)) {
            (true, true) => {} // internal, dropped
            (false, true) => {
                let adjusted = edge.weight + min_cycle_weight - replaced_weight[&edge.dst];
                history.insert(edge.id, edge.clone());
                rewritten.push(Edge {
                    src: edge.src,
                    dst: synthetic,
                    weight: adjusted,
                    id: edge.id,
                });
            }
            (true, false) => {
                history.insert(edge.id, edge.clone());
                rewritten.push(Edge {
                    src: synthetic,
                    dst: edge.dst,
                    weight: edge.weight,
                    id: edge.id,
                });
            }
            (false, false) => rewritten.push(edge),
        }
    }
    *edges = rewritten;

    Contraction {
        synthetic,
        cycle_edges,
        history,
    }
}
