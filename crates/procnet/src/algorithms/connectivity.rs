//! Connectivity and structural correctness checks for directly-follows
//! graphs.
//!
//! The filtering algorithms in this crate require a *sound* DFG: exactly one
//! activity without incoming arcs (the source), exactly one without outgoing
//! arcs (the sink), and every activity on some directed source-to-sink path.
//! [`validate_dfg`] checks those properties and names the first violation.

use std::collections::{BTreeSet, VecDeque};

use crate::models::dfg::DirectlyFollowsGraph;
use crate::{ProcnetError, Result};

/// Check weak connectivity: breadth-first expansion from the lowest-id
/// activity following arcs in both directions reaches every activity.
///
/// The empty graph counts as connected.
pub fn is_weakly_connected(dfg: &DirectlyFollowsGraph) -> bool {
    let Some(seed) = dfg.activity_ids().next() else {
        return true;
    };
    let reached = bidirectional_bfs(dfg, seed);
    reached.len() == dfg.activity_count()
}

/// Validate the soundness invariant required by the DFG optimizer.
///
/// Errors name the violated property: no unique source, no unique sink, an
/// activity unreachable from the source, or an activity that cannot reach
/// the sink.
pub fn validate_dfg(dfg: &DirectlyFollowsGraph) -> Result<()> {
    if dfg.is_empty() {
        return Err(ProcnetError::EmptyModel);
    }

    let sources = dfg.sources();
    if sources.len() != 1 {
        return Err(ProcnetError::NoUniqueSource {
            found: sources.iter().map(|a| a.id.clone()).collect(),
        });
    }
    let sinks = dfg.sinks();
    if sinks.len() != 1 {
        return Err(ProcnetError::NoUniqueSink {
            found: sinks.iter().map(|a| a.id.clone()).collect(),
        });
    }

    let from_source = reachable(dfg, &sources[0].id, Direction::Forward);
    if let Some(id) = first_missing(dfg, &from_source) {
        return Err(ProcnetError::UnreachableFromSource { id });
    }

    let to_sink = reachable(dfg, &sinks[0].id, Direction::Backward);
    if let Some(id) = first_missing(dfg, &to_sink) {
        return Err(ProcnetError::CannotReachSink { id });
    }

    Ok(())
}

/// Traversal direction over the arcs of a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    /// Follow arcs source to target.
    Forward,
    /// Follow arcs target to source.
    Backward,
}

/// Activities reachable from `start` following arcs in one direction.
pub(crate) fn reachable(
    dfg: &DirectlyFollowsGraph,
    start: &str,
    direction: Direction,
) -> BTreeSet<String> {
    let mut reached = BTreeSet::new();
    if !dfg.contains_activity(start) {
        return reached;
    }
    reached.insert(start.to_string());
    let mut queue = VecDeque::from([start.to_string()]);
    while let Some(current) = queue.pop_front() {
        for arc in dfg.arcs() {
            let next = match direction {
                Direction::Forward if arc.source == current => &arc.target,
                Direction::Backward if arc.target == current => &arc.source,
                _ => continue,
            };
            if reached.insert(next.clone()) {
                queue.push_back(next.clone());
            }
        }
    }
    reached
}

fn bidirectional_bfs(dfg: &DirectlyFollowsGraph, seed: &str) -> BTreeSet<String> {
    let mut reached = BTreeSet::from([seed.to_string()]);
    let mut queue = VecDeque::from([seed.to_string()]);
    while let Some(current) = queue.pop_front() {
        for arc in dfg.arcs() {
            let next = if arc.source == current {
                &arc.target
            } else if arc.target == current {
                &arc.source
            } else {
                continue;
            };
            if reached.insert(next.clone()) {
                queue.push_back(next.clone());
            }
        }
    }
    reached
}

fn first_missing(dfg: &DirectlyFollowsGraph, reached: &BTreeSet<String>) -> Option<String> {
    dfg.activity_ids()
        .find(|id| !reached.contains(*id))
        .cloned()
}
