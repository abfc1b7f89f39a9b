//! Cycle detection, extraction and collapsing for directly-follows graphs.
//!
//! All traversals are explicit-stack depth-first walks over an index arena,
//! never call-stack recursion, and all seed choices are deterministic
//! (ascending activity id), so repeated runs yield identical results.

use std::collections::BTreeSet;

use tracing::debug;

use crate::models::activity::{Activity, WeightedArc};
use crate::models::dfg::DirectlyFollowsGraph;
use crate::Result;

/// Check whether the graph contains a directed cycle (self-loops included).
///
/// Every activity is used as a walk start in ascending id order, tracking
/// the visited set on the current path; a cycle exists iff some walk revisits
/// an activity already on its path.
pub fn has_cycle(dfg: &DirectlyFollowsGraph) -> bool {
    let arena = Arena::new(dfg);
    arena.find_cycle_indices().is_some()
}

/// Extract one directed cycle as its arc list, if any exists.
///
/// Walks forward from every start in ascending id order; when an arc closes
/// back onto the current path, the trailing non-loop prefix is trimmed and
/// only the arcs forming the closed loop are returned. If no forward walk
/// closes a loop the search is repeated on the reversed graph and the result
/// arcs are re-reversed.
pub fn find_cycle(dfg: &DirectlyFollowsGraph) -> Option<Vec<WeightedArc>> {
    let arena = Arena::new(dfg);
    if let Some(indices) = arena.find_cycle_indices() {
        return Some(indices.iter().map(|&i| dfg.arcs()[i].clone()).collect());
    }
    let reversed = dfg.reversed();
    let rev_arena = Arena::new(&reversed);
    rev_arena.find_cycle_indices().map(|indices| {
        indices
            .iter()
            .rev()
            .map(|&i| reversed.arcs()[i].reversed())
            .collect()
    })
}

/// Collapse the activities of one extracted cycle into a synthetic activity.
///
/// Arcs with both endpoints inside the cycle are dropped, arcs crossing the
/// boundary are rewired to the synthetic activity, and arcs entirely outside
/// are kept unchanged.
pub fn collapse_cycle(
    dfg: &DirectlyFollowsGraph,
    cycle: &[WeightedArc],
) -> Result<DirectlyFollowsGraph> {
    let members: BTreeSet<&str> = cycle
        .iter()
        .flat_map(|arc| [arc.source.as_str(), arc.target.as_str()])
        .collect();
    let synthetic_id = {
        let joined: Vec<&str> = members.iter().copied().collect();
        format!("({})", joined.join("+"))
    };
    debug!(cycle = %synthetic_id, members = members.len(), "collapsing cycle");

    let mut builder = DirectlyFollowsGraph::builder(dfg.id.clone())
        .with_activity(Activity::new(synthetic_id.clone(), synthetic_id.clone()));
    for activity in dfg.activities() {
        if !members.contains(activity.id.as_str()) {
            builder = builder.with_activity(activity.clone());
        }
    }
    for arc in dfg.arcs() {
        let source_inside = members.contains(arc.source.as_str());
        let target_inside = members.contains(arc.target.as_str());
        builder = match (source_inside, target_inside) {
            (true, true) => builder,
            (true, false) => builder.with_arc(synthetic_id.clone(), arc.target.clone(), arc.weight),
            (false, true) => builder.with_arc(arc.source.clone(), synthetic_id.clone(), arc.weight),
            (false, false) => builder.with_arc(arc.source.clone(), arc.target.clone(), arc.weight),
        };
    }
    builder.build()
}

/// Collapse cycles until the graph is acyclic.
///
/// Self-loop arcs are removed first; afterwards each detected cycle is
/// replaced by a synthetic activity. Every collapse strictly reduces the
/// activity count, so the loop terminates.
pub fn collapse_all_cycles(dfg: &DirectlyFollowsGraph) -> Result<DirectlyFollowsGraph> {
    let without_self_loops: Vec<WeightedArc> = dfg
        .arcs()
        .iter()
        .filter(|arc| !arc.is_self_loop())
        .cloned()
        .collect();
    let mut graph = dfg.with_arcs(without_self_loops)?;
    while let Some(cycle) = find_cycle(&graph) {
        graph = collapse_cycle(&graph, &cycle)?;
    }
    Ok(graph)
}

/// Index arena over a graph's activities and arcs for worklist traversal.
struct Arena {
    /// Outgoing arc indices per activity, activities in ascending id order.
    outgoing: Vec<Vec<usize>>,
    /// Target activity index per arc.
    arc_target: Vec<usize>,
    /// Source activity index per arc.
    arc_source: Vec<usize>,
}

impl Arena {
    fn new(dfg: &DirectlyFollowsGraph) -> Self {
        let index_of = |id: &str| {
            dfg.activity_ids()
                .position(|candidate| candidate == id)
                .unwrap_or(usize::MAX)
        };
        let mut outgoing = vec![Vec::new(); dfg.activity_count()];
        let mut arc_target = Vec::with_capacity(dfg.arc_count());
        let mut arc_source = Vec::with_capacity(dfg.arc_count());
        for (i, arc) in dfg.arcs().iter().enumerate() {
            let source = index_of(&arc.source);
            let target = index_of(&arc.target);
            outgoing[source].push(i);
            arc_source.push(source);
            arc_target.push(target);
        }
        Self {
            outgoing,
            arc_target,
            arc_source,
        }
    }

    /// Depth-first search for a closed loop, returning the arc indices that
    /// form it. Shared colors across starts: a node fully explored without
    /// closing a loop is never re-expanded.
    fn find_cycle_indices(&self) -> Option<Vec<usize>> {
        let n = self.outgoing.len();
        let mut done = vec![false; n];
        let mut on_path = vec![false; n];

        for start in 0..n {
            if done[start] {
                continue;
            }
            // Frames of (activity, next outgoing offset); path_arcs mirrors
            // the arc taken into each frame beyond the first.
            let mut frames: Vec<(usize, usize)> = vec![(start, 0)];
            let mut path_arcs: Vec<usize> = Vec::new();
            on_path[start] = true;

            while let Some(frame) = frames.last_mut() {
                let node = frame.0;
                if let Some(&arc) = self.outgoing[node].get(frame.1) {
                    frame.1 += 1;
                    let next = self.arc_target[arc];
                    if on_path[next] {
                        // Loop closed: trim to the arcs from the duplicate
                        // entry into `next` onwards.
                        let mut cycle: Vec<usize> = path_arcs
                            .iter()
                            .copied()
                            .skip_while(|&i| self.arc_source[i] != next)
                            .collect();
                        cycle.push(arc);
                        return Some(cycle);
                    }
                    if !done[next] {
                        on_path[next] = true;
                        frames.push((next, 0));
                        path_arcs.push(arc);
                    }
                } else {
                    done[node] = true;
                    on_path[node] = false;
                    frames.pop();
                    path_arcs.pop();
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::activity::Activity;

    fn graph(arcs: &[(&str, &str)]) -> DirectlyFollowsGraph {
        let ids: BTreeSet<&str> = arcs.iter().flat_map(|&(s, t)| [s, t]).collect();
        let mut builder = DirectlyFollowsGraph::builder("g");
        for id in ids {
            builder = builder.with_activity(Activity::new(id, id));
        }
        for &(s, t) in arcs {
            builder = builder.with_arc(s, t, 1.0);
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_acyclic_graph_has_no_cycle() {
        // a -> b -> c, a -> c
        let dfg = graph(&[("a", "b"), ("b", "c"), ("a", "c")]);
        assert!(!has_cycle(&dfg));
        assert!(find_cycle(&dfg).is_none());
    }

    #[test]
    fn test_simple_cycle_found() {
        // a -> b -> c -> a
        let dfg = graph(&[("a", "b"), ("b", "c"), ("c", "a")]);
        assert!(has_cycle(&dfg));
        let cycle = find_cycle(&dfg).unwrap();
        assert_eq!(cycle.len(), 3);
        // The cycle closes: each arc's target is the next arc's source.
        for pair in cycle.windows(2) {
            assert_eq!(pair[0].target, pair[1].source);
        }
        assert_eq!(cycle.last().unwrap().target, cycle[0].source);
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let dfg = graph(&[("a", "b"), ("b", "b")]);
        assert!(has_cycle(&dfg));
        let cycle = find_cycle(&dfg).unwrap();
        assert_eq!(cycle.len(), 1);
        assert!(cycle[0].is_self_loop());
    }

    #[test]
    fn test_cycle_off_the_main_path_found() {
        // a -> b, and a detached loop x -> y -> x reached from no start
        // earlier than x itself.
        let dfg = graph(&[("a", "b"), ("x", "y"), ("y", "x")]);
        assert!(has_cycle(&dfg));
        let cycle = find_cycle(&dfg).unwrap();
        assert_eq!(cycle.len(), 2);
    }

    #[test]
    fn test_trailing_prefix_trimmed() {
        // a -> b -> c -> b: the walk a, b, c closes back into b; the prefix
        // arc a -> b is not part of the loop.
        let dfg = graph(&[("a", "b"), ("b", "c"), ("c", "b")]);
        let cycle = find_cycle(&dfg).unwrap();
        assert_eq!(cycle.len(), 2);
        let sources: BTreeSet<&str> = cycle.iter().map(|a| a.source.as_str()).collect();
        assert_eq!(sources, BTreeSet::from(["b", "c"]));
    }

    #[test]
    fn test_collapse_cycle_rewires_boundary_arcs() {
        // entry -> a -> b -> a, b -> exit
        let dfg = graph(&[("entry", "a"), ("a", "b"), ("b", "a"), ("b", "exit")]);
        let cycle = find_cycle(&dfg).unwrap();
        let collapsed = collapse_cycle(&dfg, &cycle).unwrap();
        assert_eq!(collapsed.activity_count(), 3);
        let synthetic = "(a+b)";
        assert!(collapsed.contains_activity(synthetic));
        assert!(collapsed.arc("entry", synthetic).is_some());
        assert!(collapsed.arc(synthetic, "exit").is_some());
        // Arcs inside the cycle are gone.
        assert_eq!(collapsed.arc_count(), 2);
    }

    #[test]
    fn test_collapse_all_cycles_is_acyclic() {
        // Self-loop on a, loop b <-> c, loop d -> e -> f -> d
        let dfg = graph(&[
            ("a", "a"),
            ("a", "b"),
            ("b", "c"),
            ("c", "b"),
            ("c", "d"),
            ("d", "e"),
            ("e", "f"),
            ("f", "d"),
        ]);
        let collapsed = collapse_all_cycles(&dfg).unwrap();
        assert!(!has_cycle(&collapsed));
        assert!(collapsed.activity_count() <= dfg.activity_count());
    }

    #[test]
    fn test_backward_only_cycle_recovered_reversed() {
        // With every forward walk from the deterministic starts exhausting
        // before closing a loop, the reversed pass still finds it; the
        // returned arcs are in forward orientation.
        let dfg = graph(&[("a", "b"), ("b", "c"), ("c", "a")]);
        let cycle = find_cycle(&dfg).unwrap();
        for arc in &cycle {
            assert!(dfg.arc(&arc.source, &arc.target).is_some());
        }
    }
}
