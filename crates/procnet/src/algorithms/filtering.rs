//! Arc filtering for directly-follows graphs.
//!
//! Filtering removes low-significance arcs while keeping every activity on
//! some source-to-sink path. Three passes are provided:
//!
//! - [`filter_edges_twe`]: two-way arborescence filtering (forward from the
//!   source, backward from the sink, union of both)
//! - [`filter_edges_greedy`]: weight-ordered greedy removal guarded by a
//!   reachability check per tentative removal
//! - [`filter_edges_tweg`]: the two combined, greedy applied to the TWE
//!   result
//!
//! All passes require the soundness invariant checked by
//! [`validate_dfg`](crate::algorithms::connectivity::validate_dfg) and
//! preserve it.

use std::collections::BTreeSet;

use tracing::debug;

use crate::algorithms::arborescence::maximum_arborescence;
use crate::algorithms::connectivity::{reachable, validate_dfg, Direction};
use crate::models::activity::WeightedArc;
use crate::models::dfg::DirectlyFollowsGraph;
use crate::Result;

/// Optimization objective for the greedy filter's removal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterObjective {
    /// Keep maximum total weight: try to remove light arcs first.
    #[default]
    Maximum,
    /// Keep minimum total weight: try to remove heavy arcs first.
    Minimum,
}

/// Two-way arborescence filtering.
///
/// Computes the maximum arborescence rooted at the unique source, the
/// maximum arborescence rooted at the unique sink over the reversed graph
/// (re-reversed afterwards), and returns the union of both arc sets. Every
/// activity stays reachable from the source through the forward tree and
/// keeps a path to the sink through the backward tree.
pub fn filter_edges_twe(dfg: &DirectlyFollowsGraph) -> Result<DirectlyFollowsGraph> {
    validate_dfg(dfg)?;
    let source = dfg.sources()[0].id.clone();
    let sink = dfg.sinks()[0].id.clone();

    let forward = maximum_arborescence(dfg, &source)?;
    let backward = maximum_arborescence(&dfg.reversed(), &sink)?;

    let mut kept: BTreeSet<(String, String)> = forward
        .into_iter()
        .map(|arc| (arc.source, arc.target))
        .collect();
    kept.extend(
        backward
            .into_iter()
            .map(|arc| (arc.target, arc.source)),
    );

    let arcs: Vec<WeightedArc> = dfg
        .arcs()
        .iter()
        .filter(|arc| kept.contains(&(arc.source.clone(), arc.target.clone())))
        .cloned()
        .collect();
    debug!(
        kept = arcs.len(),
        original = dfg.arc_count(),
        "two-way arborescence filter"
    );
    dfg.with_arcs(arcs)
}

/// Greedy arc filtering.
///
/// Arcs are visited in weight order (ascending for [`FilterObjective::Maximum`],
/// descending for [`FilterObjective::Minimum`]). An arc whose removal would
/// leave its source without outgoing or its target without incoming arcs is
/// kept outright; otherwise the arc is removed tentatively and restored
/// unless every activity remains reachable from the source and keeps a path
/// to the sink.
pub fn filter_edges_greedy(
    dfg: &DirectlyFollowsGraph,
    objective: FilterObjective,
) -> Result<DirectlyFollowsGraph> {
    validate_dfg(dfg)?;
    let source = dfg.sources()[0].id.clone();
    let sink = dfg.sinks()[0].id.clone();

    let mut order: Vec<&WeightedArc> = dfg.arcs().iter().collect();
    order.sort_by(|a, b| {
        let by_weight = match objective {
            FilterObjective::Maximum => a.weight.total_cmp(&b.weight),
            FilterObjective::Minimum => b.weight.total_cmp(&a.weight),
        };
        by_weight.then_with(|| a.key().cmp(&b.key()))
    });

    let mut kept: BTreeSet<(String, String)> = dfg
        .arcs()
        .iter()
        .map(|arc| (arc.source.clone(), arc.target.clone()))
        .collect();

    for arc in order {
        let key = (arc.source.clone(), arc.target.clone());
        let out_degree = kept.iter().filter(|(s, _)| *s == arc.source).count();
        let in_degree = kept.iter().filter(|(_, t)| *t == arc.target).count();
        if out_degree <= 1 || in_degree <= 1 {
            continue;
        }
        kept.remove(&key);
        if !stays_sound(dfg, &kept, &source, &sink) {
            kept.insert(key);
        }
    }

    let arcs: Vec<WeightedArc> = dfg
        .arcs()
        .iter()
        .filter(|arc| kept.contains(&(arc.source.clone(), arc.target.clone())))
        .cloned()
        .collect();
    debug!(
        kept = arcs.len(),
        original = dfg.arc_count(),
        "greedy filter"
    );
    dfg.with_arcs(arcs)
}

/// Two-way arborescence filtering followed by a greedy pass on its result.
pub fn filter_edges_tweg(dfg: &DirectlyFollowsGraph) -> Result<DirectlyFollowsGraph> {
    let filtered = filter_edges_twe(dfg)?;
    filter_edges_greedy(&filtered, FilterObjective::Maximum)
}

/// Check that, over the kept arc set, every activity is reached from the
/// source and reaches the sink.
fn stays_sound(
    dfg: &DirectlyFollowsGraph,
    kept: &BTreeSet<(String, String)>,
    source: &str,
    sink: &str,
) -> bool {
    let reduced = match dfg.with_arcs(
        dfg.arcs()
            .iter()
            .filter(|arc| kept.contains(&(arc.source.clone(), arc.target.clone())))
            .cloned()
            .collect(),
    ) {
        Ok(graph) => graph,
        Err(_) => return false,
    };
    let from_source = reachable(&reduced, source, Direction::Forward);
    if from_source.len() != reduced.activity_count() {
        return false;
    }
    let to_sink = reachable(&reduced, sink, Direction::Backward);
    to_sink.len() == reduced.activity_count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::connectivity::validate_dfg;
    use crate::models::activity::Activity;

    fn graph(arcs: &[(&str, &str, f64)]) -> DirectlyFollowsGraph {
        let ids: BTreeSet<&str> = arcs.iter().flat_map(|&(s, t, _)| [s, t]).collect();
        let mut builder = DirectlyFollowsGraph::builder("g");
        for id in ids {
            builder = builder.with_activity(Activity::new(id, id));
        }
        for &(s, t, w) in arcs {
            builder = builder.with_arc(s, t, w);
        }
        builder.build().unwrap()
    }

    fn keys(dfg: &DirectlyFollowsGraph) -> BTreeSet<(String, String)> {
        dfg.arcs()
            .iter()
            .map(|a| (a.source.clone(), a.target.clone()))
            .collect()
    }

    fn diamond() -> DirectlyFollowsGraph {
        graph(&[
            ("a", "b", 3.0),
            ("a", "c", 1.0),
            ("b", "d", 3.0),
            ("c", "d", 1.0),
        ])
    }

    #[test]
    fn test_twe_keeps_forward_and_backward_trees() {
        // Forward arborescence from a: a->b, a->c, b->d. Backward from d
        // over the reversed graph re-adds c->d so c keeps a path to the
        // sink.
        let filtered = filter_edges_twe(&diamond()).unwrap();
        assert!(keys(&filtered).is_subset(&keys(&diamond())));
        assert_eq!(filtered.activity_count(), 4);
        assert!(validate_dfg(&filtered).is_ok());
        assert!(filtered.arc("a", "b").is_some());
        assert!(filtered.arc("b", "d").is_some());
    }

    #[test]
    fn test_twe_drops_redundant_middle_arc() {
        // b -> c is in neither tree: forward picks the heavier entries into
        // c and d, backward picks the heavier exits out of a and b.
        let dfg = graph(&[
            ("a", "b", 5.0),
            ("a", "c", 4.0),
            ("b", "c", 1.0),
            ("b", "d", 5.0),
            ("c", "d", 4.0),
        ]);
        let filtered = filter_edges_twe(&dfg).unwrap();
        assert!(filtered.arc("b", "c").is_none());
        assert_eq!(filtered.arc_count(), 4);
        assert!(validate_dfg(&filtered).is_ok());
    }

    #[test]
    fn test_greedy_removes_light_arc_when_sound() {
        // The light diagonal a -> d can go: both endpoints keep degree and
        // the diamond stays sound.
        let dfg = graph(&[
            ("a", "b", 3.0),
            ("b", "d", 3.0),
            ("a", "d", 1.0),
        ]);
        let filtered = filter_edges_greedy(&dfg, FilterObjective::Maximum).unwrap();
        assert!(filtered.arc("a", "d").is_none());
        assert_eq!(filtered.arc_count(), 2);
        assert!(validate_dfg(&filtered).is_ok());
    }

    #[test]
    fn test_greedy_keeps_degree_critical_arcs() {
        // Removing either branch of the diamond would strand b or c.
        let filtered = filter_edges_greedy(&diamond(), FilterObjective::Maximum).unwrap();
        assert_eq!(keys(&filtered), keys(&diamond()));
    }

    #[test]
    fn test_greedy_restores_arc_that_breaks_reachability() {
        // c's only entry is a -> c and only exit is c -> d, so both survive
        // even though they are the lightest arcs.
        let dfg = graph(&[
            ("a", "b", 9.0),
            ("b", "d", 9.0),
            ("a", "c", 1.0),
            ("c", "d", 1.0),
            ("b", "c", 5.0),
        ]);
        let filtered = filter_edges_greedy(&dfg, FilterObjective::Maximum).unwrap();
        assert!(validate_dfg(&filtered).is_ok());
        assert!(filtered.arc("c", "d").is_some());
    }

    #[test]
    fn test_tweg_composes_both_passes() {
        let dfg = graph(&[
            ("a", "b", 5.0),
            ("a", "c", 4.0),
            ("b", "c", 1.0),
            ("b", "d", 5.0),
            ("c", "d", 4.0),
        ]);
        let filtered = filter_edges_tweg(&dfg).unwrap();
        assert!(keys(&filtered).is_subset(&keys(&dfg)));
        assert_eq!(filtered.activity_count(), dfg.activity_count());
        assert!(validate_dfg(&filtered).is_ok());
    }

    #[test]
    fn test_filters_reject_unsound_input() {
        // Two sources.
        let dfg = graph(&[("a", "c", 1.0), ("b", "c", 1.0)]);
        assert!(filter_edges_twe(&dfg).is_err());
        assert!(filter_edges_greedy(&dfg, FilterObjective::Maximum).is_err());
        assert!(filter_edges_tweg(&dfg).is_err());
    }
}
