//! Directly-follows graph model.
//!
//! A [`DirectlyFollowsGraph`] records, for every pair of activities, how
//! often (or at what cost) the target immediately followed the source in an
//! observed execution log. The graph is an immutable value: all construction
//! goes through [`DfgBuilder`], and every algorithm over it returns a new
//! graph.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::activity::{Activity, ActivityId, WeightedArc};
use crate::{ProcnetError, Result};

/// A weighted directed graph of directly-follows relations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectlyFollowsGraph {
    /// Graph identifier.
    pub id: String,
    activities: BTreeMap<ActivityId, Activity>,
    arcs: Vec<WeightedArc>,
}

impl DirectlyFollowsGraph {
    /// Start building a graph with the given id.
    pub fn builder(id: impl Into<String>) -> DfgBuilder {
        DfgBuilder::new(id)
    }

    /// All activities, ordered by id.
    pub fn activities(&self) -> impl Iterator<Item = &Activity> {
        self.activities.values()
    }

    /// All activity ids, ordered.
    pub fn activity_ids(&self) -> impl Iterator<Item = &ActivityId> {
        self.activities.keys()
    }

    /// Look up an activity by id.
    pub fn activity(&self, id: &str) -> Option<&Activity> {
        self.activities.get(id)
    }

    /// Check whether the graph contains an activity with the given id.
    pub fn contains_activity(&self, id: &str) -> bool {
        self.activities.contains_key(id)
    }

    /// All arcs, ordered by `(source, target)`.
    pub fn arcs(&self) -> &[WeightedArc] {
        &self.arcs
    }

    /// Look up an arc by its source and target ids.
    pub fn arc(&self, source: &str, target: &str) -> Option<&WeightedArc> {
        self.arcs
            .iter()
            .find(|a| a.source == source && a.target == target)
    }

    /// Arcs leaving the given activity.
    pub fn outgoing(&self, id: &str) -> impl Iterator<Item = &WeightedArc> {
        let id = id.to_string();
        self.arcs.iter().filter(move |a| a.source == id)
    }

    /// Arcs entering the given activity.
    pub fn incoming(&self, id: &str) -> impl Iterator<Item = &WeightedArc> {
        let id = id.to_string();
        self.arcs.iter().filter(move |a| a.target == id)
    }

    /// Activities without incoming arcs, ordered by id.
    pub fn sources(&self) -> Vec<&Activity> {
        self.activities
            .values()
            .filter(|a| self.incoming(&a.id).next().is_none())
            .collect()
    }

    /// Activities without outgoing arcs, ordered by id.
    pub fn sinks(&self) -> Vec<&Activity> {
        self.activities
            .values()
            .filter(|a| self.outgoing(&a.id).next().is_none())
            .collect()
    }

    /// Number of activities.
    pub fn activity_count(&self) -> usize {
        self.activities.len()
    }

    /// Number of arcs.
    pub fn arc_count(&self) -> usize {
        self.arcs.len()
    }

    /// Check whether the graph has no activities.
    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    /// A copy of the graph with every arc reversed.
    pub fn reversed(&self) -> Self {
        let mut arcs: Vec<WeightedArc> = self.arcs.iter().map(WeightedArc::reversed).collect();
        arcs.sort_by(|a, b| (&a.source, &a.target).cmp(&(&b.source, &b.target)));
        Self {
            id: self.id.clone(),
            activities: self.activities.clone(),
            arcs,
        }
    }

    /// A copy of the graph keeping the same activities but only the given
    /// arcs. Arcs referencing unknown activities are rejected.
    pub fn with_arcs(&self, arcs: Vec<WeightedArc>) -> Result<Self> {
        let mut builder = DfgBuilder::new(self.id.clone());
        for activity in self.activities.values() {
            builder = builder.with_activity(activity.clone());
        }
        for arc in arcs {
            builder = builder.with_arc(arc.source, arc.target, arc.weight);
        }
        builder.build()
    }
}

/// Builder accumulating mutable state during graph construction.
///
/// Duplicate arcs (same source and target) have their weights summed, the
/// frequency semantics of directly-follows aggregation. [`Self::build`]
/// validates that every arc references known activities.
#[derive(Debug, Default)]
pub struct DfgBuilder {
    id: String,
    activities: BTreeMap<ActivityId, Activity>,
    arcs: BTreeMap<(ActivityId, ActivityId), f64>,
}

impl DfgBuilder {
    /// Create a builder for a graph with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            activities: BTreeMap::new(),
            arcs: BTreeMap::new(),
        }
    }

    /// Add an activity.
    pub fn with_activity(mut self, activity: Activity) -> Self {
        self.activities.insert(activity.id.clone(), activity);
        self
    }

    /// Add an arc. Repeated `(source, target)` pairs sum their weights.
    pub fn with_arc(
        mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        weight: f64,
    ) -> Self {
        *self
            .arcs
            .entry((source.into(), target.into()))
            .or_insert(0.0) += weight;
        self
    }

    /// Finish construction, validating arc endpoints.
    pub fn build(self) -> Result<DirectlyFollowsGraph> {
        for (source, target) in self.arcs.keys() {
            for id in [source, target] {
                if !self.activities.contains_key(id) {
                    return Err(ProcnetError::UnknownActivity { id: id.clone() });
                }
            }
        }
        let arcs = self
            .arcs
            .into_iter()
            .map(|((source, target), weight)| WeightedArc {
                source,
                target,
                weight,
            })
            .collect();
        Ok(DirectlyFollowsGraph {
            id: self.id,
            activities: self.activities,
            arcs,
        })
    }
}
