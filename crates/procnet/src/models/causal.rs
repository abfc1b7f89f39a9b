//! Causal-model value types with dual-encoding connection sets.
//!
//! A [`CausalModel`] stores, per activity, its input and output
//! [`CausalConnections`]: a set of subsets of activity ids. The *shape* is
//! shared by two formalisms whose interpretation is opposite:
//!
//! - **Causal Net**: the outer set is OR (alternative bindings), each inner
//!   subset is AND (all members co-occur).
//! - **Causal Matrix**: the outer set is AND (every slot must be satisfied),
//!   each inner subset is OR (choose one member).
//!
//! The formalism is a tag on the model ([`CausalFormalism`]); it changes how
//! the stored sets are read, never what is stored. An empty outer set marks
//! a start activity (no predecessors) or end activity (no successors).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::models::activity::ActivityId;
use crate::{ProcnetError, Result};

/// A set of subsets of activity ids: the shared shape of both causal
/// encodings.
pub type CausalConnections = BTreeSet<BTreeSet<ActivityId>>;

/// Interpretation tag for [`CausalConnections`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CausalFormalism {
    /// OR of AND: each inner subset is one alternative binding.
    CausalNet,
    /// AND of OR: each inner subset is one mandatory slot.
    CausalMatrix,
}

/// An activity with causal input and output connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CausalActivity {
    /// Unique activity identifier.
    pub id: ActivityId,
    /// Human-readable activity name.
    pub name: String,
    /// Predecessor connections; empty for a start activity.
    pub inputs: CausalConnections,
    /// Successor connections; empty for an end activity.
    pub outputs: CausalConnections,
}

impl CausalActivity {
    /// Create an activity with no connections.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            inputs: CausalConnections::new(),
            outputs: CausalConnections::new(),
        }
    }

    /// Set the input connections.
    pub fn with_inputs<I, S>(mut self, subsets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: IntoIterator<Item = ActivityId>,
    {
        self.inputs = subsets.into_iter().map(|s| s.into_iter().collect()).collect();
        self
    }

    /// Set the output connections.
    pub fn with_outputs<I, S>(mut self, subsets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: IntoIterator<Item = ActivityId>,
    {
        self.outputs = subsets.into_iter().map(|s| s.into_iter().collect()).collect();
        self
    }

    /// Check whether this is a start activity (no predecessors).
    pub fn is_start(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Check whether this is an end activity (no successors).
    pub fn is_end(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Ids referenced by the input connections, deduplicated.
    pub fn input_ids(&self) -> BTreeSet<&ActivityId> {
        self.inputs.iter().flatten().collect()
    }

    /// Ids referenced by the output connections, deduplicated.
    pub fn output_ids(&self) -> BTreeSet<&ActivityId> {
        self.outputs.iter().flatten().collect()
    }
}

/// An immutable causal model tagged with its formalism.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalModel {
    /// Model identifier.
    pub id: String,
    /// How the stored connection sets are interpreted.
    pub formalism: CausalFormalism,
    activities: BTreeMap<ActivityId, CausalActivity>,
}

impl CausalModel {
    /// Start building a model with the given id and formalism.
    pub fn builder(id: impl Into<String>, formalism: CausalFormalism) -> CausalModelBuilder {
        CausalModelBuilder::new(id, formalism)
    }

    /// All activities, ordered by id.
    pub fn activities(&self) -> impl Iterator<Item = &CausalActivity> {
        self.activities.values()
    }

    /// Look up an activity by id.
    pub fn activity(&self, id: &str) -> Option<&CausalActivity> {
        self.activities.get(id)
    }

    /// Number of activities.
    pub fn activity_count(&self) -> usize {
        self.activities.len()
    }

    /// The start activity (empty inputs), if exactly one exists.
    pub fn start_activity(&self) -> Option<&CausalActivity> {
        let mut starts = self.activities.values().filter(|a| a.is_start());
        match (starts.next(), starts.next()) {
            (Some(start), None) => Some(start),
            _ => None,
        }
    }

    /// The end activity (empty outputs), if exactly one exists.
    pub fn end_activity(&self) -> Option<&CausalActivity> {
        let mut ends = self.activities.values().filter(|a| a.is_end());
        match (ends.next(), ends.next()) {
            (Some(end), None) => Some(end),
            _ => None,
        }
    }

    /// Flattened arcs: every `(predecessor, activity)` pair implied by the
    /// input connections, deduplicated and ordered.
    pub fn arcs(&self) -> Vec<(ActivityId, ActivityId)> {
        let mut arcs = BTreeSet::new();
        for activity in self.activities.values() {
            for pred in activity.input_ids() {
                arcs.insert((pred.clone(), activity.id.clone()));
            }
            for succ in activity.output_ids() {
                arcs.insert((activity.id.clone(), succ.clone()));
            }
        }
        arcs.into_iter().collect()
    }
}

/// Builder accumulating activities during model construction.
///
/// [`Self::build`] validates that every id referenced by a connection set
/// names a sibling activity in the model.
#[derive(Debug)]
pub struct CausalModelBuilder {
    id: String,
    formalism: CausalFormalism,
    activities: BTreeMap<ActivityId, CausalActivity>,
}

impl CausalModelBuilder {
    /// Create a builder for a model with the given id and formalism.
    pub fn new(id: impl Into<String>, formalism: CausalFormalism) -> Self {
        Self {
            id: id.into(),
            formalism,
            activities: BTreeMap::new(),
        }
    }

    /// Add an activity.
    pub fn with_activity(mut self, activity: CausalActivity) -> Self {
        self.activities.insert(activity.id.clone(), activity);
        self
    }

    /// Finish construction, validating sibling references.
    pub fn build(self) -> Result<CausalModel> {
        for activity in self.activities.values() {
            for id in activity.input_ids().iter().chain(activity.output_ids().iter()) {
                if !self.activities.contains_key(*id) {
                    return Err(ProcnetError::UnknownActivity {
                        id: (*id).clone(),
                    });
                }
            }
        }
        Ok(CausalModel {
            id: self.id,
            formalism: self.formalism,
            activities: self.activities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence() -> CausalModel {
        // a -> b -> c
        CausalModel::builder("seq", CausalFormalism::CausalNet)
            .with_activity(CausalActivity::new("a", "a").with_outputs([["b".to_string()]]))
            .with_activity(
                CausalActivity::new("b", "b")
                    .with_inputs([["a".to_string()]])
                    .with_outputs([["c".to_string()]]),
            )
            .with_activity(CausalActivity::new("c", "c").with_inputs([["b".to_string()]]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_start_and_end_activities() {
        let model = sequence();
        assert_eq!(model.start_activity().unwrap().id, "a");
        assert_eq!(model.end_activity().unwrap().id, "c");
    }

    #[test]
    fn test_flattened_arcs() {
        let model = sequence();
        let arcs = model.arcs();
        assert_eq!(
            arcs,
            vec![
                ("a".to_string(), "b".to_string()),
                ("b".to_string(), "c".to_string()),
            ]
        );
    }

    #[test]
    fn test_builder_rejects_unknown_sibling() {
        let err = CausalModel::builder("m", CausalFormalism::CausalNet)
            .with_activity(CausalActivity::new("a", "a").with_outputs([["ghost".to_string()]]))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ProcnetError::UnknownActivity {
                id: "ghost".to_string()
            }
        );
    }

    #[test]
    fn test_no_unique_start_when_two_exist() {
        let model = CausalModel::builder("m", CausalFormalism::CausalNet)
            .with_activity(CausalActivity::new("a", "a").with_outputs([["c".to_string()]]))
            .with_activity(CausalActivity::new("b", "b").with_outputs([["c".to_string()]]))
            .with_activity(CausalActivity::new("c", "c").with_inputs([
                ["a".to_string()],
                ["b".to_string()],
            ]))
            .build()
            .unwrap();
        assert!(model.start_activity().is_none());
        assert_eq!(model.end_activity().unwrap().id, "c");
    }
}
