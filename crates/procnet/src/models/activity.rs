//! Activity and weighted-arc value types.

use serde::{Deserialize, Serialize};

/// Activity identifier type, unique within a model.
pub type ActivityId = String;

/// A named process activity.
///
/// Equality and ordering consider both id and name, so two activities with
/// the same id but different names compare as distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Activity {
    /// Unique activity identifier.
    pub id: ActivityId,
    /// Human-readable activity name.
    pub name: String,
}

impl Activity {
    /// Create a new activity.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A weighted directed arc between two activities.
///
/// The weight is a frequency or cost. Arc identity within a graph is the
/// `(source, target)` pair; weights of duplicate insertions are summed by
/// [`DfgBuilder`](crate::models::dfg::DfgBuilder).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedArc {
    /// Id of the source activity.
    pub source: ActivityId,
    /// Id of the target activity.
    pub target: ActivityId,
    /// Arc weight (frequency or cost).
    pub weight: f64,
}

impl WeightedArc {
    /// Create a new weighted arc.
    pub fn new(source: impl Into<String>, target: impl Into<String>, weight: f64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            weight,
        }
    }

    /// Return the arc with source and target swapped.
    pub fn reversed(&self) -> Self {
        Self {
            source: self.target.clone(),
            target: self.source.clone(),
            weight: self.weight,
        }
    }

    /// Check whether source and target are the same activity.
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    /// The `(source, target)` identity pair.
    pub fn key(&self) -> (&str, &str) {
        (&self.source, &self.target)
    }
}
