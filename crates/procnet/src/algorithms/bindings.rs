//! Conversion between the dual causal-connection encodings.
//!
//! The Causal Matrix encoding reads a connection set as AND-of-OR (every
//! subset is a mandatory slot, one member satisfies it); the Causal Net
//! encoding reads the same shape as OR-of-AND (every subset is one
//! alternative binding whose members co-occur). [`dualize`] rewrites a set
//! from one reading into the other: a combinatorial distribution over the
//! subsets with an absorption-style filter, processed per element so the
//! activity-id set is always preserved.
//!
//! The rewrite cannot always be exact. When subsets overlap, behavior can be
//! dropped or introduced; both cases are reported through non-fatal
//! [`FidelityFlags`] rather than errors. When all top-level subsets are
//! pairwise disjoint, converting and converting back restores the input
//! exactly.

use std::collections::BTreeSet;

use tracing::trace;

use crate::models::activity::ActivityId;
use crate::models::causal::{
    CausalActivity, CausalConnections, CausalFormalism, CausalModel,
};
use crate::Result;

/// Non-fatal fidelity deviations of a causal-connection conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FidelityFlags {
    /// Some behavior of the source encoding is not representable in the
    /// result: a subset was absorbed by another, or a multi-way cyclic
    /// overlap collapsed a subset to nothing.
    pub behavior_lost: bool,
    /// The result admits combinations the source did not: the absorption
    /// filter removed more candidates than the overlap accounts for.
    pub behavior_added: bool,
}

impl FidelityFlags {
    /// Check whether the conversion was exact.
    pub fn is_exact(&self) -> bool {
        !self.behavior_lost && !self.behavior_added
    }

    /// Fold another conversion's flags into this one.
    pub fn merge(&mut self, other: FidelityFlags) {
        self.behavior_lost |= other.behavior_lost;
        self.behavior_added |= other.behavior_added;
    }
}

/// A converted causal model together with the aggregated fidelity flags of
/// every per-activity connection rewrite.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedModel {
    /// The model in the requested formalism.
    pub model: CausalModel,
    /// Aggregated fidelity flags over all rewritten connection sets.
    pub flags: FidelityFlags,
}

/// Rewrite a connection set into the dual encoding.
///
/// Deterministic in the input alone: elements are processed in ascending
/// order and the result is a sorted set of sorted subsets. The empty outer
/// set (start/end activity) maps to itself.
pub fn dualize(connections: &CausalConnections) -> (CausalConnections, FidelityFlags) {
    let subsets: Vec<&BTreeSet<ActivityId>> =
        connections.iter().filter(|s| !s.is_empty()).collect();
    let mut flags = FidelityFlags::default();
    let mut result = CausalConnections::new();
    if subsets.is_empty() {
        return (result, flags);
    }

    // A subset fully contained in another would be absorbed by any faithful
    // distribution of the encoding.
    for (i, a) in subsets.iter().enumerate() {
        for (j, b) in subsets.iter().enumerate() {
            if i != j && a.is_subset(b) && a.len() < b.len() {
                flags.behavior_lost = true;
            }
        }
    }

    let elements: BTreeSet<&ActivityId> = subsets.iter().flat_map(|s| s.iter()).collect();
    for &element in &elements {
        // Everything co-occurring with the element across the subsets that
        // contain it.
        let gathered: Vec<&BTreeSet<ActivityId>> = subsets
            .iter()
            .filter(|s| s.contains(element))
            .copied()
            .collect();
        let merged: BTreeSet<&ActivityId> = gathered.iter().flat_map(|s| s.iter()).collect();

        // The remaining subsets, each reduced by the co-occurring elements.
        // A subset reduced to nothing by two or more gathered subsets marks
        // a cyclic mutual dependency.
        let mut reduced: Vec<Vec<&ActivityId>> = Vec::new();
        for subset in subsets.iter().filter(|s| !s.contains(element)) {
            let rest: Vec<&ActivityId> =
                subset.iter().filter(|id| !merged.contains(id)).collect();
            if rest.is_empty() {
                if gathered.len() >= 2 {
                    flags.behavior_lost = true;
                }
                continue;
            }
            reduced.push(rest);
        }

        // Cartesian combination of the reduced subsets, the element added to
        // each candidate.
        let mut candidates: Vec<BTreeSet<&ActivityId>> =
            vec![BTreeSet::from([element])];
        for rest in &reduced {
            let mut extended = Vec::with_capacity(candidates.len() * rest.len());
            for candidate in &candidates {
                for &id in rest {
                    let mut next = candidate.clone();
                    next.insert(id);
                    extended.push(next);
                }
            }
            candidates = extended;
        }

        // Absorption filter: each original subset contributes at most one
        // element, unless it lies entirely inside the gathered neighborhood.
        let before = candidates.len();
        candidates.retain(|candidate| {
            subsets.iter().all(|subset| {
                subset.iter().filter(|id| candidate.contains(id)).count() <= 1
                    || subset.iter().all(|id| merged.contains(id))
            })
        });
        let removed = before - candidates.len();
        if removed > merged.len().saturating_sub(1) {
            flags.behavior_added = true;
        }

        trace!(
            element = %element,
            kept = candidates.len(),
            removed,
            "dualized element neighborhood"
        );
        for candidate in candidates {
            result.insert(candidate.into_iter().cloned().collect());
        }
    }

    (result, flags)
}

/// Convert a causal model into the requested formalism.
///
/// A model already tagged with the target formalism is returned unchanged
/// with exact flags. Otherwise every activity's inputs and outputs are
/// rewritten through [`dualize`] and the flags aggregated.
pub fn convert_model(model: &CausalModel, target: CausalFormalism) -> Result<ConvertedModel> {
    if model.formalism == target {
        return Ok(ConvertedModel {
            model: model.clone(),
            flags: FidelityFlags::default(),
        });
    }

    let mut flags = FidelityFlags::default();
    let mut builder = CausalModel::builder(model.id.clone(), target);
    for activity in model.activities() {
        let (inputs, input_flags) = dualize(&activity.inputs);
        let (outputs, output_flags) = dualize(&activity.outputs);
        flags.merge(input_flags);
        flags.merge(output_flags);
        builder = builder.with_activity(CausalActivity {
            id: activity.id.clone(),
            name: activity.name.clone(),
            inputs,
            outputs,
        });
    }
    Ok(ConvertedModel {
        model: builder.build()?,
        flags,
    })
}

impl CausalModel {
    /// Convert into the Causal-Net encoding (OR of AND bindings).
    pub fn to_causal_net(&self) -> Result<ConvertedModel> {
        convert_model(self, CausalFormalism::CausalNet)
    }

    /// Convert into the Causal-Matrix encoding (AND of OR slots).
    pub fn to_causal_matrix(&self) -> Result<ConvertedModel> {
        convert_model(self, CausalFormalism::CausalMatrix)
    }
}
