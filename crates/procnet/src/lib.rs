//! # Procnet
//!
//! Process-model graph algebra for business-process executions.
//!
//! This crate provides the core transformations between the graph formalisms
//! used in process mining, together with the algorithms that optimize and
//! validate them against observed execution logs:
//!
//! - **DFG Optimization**: cycle detection and collapsing, rooted
//!   maximum/minimum spanning arborescences (Edmonds' algorithm), and
//!   two-pass arc filtering over directly-follows graphs
//! - **Causal Connection Algebra**: conversion between the dual causal
//!   encodings (Causal Net, OR-of-AND bindings; Causal Matrix, AND-of-OR
//!   slots) with fidelity tracking
//! - **Net Reduction**: fixpoint structural simplification of bipartite
//!   place/transition nets
//! - **Translation**: DFG-to-net, causal-model-to-net and net-to-causal
//!   conversions composed from the pieces above
//! - **Replay**: heuristic best-first state-space search deciding whether a
//!   trace fits a net perfectly
//!
//! All model types are immutable values; every transformation returns a new
//! value. The crate performs no I/O: parsing, rendering and log handling
//! live with the callers that consume these types.
//!
//! ## Quick Start
//!
//! ```
//! use procnet::prelude::*;
//!
//! let dfg = DirectlyFollowsGraph::builder("order-to-cash")
//!     .with_activity(Activity::new("a", "Register"))
//!     .with_activity(Activity::new("b", "Approve"))
//!     .with_activity(Activity::new("c", "Archive"))
//!     .with_arc("a", "b", 7.0)
//!     .with_arc("b", "c", 7.0)
//!     .build()
//!     .unwrap();
//!
//! let filtered = filter_edges_tweg(&dfg).unwrap();
//! assert_eq!(filtered.activity_count(), 3);
//!
//! let net = dfg_to_petri(&dfg).unwrap();
//! let trace = vec!["a".to_string(), "b".to_string(), "c".to_string()];
//! assert!(replay(&net, &trace, None).unwrap());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algorithms;
pub mod models;

pub use algorithms::arborescence::{maximum_arborescence, minimum_arborescence};
pub use algorithms::bindings::{convert_model, dualize, ConvertedModel, FidelityFlags};
pub use algorithms::connectivity::{is_weakly_connected, validate_dfg};
pub use algorithms::cycles::{collapse_all_cycles, collapse_cycle, find_cycle, has_cycle};
pub use algorithms::filtering::{
    filter_edges_greedy, filter_edges_twe, filter_edges_tweg, FilterObjective,
};
pub use algorithms::reduce::reduce;
pub use algorithms::replay::{replay, replay_all, ReplayState};
pub use algorithms::translate::{
    causal_to_petri, dfg_to_causal_matrix, dfg_to_causal_net, dfg_to_petri, petri_to_causal,
    petri_to_causal_matrix, TranslatedNet,
};
pub use models::activity::{Activity, ActivityId, WeightedArc};
pub use models::causal::{
    CausalActivity, CausalConnections, CausalFormalism, CausalModel, CausalModelBuilder,
};
pub use models::dfg::{DfgBuilder, DirectlyFollowsGraph};
pub use models::petri::{PetriArc, PetriNet, PetriNetBuilder, Place, Transition};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::algorithms::arborescence::{maximum_arborescence, minimum_arborescence};
    pub use crate::algorithms::bindings::{convert_model, dualize, ConvertedModel, FidelityFlags};
    pub use crate::algorithms::connectivity::{is_weakly_connected, validate_dfg};
    pub use crate::algorithms::cycles::{
        collapse_all_cycles, collapse_cycle, find_cycle, has_cycle,
    };
    pub use crate::algorithms::filtering::{
        filter_edges_greedy, filter_edges_twe, filter_edges_tweg, FilterObjective,
    };
    pub use crate::algorithms::reduce::reduce;
    pub use crate::algorithms::replay::{replay, replay_all, ReplayState};
    pub use crate::algorithms::translate::{
        causal_to_petri, dfg_to_causal_matrix, dfg_to_causal_net, dfg_to_petri, petri_to_causal,
        petri_to_causal_matrix, TranslatedNet,
    };
    pub use crate::models::activity::{Activity, ActivityId, WeightedArc};
    pub use crate::models::causal::{
        CausalActivity, CausalConnections, CausalFormalism, CausalModel, CausalModelBuilder,
    };
    pub use crate::models::dfg::{DfgBuilder, DirectlyFollowsGraph};
    pub use crate::models::petri::{PetriArc, PetriNet, PetriNetBuilder, Place, Transition};
    pub use crate::{ProcnetError, Result};
}

/// Process-model error types.
///
/// Validation failures are raised before any work begins and name the
/// offending id or property. Translation fidelity deviations are *not*
/// errors; they are carried as [`FidelityFlags`] inside successful results.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProcnetError {
    /// The graph does not have exactly one activity without incoming arcs.
    #[error("graph has no unique source: found {found:?}")]
    NoUniqueSource {
        /// Ids of the activities without incoming arcs.
        found: Vec<String>,
    },

    /// The graph does not have exactly one activity without outgoing arcs.
    #[error("graph has no unique sink: found {found:?}")]
    NoUniqueSink {
        /// Ids of the activities without outgoing arcs.
        found: Vec<String>,
    },

    /// An activity is not reachable from the unique source.
    #[error("activity `{id}` is not reachable from the source")]
    UnreachableFromSource {
        /// Id of the unreachable activity.
        id: String,
    },

    /// An activity cannot reach the unique sink.
    #[error("activity `{id}` cannot reach the sink")]
    CannotReachSink {
        /// Id of the activity that cannot reach the sink.
        id: String,
    },

    /// A lookup referenced an activity id absent from the model.
    #[error("unknown activity: `{id}`")]
    UnknownActivity {
        /// The unresolved activity id.
        id: String,
    },

    /// A lookup referenced a place id absent from the net.
    #[error("unknown place: `{id}`")]
    UnknownPlace {
        /// The unresolved place id.
        id: String,
    },

    /// A lookup referenced a transition id absent from the net.
    #[error("unknown transition: `{id}`")]
    UnknownTransition {
        /// The unresolved transition id.
        id: String,
    },

    /// The model contains no activities.
    #[error("model is empty")]
    EmptyModel,

    /// A replay search exceeded its wall-clock deadline.
    ///
    /// Never conflated with "trace does not fit".
    #[error("replay timed out after {elapsed_ms} ms")]
    ReplayTimeout {
        /// Elapsed wall-clock time when the deadline fired.
        elapsed_ms: u64,
    },
}

/// Result type for process-model operations.
pub type Result<T> = std::result::Result<T, ProcnetError>;
