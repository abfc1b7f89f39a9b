//! Process-model value types.
//!
//! This module provides the immutable data structures shared by every
//! formalism in the crate:
//! - [`activity`]: activities and weighted arcs
//! - [`dfg`]: directly-follows graphs
//! - [`causal`]: causal models with dual-encoding connection sets
//! - [`petri`]: bipartite place/transition nets

pub mod activity;
pub mod causal;
pub mod dfg;
pub mod petri;

pub use activity::{Activity, ActivityId, WeightedArc};
pub use causal::{CausalActivity, CausalConnections, CausalFormalism, CausalModel, CausalModelBuilder};
pub use dfg::{DfgBuilder, DirectlyFollowsGraph};
pub use petri::{PetriArc, PetriNet, PetriNetBuilder, Place, Transition};
