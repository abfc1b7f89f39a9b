//! Process-model graph algorithms.
//!
//! This module provides the four tightly coupled algorithm families of the
//! crate:
//! - [`connectivity`], [`cycles`], [`arborescence`], [`filtering`]: the DFG
//!   optimizer
//! - [`bindings`]: the causal-connection dual-encoding algebra
//! - [`reduce`]: fixpoint structural net reduction
//! - [`translate`]: conversions between the formalisms
//! - [`replay`]: heuristic trace replay

pub mod arborescence;
pub mod bindings;
pub mod connectivity;
pub mod cycles;
pub mod filtering;
pub mod reduce;
pub mod replay;
pub mod translate;

pub use arborescence::{maximum_arborescence, minimum_arborescence};
pub use bindings::{convert_model, dualize, ConvertedModel, FidelityFlags};
pub use connectivity::{is_weakly_connected, validate_dfg};
pub use cycles::{collapse_all_cycles, collapse_cycle, find_cycle, has_cycle};
pub use filtering::{filter_edges_greedy, filter_edges_twe, filter_edges_tweg, FilterObjective};
pub use reduce::reduce;
pub use replay::{replay, replay_all, ReplayState};
pub use translate::{
    causal_to_petri, dfg_to_causal_matrix, dfg_to_causal_net, dfg_to_petri, petri_to_causal,
    petri_to_causal_matrix, TranslatedNet,
};
