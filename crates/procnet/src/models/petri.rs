//! Bipartite place/transition net model.
//!
//! Arcs are typed as place-to-transition or transition-to-place, so the
//! bipartite invariant holds by construction. Transitions are either visibly
//! labeled (they correspond to an activity) or silent (pure routing). Places
//! may carry the initial or final marking flag.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{ProcnetError, Result};

/// A place holding tokens of the net's marking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    /// Unique place identifier.
    pub id: String,
    /// Human-readable place name.
    pub name: String,
    /// Whether the place belongs to the initial marking.
    pub is_initial: bool,
    /// Whether the place belongs to the final marking.
    pub is_final: bool,
}

impl Place {
    /// Create a plain place.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_initial: false,
            is_final: false,
        }
    }

    /// Mark the place as part of the initial marking.
    pub fn initial(mut self) -> Self {
        self.is_initial = true;
        self
    }

    /// Mark the place as part of the final marking.
    pub fn terminal(mut self) -> Self {
        self.is_final = true;
        self
    }
}

/// A transition, visibly labeled or silent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Unique transition identifier. Visible transitions use the id of the
    /// activity they represent.
    pub id: String,
    /// Human-readable transition name.
    pub name: String,
    /// Whether the transition is silent (routing only, never observed).
    pub is_silent: bool,
}

impl Transition {
    /// Create a visible transition for the given activity id and name.
    pub fn visible(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_silent: false,
        }
    }

    /// Create a silent routing transition.
    pub fn silent(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            is_silent: true,
        }
    }
}

/// A directed arc of the bipartite net.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PetriArc {
    /// An arc from a place to a transition.
    PlaceToTransition {
        /// Source place id.
        place: String,
        /// Target transition id.
        transition: String,
    },
    /// An arc from a transition to a place.
    TransitionToPlace {
        /// Source transition id.
        transition: String,
        /// Target place id.
        place: String,
    },
}

/// An immutable place/transition net.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetriNet {
    /// Net identifier.
    pub id: String,
    pub(crate) places: BTreeMap<String, Place>,
    pub(crate) transitions: BTreeMap<String, Transition>,
    pub(crate) arcs: BTreeSet<PetriArc>,
}

impl PetriNet {
    /// Start building a net with the given id.
    pub fn builder(id: impl Into<String>) -> PetriNetBuilder {
        PetriNetBuilder::new(id)
    }

    /// All places, ordered by id.
    pub fn places(&self) -> impl Iterator<Item = &Place> {
        self.places.values()
    }

    /// All transitions, ordered by id.
    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.values()
    }

    /// Visible transitions only, the net's activities.
    pub fn activities(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.values().filter(|t| !t.is_silent)
    }

    /// All arcs, ordered.
    pub fn arcs(&self) -> impl Iterator<Item = &PetriArc> {
        self.arcs.iter()
    }

    /// Look up a place by id.
    pub fn place(&self, id: &str) -> Option<&Place> {
        self.places.get(id)
    }

    /// Look up a transition by id.
    pub fn transition(&self, id: &str) -> Option<&Transition> {
        self.transitions.get(id)
    }

    /// Number of places.
    pub fn place_count(&self) -> usize {
        self.places.len()
    }

    /// Number of transitions.
    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// Place ids feeding the given transition, ordered.
    pub fn transition_preset(&self, transition: &str) -> Vec<&str> {
        self.arcs
            .iter()
            .filter_map(|arc| match arc {
                PetriArc::PlaceToTransition { place, transition: t } if t == transition => {
                    Some(place.as_str())
                }
                _ => None,
            })
            .collect()
    }

    /// Place ids fed by the given transition, ordered.
    pub fn transition_postset(&self, transition: &str) -> Vec<&str> {
        self.arcs
            .iter()
            .filter_map(|arc| match arc {
                PetriArc::TransitionToPlace { transition: t, place } if t == transition => {
                    Some(place.as_str())
                }
                _ => None,
            })
            .collect()
    }

    /// Transition ids feeding the given place, ordered.
    pub fn place_preset(&self, place: &str) -> Vec<&str> {
        self.arcs
            .iter()
            .filter_map(|arc| match arc {
                PetriArc::TransitionToPlace { transition, place: p } if p == place => {
                    Some(transition.as_str())
                }
                _ => None,
            })
            .collect()
    }

    /// Transition ids fed by the given place, ordered.
    pub fn place_postset(&self, place: &str) -> Vec<&str> {
        self.arcs
            .iter()
            .filter_map(|arc| match arc {
                PetriArc::PlaceToTransition { place: p, transition } if p == place => {
                    Some(transition.as_str())
                }
                _ => None,
            })
            .collect()
    }

    /// The set of places flagged as initial.
    pub fn initial_marking(&self) -> BTreeSet<String> {
        self.places
            .values()
            .filter(|p| p.is_initial)
            .map(|p| p.id.clone())
            .collect()
    }

    /// The set of places flagged as final.
    pub fn final_marking(&self) -> BTreeSet<String> {
        self.places
            .values()
            .filter(|p| p.is_final)
            .map(|p| p.id.clone())
            .collect()
    }
}

/// Builder accumulating places, transitions and arcs during construction.
///
/// [`Self::build`] validates that every arc endpoint names a node present in
/// the net.
#[derive(Debug)]
pub struct PetriNetBuilder {
    id: String,
    places: BTreeMap<String, Place>,
    transitions: BTreeMap<String, Transition>,
    arcs: BTreeSet<PetriArc>,
}

impl PetriNetBuilder {
    /// Create a builder for a net with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            places: BTreeMap::new(),
            transitions: BTreeMap::new(),
            arcs: BTreeSet::new(),
        }
    }

    /// Add a place.
    pub fn with_place(mut self, place: Place) -> Self {
        self.places.insert(place.id.clone(), place);
        self
    }

    /// Add a transition.
    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.transitions.insert(transition.id.clone(), transition);
        self
    }

    /// Add a place-to-transition arc.
    pub fn with_arc_pt(mut self, place: impl Into<String>, transition: impl Into<String>) -> Self {
        self.arcs.insert(PetriArc::PlaceToTransition {
            place: place.into(),
            transition: transition.into(),
        });
        self
    }

    /// Add a transition-to-place arc.
    pub fn with_arc_tp(mut self, transition: impl Into<String>, place: impl Into<String>) -> Self {
        self.arcs.insert(PetriArc::TransitionToPlace {
            transition: transition.into(),
            place: place.into(),
        });
        self
    }

    /// Check whether a place with the given id was already added.
    pub fn has_place(&self, id: &str) -> bool {
        self.places.contains_key(id)
    }

    /// Finish construction, validating arc endpoints.
    pub fn build(self) -> Result<PetriNet> {
        for arc in &self.arcs {
            let (place, transition) = match arc {
                PetriArc::PlaceToTransition { place, transition }
                | PetriArc::TransitionToPlace { transition, place } => (place, transition),
            };
            if !self.places.contains_key(place) {
                return Err(ProcnetError::UnknownPlace { id: place.clone() });
            }
            if !self.transitions.contains_key(transition) {
                return Err(ProcnetError::UnknownTransition {
                    id: transition.clone(),
                });
            }
        }
        Ok(PetriNet {
            id: self.id,
            places: self.places,
            transitions: self.transitions,
            arcs: self.arcs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_net() -> PetriNet {
        // p0 -> t -> p1
        PetriNet::builder("n")
            .with_place(Place::new("p0", "p0").initial())
            .with_place(Place::new("p1", "p1").terminal())
            .with_transition(Transition::visible("t", "Task"))
            .with_arc_pt("p0", "t")
            .with_arc_tp("t", "p1")
            .build()
            .unwrap()
    }

    #[test]
    fn test_presets_and_postsets() {
        let net = simple_net();
        assert_eq!(net.transition_preset("t"), vec!["p0"]);
        assert_eq!(net.transition_postset("t"), vec!["p1"]);
        assert_eq!(net.place_postset("p0"), vec!["t"]);
        assert_eq!(net.place_preset("p1"), vec!["t"]);
    }

    #[test]
    fn test_markings() {
        let net = simple_net();
        assert!(net.initial_marking().contains("p0"));
        assert!(net.final_marking().contains("p1"));
        assert_eq!(net.initial_marking().len(), 1);
    }

    #[test]
    fn test_builder_rejects_dangling_arc() {
        let err = PetriNet::builder("n")
            .with_place(Place::new("p", "p"))
            .with_arc_pt("p", "ghost")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ProcnetError::UnknownTransition {
                id: "ghost".to_string()
            }
        );
    }

    #[test]
    fn test_activities_are_visible_transitions() {
        let net = PetriNet::builder("n")
            .with_transition(Transition::visible("a", "Task"))
            .with_transition(Transition::silent("tau"))
            .build()
            .unwrap();
        let visible: Vec<_> = net.activities().map(|t| t.id.as_str()).collect();
        assert_eq!(visible, vec!["a"]);
    }
}
