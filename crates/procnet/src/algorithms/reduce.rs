//! Fixpoint structural reduction of bipartite nets.
//!
//! Three rewrite rules are cycled until a full pass changes nothing:
//!
//! - **Self-loop**: a place (neither initial nor final) or silent transition
//!   whose predecessor set equals its successor set fires as a no-op and is
//!   removed.
//! - **Parallel**: silent transitions (respectively places) sharing the same
//!   predecessor and successor sets are redundant duplicates; one survives.
//! - **Serial**: a `place -> silent transition` pair connected by the
//!   place's only outgoing and the transition's only incoming arc collapses,
//!   predecessors of the place rewired to successors of the transition;
//!   symmetrically for `silent transition -> place`.
//!
//! Every applied rule strictly decreases the place+transition count, so the
//! fixpoint is always reached.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::models::petri::{PetriArc, PetriNet, Place, Transition};

/// Reduce a net to its structural fixpoint.
pub fn reduce(net: &PetriNet) -> PetriNet {
    let mut bench = Workbench {
        places: net.places.clone(),
        transitions: net.transitions.clone(),
        arcs: net.arcs.clone(),
    };

    let mut cycles = 0usize;
    loop {
        let changed = bench.self_loop_pass() | bench.parallel_pass() | bench.serial_pass();
        cycles += 1;
        if !changed {
            break;
        }
    }
    debug!(
        cycles,
        places = bench.places.len(),
        transitions = bench.transitions.len(),
        "net reduction reached fixpoint"
    );

    PetriNet {
        id: net.id.clone(),
        places: bench.places,
        transitions: bench.transitions,
        arcs: bench.arcs,
    }
}

/// Mutable working state of one reduction run.
struct Workbench {
    places: BTreeMap<String, Place>,
    transitions: BTreeMap<String, Transition>,
    arcs: BTreeSet<PetriArc>,
}

impl Workbench {
    /// Transition ids feeding the place, ascending.
    fn place_preset(&self, place: &str) -> Vec<String> {
        self.arcs
            .iter()
            .filter_map(|arc| match arc {
                PetriArc::TransitionToPlace { transition, place: p } if p == place => {
                    Some(transition.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Transition ids fed by the place, ascending.
    fn place_postset(&self, place: &str) -> Vec<String> {
        self.arcs
            .iter()
            .filter_map(|arc| match arc {
                PetriArc::PlaceToTransition { place: p, transition } if p == place => {
                    Some(transition.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Place ids feeding the transition, ascending.
    fn transition_preset(&self, transition: &str) -> Vec<String> {
        self.arcs
            .iter()
            .filter_map(|arc| match arc {
                PetriArc::PlaceToTransition { place, transition: t } if t == transition => {
                    Some(place.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Place ids fed by the transition, ascending.
    fn transition_postset(&self, transition: &str) -> Vec<String> {
        self.arcs
            .iter()
            .filter_map(|arc| match arc {
                PetriArc::TransitionToPlace { transition: t, place } if t == transition => {
                    Some(place.clone())
                }
                _ => None,
            })
            .collect()
    }

    fn remove_place(&mut self, id: &str) {
        self.places.remove(id);
        self.arcs.retain(|arc| match arc {
            PetriArc::PlaceToTransition { place, .. }
            | PetriArc::TransitionToPlace { place, .. } => place != id,
        });
    }

    fn remove_transition(&mut self, id: &str) {
        self.transitions.remove(id);
        self.arcs.retain(|arc| match arc {
            PetriArc::PlaceToTransition { transition, .. }
            | PetriArc::TransitionToPlace { transition, .. } => transition != id,
        });
    }

    /// Remove places and silent transitions whose firing is a no-op.
    fn self_loop_pass(&mut self) -> bool {
        let mut changed = false;

        let place_ids: Vec<String> = self.places.keys().cloned().collect();
        for id in place_ids {
            let place = &self.places[&id];
            if place.is_initial || place.is_final {
                continue;
            }
            let preds = self.place_preset(&id);
            if !preds.is_empty() && preds == self.place_postset(&id) {
                self.remove_place(&id);
                changed = true;
            }
        }

        let transition_ids: Vec<String> = self.transitions.keys().cloned().collect();
        for id in transition_ids {
            if !self.transitions[&id].is_silent {
                continue;
            }
            let preds = self.transition_preset(&id);
            if !preds.is_empty() && preds == self.transition_postset(&id) {
                self.remove_transition(&id);
                changed = true;
            }
        }

        changed
    }

    /// Deduplicate silent transitions and places by connection signature.
    fn parallel_pass(&mut self) -> bool {
        let mut changed = false;

        let mut transition_groups: BTreeMap<(Vec<String>, Vec<String>), Vec<String>> =
            BTreeMap::new();
        for id in self.transitions.keys() {
            if self.transitions[id].is_silent {
                let signature = (self.transition_preset(id), self.transition_postset(id));
                transition_groups.entry(signature).or_default().push(id.clone());
            }
        }
        for ((preds, _), group) in transition_groups {
            if preds.is_empty() {
                continue;
            }
            // Ids were collected in ascending order; the first survives.
            for id in group.into_iter().skip(1) {
                self.remove_transition(&id);
                changed = true;
            }
        }

        let mut place_groups: BTreeMap<(Vec<String>, Vec<String>), Vec<String>> = BTreeMap::new();
        for id in self.places.keys() {
            let signature = (self.place_preset(id), self.place_postset(id));
            place_groups.entry(signature).or_default().push(id.clone());
        }
        for ((preds, _), group) in place_groups {
            if preds.is_empty() || group.len() < 2 {
                continue;
            }
            let flagged: Vec<&String> = group
                .iter()
                .filter(|id| self.places[*id].is_initial || self.places[*id].is_final)
                .collect();
            let keep: BTreeSet<String> = if flagged.is_empty() {
                BTreeSet::from([group[0].clone()])
            } else {
                // Marked places carry the initial/final marking and are
                // never the ones dropped.
                flagged.into_iter().cloned().collect()
            };
            for id in group {
                if !keep.contains(&id) {
                    self.remove_place(&id);
                    changed = true;
                }
            }
        }

        changed
    }

    /// Collapse single-entry/single-exit chains through silent transitions.
    fn serial_pass(&mut self) -> bool {
        let mut changed = false;
        loop {
            if self.collapse_place_into_transition() || self.collapse_transition_into_place() {
                changed = true;
                continue;
            }
            break;
        }
        changed
    }

    /// One `place -> silent transition` collapse, if a candidate exists.
    fn collapse_place_into_transition(&mut self) -> bool {
        let place_ids: Vec<String> = self.places.keys().cloned().collect();
        for place_id in place_ids {
            if self.places[&place_id].is_initial {
                continue;
            }
            let postset = self.place_postset(&place_id);
            let [transition_id] = postset.as_slice() else {
                continue;
            };
            let transition_id = transition_id.clone();
            if !self.transitions[&transition_id].is_silent
                || self.transition_preset(&transition_id) != [place_id.clone()]
            {
                continue;
            }
            let preds = self.place_preset(&place_id);
            let succs = self.transition_postset(&transition_id);
            self.remove_place(&place_id);
            self.remove_transition(&transition_id);
            for pred in &preds {
                for succ in &succs {
                    if pred != &transition_id && succ != &place_id {
                        self.arcs.insert(PetriArc::TransitionToPlace {
                            transition: pred.clone(),
                            place: succ.clone(),
                        });
                    }
                }
            }
            return true;
        }
        false
    }

    /// One `silent transition -> place` collapse, if a candidate exists.
    fn collapse_transition_into_place(&mut self) -> bool {
        let transition_ids: Vec<String> = self.transitions.keys().cloned().collect();
        for transition_id in transition_ids {
            if !self.transitions[&transition_id].is_silent {
                continue;
            }
            let postset = self.transition_postset(&transition_id);
            let [place_id] = postset.as_slice() else {
                continue;
            };
            let place_id = place_id.clone();
            if self.places[&place_id].is_final
                || self.place_preset(&place_id) != [transition_id.clone()]
            {
                continue;
            }
            let preds = self.transition_preset(&transition_id);
            let succs = self.place_postset(&place_id);
            self.remove_transition(&transition_id);
            self.remove_place(&place_id);
            for pred in &preds {
                for succ in &succs {
                    if pred != &place_id && succ != &transition_id {
                        self.arcs.insert(PetriArc::PlaceToTransition {
                            place: pred.clone(),
                            transition: succ.clone(),
                        });
                    }
                }
            }
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::petri::{PetriNet, Place, Transition};

    #[test]
    fn test_self_loop_place_removed() {
        // p's predecessor set {t} equals its successor set {t}; t's other
        // arcs stay intact.
        let net = PetriNet::builder("n")
            .with_place(Place::new("p", "p"))
            .with_place(Place::new("in", "in").initial())
            .with_place(Place::new("out", "out").terminal())
            .with_transition(Transition::visible("t", "t"))
            .with_arc_pt("in", "t")
            .with_arc_tp("t", "out")
            .with_arc_tp("t", "p")
            .with_arc_pt("p", "t")
            .build()
            .unwrap();
        let reduced = reduce(&net);
        assert!(reduced.place("p").is_none());
        assert_eq!(reduced.transition_preset("t"), vec!["in"]);
        assert_eq!(reduced.transition_postset("t"), vec!["out"]);
    }

    #[test]
    fn test_self_loop_silent_transition_removed() {
        let net = PetriNet::builder("n")
            .with_place(Place::new("p", "p").initial().terminal())
            .with_transition(Transition::silent("tau"))
            .with_arc_pt("p", "tau")
            .with_arc_tp("tau", "p")
            .build()
            .unwrap();
        let reduced = reduce(&net);
        assert!(reduced.transition("tau").is_none());
        assert!(reduced.place("p").is_some());
    }

    #[test]
    fn test_parallel_silent_transitions_collapse() {
        // Two silent transitions both wired p1 -> tau -> p2.
        let net = PetriNet::builder("n")
            .with_place(Place::new("p1", "p1").initial())
            .with_place(Place::new("p2", "p2").terminal())
            .with_transition(Transition::silent("tau_a"))
            .with_transition(Transition::silent("tau_b"))
            .with_arc_pt("p1", "tau_a")
            .with_arc_tp("tau_a", "p2")
            .with_arc_pt("p1", "tau_b")
            .with_arc_tp("tau_b", "p2")
            .build()
            .unwrap();
        let reduced = reduce(&net);
        assert_eq!(reduced.transition_count(), 1);
        assert!(reduced.transition("tau_a").is_some());
        assert!(reduced.transition("tau_b").is_none());
    }

    #[test]
    fn test_parallel_places_keep_marked_one() {
        let net = PetriNet::builder("n")
            .with_place(Place::new("marked", "marked").initial())
            .with_place(Place::new("copy", "copy"))
            .with_transition(Transition::visible("a", "a"))
            .with_transition(Transition::visible("b", "b"))
            .with_arc_tp("a", "marked")
            .with_arc_tp("a", "copy")
            .with_arc_pt("marked", "b")
            .with_arc_pt("copy", "b")
            .build()
            .unwrap();
        let reduced = reduce(&net);
        assert!(reduced.place("marked").is_some());
        assert!(reduced.place("copy").is_none());
    }

    #[test]
    fn test_serial_place_transition_collapse() {
        // a -> p -> tau -> q -> b becomes a -> q -> b.
        let net = PetriNet::builder("n")
            .with_place(Place::new("start", "start").initial())
            .with_place(Place::new("p", "p"))
            .with_place(Place::new("q", "q"))
            .with_place(Place::new("end", "end").terminal())
            .with_transition(Transition::visible("a", "a"))
            .with_transition(Transition::visible("b", "b"))
            .with_transition(Transition::silent("tau"))
            .with_arc_pt("start", "a")
            .with_arc_tp("a", "p")
            .with_arc_pt("p", "tau")
            .with_arc_tp("tau", "q")
            .with_arc_pt("q", "b")
            .with_arc_tp("b", "end")
            .build()
            .unwrap();
        let reduced = reduce(&net);
        assert!(reduced.place("p").is_none());
        assert!(reduced.transition("tau").is_none());
        assert_eq!(reduced.transition_postset("a"), vec!["q"]);
        assert_eq!(reduced.place_postset("q"), vec!["b"]);
    }

    #[test]
    fn test_initial_place_never_serially_collapsed() {
        // start -> tau -> p: the place->transition rule must not consume the
        // initial place; the transition->place rule removes tau and p's
        // entry chain instead, keeping start marked.
        let net = PetriNet::builder("n")
            .with_place(Place::new("start", "start").initial())
            .with_place(Place::new("p", "p"))
            .with_place(Place::new("end", "end").terminal())
            .with_transition(Transition::silent("tau"))
            .with_transition(Transition::visible("a", "a"))
            .with_arc_pt("start", "tau")
            .with_arc_tp("tau", "p")
            .with_arc_pt("p", "a")
            .with_arc_tp("a", "end")
            .build()
            .unwrap();
        let reduced = reduce(&net);
        assert!(reduced.place("start").is_some());
        assert!(reduced.place("start").unwrap().is_initial);
        assert!(reduced.transition("tau").is_none());
        assert_eq!(reduced.place_postset("start"), vec!["a"]);
    }

    #[test]
    fn test_reduce_is_idempotent() {
        let net = PetriNet::builder("n")
            .with_place(Place::new("start", "start").initial())
            .with_place(Place::new("p", "p"))
            .with_place(Place::new("q", "q"))
            .with_place(Place::new("end", "end").terminal())
            .with_transition(Transition::visible("a", "a"))
            .with_transition(Transition::silent("tau1"))
            .with_transition(Transition::silent("tau2"))
            .with_arc_pt("start", "a")
            .with_arc_tp("a", "p")
            .with_arc_pt("p", "tau1")
            .with_arc_tp("tau1", "q")
            .with_arc_pt("p", "tau2")
            .with_arc_tp("tau2", "q")
            .with_arc_pt("q", "tau1")
            .build()
            .unwrap();
        let once = reduce(&net);
        let twice = reduce(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_visible_transitions_never_removed() {
        let net = PetriNet::builder("n")
            .with_place(Place::new("p", "p").initial().terminal())
            .with_transition(Transition::visible("a", "a"))
            .with_arc_pt("p", "a")
            .with_arc_tp("a", "p")
            .build()
            .unwrap();
        let reduced = reduce(&net);
        assert!(reduced.transition("a").is_some());
    }
}
