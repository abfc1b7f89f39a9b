//! Heuristic state-space replay of traces against a bipartite net.
//!
//! The replay decides *perfect fit* only: whether firing transitions from
//! the initial marking can reproduce exactly the target activity sequence
//! and end on the final marking. Search states are pruned as soon as their
//! visible firing sequence stops being a prefix of the target, and a
//! best-first frontier ordered by the admissible remaining-length heuristic
//! drives the search towards the goal.
//!
//! Searches over independent traces share nothing but the immutable net;
//! [`replay_all`] runs one search per trace in parallel.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashSet};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::models::petri::PetriNet;
use crate::{ProcnetError, Result};

/// One state of a replay search.
///
/// States are search-node-local: firing a transition produces a new state,
/// never mutates an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayState {
    /// Place ids currently holding a token.
    pub tokens: BTreeSet<String>,
    /// Ids of the visible transitions fired so far, in order.
    pub fired_visible: Vec<String>,
}

impl ReplayState {
    /// The initial state of a net: its initial marking, nothing fired.
    pub fn initial(net: &PetriNet) -> Self {
        Self {
            tokens: net.initial_marking(),
            fired_visible: Vec::new(),
        }
    }

    /// Check whether this state is the goal for the given target sequence.
    pub fn is_goal(&self, net: &PetriNet, target: &[String]) -> bool {
        self.fired_visible == target && self.tokens == net.final_marking()
    }

    /// Transition ids enabled in this state, ascending.
    pub fn enabled(&self, net: &PetriNet) -> Vec<String> {
        net.transitions()
            .filter(|t| {
                let preset = net.transition_preset(&t.id);
                !preset.is_empty() && preset.iter().all(|p| self.tokens.contains(*p))
            })
            .map(|t| t.id.clone())
            .collect()
    }

    /// Fire a transition, producing the successor state.
    ///
    /// The caller guarantees the transition is enabled. Visible transitions
    /// append their id to the fired sequence; silent ones only move tokens.
    pub fn fire(&self, net: &PetriNet, transition: &str) -> Self {
        let mut tokens = self.tokens.clone();
        for place in net.transition_preset(transition) {
            tokens.remove(place);
        }
        for place in net.transition_postset(transition) {
            tokens.insert(place.to_string());
        }
        let mut fired_visible = self.fired_visible.clone();
        if let Some(t) = net.transition(transition) {
            if !t.is_silent {
                fired_visible.push(t.id.clone());
            }
        }
        Self {
            tokens,
            fired_visible,
        }
    }

    /// Check whether the state can still reach the target: the fired
    /// sequence must be a prefix of it.
    pub fn is_alive(&self, target: &[String]) -> bool {
        self.fired_visible.len() <= target.len()
            && self.fired_visible == target[..self.fired_visible.len()]
    }

    /// Admissible heuristic: visible firings still required. Never
    /// overestimates, since each remaining target activity needs at least
    /// one visible firing.
    pub fn remaining(&self, target: &[String]) -> usize {
        target.len().saturating_sub(self.fired_visible.len())
    }
}

/// Replay a trace against a net, deciding perfect fit.
///
/// A trace naming an activity id absent from the net's visible transitions
/// does not fit and is rejected without searching. An expired `timeout`
/// raises [`ProcnetError::ReplayTimeout`]; it is never reported as
/// non-fit.
pub fn replay(net: &PetriNet, trace: &[String], timeout: Option<Duration>) -> Result<bool> {
    let known: BTreeSet<&str> = net.activities().map(|t| t.id.as_str()).collect();
    if let Some(unknown) = trace.iter().find(|id| !known.contains(id.as_str())) {
        debug!(activity = %unknown, "trace references an activity absent from the net");
        return Ok(false);
    }

    let started = Instant::now();
    let deadline = timeout.map(|limit| started + limit);

    let mut frontier: BinaryHeap<Reverse<(usize, usize)>> = BinaryHeap::new();
    let mut states: Vec<ReplayState> = Vec::new();
    let mut seen: HashSet<(Vec<String>, usize)> = HashSet::new();

    let initial = ReplayState::initial(net);
    frontier.push(Reverse((initial.remaining(trace), 0)));
    states.push(initial);

    let mut expanded = 0usize;
    while let Some(Reverse((_, index))) = frontier.pop() {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return Err(ProcnetError::ReplayTimeout {
                    elapsed_ms: started.elapsed().as_millis() as u64,
                });
            }
        }

        let state = states[index].clone();
        if state.is_goal(net, trace) {
            trace!(expanded, "replay reached the goal marking");
            return Ok(true);
        }
        expanded += 1;

        for transition in state.enabled(net) {
            let next = state.fire(net, &transition);
            if !next.is_alive(trace) {
                continue;
            }
            let key = (
                next.tokens.iter().cloned().collect::<Vec<_>>(),
                next.fired_visible.len(),
            );
            if !seen.insert(key) {
                continue;
            }
            let index = states.len();
            frontier.push(Reverse((next.remaining(trace), index)));
            states.push(next);
        }
    }

    trace!(expanded, "replay exhausted the state space");
    Ok(false)
}

/// Replay many independent traces in parallel over one shared net.
///
/// Each trace gets its own search and its own timeout budget; results keep
/// the input order.
pub fn replay_all(
    net: &PetriNet,
    traces: &[Vec<String>],
    timeout: Option<Duration>,
) -> Vec<Result<bool>> {
    traces
        .par_iter()
        .map(|trace| replay(net, trace, timeout))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::petri::{Place, Transition};

    /// p0 -> a -> p1 -> b -> p2, with a silent detour p1 -> tau -> p1x -> c -> p2.
    fn choice_net() -> PetriNet {
        PetriNet::builder("n")
            .with_place(Place::new("p0", "p0").initial())
            .with_place(Place::new("p1", "p1"))
            .with_place(Place::new("p1x", "p1x"))
            .with_place(Place::new("p2", "p2").terminal())
            .with_transition(Transition::visible("a", "a"))
            .with_transition(Transition::visible("b", "b"))
            .with_transition(Transition::visible("c", "c"))
            .with_transition(Transition::silent("tau"))
            .with_arc_pt("p0", "a")
            .with_arc_tp("a", "p1")
            .with_arc_pt("p1", "b")
            .with_arc_tp("b", "p2")
            .with_arc_pt("p1", "tau")
            .with_arc_tp("tau", "p1x")
            .with_arc_pt("p1x", "c")
            .with_arc_tp("c", "p2")
            .build()
            .unwrap()
    }

    fn trace(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_canonical_sequence_fits() {
        let net = choice_net();
        assert!(replay(&net, &trace(&["a", "b"]), None).unwrap());
    }

    #[test]
    fn test_silent_detour_found() {
        let net = choice_net();
        assert!(replay(&net, &trace(&["a", "c"]), None).unwrap());
    }

    #[test]
    fn test_wrong_order_does_not_fit() {
        let net = choice_net();
        assert!(!replay(&net, &trace(&["b", "a"]), None).unwrap());
    }

    #[test]
    fn test_incomplete_trace_does_not_fit() {
        // Stopping after a leaves a token outside the final marking.
        let net = choice_net();
        assert!(!replay(&net, &trace(&["a"]), None).unwrap());
    }

    #[test]
    fn test_unknown_activity_rejected_without_search() {
        let net = choice_net();
        assert!(!replay(&net, &trace(&["a", "ghost"]), None).unwrap());
    }

    #[test]
    fn test_empty_trace_fits_only_if_initially_final() {
        let net = choice_net();
        assert!(!replay(&net, &trace(&[]), None).unwrap());

        let trivial = PetriNet::builder("t")
            .with_place(Place::new("p", "p").initial().terminal())
            .build()
            .unwrap();
        assert!(replay(&trivial, &trace(&[]), None).unwrap());
    }

    #[test]
    fn test_timeout_is_a_distinct_failure() {
        let net = choice_net();
        let result = replay(&net, &trace(&["a", "b"]), Some(Duration::ZERO));
        assert!(matches!(
            result,
            Err(ProcnetError::ReplayTimeout { .. })
        ));
    }

    #[test]
    fn test_replay_all_keeps_order() {
        let net = choice_net();
        let traces = vec![trace(&["a", "b"]), trace(&["a", "c"]), trace(&["c"])];
        let results = replay_all(&net, &traces, None);
        assert_eq!(results, vec![Ok(true), Ok(true), Ok(false)]);
    }

    #[test]
    fn test_silent_loop_terminates() {
        // tau cycles a token between p1 and p1b forever; the visited set
        // keeps the search finite and the answer is non-fit.
        let net = PetriNet::builder("loop")
            .with_place(Place::new("p0", "p0").initial())
            .with_place(Place::new("p1", "p1"))
            .with_place(Place::new("p1b", "p1b"))
            .with_place(Place::new("p2", "p2").terminal())
            .with_transition(Transition::visible("a", "a"))
            .with_transition(Transition::silent("tau_fwd"))
            .with_transition(Transition::silent("tau_back"))
            .with_transition(Transition::visible("b", "b"))
            .with_arc_pt("p0", "a")
            .with_arc_tp("a", "p1")
            .with_arc_pt("p1", "tau_fwd")
            .with_arc_tp("tau_fwd", "p1b")
            .with_arc_pt("p1b", "tau_back")
            .with_arc_tp("tau_back", "p1")
            .with_arc_pt("p1b", "b")
            .with_arc_tp("b", "p2")
            .build()
            .unwrap();
        assert!(replay(&net, &trace(&["a", "b"]), None).unwrap());
        assert!(!replay(&net, &trace(&["a", "a"]), None).unwrap());
    }
}
