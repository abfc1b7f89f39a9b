//! Translation between graph formalisms.
//!
//! - [`dfg_to_petri`]: each activity becomes an `input place -> visible
//!   transition -> output place` triple; each directly-follows arc a silent
//!   bridge; global initial/final places wire up the boundary activities.
//! - [`causal_to_petri`]: bindings become silent fan transitions over
//!   per-activity-pair link places.
//! - [`petri_to_causal`]: visible transitions recover their causal bindings
//!   by resolving adjacent places, inlining silent transitions through a
//!   memoized recursion with a cycle guard.
//!
//! Directions whose target encoding differs from the natural result compose
//! these with the dualization of
//! [`bindings`](crate::algorithms::bindings). Every produced net is run
//! through [`reduce`](crate::algorithms::reduce::reduce) before it is
//! returned.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::algorithms::bindings::{convert_model, ConvertedModel, FidelityFlags};
use crate::algorithms::reduce::reduce;
use crate::models::causal::{
    CausalActivity, CausalConnections, CausalFormalism, CausalModel,
};
use crate::models::dfg::DirectlyFollowsGraph;
use crate::models::petri::{PetriNet, Place, Transition};
use crate::Result;

/// A translated net together with the fidelity flags collected on the way.
///
/// Flags are non-default only when the translation involved a causal
/// dualization that could not be exact.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedNet {
    /// The reduced result net.
    pub net: PetriNet,
    /// Aggregated conversion fidelity flags.
    pub flags: FidelityFlags,
}

/// Translate a directly-follows graph into a reduced place/transition net.
pub fn dfg_to_petri(dfg: &DirectlyFollowsGraph) -> Result<PetriNet> {
    let mut builder = PetriNet::builder(dfg.id.clone());

    for activity in dfg.activities() {
        builder = builder
            .with_place(Place::new(input_place(&activity.id), input_place(&activity.id)))
            .with_place(Place::new(output_place(&activity.id), output_place(&activity.id)))
            .with_transition(Transition::visible(activity.id.clone(), activity.name.clone()))
            .with_arc_pt(input_place(&activity.id), activity.id.clone())
            .with_arc_tp(activity.id.clone(), output_place(&activity.id));
    }

    for arc in dfg.arcs() {
        let bridge = format!("tau:{}->{}", arc.source, arc.target);
        builder = builder
            .with_transition(Transition::silent(bridge.clone()))
            .with_arc_pt(output_place(&arc.source), bridge.clone())
            .with_arc_tp(bridge, input_place(&arc.target));
    }

    let sources = dfg.sources();
    if !sources.is_empty() {
        builder = builder.with_place(Place::new("p_initial", "p_initial").initial());
        for activity in sources {
            let tau = format!("tau_src:{}", activity.id);
            builder = builder
                .with_transition(Transition::silent(tau.clone()))
                .with_arc_pt("p_initial", tau.clone())
                .with_arc_tp(tau, input_place(&activity.id));
        }
    }
    let sinks = dfg.sinks();
    if !sinks.is_empty() {
        builder = builder.with_place(Place::new("p_final", "p_final").terminal());
        for activity in sinks {
            let tau = format!("tau_snk:{}", activity.id);
            builder = builder
                .with_transition(Transition::silent(tau.clone()))
                .with_arc_pt(output_place(&activity.id), tau.clone())
                .with_arc_tp(tau, "p_final");
        }
    }

    let net = builder.build()?;
    debug!(
        places = net.place_count(),
        transitions = net.transition_count(),
        "translated DFG to net"
    );
    Ok(reduce(&net))
}

/// Translate a causal model into a reduced place/transition net.
///
/// A Causal-Matrix-tagged model is first dualized into its Causal-Net
/// encoding; the returned flags report that conversion's fidelity.
pub fn causal_to_petri(model: &CausalModel) -> Result<TranslatedNet> {
    let converted = convert_model(model, CausalFormalism::CausalNet)?;
    let model = &converted.model;
    let mut builder = PetriNet::builder(model.id.clone());
    let mut link_places: BTreeSet<(String, String)> = BTreeSet::new();

    for activity in model.activities() {
        builder = builder
            .with_place(Place::new(input_place(&activity.id), input_place(&activity.id)))
            .with_place(Place::new(output_place(&activity.id), output_place(&activity.id)))
            .with_transition(Transition::visible(activity.id.clone(), activity.name.clone()))
            .with_arc_pt(input_place(&activity.id), activity.id.clone())
            .with_arc_tp(activity.id.clone(), output_place(&activity.id));
    }

    for activity in model.activities() {
        for (index, binding) in activity.inputs.iter().enumerate() {
            let tau = format!("tau_in:{}:{}", activity.id, index);
            builder = builder
                .with_transition(Transition::silent(tau.clone()))
                .with_arc_tp(tau.clone(), input_place(&activity.id));
            for pred in binding {
                let link = link_place(pred, &activity.id);
                if link_places.insert((pred.clone(), activity.id.clone())) {
                    builder = builder.with_place(Place::new(link.clone(), link.clone()));
                }
                builder = builder.with_arc_pt(link, tau.clone());
            }
        }
        for (index, binding) in activity.outputs.iter().enumerate() {
            let tau = format!("tau_out:{}:{}", activity.id, index);
            builder = builder
                .with_transition(Transition::silent(tau.clone()))
                .with_arc_pt(output_place(&activity.id), tau.clone());
            for succ in binding {
                let link = link_place(&activity.id, succ);
                if link_places.insert((activity.id.clone(), succ.clone())) {
                    builder = builder.with_place(Place::new(link.clone(), link.clone()));
                }
                builder = builder.with_arc_tp(tau.clone(), link);
            }
        }
    }

    let starts: Vec<String> = model
        .activities()
        .filter(|a| a.is_start())
        .map(|a| a.id.clone())
        .collect();
    if !starts.is_empty() {
        builder = builder.with_place(Place::new("p_initial", "p_initial").initial());
        for id in starts {
            let tau = format!("tau_src:{id}");
            builder = builder
                .with_transition(Transition::silent(tau.clone()))
                .with_arc_pt("p_initial", tau.clone())
                .with_arc_tp(tau, input_place(&id));
        }
    }
    let ends: Vec<String> = model
        .activities()
        .filter(|a| a.is_end())
        .map(|a| a.id.clone())
        .collect();
    if !ends.is_empty() {
        builder = builder.with_place(Place::new("p_final", "p_final").terminal());
        for id in ends {
            let tau = format!("tau_snk:{id}");
            builder = builder
                .with_transition(Transition::silent(tau.clone()))
                .with_arc_pt(output_place(&id), tau.clone())
                .with_arc_tp(tau, "p_final");
        }
    }

    let net = builder.build()?;
    Ok(TranslatedNet {
        net: reduce(&net),
        flags: converted.flags,
    })
}

/// Recover a Causal-Net-tagged model from a place/transition net.
///
/// Per visible transition and direction, each adjacent place contributes its
/// far-side transitions as alternatives; silent transitions are inlined
/// recursively (memoized per id, guarded against resolution loops) and the
/// per-place alternatives combine through a duplicate-aware cartesian
/// product.
pub fn petri_to_causal(net: &PetriNet) -> Result<CausalModel> {
    let mut inputs_resolver = Resolver::new(net, Side::Inputs);
    let mut outputs_resolver = Resolver::new(net, Side::Outputs);

    let mut builder = CausalModel::builder(net.id.clone(), CausalFormalism::CausalNet);
    for transition in net.activities() {
        let inputs = inputs_resolver.connections_of(&transition.id);
        let outputs = outputs_resolver.connections_of(&transition.id);
        builder = builder.with_activity(CausalActivity {
            id: transition.id.clone(),
            name: transition.name.clone(),
            inputs,
            outputs,
        });
    }
    builder.build()
}

/// Recover a Causal-Matrix-tagged model from a place/transition net.
pub fn petri_to_causal_matrix(net: &PetriNet) -> Result<ConvertedModel> {
    let causal = petri_to_causal(net)?;
    convert_model(&causal, CausalFormalism::CausalMatrix)
}

/// Translate a directly-follows graph into a Causal-Net-tagged model.
pub fn dfg_to_causal_net(dfg: &DirectlyFollowsGraph) -> Result<CausalModel> {
    let net = dfg_to_petri(dfg)?;
    petri_to_causal(&net)
}

/// Translate a directly-follows graph into a Causal-Matrix-tagged model.
pub fn dfg_to_causal_matrix(dfg: &DirectlyFollowsGraph) -> Result<ConvertedModel> {
    let net = dfg_to_petri(dfg)?;
    petri_to_causal_matrix(&net)
}

fn input_place(activity: &str) -> String {
    format!("in:{activity}")
}

fn output_place(activity: &str) -> String {
    format!("out:{activity}")
}

fn link_place(source: &str, target: &str) -> String {
    format!("link:{source}->{target}")
}

/// Which side of a transition is being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Inputs,
    Outputs,
}

/// Binding resolution over one direction of a net.
struct Resolver<'a> {
    net: &'a PetriNet,
    side: Side,
    /// Resolved bindings per silent transition id.
    memo: HashMap<String, BTreeSet<BTreeSet<String>>>,
    /// Silent ids on the current resolution chain; re-entering one of these
    /// means a loop of silent transitions closed, which contributes nothing
    /// at the point of closure.
    in_progress: HashSet<String>,
}

impl<'a> Resolver<'a> {
    fn new(net: &'a PetriNet, side: Side) -> Self {
        Self {
            net,
            side,
            memo: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    /// The causal connections of a visible transition in this direction.
    fn connections_of(&mut self, transition: &str) -> CausalConnections {
        let places = self.adjacent_places(transition);
        let mut bindings = self.combine_places(&places);
        // An activity at the net boundary resolves to the empty binding;
        // normalized, that is the empty outer set (start/end activity).
        bindings.retain(|b| !b.is_empty());
        bindings
    }

    fn adjacent_places(&self, transition: &str) -> Vec<String> {
        let places = match self.side {
            Side::Inputs => self.net.transition_preset(transition),
            Side::Outputs => self.net.transition_postset(transition),
        };
        places.into_iter().map(str::to_string).collect()
    }

    fn far_side_transitions(&self, place: &str) -> Vec<String> {
        let transitions = match self.side {
            Side::Inputs => self.net.place_preset(place),
            Side::Outputs => self.net.place_postset(place),
        };
        transitions.into_iter().map(str::to_string).collect()
    }

    /// Alternatives a single place offers: every far-side visible transition
    /// as a singleton, every far-side silent transition inlined.
    fn place_alternatives(&mut self, place: &str) -> BTreeSet<BTreeSet<String>> {
        let mut alternatives = BTreeSet::new();
        for transition in self.far_side_transitions(place) {
            let is_silent = self
                .net
                .transition(&transition)
                .map(|t| t.is_silent)
                .unwrap_or(false);
            if is_silent {
                alternatives.extend(self.resolve_silent(&transition));
            } else {
                alternatives.insert(BTreeSet::from([transition]));
            }
        }
        alternatives
    }

    /// Resolved bindings of a silent transition, memoized by id.
    fn resolve_silent(&mut self, transition: &str) -> BTreeSet<BTreeSet<String>> {
        if let Some(resolved) = self.memo.get(transition) {
            return resolved.clone();
        }
        if !self.in_progress.insert(transition.to_string()) {
            return BTreeSet::new();
        }
        let places = self.adjacent_places(transition);
        let resolved = self.combine_places(&places);
        self.in_progress.remove(transition);
        self.memo.insert(transition.to_string(), resolved.clone());
        resolved
    }

    /// Cartesian combination of per-place alternatives. A place without any
    /// resolvable far side (the net boundary) constrains nothing and is
    /// skipped; duplicate ids merge instead of expanding twice.
    fn combine_places(&mut self, places: &[String]) -> BTreeSet<BTreeSet<String>> {
        let mut combined: Vec<BTreeSet<String>> = vec![BTreeSet::new()];
        for place in places {
            let alternatives = self.place_alternatives(place);
            if alternatives.is_empty() {
                continue;
            }
            let mut extended = Vec::with_capacity(combined.len() * alternatives.len());
            for binding in &combined {
                for alternative in &alternatives {
                    let mut next = binding.clone();
                    next.extend(alternative.iter().cloned());
                    extended.push(next);
                }
            }
            combined = extended;
        }
        combined.into_iter().collect()
    }
}
