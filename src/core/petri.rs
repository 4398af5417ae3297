// FairMine - core/petri.rs
//
// Place/transition nets with initial and final markings. Every Petri-net
// based discovery algorithm produces an `AcceptingPetriNet`; token-based
// replay consumes it.

use std::collections::HashMap;

/// Index of a place within its net.
pub type PlaceId = usize;

/// Index of a transition within its net.
pub type TransitionId = usize;

/// Token counts indexed by `PlaceId`.
pub type Marking = Vec<u32>;

#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub name: String,
}

/// A transition with weighted input and output arcs.
///
/// `label` is `None` for silent (tau) transitions.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub name: String,
    pub label: Option<String>,
    pub inputs: Vec<(PlaceId, u32)>,
    pub outputs: Vec<(PlaceId, u32)>,
}

impl Transition {
    pub fn is_silent(&self) -> bool {
        self.label.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PetriNet {
    pub places: Vec<Place>,
    pub transitions: Vec<Transition>,
}

impl PetriNet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_place(&mut self, name: impl Into<String>) -> PlaceId {
        self.places.push(Place { name: name.into() });
        self.places.len() - 1
    }

    pub fn add_transition(&mut self, name: impl Into<String>, label: Option<String>) -> TransitionId {
        self.transitions.push(Transition {
            name: name.into(),
            label,
            inputs: Vec::new(),
            outputs: Vec::new(),
        });
        self.transitions.len() - 1
    }

    /// Add a silent transition with a generated name.
    pub fn add_silent(&mut self, prefix: &str) -> TransitionId {
        let name = format!("{prefix}_{}", self.transitions.len());
        self.add_transition(name, None)
    }

    /// Arc from place `p` to transition `t`.
    pub fn add_input_arc(&mut self, p: PlaceId, t: TransitionId) {
        add_weight(&mut self.transitions[t].inputs, p);
    }

    /// Arc from transition `t` to place `p`.
    pub fn add_output_arc(&mut self, t: TransitionId, p: PlaceId) {
        add_weight(&mut self.transitions[t].outputs, p);
    }

    pub fn empty_marking(&self) -> Marking {
        vec![0; self.places.len()]
    }

    pub fn is_enabled(&self, marking: &Marking, t: TransitionId) -> bool {
        self.transitions[t]
            .inputs
            .iter()
            .all(|&(p, w)| marking[p] >= w)
    }

    /// Fire `t`, consuming and producing tokens. The caller ensures `t` is
    /// enabled; this only saturates at zero.
    pub fn fire(&self, marking: &mut Marking, t: TransitionId) {
        let tr = &self.transitions[t];
        for &(p, w) in &tr.inputs {
            marking[p] = marking[p].saturating_sub(w);
        }
        for &(p, w) in &tr.outputs {
            marking[p] += w;
        }
    }

    /// Transitions grouped by visible label.
    pub fn label_index(&self) -> HashMap<&str, Vec<TransitionId>> {
        let mut index: HashMap<&str, Vec<TransitionId>> = HashMap::new();
        for (t, tr) in self.transitions.iter().enumerate() {
            if let Some(label) = tr.label.as_deref() {
                index.entry(label).or_default().push(t);
            }
        }
        index
    }

    pub fn silent_transitions(&self) -> Vec<TransitionId> {
        (0..self.transitions.len())
            .filter(|&t| self.transitions[t].is_silent())
            .collect()
    }

    pub fn arc_count(&self) -> usize {
        self.transitions
            .iter()
            .map(|t| t.inputs.len() + t.outputs.len())
            .sum()
    }
}

fn add_weight(arcs: &mut Vec<(PlaceId, u32)>, p: PlaceId) {
    match arcs.iter_mut().find(|(q, _)| *q == p) {
        Some((_, w)) => *w += 1,
        None => arcs.push((p, 1)),
    }
}

/// A Petri net together with its initial and final markings.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptingPetriNet {
    pub net: PetriNet,
    pub initial: Marking,
    pub final_marking: Marking,
}

impl AcceptingPetriNet {
    /// Net with a single token in `source` initially and in `sink` finally.
    pub fn with_source_sink(net: PetriNet, source: PlaceId, sink: PlaceId) -> Self {
        let mut initial = net.empty_marking();
        let mut final_marking = net.empty_marking();
        initial[source] = 1;
        final_marking[sink] = 1;
        Self {
            net,
            initial,
            final_marking,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fire_moves_tokens() {
        let mut net = PetriNet::new();
        let p0 = net.add_place("p0");
        let p1 = net.add_place("p1");
        let t = net.add_transition("a", Some("a".into()));
        net.add_input_arc(p0, t);
        net.add_output_arc(t, p1);

        let mut m = net.empty_marking();
        assert!(!net.is_enabled(&m, t));
        m[p0] = 1;
        assert!(net.is_enabled(&m, t));
        net.fire(&mut m, t);
        assert_eq!(m, vec![0, 1]);
    }

    #[test]
    fn test_duplicate_arcs_accumulate_weight() {
        let mut net = PetriNet::new();
        let p = net.add_place("p");
        let t = net.add_silent("tau");
        net.add_input_arc(p, t);
        net.add_input_arc(p, t);
        assert_eq!(net.transitions[t].inputs, vec![(p, 2)]);
        assert!(net.transitions[t].is_silent());
        assert_eq!(net.silent_transitions(), vec![t]);
    }
}
