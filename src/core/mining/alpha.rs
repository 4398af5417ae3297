// FairMine - core/mining/alpha.rs
//
// Alpha miner. Places are the maximal pairs (A, B) where every a in A is
// causally followed by every b in B and both sets are internally unrelated,
// plus a source place feeding the start activities and a sink place fed by
// the end activities. Length-one loops are not represented.

use super::{Dfg, IndexedLog};
use crate::core::petri::{AcceptingPetriNet, PetriNet};
use crate::util::constants;
use std::collections::{BTreeSet, HashSet};

type Pair = (BTreeSet<usize>, BTreeSet<usize>);

pub fn discover(log: &IndexedLog) -> AcceptingPetriNet {
    let dfg = Dfg::from_traces(&log.traces);
    let activities: Vec<usize> = dfg.activities().into_iter().collect();
    let places = maximal_pairs(&dfg, &activities);

    let mut net = PetriNet::new();
    let transitions: Vec<usize> = (0..log.activities.len())
        .map(|i| net.add_transition(log.activities[i].clone(), Some(log.activities[i].clone())))
        .collect();

    let source = net.add_place("source");
    let sink = net.add_place("sink");
    for &s in dfg.start.keys() {
        net.add_input_arc(source, transitions[s]);
    }
    for &e in dfg.end.keys() {
        net.add_output_arc(transitions[e], sink);
    }

    for (inputs, outputs) in &places {
        let name = format!(
            "({{{}}},{{{}}})",
            join_names(log, inputs),
            join_names(log, outputs)
        );
        let p = net.add_place(name);
        for &a in inputs {
            net.add_output_arc(transitions[a], p);
        }
        for &b in outputs {
            net.add_input_arc(p, transitions[b]);
        }
    }

    tracing::debug!(
        activities = activities.len(),
        places = places.len(),
        "Alpha miner finished"
    );
    AcceptingPetriNet::with_source_sink(net, source, sink)
}

/// All maximal (A, B) pairs, in deterministic order.
fn maximal_pairs(dfg: &Dfg, activities: &[usize]) -> Vec<Pair> {
    let self_unrelated = |a: usize| dfg.unrelated(a, a);

    let mut seen: HashSet<Pair> = HashSet::new();
    let mut work: Vec<Pair> = Vec::new();
    for &a in activities {
        for &b in activities {
            if a != b && dfg.causal(a, b) && self_unrelated(a) && self_unrelated(b) {
                let pair = (BTreeSet::from([a]), BTreeSet::from([b]));
                if seen.insert(pair.clone()) {
                    work.push(pair);
                }
            }
        }
    }

    let mut truncated = false;
    while let Some((inputs, outputs)) = work.pop() {
        for &x in activities {
            if !self_unrelated(x) {
                continue;
            }
            if !inputs.contains(&x)
                && !outputs.contains(&x)
                && inputs.iter().all(|&a| dfg.unrelated(a, x))
                && outputs.iter().all(|&b| dfg.causal(x, b))
            {
                let mut grown = inputs.clone();
                grown.insert(x);
                let pair = (grown, outputs.clone());
                if seen.len() < constants::ALPHA_MAX_CANDIDATES {
                    if seen.insert(pair.clone()) {
                        work.push(pair);
                    }
                } else {
                    truncated = true;
                }
            }
            if !outputs.contains(&x)
                && !inputs.contains(&x)
                && outputs.iter().all(|&b| dfg.unrelated(b, x))
                && inputs.iter().all(|&a| dfg.causal(a, x))
            {
                let mut grown = outputs.clone();
                grown.insert(x);
                let pair = (inputs.clone(), grown);
                if seen.len() < constants::ALPHA_MAX_CANDIDATES {
                    if seen.insert(pair.clone()) {
                        work.push(pair);
                    }
                } else {
                    truncated = true;
                }
            }
        }
    }
    if truncated {
        tracing::warn!(
            limit = constants::ALPHA_MAX_CANDIDATES,
            "Alpha miner candidate limit reached; some places may not be maximal"
        );
    }

    let candidates: Vec<Pair> = seen.into_iter().collect();
    let mut maximal: Vec<Pair> = candidates
        .iter()
        .filter(|(a, b)| {
            !candidates.iter().any(|(a2, b2)| {
                (a2.len() + b2.len() > a.len() + b.len()) && a.is_subset(a2) && b.is_subset(b2)
            })
        })
        .cloned()
        .collect();
    maximal.sort();
    maximal
}

fn join_names(log: &IndexedLog, set: &BTreeSet<usize>) -> String {
    set.iter()
        .map(|&i| log.activities[i].as_str())
        .collect::<Vec<_>>()
        .join(",")
}
