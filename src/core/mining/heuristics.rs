// FairMine - core/mining/heuristics.rs
//
// Heuristics miner. Dependency edges are kept when their dependency measure
// reaches the threshold:
//     a != b : (|a>b| - |b>a|) / (|a>b| + |b>a| + 1)
//     a == b : |a>a| / (|a>a| + 1)
// Outgoing and incoming edges of each activity are grouped into AND bindings
// by the AND measure; bindings are XOR alternatives. The resulting causal net
// becomes a Petri net where every activity has an input and an output place,
// every kept edge has its own place, and silent transitions fire bindings.

use super::{Dfg, IndexedLog, UnionFind};
use crate::core::petri::{AcceptingPetriNet, PetriNet};
use crate::util::constants;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicsParams {
    pub dependency_threshold: f64,
    pub and_threshold: f64,
    pub min_dfg_occurrences: u64,
}

impl HeuristicsParams {
    pub fn with_dependency(dependency_threshold: f64) -> Self {
        Self {
            dependency_threshold,
            and_threshold: constants::HEURISTICS_AND_THRESHOLD,
            min_dfg_occurrences: constants::HEURISTICS_MIN_DFG_OCCURRENCES,
        }
    }
}

/// Dependency measure of the edge `a -> b`.
pub fn dependency(dfg: &Dfg, a: usize, b: usize) -> f64 {
    let ab = dfg.count(a, b) as f64;
    if a == b {
        return ab / (ab + 1.0);
    }
    let ba = dfg.count(b, a) as f64;
    (ab - ba) / (ab + ba + 1.0)
}

/// Dependency edges passing both thresholds.
pub fn dependency_edges(dfg: &Dfg, params: &HeuristicsParams) -> Vec<(usize, usize)> {
    dfg.edges
        .iter()
        .filter(|(&(a, b), &count)| {
            count >= params.min_dfg_occurrences
                && dependency(dfg, a, b) >= params.dependency_threshold
        })
        .map(|(&edge, _)| edge)
        .collect()
}

pub fn discover(log: &IndexedLog, params: &HeuristicsParams) -> AcceptingPetriNet {
    let dfg = Dfg::from_traces(&log.traces);
    let edges = dependency_edges(&dfg, params);

    let mut net = PetriNet::new();
    let source = net.add_place("source");
    let sink = net.add_place("sink");

    let n = log.activities.len();
    let mut in_place = Vec::with_capacity(n);
    let mut out_place = Vec::with_capacity(n);
    for name in &log.activities {
        let pin = net.add_place(format!("in_{name}"));
        let pout = net.add_place(format!("out_{name}"));
        let t = net.add_transition(name.clone(), Some(name.clone()));
        net.add_input_arc(pin, t);
        net.add_output_arc(t, pout);
        in_place.push(pin);
        out_place.push(pout);
    }

    for &s in dfg.start.keys() {
        let t = net.add_silent("start");
        net.add_input_arc(source, t);
        net.add_output_arc(t, in_place[s]);
    }
    for &e in dfg.end.keys() {
        let t = net.add_silent("end");
        net.add_input_arc(out_place[e], t);
        net.add_output_arc(t, sink);
    }

    let mut edge_place = BTreeMap::new();
    for &(a, b) in &edges {
        let p = net.add_place(format!("{}->{}", log.activities[a], log.activities[b]));
        edge_place.insert((a, b), p);
    }

    for a in 0..n {
        let successors: Vec<usize> = edges.iter().filter(|e| e.0 == a).map(|e| e.1).collect();
        for group in and_groups(&successors, |b, c| {
            and_measure_out(&dfg, a, b, c) >= params.and_threshold
        }) {
            let t = net.add_silent("split");
            net.add_input_arc(out_place[a], t);
            for b in group {
                net.add_output_arc(t, edge_place[&(a, b)]);
            }
        }
    }
    for b in 0..n {
        let predecessors: Vec<usize> = edges.iter().filter(|e| e.1 == b).map(|e| e.0).collect();
        for group in and_groups(&predecessors, |a, c| {
            and_measure_in(&dfg, b, a, c) >= params.and_threshold
        }) {
            let t = net.add_silent("join");
            for a in group {
                net.add_input_arc(edge_place[&(a, b)], t);
            }
            net.add_output_arc(t, in_place[b]);
        }
    }

    tracing::debug!(
        threshold = params.dependency_threshold,
        edges = edges.len(),
        "Heuristics miner finished"
    );
    AcceptingPetriNet::with_source_sink(net, source, sink)
}

/// AND measure of the split `a -> {b, c}`.
fn and_measure_out(dfg: &Dfg, a: usize, b: usize, c: usize) -> f64 {
    let bc = (dfg.count(b, c) + dfg.count(c, b)) as f64;
    bc / (dfg.count(a, b) + dfg.count(a, c) + 1) as f64
}

/// AND measure of the join `{a, c} -> b`.
fn and_measure_in(dfg: &Dfg, b: usize, a: usize, c: usize) -> f64 {
    let ac = (dfg.count(a, c) + dfg.count(c, a)) as f64;
    ac / (dfg.count(a, b) + dfg.count(c, b) + 1) as f64
}

/// Partition `members` into connected components of the AND relation.
fn and_groups<F>(members: &[usize], is_and: F) -> Vec<Vec<usize>>
where
    F: Fn(usize, usize) -> bool,
{
    if members.is_empty() {
        return Vec::new();
    }
    let max = members.iter().copied().max().unwrap_or(0);
    let mut uf = UnionFind::new(max + 1);
    for (i, &x) in members.iter().enumerate() {
        for &y in &members[i + 1..] {
            if x != y && is_and(x, y) {
                uf.union(x, y);
            }
        }
    }
    uf.groups(members)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::indexed;
    use super::*;
    use crate::core::replay::Replayer;

    #[test]
    fn test_dependency_measure() {
        let log = indexed(&[("ab", 9), ("ba", 1), ("aa", 3)]);
        let dfg = Dfg::from_traces(&log.traces);
        assert!((dependency(&dfg, 0, 1) - 8.0 / 11.0).abs() < 1e-9);
        assert!((dependency(&dfg, 0, 0) - 3.0 / 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_one_keeps_no_edges() {
        let log = indexed(&[("abc", 100)]);
        let dfg = Dfg::from_traces(&log.traces);
        let edges = dependency_edges(&dfg, &HeuristicsParams::with_dependency(1.0));
        assert!(edges.is_empty(), "dependency never reaches 1.0");
    }

    #[test]
    fn test_sequence_and_parallel_fit() {
        let log = indexed(&[("abcd", 10), ("acbd", 10)]);
        let model = discover(&log, &HeuristicsParams::with_dependency(0.5));
        let replayer = Replayer::new(&model);
        assert!(replayer.replay(&["a", "b", "c", "d"]).is_fit);
        assert!(replayer.replay(&["a", "c", "b", "d"]).is_fit);
        assert!(!replayer.replay(&["a", "d"]).is_fit);
    }

    #[test]
    fn test_exclusive_choice_fits() {
        let log = indexed(&[("abd", 10), ("acd", 10)]);
        let model = discover(&log, &HeuristicsParams::with_dependency(0.5));
        let replayer = Replayer::new(&model);
        assert!(replayer.replay(&["a", "b", "d"]).is_fit);
        assert!(replayer.replay(&["a", "c", "d"]).is_fit);
        assert!(!replayer.replay(&["a", "b", "c", "d"]).is_fit);
    }
}
