// FairMine - core/mining/inductive.rs
//
// Inductive miner with infrequent-behaviour filtering (IMf).
//
// The log is split recursively by the first cut found on its directly-follows
// graph, tried in the order exclusive choice, sequence, parallel, loop. When
// no cut exists on the full graph, edges below `noise` times the strongest
// outgoing edge of their source are dropped and detection is retried. A sublog
// with no cut at all becomes a flower model. The resulting process tree is
// block-structured and converts to a sound workflow net.

use super::{Dfg, IndexedLog, UnionFind, WeightedTrace};
use crate::core::petri::{AcceptingPetriNet, PetriNet, PlaceId};
use crate::util::constants;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessTree {
    Activity(usize),
    Tau,
    Sequence(Vec<ProcessTree>),
    Xor(Vec<ProcessTree>),
    Parallel(Vec<ProcessTree>),
    Loop {
        body: Box<ProcessTree>,
        redo: Box<ProcessTree>,
    },
}

impl ProcessTree {
    /// Textual form, e.g. `->(a, X(b, c), d)`.
    pub fn render(&self, names: &[String]) -> String {
        let list = |op: &str, children: &[ProcessTree]| {
            let inner: Vec<String> = children.iter().map(|c| c.render(names)).collect();
            format!("{op}({})", inner.join(", "))
        };
        match self {
            ProcessTree::Activity(a) => names.get(*a).cloned().unwrap_or_else(|| a.to_string()),
            ProcessTree::Tau => "tau".to_string(),
            ProcessTree::Sequence(c) => list("->", c),
            ProcessTree::Xor(c) => list("X", c),
            ProcessTree::Parallel(c) => list("+", c),
            ProcessTree::Loop { body, redo } => {
                format!("*({}, {})", body.render(names), redo.render(names))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cut {
    Xor,
    Sequence,
    Parallel,
    Loop,
}

pub fn discover(log: &IndexedLog, noise: f64) -> AcceptingPetriNet {
    let tree = discover_tree(log, noise);
    tracing::debug!(
        noise,
        tree = %tree.render(&log.activities),
        "Inductive miner finished"
    );
    to_petri_net(&tree, &log.activities)
}

pub fn discover_tree(log: &IndexedLog, noise: f64) -> ProcessTree {
    mine(log.traces.clone(), noise, 0)
}

fn mine(traces: Vec<WeightedTrace>, noise: f64, depth: usize) -> ProcessTree {
    let traces = merge(traces);
    let total: u64 = traces.iter().map(|(_, w)| w).sum();
    if total == 0 {
        return ProcessTree::Tau;
    }

    let empty: u64 = traces
        .iter()
        .filter(|(t, _)| t.is_empty())
        .map(|(_, w)| w)
        .sum();
    let traces: Vec<WeightedTrace> = traces.into_iter().filter(|(t, _)| !t.is_empty()).collect();
    if traces.is_empty() {
        return ProcessTree::Tau;
    }
    if empty > 0 {
        if empty as f64 / total as f64 > noise {
            return ProcessTree::Xor(vec![ProcessTree::Tau, mine(traces, noise, depth + 1)]);
        }
        tracing::trace!(empty, total, "Dropping infrequent empty traces");
    }

    let activities: Vec<usize> = traces
        .iter()
        .flat_map(|(t, _)| t.iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    if activities.len() == 1 {
        let a = activities[0];
        let single: u64 = traces
            .iter()
            .filter(|(t, _)| t.len() == 1)
            .map(|(_, w)| w)
            .sum();
        let remaining: u64 = traces.iter().map(|(_, w)| w).sum();
        if single as f64 >= (1.0 - noise) * remaining as f64 {
            return ProcessTree::Activity(a);
        }
        return ProcessTree::Loop {
            body: Box::new(ProcessTree::Activity(a)),
            redo: Box::new(ProcessTree::Tau),
        };
    }

    if depth >= constants::INDUCTIVE_MAX_DEPTH {
        tracing::warn!(depth, "Inductive miner depth limit reached; using flower model");
        return flower(&activities);
    }

    let dfg = Dfg::from_traces(&traces);
    let found = find_cut(&dfg, &activities).or_else(|| {
        if noise > 0.0 {
            find_cut(&filter_dfg(&dfg, noise), &activities)
        } else {
            None
        }
    });

    let Some((cut, parts)) = found else {
        return flower(&activities);
    };

    let sublogs = split(cut, &parts, &traces);
    let mut children: Vec<ProcessTree> = sublogs
        .into_iter()
        .map(|sub| mine(sub, noise, depth + 1))
        .collect();

    match cut {
        Cut::Xor => ProcessTree::Xor(children),
        Cut::Sequence => ProcessTree::Sequence(children),
        Cut::Parallel => ProcessTree::Parallel(children),
        Cut::Loop => {
            let body = children.remove(0);
            let redo = if children.len() == 1 {
                children.remove(0)
            } else {
                ProcessTree::Xor(children)
            };
            ProcessTree::Loop {
                body: Box::new(body),
                redo: Box::new(redo),
            }
        }
    }
}

/// Merge identical traces, summing their weights.
fn merge(traces: Vec<WeightedTrace>) -> Vec<WeightedTrace> {
    let mut merged: BTreeMap<Vec<usize>, u64> = BTreeMap::new();
    for (trace, weight) in traces {
        *merged.entry(trace).or_default() += weight;
    }
    merged.into_iter().collect()
}

fn flower(activities: &[usize]) -> ProcessTree {
    let redo = if activities.len() == 1 {
        ProcessTree::Activity(activities[0])
    } else {
        ProcessTree::Xor(activities.iter().map(|&a| ProcessTree::Activity(a)).collect())
    };
    ProcessTree::Loop {
        body: Box::new(ProcessTree::Tau),
        redo: Box::new(redo),
    }
}

/// Drop edges, start and end activities below `noise` times the strongest
/// alternative.
fn filter_dfg(dfg: &Dfg, noise: f64) -> Dfg {
    let mut max_out: BTreeMap<usize, u64> = BTreeMap::new();
    for (&(a, _), &count) in &dfg.edges {
        let m = max_out.entry(a).or_default();
        *m = (*m).max(count);
    }
    let edges = dfg
        .edges
        .iter()
        .filter(|(&(a, _), &count)| {
            count as f64 >= noise * max_out.get(&a).copied().unwrap_or(0) as f64
        })
        .map(|(&k, &v)| (k, v))
        .collect();
    let keep_strong = |counts: &BTreeMap<usize, u64>| -> BTreeMap<usize, u64> {
        let max = counts.values().copied().max().unwrap_or(0);
        counts
            .iter()
            .filter(|(_, &c)| c as f64 >= noise * max as f64)
            .map(|(&k, &v)| (k, v))
            .collect()
    };
    Dfg {
        edges,
        start: keep_strong(&dfg.start),
        end: keep_strong(&dfg.end),
        activity_counts: dfg.activity_counts.clone(),
    }
}

fn find_cut(dfg: &Dfg, activities: &[usize]) -> Option<(Cut, Vec<Vec<usize>>)> {
    xor_cut(dfg, activities)
        .map(|p| (Cut::Xor, p))
        .or_else(|| sequence_cut(dfg, activities).map(|p| (Cut::Sequence, p)))
        .or_else(|| parallel_cut(dfg, activities).map(|p| (Cut::Parallel, p)))
        .or_else(|| loop_cut(dfg, activities).map(|p| (Cut::Loop, p)))
}

fn union_find_for(activities: &[usize]) -> UnionFind {
    UnionFind::new(activities.iter().copied().max().map_or(0, |m| m + 1))
}

/// Connected components of the undirected directly-follows graph.
fn xor_cut(dfg: &Dfg, activities: &[usize]) -> Option<Vec<Vec<usize>>> {
    let mut uf = union_find_for(activities);
    for &(a, b) in dfg.edges.keys() {
        uf.union(a, b);
    }
    let groups = uf.groups(activities);
    (groups.len() > 1).then_some(groups)
}

/// Transitive reachability over directly-follows edges.
fn reachability(dfg: &Dfg, activities: &[usize]) -> BTreeMap<usize, BTreeSet<usize>> {
    let mut reach = BTreeMap::new();
    for &a in activities {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<usize> = dfg.successors(a).into();
        while let Some(x) = queue.pop_front() {
            if seen.insert(x) {
                queue.extend(dfg.successors(x));
            }
        }
        reach.insert(a, seen);
    }
    reach
}

/// Groups activities that are mutually reachable or mutually unreachable, then
/// orders the groups so no group reaches an earlier one.
fn sequence_cut(dfg: &Dfg, activities: &[usize]) -> Option<Vec<Vec<usize>>> {
    let reach = reachability(dfg, activities);
    let reaches = |a: usize, b: usize| reach.get(&a).is_some_and(|r| r.contains(&b));

    let mut uf = union_find_for(activities);
    for (i, &a) in activities.iter().enumerate() {
        for &b in &activities[i + 1..] {
            if reaches(a, b) == reaches(b, a) {
                uf.union(a, b);
            }
        }
    }
    let mut groups = uf.groups(activities);
    if groups.len() < 2 {
        return None;
    }

    let incoming = |g: &Vec<usize>, groups: &[Vec<usize>]| {
        groups
            .iter()
            .filter(|h| *h != g && h.iter().any(|&x| g.iter().any(|&y| reaches(x, y))))
            .count()
    };
    let keys: Vec<usize> = groups.iter().map(|g| incoming(g, &groups)).collect();
    let mut order: Vec<usize> = (0..groups.len()).collect();
    order.sort_by_key(|&i| (keys[i], groups[i][0]));
    groups = order.into_iter().map(|i| groups[i].clone()).collect();

    for (i, earlier) in groups.iter().enumerate() {
        for later in &groups[i + 1..] {
            if later.iter().any(|&b| earlier.iter().any(|&a| reaches(b, a))) {
                return None;
            }
        }
    }
    Some(groups)
}

/// Components of the graph linking activities that are not directly-follows
/// in both directions. Parts lacking a start or end activity are merged into
/// the first complete part.
fn parallel_cut(dfg: &Dfg, activities: &[usize]) -> Option<Vec<Vec<usize>>> {
    let mut uf = union_find_for(activities);
    for (i, &a) in activities.iter().enumerate() {
        for &b in &activities[i + 1..] {
            if !dfg.parallel(a, b) {
                uf.union(a, b);
            }
        }
    }
    let groups = uf.groups(activities);
    if groups.len() < 2 {
        return None;
    }

    let complete = |g: &Vec<usize>| {
        g.iter().any(|a| dfg.start.contains_key(a)) && g.iter().any(|a| dfg.end.contains_key(a))
    };
    let (mut good, partial): (Vec<Vec<usize>>, Vec<Vec<usize>>) =
        groups.into_iter().partition(|g| complete(g));
    let first = good.first_mut()?;
    for g in partial {
        first.extend(g);
    }
    first.sort_unstable();
    (good.len() > 1).then_some(good)
}

/// Body = start and end activities; every other component is a redo part if
/// it leaves only towards all start activities and is entered only from all
/// end activities. Offending components join the body.
fn loop_cut(dfg: &Dfg, activities: &[usize]) -> Option<Vec<Vec<usize>>> {
    let starts: BTreeSet<usize> = dfg.start.keys().copied().collect();
    let ends: BTreeSet<usize> = dfg.end.keys().copied().collect();
    if starts.is_empty() || ends.is_empty() {
        return None;
    }
    let mut body: BTreeSet<usize> = starts.union(&ends).copied().collect();
    let rest: Vec<usize> = activities
        .iter()
        .copied()
        .filter(|a| !body.contains(a))
        .collect();
    if rest.is_empty() {
        return None;
    }

    let mut uf = union_find_for(activities);
    for &(a, b) in dfg.edges.keys() {
        if !body.contains(&a) && !body.contains(&b) {
            uf.union(a, b);
        }
    }

    let mut redo = Vec::new();
    for comp in uf.groups(&rest) {
        if redo_part_valid(dfg, &comp, &starts, &ends) {
            redo.push(comp);
        } else {
            body.extend(comp);
        }
    }
    if redo.is_empty() {
        return None;
    }
    let mut parts = vec![body.into_iter().collect::<Vec<_>>()];
    parts.extend(redo);
    Some(parts)
}

fn redo_part_valid(
    dfg: &Dfg,
    comp: &[usize],
    starts: &BTreeSet<usize>,
    ends: &BTreeSet<usize>,
) -> bool {
    comp.iter().all(|&c| {
        let exits: Vec<usize> = dfg
            .successors(c)
            .into_iter()
            .filter(|s| !comp.contains(s))
            .collect();
        let entries: Vec<usize> = dfg
            .predecessors(c)
            .into_iter()
            .filter(|p| !comp.contains(p))
            .collect();
        let exits_ok = exits.iter().all(|s| starts.contains(s))
            && (exits.is_empty() || starts.iter().all(|&s| dfg.follows(c, s)));
        let entries_ok = entries.iter().all(|p| ends.contains(p))
            && (entries.is_empty() || ends.iter().all(|&e| dfg.follows(e, c)));
        exits_ok && entries_ok
    })
}

fn split(cut: Cut, parts: &[Vec<usize>], traces: &[WeightedTrace]) -> Vec<Vec<WeightedTrace>> {
    let mut part_of: BTreeMap<usize, usize> = BTreeMap::new();
    for (i, part) in parts.iter().enumerate() {
        for &a in part {
            part_of.insert(a, i);
        }
    }
    let mut sublogs: Vec<Vec<WeightedTrace>> = vec![Vec::new(); parts.len()];

    for (trace, weight) in traces {
        match cut {
            Cut::Xor => {
                let mut counts = vec![0usize; parts.len()];
                for a in trace {
                    if let Some(&p) = part_of.get(a) {
                        counts[p] += 1;
                    }
                }
                let mut best = 0;
                for (i, &c) in counts.iter().enumerate() {
                    if c > counts[best] {
                        best = i;
                    }
                }
                let projected = trace
                    .iter()
                    .copied()
                    .filter(|a| part_of.get(a) == Some(&best))
                    .collect();
                sublogs[best].push((projected, *weight));
            }
            Cut::Sequence => {
                let mut pieces: Vec<Vec<usize>> = vec![Vec::new(); parts.len()];
                let mut current = 0;
                for &a in trace {
                    let Some(&p) = part_of.get(&a) else { continue };
                    if p >= current {
                        current = p;
                        pieces[p].push(a);
                    }
                }
                for (i, piece) in pieces.into_iter().enumerate() {
                    sublogs[i].push((piece, *weight));
                }
            }
            Cut::Parallel => {
                for (i, sub) in sublogs.iter_mut().enumerate() {
                    let projected = trace
                        .iter()
                        .copied()
                        .filter(|a| part_of.get(a) == Some(&i))
                        .collect();
                    sub.push((projected, *weight));
                }
            }
            Cut::Loop => {
                for (p, segment) in loop_segments(trace, &part_of) {
                    sublogs[p].push((segment, *weight));
                }
            }
        }
    }
    sublogs
}

/// Cut a trace into alternating body (part 0) and redo segments, inserting
/// empty body segments so the trace starts and ends in the body and no two
/// redo segments are adjacent.
fn loop_segments(trace: &[usize], part_of: &BTreeMap<usize, usize>) -> Vec<(usize, Vec<usize>)> {
    let mut segments: Vec<(usize, Vec<usize>)> = Vec::new();
    for &a in trace {
        let p = part_of.get(&a).copied().unwrap_or(0);
        match segments.last().map(|(q, _)| *q) {
            Some(q) if q == p => {
                if let Some((_, seg)) = segments.last_mut() {
                    seg.push(a);
                }
            }
            Some(q) if q != 0 && p != 0 => {
                segments.push((0, Vec::new()));
                segments.push((p, vec![a]));
            }
            None if p != 0 => {
                segments.push((0, Vec::new()));
                segments.push((p, vec![a]));
            }
            _ => segments.push((p, vec![a])),
        }
    }
    if segments.last().map_or(true, |(p, _)| *p != 0) {
        segments.push((0, Vec::new()));
    }
    segments
}

/// Convert a process tree into a workflow net with a single source and sink.
pub fn to_petri_net(tree: &ProcessTree, names: &[String]) -> AcceptingPetriNet {
    let mut net = PetriNet::new();
    let source = net.add_place("source");
    let sink = net.add_place("sink");
    build(&mut net, tree, names, source, sink);
    AcceptingPetriNet::with_source_sink(net, source, sink)
}

fn build(net: &mut PetriNet, tree: &ProcessTree, names: &[String], entry: PlaceId, exit: PlaceId) {
    match tree {
        ProcessTree::Activity(a) => {
            let name = names.get(*a).cloned().unwrap_or_else(|| a.to_string());
            let t = net.add_transition(name.clone(), Some(name));
            net.add_input_arc(entry, t);
            net.add_output_arc(t, exit);
        }
        ProcessTree::Tau => {
            let t = net.add_silent("tau");
            net.add_input_arc(entry, t);
            net.add_output_arc(t, exit);
        }
        ProcessTree::Sequence(children) => {
            let mut from = entry;
            for (i, child) in children.iter().enumerate() {
                let to = if i + 1 == children.len() {
                    exit
                } else {
                    net.add_place(format!("seq_{}", net.places.len()))
                };
                build(net, child, names, from, to);
                from = to;
            }
        }
        ProcessTree::Xor(children) => {
            for child in children {
                build(net, child, names, entry, exit);
            }
        }
        ProcessTree::Parallel(children) => {
            let fork = net.add_silent("and_split");
            let join = net.add_silent("and_join");
            net.add_input_arc(entry, fork);
            net.add_output_arc(join, exit);
            for child in children {
                let start = net.add_place(format!("par_in_{}", net.places.len()));
                let end = net.add_place(format!("par_out_{}", net.places.len()));
                net.add_output_arc(fork, start);
                net.add_input_arc(end, join);
                build(net, child, names, start, end);
            }
        }
        ProcessTree::Loop { body, redo } => {
            let enter = net.add_silent("loop_enter");
            let leave = net.add_silent("loop_exit");
            let before = net.add_place(format!("loop_in_{}", net.places.len()));
            let after = net.add_place(format!("loop_out_{}", net.places.len()));
            net.add_input_arc(entry, enter);
            net.add_output_arc(enter, before);
            build(net, body, names, before, after);
            build(net, redo, names, after, before);
            net.add_input_arc(after, leave);
            net.add_output_arc(leave, exit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::indexed;
    use super::*;
    use crate::core::replay::Replayer;

    fn tree_of(traces: &[(&str, u64)], noise: f64) -> String {
        let log = indexed(traces);
        discover_tree(&log, noise).render(&log.activities)
    }

    #[test]
    fn test_sequence_with_parallel_block() {
        assert_eq!(tree_of(&[("abcd", 3), ("acbd", 2)], 0.0), "->(a, +(b, c), d)");
    }

    #[test]
    fn test_exclusive_choice() {
        assert_eq!(tree_of(&[("abd", 3), ("acd", 2)], 0.0), "->(a, X(b, c), d)");
    }

    #[test]
    fn test_loop_detected() {
        assert_eq!(tree_of(&[("abd", 5), ("abcbd", 3)], 0.0), "->(a, *(b, c), d)");
    }

    #[test]
    fn test_noise_drops_rare_skip() {
        let traces = [("abc", 50), ("ac", 1)];
        assert_eq!(tree_of(&traces, 0.0), "->(a, X(tau, b), c)");
        assert_eq!(tree_of(&traces, 0.2), "->(a, b, c)");
    }

    #[test]
    fn test_no_cut_falls_back_to_flower() {
        assert_eq!(tree_of(&[("abab", 1)], 0.0), "*(tau, X(a, b))");
    }

    #[test]
    fn test_discovered_net_replays_log() {
        let log = indexed(&[("abcd", 3), ("acbd", 2), ("abcbd", 1)]);
        let model = discover(&log, 0.0);
        let replayer = Replayer::new(&model);
        for (trace, _) in &log.traces {
            let names: Vec<&str> = trace.iter().map(|&i| log.activities[i].as_str()).collect();
            let r = replayer.replay(&names);
            assert!(r.is_fit, "{names:?} should fit: {r:?}");
        }
    }

    #[test]
    fn test_loop_segments_pad_with_empty_body() {
        let part_of = BTreeMap::from([(0, 0), (1, 1), (2, 2)]);
        let segs = loop_segments(&[1, 0, 2], &part_of);
        assert_eq!(
            segs,
            vec![
                (0, vec![]),
                (1, vec![1]),
                (0, vec![0]),
                (2, vec![2]),
                (0, vec![])
            ]
        );
    }
}
