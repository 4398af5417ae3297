// FairMine - core/mining/mod.rs
//
// Process discovery algorithms and the shared indexed-log / directly-follows
// structures they are built on. Activities are interned to dense indices so
// the miners work on `usize` sequences instead of strings.

pub mod alpha;
pub mod declare;
pub mod heuristics;
pub mod ilp;
pub mod inductive;
pub mod log_skeleton;

use crate::core::model::{Detail, EventLog, Variant};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A weighted trace: activity indices plus the number of cases following it.
pub type WeightedTrace = (Vec<usize>, u64);

/// Variants of a log with activities interned to indices.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedLog {
    /// Activity names; position = index.
    pub activities: Vec<String>,
    pub traces: Vec<WeightedTrace>,
}

impl IndexedLog {
    pub fn from_log(log: &EventLog) -> Self {
        Self::from_variants(&log.variants())
    }

    pub fn from_variants(variants: &[Variant]) -> Self {
        let mut activities: Vec<String> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut traces = Vec::with_capacity(variants.len());
        for variant in variants {
            let trace = variant
                .activities
                .iter()
                .map(|a| {
                    *index.entry(a.as_str()).or_insert_with(|| {
                        activities.push(a.clone());
                        activities.len() - 1
                    })
                })
                .collect();
            traces.push((trace, variant.frequency()));
        }
        Self { activities, traces }
    }

    /// Total number of cases.
    pub fn case_count(&self) -> u64 {
        self.traces.iter().map(|(_, w)| w).sum()
    }

    pub fn index_of(&self, activity: &str) -> Option<usize> {
        self.activities.iter().position(|a| a == activity)
    }
}

/// Weighted directly-follows graph with start and end activity counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dfg {
    pub edges: BTreeMap<(usize, usize), u64>,
    pub start: BTreeMap<usize, u64>,
    pub end: BTreeMap<usize, u64>,
    pub activity_counts: BTreeMap<usize, u64>,
}

impl Dfg {
    pub fn from_traces(traces: &[WeightedTrace]) -> Self {
        let mut dfg = Dfg::default();
        for (trace, weight) in traces {
            if let (Some(&first), Some(&last)) = (trace.first(), trace.last()) {
                *dfg.start.entry(first).or_default() += weight;
                *dfg.end.entry(last).or_default() += weight;
            }
            for &a in trace {
                *dfg.activity_counts.entry(a).or_default() += weight;
            }
            for pair in trace.windows(2) {
                *dfg.edges.entry((pair[0], pair[1])).or_default() += weight;
            }
        }
        dfg
    }

    /// Number of times `a` is directly followed by `b`.
    pub fn count(&self, a: usize, b: usize) -> u64 {
        self.edges.get(&(a, b)).copied().unwrap_or(0)
    }

    pub fn follows(&self, a: usize, b: usize) -> bool {
        self.count(a, b) > 0
    }

    /// `a -> b`: a is followed by b but never the other way round.
    pub fn causal(&self, a: usize, b: usize) -> bool {
        self.follows(a, b) && !self.follows(b, a)
    }

    /// `a || b`: both orders occur.
    pub fn parallel(&self, a: usize, b: usize) -> bool {
        self.follows(a, b) && self.follows(b, a)
    }

    /// `a # b`: neither order occurs.
    pub fn unrelated(&self, a: usize, b: usize) -> bool {
        !self.follows(a, b) && !self.follows(b, a)
    }

    /// Activities that occur in at least one trace.
    pub fn activities(&self) -> BTreeSet<usize> {
        self.activity_counts.keys().copied().collect()
    }

    /// Successors of `a` in index order.
    pub fn successors(&self, a: usize) -> Vec<usize> {
        self.edges
            .keys()
            .filter(|(x, _)| *x == a)
            .map(|&(_, y)| y)
            .collect()
    }

    /// Predecessors of `b` in index order.
    pub fn predecessors(&self, b: usize) -> Vec<usize> {
        self.edges
            .keys()
            .filter(|(_, y)| *y == b)
            .map(|&(x, _)| x)
            .collect()
    }
}

/// Fitness triple for deviation-based checkers: `1 - violated / applicable`,
/// or 1.0 when nothing applies.
pub(crate) fn deviation_result(violated: u64, applicable: u64) -> (f64, bool, Detail) {
    let fitness = if applicable == 0 {
        1.0
    } else {
        1.0 - violated as f64 / applicable as f64
    };
    (
        fitness,
        violated == 0,
        Detail::Deviations {
            violated,
            applicable,
        },
    )
}

/// Minimal union-find over dense indices, used for component grouping.
#[derive(Debug, Clone)]
pub(crate) struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    pub(crate) fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    pub(crate) fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    pub(crate) fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb.max(ra)] = rb.min(ra);
        }
    }

    /// Groups of `members` sharing a root, each sorted, ordered by smallest member.
    pub(crate) fn groups(&mut self, members: &[usize]) -> Vec<Vec<usize>> {
        let mut by_root: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for &m in members {
            let r = self.find(m);
            by_root.entry(r).or_default().push(m);
        }
        let mut groups: Vec<Vec<usize>> = by_root
            .into_values()
            .map(|mut g| {
                g.sort_unstable();
                g
            })
            .collect();
        groups.sort_by_key(|g| g[0]);
        groups
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::IndexedLog;

    /// Build an indexed log from `(trace, weight)` pairs of single-char activities.
    pub(crate) fn indexed(traces: &[(&str, u64)]) -> IndexedLog {
        let mut activities: Vec<String> = Vec::new();
        let mut out = Vec::new();
        for (trace, weight) in traces {
            let seq = trace
                .chars()
                .map(|c| {
                    let name = c.to_string();
                    match activities.iter().position(|a| *a == name) {
                        Some(i) => i,
                        None => {
                            activities.push(name);
                            activities.len() - 1
                        }
                    }
                })
                .collect();
            out.push((seq, *weight));
        }
        IndexedLog {
            activities,
            traces: out,
        }
    }
}
