// FairMine - core/mining/log_skeleton.rs
//
// Log skeleton discovery and conformance. A skeleton is a set of declarative
// relations between activities plus the allowed occurrence counts of each
// activity. A relation (a, b) is kept when it holds for at least
// (1 - noise) of the occurrences of a.

use super::{deviation_result, IndexedLog};
use crate::core::model::{DiagnosticsTable, EventLog, FitnessKey};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};

type Relation = BTreeSet<(String, String)>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogSkeleton {
    /// a and b occur equally often in every trace containing a.
    pub equivalence: Relation,
    /// Every a is eventually followed by b.
    pub always_after: Relation,
    /// Every a is preceded at some point by b.
    pub always_before: Relation,
    /// b never occurs in a trace containing a.
    pub never_together: Relation,
    /// Every a is immediately followed by b.
    pub directly_follows: Relation,
    /// Allowed per-trace occurrence counts.
    pub activ_freq: BTreeMap<String, BTreeSet<usize>>,
}

impl LogSkeleton {
    pub fn constraint_count(&self) -> usize {
        self.equivalence.len()
            + self.always_after.len()
            + self.always_before.len()
            + self.never_together.len()
            + self.directly_follows.len()
            + self.activ_freq.len()
    }

    /// Count (violated, applicable) constraints for one trace.
    pub fn check_trace<S: AsRef<str>>(&self, trace: &[S]) -> (u64, u64) {
        let trace: Vec<&str> = trace.iter().map(|s| s.as_ref()).collect();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for &a in &trace {
            *counts.entry(a).or_default() += 1;
        }
        let count = |a: &str| counts.get(a).copied().unwrap_or(0);
        let positions = |a: &str| -> Vec<usize> {
            trace
                .iter()
                .enumerate()
                .filter(|(_, x)| **x == a)
                .map(|(i, _)| i)
                .collect()
        };

        let mut violated = 0u64;
        let mut applicable = 0u64;
        let mut tally = |applies: bool, ok: bool| {
            if applies {
                applicable += 1;
                if !ok {
                    violated += 1;
                }
            }
        };

        for (a, b) in self.equivalence.iter().map(as_strs) {
            tally(count(a) > 0, count(a) == count(b));
        }
        for (a, b) in self.always_after.iter().map(as_strs) {
            let last_b = positions(b).last().copied();
            let ok = positions(a)
                .iter()
                .all(|&i| last_b.is_some_and(|j| j > i));
            tally(count(a) > 0, ok);
        }
        for (a, b) in self.always_before.iter().map(as_strs) {
            let first_b = positions(b).first().copied();
            let ok = positions(a)
                .iter()
                .all(|&i| first_b.is_some_and(|j| j < i));
            tally(count(a) > 0, ok);
        }
        for (a, b) in self.never_together.iter().map(as_strs) {
            tally(count(a) > 0, count(b) == 0);
        }
        for (a, b) in self.directly_follows.iter().map(as_strs) {
            let ok = positions(a)
                .iter()
                .all(|&i| trace.get(i + 1).is_some_and(|x| *x == b));
            tally(count(a) > 0, ok);
        }
        for (a, allowed) in &self.activ_freq {
            tally(true, allowed.contains(&count(a.as_str())));
        }
        let unknown: BTreeSet<&str> = trace
            .iter()
            .copied()
            .filter(|a| !self.activ_freq.contains_key(*a))
            .collect();
        for _ in unknown {
            tally(true, false);
        }

        (violated, applicable)
    }
}

fn as_strs((a, b): &(String, String)) -> (&str, &str) {
    (a.as_str(), b.as_str())
}

pub fn discover(log: &IndexedLog, noise: f64) -> LogSkeleton {
    let n = log.activities.len();
    let total: u64 = log.case_count();
    let mut occurrences = vec![0u64; n];
    let mut equivalence = vec![vec![0u64; n]; n];
    let mut never_together = vec![vec![0u64; n]; n];
    let mut after = vec![vec![0u64; n]; n];
    let mut before = vec![vec![0u64; n]; n];
    let mut follows = vec![vec![0u64; n]; n];
    let mut histogram: Vec<BTreeMap<usize, u64>> = vec![BTreeMap::new(); n];

    for (trace, weight) in &log.traces {
        let w = *weight;
        let mut counts = vec![0usize; n];
        for &a in trace {
            counts[a] += 1;
        }
        for a in 0..n {
            *histogram[a].entry(counts[a]).or_default() += w;
            if counts[a] == 0 {
                continue;
            }
            let weighted = counts[a] as u64 * w;
            occurrences[a] += weighted;
            for b in (0..n).filter(|&b| b != a) {
                if counts[a] == counts[b] {
                    equivalence[a][b] += weighted;
                }
                if counts[b] == 0 {
                    never_together[a][b] += weighted;
                }
            }
        }
        for (i, &a) in trace.iter().enumerate() {
            let later: BTreeSet<usize> = trace[i + 1..].iter().copied().collect();
            let earlier: BTreeSet<usize> = trace[..i].iter().copied().collect();
            for b in later.into_iter().filter(|&b| b != a) {
                after[a][b] += w;
            }
            for b in earlier.into_iter().filter(|&b| b != a) {
                before[a][b] += w;
            }
            if let Some(&b) = trace.get(i + 1) {
                if b != a {
                    follows[a][b] += w;
                }
            }
        }
    }

    let keep = |matrix: &[Vec<u64>]| -> Relation {
        let mut rel = Relation::new();
        for a in 0..n {
            let needed = (1.0 - noise) * occurrences[a] as f64;
            for b in 0..n {
                let value = matrix[a][b];
                if a != b && value > 0 && value as f64 >= needed {
                    rel.insert((log.activities[a].clone(), log.activities[b].clone()));
                }
            }
        }
        rel
    };

    let activ_freq = (0..n)
        .map(|a| {
            (
                log.activities[a].clone(),
                allowed_counts(&histogram[a], total, noise),
            )
        })
        .collect();

    let skeleton = LogSkeleton {
        equivalence: keep(&equivalence),
        always_after: keep(&after),
        always_before: keep(&before),
        never_together: keep(&never_together),
        directly_follows: keep(&follows),
        activ_freq,
    };
    tracing::debug!(
        noise,
        constraints = skeleton.constraint_count(),
        "Log skeleton discovered"
    );
    skeleton
}

/// Most frequent occurrence counts until they cover (1 - noise) of the traces.
fn allowed_counts(histogram: &BTreeMap<usize, u64>, total: u64, noise: f64) -> BTreeSet<usize> {
    let mut by_weight: Vec<(usize, u64)> = histogram.iter().map(|(&c, &w)| (c, w)).collect();
    by_weight.sort_by(|x, y| y.1.cmp(&x.1).then(x.0.cmp(&y.0)));
    let needed = (1.0 - noise) * total as f64;
    let mut covered = 0u64;
    let mut allowed = BTreeSet::new();
    for (count, weight) in by_weight {
        if covered as f64 >= needed && !allowed.is_empty() {
            break;
        }
        covered += weight;
        allowed.insert(count);
    }
    allowed
}

/// Check every case of `log` against `model`.
pub fn conformance(log: &EventLog, model: &LogSkeleton) -> DiagnosticsTable {
    let variants = log.variants();
    let results: Vec<_> = variants
        .par_iter()
        .map(|v| {
            let (violated, applicable) = model.check_trace(&v.activities);
            deviation_result(violated, applicable)
        })
        .collect();
    DiagnosticsTable::from_variants(FitnessKey::DevFitness, log, &variants, &results)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::indexed;
    use super::*;

    fn pair(a: &str, b: &str) -> (String, String) {
        (a.to_string(), b.to_string())
    }

    #[test]
    fn test_relations_on_parallel_log() {
        let skeleton = discover(&indexed(&[("abc", 5), ("acb", 5)]), 0.0);
        assert!(skeleton.equivalence.contains(&pair("a", "b")));
        assert!(skeleton.always_after.contains(&pair("a", "b")));
        assert!(skeleton.always_after.contains(&pair("a", "c")));
        assert!(skeleton.always_before.contains(&pair("b", "a")));
        assert!(!skeleton.always_after.contains(&pair("b", "c")));
        assert!(skeleton.never_together.is_empty());
        assert!(!skeleton.directly_follows.contains(&pair("a", "b")));
        assert_eq!(skeleton.activ_freq["a"], BTreeSet::from([1]));
    }

    #[test]
    fn test_noise_relaxes_relations() {
        let log = indexed(&[("ab", 95), ("a", 5)]);
        let strict = discover(&log, 0.0);
        assert!(!strict.always_after.contains(&pair("a", "b")));
        assert_eq!(strict.activ_freq["b"], BTreeSet::from([0, 1]));

        let relaxed = discover(&log, 0.1);
        assert!(relaxed.always_after.contains(&pair("a", "b")));
        assert_eq!(relaxed.activ_freq["b"], BTreeSet::from([1]));
    }

    #[test]
    fn test_check_trace() {
        let skeleton = discover(&indexed(&[("abc", 5), ("acb", 5)]), 0.0);
        let (violated, applicable) = skeleton.check_trace(&["a", "b", "c"]);
        assert_eq!(violated, 0);
        assert!(applicable > 0);

        let (violated, applicable) = skeleton.check_trace(&["a", "b"]);
        assert!(violated > 0 && violated < applicable);

        let (violated, _) = skeleton.check_trace(&["a", "b", "c", "x"]);
        assert_eq!(violated, 1, "unknown activity violates its frequency");
    }
}
