// FairMine - core/replay.rs
//
// Token-based replay of an event log on an accepting Petri net.
//
// Per trace the replay counts produced (p), consumed (c), missing (m) and
// remaining (r) tokens and reports
//     fitness = 0.5 * (1 - m/c) + 0.5 * (1 - r/p).
// A visible transition that is not enabled first tries a short path of silent
// transitions; failing that, the missing tokens are inserted. Activities that
// no transition carries count as one missing and one remaining token and make
// the trace unfit.
//
// Replay runs once per variant on the rayon pool and is fanned back out to
// one row per case.

use crate::core::model::{Detail, DiagnosticsTable, EventLog, FitnessKey};
use crate::core::petri::{AcceptingPetriNet, Marking, PetriNet, TransitionId};
use crate::util::constants;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet, VecDeque};

/// Token counters for one replayed trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenCounts {
    pub missing: u64,
    pub consumed: u64,
    pub remaining: u64,
    pub produced: u64,
}

impl TokenCounts {
    pub fn fitness(&self) -> f64 {
        let consumed_term = if self.consumed > 0 {
            1.0 - self.missing as f64 / self.consumed as f64
        } else {
            1.0
        };
        let produced_term = if self.produced > 0 {
            1.0 - self.remaining as f64 / self.produced as f64
        } else {
            1.0
        };
        0.5 * consumed_term + 0.5 * produced_term
    }

    fn fire(&mut self, net: &PetriNet, t: TransitionId) {
        let tr = &net.transitions[t];
        self.consumed += tr.inputs.iter().map(|&(_, w)| w as u64).sum::<u64>();
        self.produced += tr.outputs.iter().map(|&(_, w)| w as u64).sum::<u64>();
    }
}

/// Result of replaying a single trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceReplay {
    pub counts: TokenCounts,
    pub is_fit: bool,
    pub fitness: f64,
}

/// Replay every case of `log` on `model`.
pub fn token_replay(log: &EventLog, model: &AcceptingPetriNet) -> DiagnosticsTable {
    let replayer = Replayer::new(model);
    let variants = log.variants();
    let results: Vec<(f64, bool, Detail)> = variants
        .par_iter()
        .map(|v| {
            let r = replayer.replay(&v.activities);
            (
                r.fitness,
                r.is_fit,
                Detail::TokenReplay {
                    missing: r.counts.missing,
                    consumed: r.counts.consumed,
                    remaining: r.counts.remaining,
                    produced: r.counts.produced,
                },
            )
        })
        .collect();

    tracing::debug!(
        variants = variants.len(),
        places = model.net.places.len(),
        transitions = model.net.transitions.len(),
        "Token replay finished"
    );

    DiagnosticsTable::from_variants(FitnessKey::TraceFitness, log, &variants, &results)
}

/// Replays traces against one model; holds the label lookup so it is built once.
pub struct Replayer<'a> {
    model: &'a AcceptingPetriNet,
    labels: HashMap<&'a str, Vec<TransitionId>>,
    silent: Vec<TransitionId>,
}

impl<'a> Replayer<'a> {
    pub fn new(model: &'a AcceptingPetriNet) -> Self {
        Self {
            model,
            labels: model.net.label_index(),
            silent: model.net.silent_transitions(),
        }
    }

    pub fn replay<S: AsRef<str>>(&self, trace: &[S]) -> TraceReplay {
        let net = &self.model.net;
        let mut marking = self.model.initial.clone();
        let mut counts = TokenCounts {
            produced: marking.iter().map(|&x| x as u64).sum(),
            ..Default::default()
        };
        let mut all_known = true;

        for activity in trace {
            let Some(candidates) = self.labels.get(activity.as_ref()) else {
                all_known = false;
                counts.missing += 1;
                counts.consumed += 1;
                counts.produced += 1;
                counts.remaining += 1;
                continue;
            };

            let t = match candidates
                .iter()
                .copied()
                .find(|&t| net.is_enabled(&marking, t))
            {
                Some(t) => t,
                None => match self.silent_path(&marking, |m| {
                    candidates.iter().any(|&t| net.is_enabled(m, t))
                }) {
                    Some(path) => {
                        for s in path {
                            counts.fire(net, s);
                            net.fire(&mut marking, s);
                        }
                        match candidates
                            .iter()
                            .copied()
                            .find(|&t| net.is_enabled(&marking, t))
                        {
                            Some(t) => t,
                            None => candidates[0],
                        }
                    }
                    None => {
                        let t = self.least_deficit(&marking, candidates);
                        for &(p, w) in &net.transitions[t].inputs {
                            if marking[p] < w {
                                counts.missing += (w - marking[p]) as u64;
                                marking[p] = w;
                            }
                        }
                        t
                    }
                },
            };

            counts.fire(net, t);
            net.fire(&mut marking, t);
        }

        let target = &self.model.final_marking;
        if &marking != target {
            let path = self
                .silent_path(&marking, |m| m == target)
                .or_else(|| self.silent_path(&marking, |m| covers(m, target)));
            if let Some(path) = path {
                for s in path {
                    counts.fire(net, s);
                    net.fire(&mut marking, s);
                }
            }
        }

        for (p, &want) in target.iter().enumerate() {
            if marking[p] < want {
                counts.missing += (want - marking[p]) as u64;
                marking[p] = want;
            }
            counts.consumed += want as u64;
            marking[p] -= want;
        }
        counts.remaining += marking.iter().map(|&x| x as u64).sum::<u64>();

        TraceReplay {
            counts,
            is_fit: all_known && counts.missing == 0 && counts.remaining == 0,
            fitness: counts.fitness(),
        }
    }

    /// Candidate needing the fewest inserted tokens; first one wins ties.
    fn least_deficit(&self, marking: &Marking, candidates: &[TransitionId]) -> TransitionId {
        let net = &self.model.net;
        candidates
            .iter()
            .copied()
            .min_by_key(|&t| {
                net.transitions[t]
                    .inputs
                    .iter()
                    .map(|&(p, w)| w.saturating_sub(marking[p]) as u64)
                    .sum::<u64>()
            })
            .unwrap_or(candidates[0])
    }

    /// Shortest sequence of silent firings from `start` reaching a marking
    /// that satisfies `goal`. Bounded by the replay state/depth limits.
    fn silent_path<F>(&self, start: &Marking, goal: F) -> Option<Vec<TransitionId>>
    where
        F: Fn(&Marking) -> bool,
    {
        if self.silent.is_empty() {
            return None;
        }
        let net = &self.model.net;
        let mut seen: HashSet<Marking> = HashSet::new();
        let mut queue: VecDeque<(Marking, Vec<TransitionId>)> = VecDeque::new();
        seen.insert(start.clone());
        queue.push_back((start.clone(), Vec::new()));

        while let Some((marking, path)) = queue.pop_front() {
            if path.len() >= constants::REPLAY_MAX_SILENT_DEPTH {
                continue;
            }
            for &s in &self.silent {
                if !net.is_enabled(&marking, s) {
                    continue;
                }
                let mut next = marking.clone();
                net.fire(&mut next, s);
                if !seen.insert(next.clone()) {
                    continue;
                }
                let mut next_path = path.clone();
                next_path.push(s);
                if goal(&next) {
                    return Some(next_path);
                }
                if seen.len() >= constants::REPLAY_MAX_SILENT_STATES {
                    return None;
                }
                queue.push_back((next, next_path));
            }
        }
        None
    }
}

fn covers(marking: &Marking, target: &Marking) -> bool {
    marking.iter().zip(target).all(|(have, want)| have >= want)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::petri::PetriNet;

    /// source -> a -> p1 -> tau -> p2 -> b -> sink
    fn sequence_with_tau() -> AcceptingPetriNet {
        let mut net = PetriNet::new();
        let source = net.add_place("source");
        let p1 = net.add_place("p1");
        let p2 = net.add_place("p2");
        let sink = net.add_place("sink");
        let a = net.add_transition("a", Some("a".into()));
        let tau = net.add_silent("tau");
        let b = net.add_transition("b", Some("b".into()));
        net.add_input_arc(source, a);
        net.add_output_arc(a, p1);
        net.add_input_arc(p1, tau);
        net.add_output_arc(tau, p2);
        net.add_input_arc(p2, b);
        net.add_output_arc(b, sink);
        AcceptingPetriNet::with_source_sink(net, source, sink)
    }

    #[test]
    fn test_fitting_trace_uses_silent_transition() {
        let model = sequence_with_tau();
        let r = Replayer::new(&model).replay(&["a", "b"]);
        assert!(r.is_fit);
        assert_eq!(r.fitness, 1.0);
        assert_eq!(
            r.counts,
            TokenCounts {
                missing: 0,
                consumed: 4,
                remaining: 0,
                produced: 4
            }
        );
    }

    #[test]
    fn test_skipped_activity_inserts_missing_tokens() {
        let model = sequence_with_tau();
        let r = Replayer::new(&model).replay(&["b"]);
        assert!(!r.is_fit);
        assert_eq!(r.counts.missing, 1);
        assert_eq!(r.counts.remaining, 1, "source token is left behind");
        assert!(r.fitness < 1.0 && r.fitness > 0.0);
    }

    #[test]
    fn test_unknown_activity_is_unfit() {
        let model = sequence_with_tau();
        let r = Replayer::new(&model).replay(&["a", "x", "b"]);
        assert!(!r.is_fit);
        assert_eq!(r.counts.missing, 1);
        assert_eq!(r.counts.remaining, 1);
    }

    #[test]
    fn test_incomplete_trace_leaves_tokens() {
        let model = sequence_with_tau();
        let r = Replayer::new(&model).replay(&["a"]);
        assert!(!r.is_fit);
        // No silent path reaches the final marking, so p1 keeps its token.
        assert_eq!(r.counts.missing, 1);
        assert_eq!(r.counts.remaining, 1);
    }

    #[test]
    fn test_empty_counts_are_perfect() {
        assert_eq!(TokenCounts::default().fitness(), 1.0);
    }
}
