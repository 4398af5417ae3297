// FairMine - core/mining/declare.rs
//
// Declare discovery and conformance over eighteen constraint templates.
//
// For every candidate rule each trace is classified as not activated,
// satisfied or violated. A rule is kept when
//     support    = activated-and-satisfied traces / all traces
//     confidence = activated-and-satisfied traces / activated traces
// both reach their thresholds. Conformance of a trace is
// 1 - violated rules / all rules.

use super::{deviation_result, IndexedLog};
use crate::core::model::{DiagnosticsTable, EventLog, FitnessKey};
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Template {
    Existence,
    Absence,
    ExactlyOne,
    Init,
    RespondedExistence,
    Response,
    Precedence,
    Succession,
    AlternateResponse,
    AlternatePrecedence,
    AlternateSuccession,
    ChainResponse,
    ChainPrecedence,
    ChainSuccession,
    Coexistence,
    NonCoexistence,
    NonSuccession,
    NonChainSuccession,
}

/// Evaluation of one rule on one trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    NotActivated,
    Satisfied,
    Violated,
}

impl Template {
    pub const ALL: [Template; 18] = [
        Template::Existence,
        Template::Absence,
        Template::ExactlyOne,
        Template::Init,
        Template::RespondedExistence,
        Template::Response,
        Template::Precedence,
        Template::Succession,
        Template::AlternateResponse,
        Template::AlternatePrecedence,
        Template::AlternateSuccession,
        Template::ChainResponse,
        Template::ChainPrecedence,
        Template::ChainSuccession,
        Template::Coexistence,
        Template::NonCoexistence,
        Template::NonSuccession,
        Template::NonChainSuccession,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Template::Existence => "existence",
            Template::Absence => "absence",
            Template::ExactlyOne => "exactly_one",
            Template::Init => "init",
            Template::RespondedExistence => "responded_existence",
            Template::Response => "response",
            Template::Precedence => "precedence",
            Template::Succession => "succession",
            Template::AlternateResponse => "alternate_response",
            Template::AlternatePrecedence => "alternate_precedence",
            Template::AlternateSuccession => "alternate_succession",
            Template::ChainResponse => "chain_response",
            Template::ChainPrecedence => "chain_precedence",
            Template::ChainSuccession => "chain_succession",
            Template::Coexistence => "coexistence",
            Template::NonCoexistence => "non_coexistence",
            Template::NonSuccession => "non_succession",
            Template::NonChainSuccession => "non_chain_succession",
        }
    }

    pub fn is_unary(&self) -> bool {
        matches!(
            self,
            Template::Existence | Template::Absence | Template::ExactlyOne | Template::Init
        )
    }

    /// Evaluate the rule `self(a, b)` on `trace`; `b` is ignored for unary
    /// templates.
    pub fn evaluate<T: PartialEq>(&self, trace: &[T], a: &T, b: &T) -> Evaluation {
        let pa: Vec<usize> = positions(trace, a);
        let pb: Vec<usize> = positions(trace, b);
        let verdict = |ok: bool| {
            if ok {
                Evaluation::Satisfied
            } else {
                Evaluation::Violated
            }
        };

        let response = || pa.last().map_or(true, |&i| pb.last().is_some_and(|&j| j > i));
        let precedence = || pb.first().map_or(true, |&j| pa.first().is_some_and(|&i| i < j));
        let alt_response = || {
            let mut pending = false;
            for x in trace {
                if x == a {
                    if pending {
                        return false;
                    }
                    pending = true;
                } else if x == b {
                    pending = false;
                }
            }
            !pending
        };
        let alt_precedence = || {
            let mut available = false;
            for x in trace {
                if x == a {
                    available = true;
                } else if x == b {
                    if !available {
                        return false;
                    }
                    available = false;
                }
            }
            true
        };
        let chain_response = || pa.iter().all(|&i| trace.get(i + 1).is_some_and(|x| x == b));
        let chain_precedence = || pb.iter().all(|&j| j > 0 && trace[j - 1] == *a);

        let has_a = !pa.is_empty();
        let has_b = !pb.is_empty();
        match self {
            Template::Existence => verdict(has_a),
            Template::Absence => verdict(!has_a),
            Template::ExactlyOne => verdict(pa.len() == 1),
            Template::Init => verdict(trace.first().is_some_and(|x| x == a)),
            Template::RespondedExistence if has_a => verdict(has_b),
            Template::Response if has_a => verdict(response()),
            Template::Precedence if has_b => verdict(precedence()),
            Template::Succession if has_a || has_b => verdict(response() && precedence()),
            Template::AlternateResponse if has_a => verdict(alt_response()),
            Template::AlternatePrecedence if has_b => verdict(alt_precedence()),
            Template::AlternateSuccession if has_a || has_b => {
                verdict(alt_response() && alt_precedence())
            }
            Template::ChainResponse if has_a => verdict(chain_response()),
            Template::ChainPrecedence if has_b => verdict(chain_precedence()),
            Template::ChainSuccession if has_a || has_b => {
                verdict(chain_response() && chain_precedence())
            }
            Template::Coexistence if has_a || has_b => verdict(has_a == has_b),
            Template::NonCoexistence if has_a || has_b => verdict(!(has_a && has_b)),
            Template::NonSuccession if has_a => {
                verdict(pb.last().map_or(true, |&j| pa[0] > j))
            }
            Template::NonChainSuccession if has_a => {
                verdict(!pa.iter().any(|&i| trace.get(i + 1).is_some_and(|x| x == b)))
            }
            _ => Evaluation::NotActivated,
        }
    }
}

fn positions<T: PartialEq>(trace: &[T], x: &T) -> Vec<usize> {
    trace
        .iter()
        .enumerate()
        .filter(|(_, y)| *y == x)
        .map(|(i, _)| i)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclareRule {
    pub template: Template,
    pub a: String,
    /// Second activity; `None` for unary templates.
    pub b: Option<String>,
    pub support: f64,
    pub confidence: f64,
}

impl DeclareRule {
    fn evaluate(&self, trace: &[&str]) -> Evaluation {
        let a = self.a.as_str();
        let b = self.b.as_deref().unwrap_or(a);
        self.template.evaluate(trace, &a, &b)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeclareModel {
    pub rules: Vec<DeclareRule>,
}

impl DeclareModel {
    pub fn contains(&self, template: Template, a: &str, b: Option<&str>) -> bool {
        self.rules
            .iter()
            .any(|r| r.template == template && r.a == a && r.b.as_deref() == b)
    }

    /// Count (violated, applicable) rules for one trace.
    pub fn check_trace<S: AsRef<str>>(&self, trace: &[S]) -> (u64, u64) {
        let trace: Vec<&str> = trace.iter().map(|s| s.as_ref()).collect();
        let violated = self
            .rules
            .iter()
            .filter(|r| r.evaluate(&trace) == Evaluation::Violated)
            .count() as u64;
        (violated, self.rules.len() as u64)
    }
}

pub fn discover(log: &IndexedLog, min_support: f64, min_confidence: f64) -> DeclareModel {
    let n = log.activities.len();
    let total = log.case_count();
    let mut candidates: Vec<(Template, usize, usize)> = Vec::new();
    for template in Template::ALL {
        for a in 0..n {
            if template.is_unary() {
                candidates.push((template, a, a));
            } else {
                for b in (0..n).filter(|&b| b != a) {
                    candidates.push((template, a, b));
                }
            }
        }
    }

    let rules: Vec<DeclareRule> = candidates
        .par_iter()
        .filter_map(|&(template, a, b)| {
            let mut activated = 0u64;
            let mut satisfied = 0u64;
            for (trace, weight) in &log.traces {
                match template.evaluate(trace, &a, &b) {
                    Evaluation::NotActivated => {}
                    Evaluation::Satisfied => {
                        activated += weight;
                        satisfied += weight;
                    }
                    Evaluation::Violated => activated += weight,
                }
            }
            if total == 0 || activated == 0 {
                return None;
            }
            let support = satisfied as f64 / total as f64;
            let confidence = satisfied as f64 / activated as f64;
            (support >= min_support && confidence >= min_confidence).then(|| DeclareRule {
                template,
                a: log.activities[a].clone(),
                b: (!template.is_unary()).then(|| log.activities[b].clone()),
                support,
                confidence,
            })
        })
        .collect();

    tracing::debug!(
        min_support,
        min_confidence,
        candidates = candidates.len(),
        rules = rules.len(),
        "Declare model discovered"
    );
    DeclareModel { rules }
}

/// Check every case of `log` against `model`.
pub fn conformance(log: &EventLog, model: &DeclareModel) -> DiagnosticsTable {
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
