// FairMine - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no platform
// dependencies. These types are the shared vocabulary across all layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// =============================================================================
// Event log
// =============================================================================

/// A single event: one occurrence of an activity within a case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// Activity label (`concept:name`).
    pub activity: String,

    /// Normalised timestamp (see `TimestampMode`).
    pub timestamp: DateTime<Utc>,
}

/// One process instance with its ordered events.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Case {
    /// Case identifier (trace `concept:name`).
    pub id: String,

    /// Whether the case belongs to the protected group.
    pub protected: bool,

    /// Events, stably ordered by timestamp.
    pub events: Vec<Event>,
}

impl Case {
    /// Activity labels in event order.
    pub fn activities(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.activity.as_str()).collect()
    }
}

/// An immutable event log.
#[derive(Debug, Clone, PartialEq)]
pub struct EventLog {
    cases: Vec<Case>,
    source: Option<PathBuf>,
}

impl EventLog {
    /// Build a log from already-ordered cases. `source` is the file the log
    /// was read from, if any; external discovery tools need it.
    pub fn new(cases: Vec<Case>, source: Option<PathBuf>) -> Self {
        Self { cases, source }
    }

    pub fn cases(&self) -> &[Case] {
        &self.cases
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn case_count(&self) -> usize {
        self.cases.len()
    }

    pub fn event_count(&self) -> usize {
        self.cases.iter().map(|c| c.events.len()).sum()
    }

    /// Distinct activity labels in first-seen order.
    pub fn activities(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for case in &self.cases {
            for event in &case.events {
                if seen.insert(event.activity.as_str()) {
                    out.push(event.activity.clone());
                }
            }
        }
        out
    }

    /// Group cases by identical activity sequence.
    ///
    /// Variants appear in order of their first case; each lists its case
    /// indices in log order.
    pub fn variants(&self) -> Vec<Variant> {
        let mut index: HashMap<Vec<&str>, usize> = HashMap::new();
        let mut variants: Vec<Variant> = Vec::new();
        for (i, case) in self.cases.iter().enumerate() {
            let key = case.activities();
            match index.get(&key) {
                Some(&v) => variants[v].cases.push(i),
                None => {
                    index.insert(key.clone(), variants.len());
                    variants.push(Variant {
                        activities: key.iter().map(|s| (*s).to_string()).collect(),
                        cases: vec![i],
                    });
                }
            }
        }
        variants
    }
}

/// A distinct activity sequence together with the cases that follow it.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub activities: Vec<String>,

    /// Indices into `EventLog::cases`.
    pub cases: Vec<usize>,
}

impl Variant {
    /// Number of cases following this variant.
    pub fn frequency(&self) -> u64 {
        self.cases.len() as u64
    }
}

/// How event timestamps are derived when loading a log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TimestampMode {
    /// Epoch plus the event's global record index in nanoseconds.
    #[default]
    RecordOrder,

    /// The `time:timestamp` attribute of each event.
    Source,
}

// =============================================================================
// Diagnostics
// =============================================================================

/// Name of the per-case fitness column a diagnostics table exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessKey {
    /// Token-based replay fitness.
    TraceFitness,

    /// Constraint deviation fitness (log skeleton, Declare).
    DevFitness,
}

impl FitnessKey {
    pub fn label(&self) -> &'static str {
        match self {
            FitnessKey::TraceFitness => "trace_fitness",
            FitnessKey::DevFitness => "dev_fitness",
        }
    }
}

/// Algorithm-specific counters behind a fitness value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Detail {
    /// Token-based replay counters.
    TokenReplay {
        missing: u64,
        consumed: u64,
        remaining: u64,
        produced: u64,
    },

    /// Constraint check counters.
    Deviations { violated: u64, applicable: u64 },
}

/// One row of a diagnostics table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticsRow {
    pub case_id: String,
    pub fitness: f64,
    pub is_fit: bool,
    pub detail: Detail,
}

/// Per-case conformance diagnostics, one row per case in log order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticsTable {
    pub key: FitnessKey,
    pub rows: Vec<DiagnosticsRow>,
}

impl DiagnosticsTable {
    /// Expand per-variant results to one row per case, in log order.
    ///
    /// `results[i]` holds `(fitness, is_fit, detail)` for `variants[i]`.
    pub fn from_variants(
        key: FitnessKey,
        log: &EventLog,
        variants: &[Variant],
        results: &[(f64, bool, Detail)],
    ) -> Self {
        let mut by_case: Vec<Option<usize>> = vec![None; log.case_count()];
        for (v, variant) in variants.iter().enumerate() {
            for &c in &variant.cases {
                by_case[c] = Some(v);
            }
        }
        let rows = log
            .cases()
            .iter()
            .zip(by_case)
            .filter_map(|(case, v)| {
                let (fitness, is_fit, detail) = results.get(v?)?;
                Some(DiagnosticsRow {
                    case_id: case.id.clone(),
                    fitness: *fitness,
                    is_fit: *is_fit,
                    detail: *detail,
                })
            })
            .collect();
        Self { key, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Mean fitness over all rows (`None` for an empty table).
    pub fn average_fitness(&self) -> Option<f64> {
        if self.rows.is_empty() {
            return None;
        }
        let sum: f64 = self.rows.iter().map(|r| r.fitness).sum();
        Some(sum / self.rows.len() as f64)
    }

    /// Share of fitting rows as a percentage.
    pub fn fitting_percentage(&self) -> Percentage {
        let fit = self.rows.iter().filter(|r| r.is_fit).count();
        Percentage::of(fit, self.rows.len())
    }
}

/// A case selected as a worst-performing, non-conforming outlier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlierRow {
    pub case_id: String,
    pub is_fit: bool,
}

// =============================================================================
// Fairness results
// =============================================================================

/// A percentage rounded to two decimals, or undefined for an empty base.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Percentage {
    Defined(f64),
    #[default]
    Undefined,
}

impl Percentage {
    /// `round(100 * part / whole, 2)`, undefined when `whole` is zero.
    ///
    /// Rounding is done on the exact binary value with ties to even, so
    /// 1 of 32 (3.125) gives 3.12 and 3 of 32 (9.375) gives 9.38.
    pub fn of(part: usize, whole: usize) -> Self {
        if whole == 0 {
            return Percentage::Undefined;
        }
        let raw = 100.0 * (part as f64 / whole as f64);
        Percentage::Defined(round_half_even_2dp(raw))
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Percentage::Defined(v) => Some(*v),
            Percentage::Undefined => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Percentage::Defined(_))
    }
}

/// Two decimals, rounded from the exact binary value with ties to even.
/// Fixed-precision float formatting rounds that way; `(x * 100.0).round()`
/// does not.
fn round_half_even_2dp(x: f64) -> f64 {
    format!("{x:.2}").parse().unwrap_or(x)
}

impl std::fmt::Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Percentage::Defined(v) => write!(f, "{v:.2}"),
            Percentage::Undefined => f.write_str("undefined"),
        }
    }
}

impl Serialize for Percentage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}

/// Statistics of one algorithm run on one log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlgorithmStats {
    /// Fitness column the outliers were selected on.
    pub fitness_key: FitnessKey,

    /// Number of outlier cases.
    pub outliers: usize,

    /// Protected outlier case ids in log order.
    pub protected_outliers: Vec<String>,

    /// Share of protected cases among the outliers.
    pub percentage: Percentage,

    /// Mean per-case fitness over the whole log.
    pub average_fitness: Option<f64>,

    /// Share of fitting cases over the whole log.
    pub fitting_percentage: Percentage,
}

/// Outcome of one algorithm on one log: statistics or the reason it failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlgorithmOutcome {
    /// Display name of the algorithm ("Alpha Miner", ...).
    pub algorithm: String,

    /// Wall-clock duration of discovery plus conformance checking.
    pub duration_ms: u64,

    #[serde(flatten)]
    pub result: OutcomeResult,
}

/// Success/failure payload of an `AlgorithmOutcome`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeResult {
    Ok(AlgorithmStats),
    Failed { error: String },
}

impl AlgorithmOutcome {
    pub fn stats(&self) -> Option<&AlgorithmStats> {
        match &self.result {
            OutcomeResult::Ok(s) => Some(s),
            OutcomeResult::Failed { .. } => None,
        }
    }
}

/// Everything computed for one event log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogReport {
    pub log_path: PathBuf,

    /// Group label used in comparison charts ("High", "Medium", ...).
    pub label: String,

    pub case_count: usize,
    pub event_count: usize,

    /// Share of protected cases in the whole log.
    pub baseline: Percentage,

    /// One outcome per algorithm, in suite order.
    pub algorithms: Vec<AlgorithmOutcome>,
}

impl LogReport {
    /// File stem of the source log (`hiring_log_high` for `.../hiring_log_high.xes`).
    pub fn stem(&self) -> String {
        log_stem(&self.log_path)
    }

    pub fn outcome(&self, algorithm: &str) -> Option<&AlgorithmOutcome> {
        self.algorithms.iter().find(|o| o.algorithm == algorithm)
    }
}

/// File name up to the first dot, so `log.xes.gz` yields `log`.
pub fn log_stem(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .map(|n| n.split('.').next().unwrap_or_default().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn case(id: &str, protected: bool, acts: &[&str]) -> Case {
        Case {
            id: id.to_string(),
            protected,
            events: acts
                .iter()
                .enumerate()
                .map(|(i, a)| Event {
                    activity: (*a).to_string(),
                    timestamp: Utc.timestamp_opt(i as i64, 0).unwrap(),
                })
                .collect(),
        }
    }

    /// Log from `(case id, protected, trace)` triples of single-char activities.
    pub(crate) fn log_of(cases: &[(&str, bool, &str)]) -> EventLog {
        let cases = cases
            .iter()
            .map(|(id, protected, trace)| {
                let acts: Vec<String> = trace.chars().map(|c| c.to_string()).collect();
                let refs: Vec<&str> = acts.iter().map(String::as_str).collect();
                case(id, *protected, &refs)
            })
            .collect();
        EventLog::new(cases, None)
    }
}
