// FairMine - core/conformance.rs
//
// Algorithm variants and the discover-then-check adapter.
//
// Each `Algorithm` discovers a model from the log and checks the same log
// against it. Petri-net algorithms use token replay (`trace_fitness`); the
// constraint-based ones use their own deviation check (`dev_fitness`). Split
// Miner runs outside the process behind the `ExternalDiscovery` trait so the
// pipeline can be exercised without Java.

use crate::core::bpmn;
use crate::core::mining::{alpha, declare, heuristics, ilp, inductive, log_skeleton, IndexedLog};
use crate::core::model::{DiagnosticsTable, EventLog, FitnessKey};
use crate::core::replay;
use crate::util::constants;
use crate::util::error::{ConformanceError, ExternalToolError};
use std::fmt;
use std::path::Path;
use std::time::Instant;

/// A discovery algorithm with its hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Algorithm {
    Alpha,
    Inductive { noise: f64 },
    Heuristics { dependency: f64 },
    Ilp { alpha: f64 },
    SplitMiner { epsilon: f64 },
    LogSkeleton { noise: f64 },
    Declare { min_confidence: f64, min_support: f64 },
}

/// Identifiers accepted in `[algorithms] enabled`, in suite order.
pub const ALGORITHM_KEYS: &[&str] = &[
    "alpha",
    "inductive",
    "heuristics",
    "ilp",
    "split_miner",
    "log_skeleton",
    "declare",
];

impl Algorithm {
    /// Display name used in charts, logs and exports.
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Alpha => "Alpha Miner",
            Algorithm::Inductive { .. } => "Inductive Miner",
            Algorithm::Heuristics { .. } => "Heuristics Miner",
            Algorithm::Ilp { .. } => "ILP Miner",
            Algorithm::SplitMiner { .. } => "Split Miner",
            Algorithm::LogSkeleton { .. } => "Log Skeleton",
            Algorithm::Declare { .. } => "Declare",
        }
    }

    /// Configuration identifier (see `ALGORITHM_KEYS`).
    pub fn key(&self) -> &'static str {
        match self {
            Algorithm::Alpha => "alpha",
            Algorithm::Inductive { .. } => "inductive",
            Algorithm::Heuristics { .. } => "heuristics",
            Algorithm::Ilp { .. } => "ilp",
            Algorithm::SplitMiner { .. } => "split_miner",
            Algorithm::LogSkeleton { .. } => "log_skeleton",
            Algorithm::Declare { .. } => "declare",
        }
    }

    pub fn fitness_key(&self) -> FitnessKey {
        match self {
            Algorithm::LogSkeleton { .. } | Algorithm::Declare { .. } => FitnessKey::DevFitness,
            _ => FitnessKey::TraceFitness,
        }
    }

    /// All seven algorithms with the experiment's default hyperparameters.
    pub fn default_suite() -> Vec<Algorithm> {
        AlgorithmParams::default().suite()
    }

    fn validate(&self) -> Result<(), ConformanceError> {
        let check = |name: &'static str, value: f64, lo: f64, hi: f64| {
            if value.is_finite() && (lo..=hi).contains(&value) {
                Ok(())
            } else {
                Err(ConformanceError::InvalidParameter {
                    algorithm: self.name().to_string(),
                    name,
                    value,
                })
            }
        };
        match *self {
            Algorithm::Alpha => Ok(()),
            Algorithm::Inductive { noise } => check("noise", noise, 0.0, 1.0),
            Algorithm::Heuristics { dependency } => check("dependency", dependency, -1.0, 1.0),
            Algorithm::Ilp { alpha } => check("alpha", alpha, 0.0, 1.0),
            Algorithm::SplitMiner { epsilon } => check("epsilon", epsilon, 0.0, 1.0),
            Algorithm::LogSkeleton { noise } => check("noise", noise, 0.0, 1.0),
            Algorithm::Declare {
                min_confidence,
                min_support,
            } => {
                check("min_confidence", min_confidence, 0.0, 1.0)?;
                check("min_support", min_support, 0.0, 1.0)
            }
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Hyperparameters for every algorithm in the suite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlgorithmParams {
    pub inductive_noise: f64,
    pub heuristics_dependency: f64,
    pub ilp_alpha: f64,
    pub split_miner_epsilon: f64,
    pub log_skeleton_noise: f64,
    pub declare_min_confidence: f64,
    pub declare_min_support: f64,
}

impl Default for AlgorithmParams {
    fn default() -> Self {
        Self {
            inductive_noise: constants::DEFAULT_INDUCTIVE_NOISE,
            heuristics_dependency: constants::DEFAULT_HEURISTICS_DEPENDENCY,
            ilp_alpha: constants::DEFAULT_ILP_ALPHA,
            split_miner_epsilon: constants::DEFAULT_SPLIT_MINER_EPSILON,
            log_skeleton_noise: constants::DEFAULT_LOG_SKELETON_NOISE,
            declare_min_confidence: constants::DEFAULT_DECLARE_MIN_CONFIDENCE,
            declare_min_support: constants::DEFAULT_DECLARE_MIN_SUPPORT,
        }
    }
}

impl AlgorithmParams {
    /// The algorithm named by a configuration key, if the key is known.
    pub fn algorithm(&self, key: &str) -> Option<Algorithm> {
        Some(match key {
            "alpha" => Algorithm::Alpha,
            "inductive" => Algorithm::Inductive {
                noise: self.inductive_noise,
            },
            "heuristics" => Algorithm::Heuristics {
                dependency: self.heuristics_dependency,
            },
            "ilp" => Algorithm::Ilp {
                alpha: self.ilp_alpha,
            },
            "split_miner" => Algorithm::SplitMiner {
                epsilon: self.split_miner_epsilon,
            },
            "log_skeleton" => Algorithm::LogSkeleton {
                noise: self.log_skeleton_noise,
            },
            "declare" => Algorithm::Declare {
                min_confidence: self.declare_min_confidence,
                min_support: self.declare_min_support,
            },
            _ => return None,
        })
    }

    pub fn suite(&self) -> Vec<Algorithm> {
        ALGORITHM_KEYS
            .iter()
            .filter_map(|key| self.algorithm(key))
            .collect()
    }
}

/// A discovery tool running outside this process.
pub trait ExternalDiscovery: Send + Sync {
    /// Discover a model from the XES file at `log_path` and return it as BPMN
    /// XML. Any intermediate files are removed before returning.
    fn discover_bpmn(&self, log_path: &Path, epsilon: f64) -> Result<String, ExternalToolError>;
}

/// Runs one algorithm's discover-and-check step.
pub struct ConformanceAdapter<'a> {
    algorithm: Algorithm,
    external: Option<&'a dyn ExternalDiscovery>,
}

impl<'a> ConformanceAdapter<'a> {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            external: None,
        }
    }

    /// Use `tool` for algorithms that run externally.
    pub fn with_external(mut self, tool: &'a dyn ExternalDiscovery) -> Self {
        self.external = Some(tool);
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Discover a model from `log` and check `log` against it.
    ///
    /// The returned table has one row per case in log order. Errors concern
    /// this algorithm only; the caller decides whether to continue.
    pub fn discover_and_check(&self, log: &EventLog) -> Result<DiagnosticsTable, ConformanceError> {
        self.algorithm.validate()?;
        let name = self.algorithm.name();
        let started = Instant::now();

        let table = match self.algorithm {
            Algorithm::Alpha => {
                let model = alpha::discover(&IndexedLog::from_log(log));
                replay::token_replay(log, &model)
            }
            Algorithm::Inductive { noise } => {
                let model = inductive::discover(&IndexedLog::from_log(log), noise);
                replay::token_replay(log, &model)
            }
            Algorithm::Heuristics { dependency } => {
                let params = heuristics::HeuristicsParams::with_dependency(dependency);
                let model = heuristics::discover(&IndexedLog::from_log(log), &params);
                replay::token_replay(log, &model)
            }
            Algorithm::Ilp { alpha } => {
                let model = ilp::discover(&IndexedLog::from_log(log), alpha);
                replay::token_replay(log, &model)
            }
            Algorithm::SplitMiner { epsilon } => {
                let tool = self.external.ok_or_else(|| ConformanceError::NoExternalTool {
                    algorithm: name.to_string(),
                })?;
                let path = log.source().ok_or_else(|| ConformanceError::NoSourcePath {
                    algorithm: name.to_string(),
                })?;
                let xml = tool
                    .discover_bpmn(path, epsilon)
                    .map_err(|source| ConformanceError::External {
                        algorithm: name.to_string(),
                        source,
                    })?;
                let diagram = bpmn::parse_bpmn(&xml, &path.display().to_string()).map_err(
                    |source| ConformanceError::Model {
                        algorithm: name.to_string(),
                        source,
                    },
                )?;
                replay::token_replay(log, &bpmn::to_petri_net(&diagram))
            }
            Algorithm::LogSkeleton { noise } => {
                let model = log_skeleton::discover(&IndexedLog::from_log(log), noise);
                log_skeleton::conformance(log, &model)
            }
            Algorithm::Declare {
                min_confidence,
                min_support,
            } => {
                let model =
                    declare::discover(&IndexedLog::from_log(log), min_support, min_confidence);
                declare::conformance(log, &model)
            }
        };

        tracing::debug!(
            algorithm = name,
            rows = table.len(),
            key = table.key.label(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Conformance check finished"
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::test_support::log_of;
    use std::path::PathBuf;

    const SEQUENCE_BPMN: &str = r#"<definitions><process>
        <startEvent id="s"/><task id="a" name="a"/><task id="b" name="b"/><endEvent id="e"/>
        <sequenceFlow id="1" sourceRef="s" targetRef="a"/>
        <sequenceFlow id="2" sourceRef="a" targetRef="b"/>
        <sequenceFlow id="3" sourceRef="b" targetRef="e"/>
    </process></definitions>"#;

    struct StubTool(Result<&'static str, u64>);

    impl ExternalDiscovery for StubTool {
        fn discover_bpmn(&self, _: &Path, _: f64) -> Result<String, ExternalToolError> {
            match self.0 {
                Ok(xml) => Ok(xml.to_string()),
                Err(timeout_secs) => Err(ExternalToolError::Timeout {
                    program: "stub".into(),
                    timeout_secs,
                }),
            }
        }
    }

    fn sample_log() -> EventLog {
        let cases = log_of(&[
            ("1", false, "ab"),
            ("2", true, "ab"),
            ("3", false, "ab"),
            ("4", true, "ba"),
            ("5", false, "abc"),
        ]);
        EventLog::new(cases.cases().to_vec(), Some(PathBuf::from("sample.xes")))
    }

    #[test]
    fn test_default_suite_has_seven_algorithms() {
        let suite = Algorithm::default_suite();
        assert_eq!(suite.len(), 7);
        assert_eq!(suite[1], Algorithm::Inductive { noise: 0.18 });
        assert_eq!(
            suite.iter().map(Algorithm::key).collect::<Vec<_>>(),
            ALGORITHM_KEYS
        );
        assert_eq!(suite[5].fitness_key(), FitnessKey::DevFitness);
    }

    #[test]
    fn test_every_algorithm_returns_one_row_per_case() {
        let log = sample_log();
        let stub = StubTool(Ok(SEQUENCE_BPMN));
        let ids: Vec<&str> = log.cases().iter().map(|c| c.id.as_str()).collect();
        for algorithm in Algorithm::default_suite() {
            let table = ConformanceAdapter::new(algorithm)
                .with_external(&stub)
                .discover_and_check(&log)
                .unwrap_or_else(|e| panic!("{algorithm} failed: {e}"));
            assert_eq!(table.key, algorithm.fitness_key());
            let row_ids: Vec<&str> = table.rows.iter().map(|r| r.case_id.as_str()).collect();
            assert_eq!(row_ids, ids, "{algorithm}");
            assert!(table.rows.iter().all(|r| (0.0..=1.0).contains(&r.fitness)));
        }
    }

    #[test]
    fn test_split_miner_replays_external_model() {
        let log = sample_log();
        let stub = StubTool(Ok(SEQUENCE_BPMN));
        let table = ConformanceAdapter::new(Algorithm::SplitMiner { epsilon: 0.1 })
            .with_external(&stub)
            .discover_and_check(&log)
            .unwrap();
        let fit: Vec<bool> = table.rows.iter().map(|r| r.is_fit).collect();
        assert_eq!(fit, vec![true, true, true, false, false]);
    }

    #[test]
    fn test_external_failures_are_reported() {
        let log = sample_log();
        let algorithm = Algorithm::SplitMiner { epsilon: 0.1 };

        let err = ConformanceAdapter::new(algorithm)
            .discover_and_check(&log)
            .unwrap_err();
        assert!(matches!(err, ConformanceError::NoExternalTool { .. }));

        let stub = StubTool(Err(5));
        let err = ConformanceAdapter::new(algorithm)
            .with_external(&stub)
            .discover_and_check(&log)
            .unwrap_err();
        assert!(matches!(
            err,
            ConformanceError::External {
                source: ExternalToolError::Timeout { timeout_secs: 5, .. },
                ..
            }
        ));

        let stub = StubTool(Ok("<definitions/>"));
        let err = ConformanceAdapter::new(algorithm)
            .with_external(&stub)
            .discover_and_check(&log)
            .unwrap_err();
        assert!(matches!(err, ConformanceError::Model { .. }));

        let in_memory = log_of(&[("1", false, "ab")]);
        let stub = StubTool(Ok(SEQUENCE_BPMN));
        let err = ConformanceAdapter::new(algorithm)
            .with_external(&stub)
            .discover_and_check(&in_memory)
            .unwrap_err();
        assert!(matches!(err, ConformanceError::NoSourcePath { .. }));
    }

    #[test]
    fn test_invalid_parameter_rejected() {
        let err = ConformanceAdapter::new(Algorithm::Inductive { noise: 1.5 })
            .discover_and_check(&sample_log())
            .unwrap_err();
        assert!(matches!(
            err,
            ConformanceError::InvalidParameter { name: "noise", .. }
        ));
    }
}
