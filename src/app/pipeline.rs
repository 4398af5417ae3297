// FairMine - app/pipeline.rs
//
// Experiment pipeline: per log, load it, then per algorithm discover and
// check, select outliers and compute the protected-case share.
//
// Phases per log:
//   1. Load      - XES → EventLog; failure aborts this log only
//   2. Baseline  - protected share of the whole log
//   3. Evaluate  - each algorithm in suite order; failures are recorded as
//                  failed outcomes and never stop the remaining algorithms
//
// Logs and algorithms run sequentially so output order is deterministic.
// Parallelism lives inside the conformance checks (rayon, per variant).

use crate::core::conformance::{Algorithm, ConformanceAdapter, ExternalDiscovery};
use crate::core::model::{AlgorithmOutcome, AlgorithmStats, EventLog, LogReport, OutcomeResult};
use crate::core::{fairness, outlier, xes};
use crate::platform::config::ExperimentConfig;
use crate::util::error::{ConformanceError, ParseError};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// A log that could not be analysed.
#[derive(Debug)]
pub struct LogFailure {
    pub log_path: PathBuf,
    pub error: ParseError,
}

/// Result of a full experiment run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Reports in input order, for the logs that loaded.
    pub reports: Vec<LogReport>,
    pub failures: Vec<LogFailure>,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Runs the configured algorithm suite over event logs.
pub struct Pipeline<'a> {
    config: &'a ExperimentConfig,
    suite: Vec<Algorithm>,
    external: Option<&'a dyn ExternalDiscovery>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a ExperimentConfig) -> Self {
        Self {
            config,
            suite: config.suite(),
            external: None,
        }
    }

    /// Use `tool` for algorithms that run outside the process.
    pub fn with_external(mut self, tool: &'a dyn ExternalDiscovery) -> Self {
        self.external = Some(tool);
        self
    }

    pub fn suite(&self) -> &[Algorithm] {
        &self.suite
    }

    /// Analyse every log in order. A log that fails to load is recorded and
    /// skipped; the others still run.
    pub fn run(&self, logs: &[PathBuf]) -> RunSummary {
        let mut summary = RunSummary::default();
        for (index, path) in logs.iter().enumerate() {
            match self.run_log(index, path) {
                Ok(report) => summary.reports.push(report),
                Err(error) => {
                    tracing::error!(log = %path.display(), error = %error, "Log skipped");
                    summary.failures.push(LogFailure {
                        log_path: path.clone(),
                        error,
                    });
                }
            }
        }
        tracing::info!(
            logs = logs.len(),
            analysed = summary.reports.len(),
            failed = summary.failures.len(),
            "Experiment complete"
        );
        summary
    }

    /// Analyse one log. `index` selects its configured tier label.
    pub fn run_log(&self, index: usize, path: &Path) -> Result<LogReport, ParseError> {
        let log = xes::load_log(path, &self.config.load_options())?;
        let baseline = fairness::baseline(&log);
        tracing::info!(
            log = %path.display(),
            baseline = %baseline,
            algorithms = self.suite.len(),
            "Analysing log"
        );

        let algorithms = self
            .suite
            .iter()
            .map(|algorithm| self.evaluate(&log, *algorithm))
            .collect();

        Ok(LogReport {
            log_path: path.to_path_buf(),
            label: self.config.label_for(index, path),
            case_count: log.case_count(),
            event_count: log.event_count(),
            baseline,
            algorithms,
        })
    }

    /// Run one algorithm on `log`, folding any error into the outcome.
    pub fn evaluate(&self, log: &EventLog, algorithm: Algorithm) -> AlgorithmOutcome {
        let started = Instant::now();
        let result = match self.statistics(log, algorithm) {
            Ok(stats) => {
                tracing::info!(
                    algorithm = algorithm.name(),
                    average_fitness = stats.average_fitness.unwrap_or(f64::NAN),
                    fitting = %stats.fitting_percentage,
                    outliers = stats.outliers,
                    protected = stats.protected_outliers.len(),
                    percentage = %stats.percentage,
                    "Algorithm evaluated"
                );
                OutcomeResult::Ok(stats)
            }
            Err(e) => {
                tracing::warn!(algorithm = algorithm.name(), error = %e, "Algorithm failed");
                OutcomeResult::Failed {
                    error: e.to_string(),
                }
            }
        };
        AlgorithmOutcome {
            algorithm: algorithm.name().to_string(),
            duration_ms: started.elapsed().as_millis() as u64,
            result,
        }
    }

    fn statistics(
        &self,
        log: &EventLog,
        algorithm: Algorithm,
    ) -> Result<AlgorithmStats, ConformanceError> {
        let mut adapter = ConformanceAdapter::new(algorithm);
        if let Some(tool) = self.external {
            adapter = adapter.with_external(tool);
        }
        let table = adapter.discover_and_check(log)?;
        let outliers = outlier::worst_performing(&table, self.config.outlier_fraction);

        Ok(AlgorithmStats {
            fitness_key: table.key,
            outliers: outliers.len(),
            protected_outliers: fairness::protected_outliers(log, &outliers),
            percentage: fairness::outlier_percentage(log, &outliers),
            average_fitness: table.average_fitness(),
            fitting_percentage: table.fitting_percentage(),
        })
    }
}
