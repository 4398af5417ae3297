// FairMine - tests/e2e_pipeline.rs
//
// End-to-end tests for the experiment pipeline.
//
// These tests read real XES fixtures from disk, run every discovery
// algorithm, and write charts and result tables into a temporary directory.
// Split Miner is emulated by a stub `ExternalDiscovery` returning a fixture
// BPMN model, and on unix additionally by a `sh` script driven through the
// real subprocess wrapper.

use fairmine::app::experiment::{self, Mode};
use fairmine::app::pipeline::Pipeline;
use fairmine::core::conformance::{Algorithm, ConformanceAdapter, ExternalDiscovery};
use fairmine::core::model::{OutcomeResult, Percentage};
use fairmine::core::xes::{load_log, LoadOptions};
use fairmine::platform::config::ExperimentConfig;
use fairmine::util::error::{ExternalToolError, FairMineError, LocateError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// =============================================================================
// Helpers
// =============================================================================

/// Absolute path to an on-disk fixture file.
fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn source(name: &str) -> String {
    fixture(name).display().to_string()
}

/// Split Miner stand-in that always "discovers" the fixture BPMN model.
struct FixtureModel;

impl ExternalDiscovery for FixtureModel {
    fn discover_bpmn(&self, log_path: &Path, epsilon: f64) -> Result<String, ExternalToolError> {
        assert!(log_path.is_file(), "tool receives the log's source path");
        assert_eq!(epsilon, 0.1);
        std::fs::read_to_string(fixture("hiring_sequence.bpmn")).map_err(|source| {
            ExternalToolError::Io {
                path: fixture("hiring_sequence.bpmn"),
                source,
            }
        })
    }
}

fn config_in(dir: &Path) -> ExperimentConfig {
    ExperimentConfig {
        output_dir: dir.to_path_buf(),
        ..ExperimentConfig::default()
    }
}

// =============================================================================
// Log loading
// =============================================================================

#[test]
fn e2e_loading_twice_is_identical() {
    let options = LoadOptions::default();
    let first = load_log(&fixture("hiring_log_high.xes"), &options).unwrap();
    let second = load_log(&fixture("hiring_log_high.xes"), &options).unwrap();

    assert_eq!(first.case_count(), 20);
    assert_eq!(first.case_count(), second.case_count());
    assert_eq!(first.event_count(), second.event_count());
    assert_eq!(first.cases(), second.cases());
}

// =============================================================================
// Conformance adapters
// =============================================================================

/// Every algorithm yields one row per case and only ids from the log.
#[test]
fn e2e_all_algorithms_return_log_case_ids() {
    let log = load_log(&fixture("hiring_log_high.xes"), &LoadOptions::default()).unwrap();
    let ids: HashSet<&str> = log.cases().iter().map(|c| c.id.as_str()).collect();
    let tool = FixtureModel;

    for algorithm in Algorithm::default_suite() {
        let table = ConformanceAdapter::new(algorithm)
            .with_external(&tool)
            .discover_and_check(&log)
            .unwrap_or_else(|e| panic!("{algorithm} failed: {e}"));
        assert_eq!(table.len(), log.case_count(), "{algorithm}");
        assert!(
            table.rows.iter().all(|r| ids.contains(r.case_id.as_str())),
            "{algorithm} returned unknown case ids"
        );
        assert!(
            table.rows.iter().all(|r| (0.0..=1.0).contains(&r.fitness)),
            "{algorithm} fitness out of range"
        );
    }
}

// =============================================================================
// Pipeline
// =============================================================================

#[test]
fn e2e_pipeline_reports_per_log() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path());
    let tool = FixtureModel;
    let pipeline = Pipeline::new(&config).with_external(&tool);

    let summary = pipeline.run(&[
        fixture("hiring_log_high.xes"),
        fixture("broken.xes"),
        fixture("hiring_log_low.xes"),
    ]);

    assert_eq!(summary.reports.len(), 2);
    assert_eq!(summary.failures.len(), 1);
    assert!(summary.failures[0].log_path.ends_with("broken.xes"));

    let high = &summary.reports[0];
    assert_eq!(high.label, "High");
    assert_eq!(high.baseline, Percentage::Defined(20.0));
    assert_eq!(high.algorithms.len(), 7);

    // The sequence model rejects exactly the two protected shortcut cases.
    let split = high.outcome("Split Miner").unwrap().stats().unwrap();
    assert_eq!(split.protected_outliers, vec!["h03", "h11"]);
    assert_eq!(split.percentage, Percentage::Defined(100.0));

    let low = &summary.reports[1];
    assert_eq!(low.label, "Low");
    assert_eq!(low.baseline, Percentage::Defined(10.0));
    let split = low.outcome("Split Miner").unwrap().stats().unwrap();
    assert_eq!(split.outliers, 2);
    assert_eq!(split.percentage, Percentage::Defined(0.0));

    for report in &summary.reports {
        for outcome in &report.algorithms {
            let stats = outcome
                .stats()
                .unwrap_or_else(|| panic!("{} failed: {:?}", outcome.algorithm, outcome.result));
            assert!(stats.outliers <= report.case_count / 5);
            if let Percentage::Defined(p) = stats.percentage {
                assert!((0.0..=100.0).contains(&p));
            }
        }
    }
}

#[test]
fn e2e_experiment_writes_artifacts() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");
    let config = config_in(&out);
    let tool = FixtureModel;

    let outcome = experiment::run(
        &config,
        &[source("hiring_log_high.xes"), source("hiring_log_low.xes")],
        Mode::Run,
        Some(&tool),
    )
    .unwrap();

    assert!(!outcome.summary.has_failures());
    let names: Vec<String> = outcome
        .artifacts
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "hiring_log_high_protected.svg",
            "hiring_log_low_protected.svg",
            "protected_traces.svg",
            "results.csv",
            "results.json",
        ]
    );

    let csv = std::fs::read_to_string(out.join("results.csv")).unwrap();
    // Header plus (baseline + 7 algorithms) per log.
    assert_eq!(csv.lines().count(), 1 + 2 * 8);

    let svg = std::fs::read_to_string(out.join("protected_traces.svg")).unwrap();
    assert!(svg.contains("Percentage of Protected Traces"));
    assert!(svg.contains(">High<") && svg.contains(">Low<"));
}

#[test]
fn e2e_overlap_mode_skips_comparison() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path());

    // No external tool: Split Miner is reported as failed, the rest still run.
    let outcome = experiment::run(
        &config,
        &[source("hiring_log_high.xes")],
        Mode::Overlap,
        None,
    )
    .unwrap();

    assert!(!dir.path().join("protected_traces.svg").exists());
    assert!(dir.path().join("hiring_log_high_protected.svg").is_file());
    let report = &outcome.summary.reports[0];
    assert!(matches!(
        report.outcome("Split Miner").unwrap().result,
        OutcomeResult::Failed { .. }
    ));
    assert_eq!(
        report.algorithms.iter().filter(|o| o.stats().is_some()).count(),
        6
    );
}

#[test]
fn e2e_directory_source_and_missing_logs() {
    let dir = TempDir::new().unwrap();
    let config = ExperimentConfig {
        enabled: vec!["log_skeleton".into(), "declare".into()],
        ..config_in(dir.path())
    };

    let fixtures = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures");
    let outcome = experiment::run(
        &config,
        &[fixtures.display().to_string()],
        Mode::Compare,
        None,
    )
    .unwrap();
    // broken.xes is found by the walk and fails to load; the others run.
    assert_eq!(outcome.summary.reports.len(), 2);
    assert_eq!(outcome.summary.failures.len(), 1);
    assert!(outcome.summary.reports.iter().all(|r| r.algorithms.len() == 2));

    let err = experiment::run(&config, &[], Mode::Compare, None).unwrap_err();
    assert!(matches!(err, FairMineError::Locate(LocateError::NoLogs)));
}

// =============================================================================
// Real subprocess (unix only)
// =============================================================================

#[cfg(unix)]
#[test]
fn e2e_split_miner_subprocess() {
    use fairmine::platform::config::SplitMinerSettings;
    use std::time::Duration;

    let dir = TempDir::new().unwrap();
    let model = fixture("hiring_sequence.bpmn").display().to_string();
    let script = format!(r#"test -f "$1" && cp '{model}' "$2/output""#);
    let config = ExperimentConfig {
        enabled: vec!["split_miner".into()],
        split_miner: SplitMinerSettings {
            program: "sh".into(),
            jar: Some(PathBuf::from("unused.jar")),
            args: vec![
                "-c".into(),
                script,
                "sh".into(),
                "{input}".into(),
                "{output_dir}".into(),
            ],
            project_root: PathBuf::from("/"),
            output_dir: dir.path().to_path_buf(),
            output_name: "output".into(),
            timeout: Duration::from_secs(30),
        },
        ..config_in(dir.path())
    };

    let outcome = experiment::run(
        &config,
        &[source("hiring_log_high.xes")],
        Mode::Compare,
        None,
    )
    .unwrap();
    let report = &outcome.summary.reports[0];
    let stats = report.outcome("Split Miner").unwrap().stats().unwrap();
    assert_eq!(stats.protected_outliers, vec!["h03", "h11"]);
    assert!(!dir.path().join("output").exists(), "model file is cleaned up");
}
