// FairMine - app/experiment.rs
//
// One end-to-end experiment: resolve logs, run the pipeline, write the
// artifacts the selected mode asks for.

use crate::app::artifacts;
use crate::app::pipeline::{Pipeline, RunSummary};
use crate::core::conformance::ExternalDiscovery;
use crate::core::logfiles::{self, LocateOptions};
use crate::platform::config::ExperimentConfig;
use crate::platform::split_miner::SplitMinerTool;
use crate::util::error::FairMineError;
use std::path::PathBuf;

/// Which charts an experiment produces. Result tables are always written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Per-log set-overlap charts of protected outliers.
    Overlap,
    /// Cross-log percentage comparison chart.
    Compare,
    /// Both.
    Run,
}

impl Mode {
    fn overlap(self) -> bool {
        matches!(self, Mode::Overlap | Mode::Run)
    }

    fn compare(self) -> bool {
        matches!(self, Mode::Compare | Mode::Run)
    }
}

/// What an experiment produced.
#[derive(Debug)]
pub struct ExperimentOutcome {
    pub summary: RunSummary,
    pub artifacts: Vec<PathBuf>,
    /// Non-fatal warnings from log resolution.
    pub warnings: Vec<String>,
}

/// Run an experiment over `sources` (config `logs` when empty).
///
/// `external` overrides the configured Split Miner; without either, Split
/// Miner outcomes are recorded as failed.
pub fn run(
    config: &ExperimentConfig,
    sources: &[String],
    mode: Mode,
    external: Option<&dyn ExternalDiscovery>,
) -> Result<ExperimentOutcome, FairMineError> {
    let sources = if sources.is_empty() {
        config.logs.as_slice()
    } else {
        sources
    };
    let located = logfiles::locate_logs(sources, &LocateOptions::default())?;
    for warning in &located.warnings {
        tracing::warn!(warning = %warning, "Log location warning");
    }

    let configured_tool = SplitMinerTool::configured(&config.split_miner);
    let external = external.or(configured_tool.as_ref().map(|t| t as &dyn ExternalDiscovery));
    if external.is_none() && config.enabled.iter().any(|k| k == "split_miner") {
        tracing::warn!("[split_miner] jar is not set; Split Miner will be reported as failed");
    }

    let mut pipeline = Pipeline::new(config);
    if let Some(tool) = external {
        pipeline = pipeline.with_external(tool);
    }
    let summary = pipeline.run(&located.logs);

    let mut written = Vec::new();
    if !summary.reports.is_empty() {
        if mode.overlap() {
            written.extend(artifacts::write_overlap_charts(
                &summary.reports,
                &config.output_dir,
            )?);
        }
        if mode.compare() {
            written.push(artifacts::write_comparison_chart(
                &summary.reports,
                &config.output_dir,
            )?);
        }
        written.extend(artifacts::write_results(&summary.reports, &config.output_dir)?);
    }

    Ok(ExperimentOutcome {
        summary,
        artifacts: written,
        warnings: located.warnings,
    })
}
