// FairMine - app/artifacts.rs
//
// Writes charts and result tables into the output directory.

use crate::core::model::LogReport;
use crate::core::{chart, export};
use crate::platform::fs::ensure_dir;
use crate::util::constants;
use crate::util::error::{ExportError, FairMineError};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// One set-overlap chart per report: `<stem>_protected.svg`.
pub fn write_overlap_charts(
    reports: &[LogReport],
    output_dir: &Path,
) -> Result<Vec<PathBuf>, FairMineError> {
    prepare(output_dir)?;
    let mut written = Vec::with_capacity(reports.len());
    for report in reports {
        let stem = report.stem();
        let title = format!("{stem} protected");
        let svg = chart::render_overlap(&title, &chart::overlap_sets(report));
        let path = output_dir.join(format!("{stem}{}", constants::OVERLAP_CHART_SUFFIX));
        write_text(&path, &svg)?;
        written.push(path);
    }
    Ok(written)
}

/// The cross-log comparison chart: `protected_traces.svg`.
pub fn write_comparison_chart(
    reports: &[LogReport],
    output_dir: &Path,
) -> Result<PathBuf, FairMineError> {
    prepare(output_dir)?;
    let (series, groups) = chart::comparison_groups(reports);
    let svg = chart::render_comparison(&series, &groups);
    let path = output_dir.join(constants::COMPARISON_CHART_FILE);
    write_text(&path, &svg)?;
    Ok(path)
}

/// `results.csv` and `results.json`.
pub fn write_results(
    reports: &[LogReport],
    output_dir: &Path,
) -> Result<Vec<PathBuf>, FairMineError> {
    prepare(output_dir)?;

    let csv_path = output_dir.join(constants::RESULTS_CSV_FILE);
    let rows = export::export_csv(reports, BufWriter::new(create(&csv_path)?), &csv_path)?;

    let json_path = output_dir.join(constants::RESULTS_JSON_FILE);
    export::export_json(reports, BufWriter::new(create(&json_path)?), &json_path)?;

    tracing::info!(
        csv = %csv_path.display(),
        json = %json_path.display(),
        rows,
        "Results exported"
    );
    Ok(vec![csv_path, json_path])
}

fn prepare(output_dir: &Path) -> Result<(), FairMineError> {
    ensure_dir(output_dir).map_err(|source| FairMineError::Io {
        path: output_dir.to_path_buf(),
        operation: "create output directory",
        source,
    })
}

fn create(path: &Path) -> Result<File, ExportError> {
    File::create(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_text(path: &Path, content: &str) -> Result<(), FairMineError> {
    std::fs::write(path, content).map_err(|source| FairMineError::Io {
        path: path.to_path_buf(),
        operation: "write chart",
        source,
    })?;
    tracing::info!(path = %path.display(), "Chart written");
    Ok(())
}
