// FairMine - core/export.rs
//
// CSV and JSON export of experiment results.
// Core layer: writes to any Write trait object.

use crate::core::model::{LogReport, OutcomeResult};
use crate::util::constants;
use crate::util::error::ExportError;
use std::io::Write;
use std::path::Path;

const CSV_HEADER: [&str; 11] = [
    "log",
    "label",
    "algorithm",
    "status",
    "percentage",
    "outliers",
    "protected_outliers",
    "average_fitness",
    "fitting_percentage",
    "duration_ms",
    "error",
];

/// Export results to CSV: per log one baseline row, then one row per algorithm.
///
/// Undefined percentages and missing values are written as empty fields.
/// Returns the number of data rows written.
pub fn export_csv<W: Write>(
    reports: &[LogReport],
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let csv_err = |e: csv::Error| ExportError::Csv {
        path: export_path.to_path_buf(),
        source: e,
    };

    csv_writer.write_record(CSV_HEADER).map_err(csv_err)?;

    let mut count = 0;
    for report in reports {
        let log = report.log_path.display().to_string();
        let baseline = optional(report.baseline.value().map(|v| format!("{v:.2}")));
        csv_writer
            .write_record([
                log.as_str(),
                report.label.as_str(),
                constants::BASELINE_SERIES,
                "ok",
                baseline.as_str(),
                "",
                "",
                "",
                "",
                "",
                "",
            ])
            .map_err(csv_err)?;
        count += 1;

        for outcome in &report.algorithms {
            let duration = outcome.duration_ms.to_string();
            let record: [String; 11] = match &outcome.result {
                OutcomeResult::Ok(stats) => [
                    log.clone(),
                    report.label.clone(),
                    outcome.algorithm.clone(),
                    "ok".to_string(),
                    optional(stats.percentage.value().map(|v| format!("{v:.2}"))),
                    stats.outliers.to_string(),
                    stats.protected_outliers.len().to_string(),
                    optional(stats.average_fitness.map(|v| format!("{v:.4}"))),
                    optional(stats.fitting_percentage.value().map(|v| format!("{v:.2}"))),
                    duration,
                    String::new(),
                ],
                OutcomeResult::Failed { error } => [
                    log.clone(),
                    report.label.clone(),
                    outcome.algorithm.clone(),
                    "failed".to_string(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    duration,
                    error.clone(),
                ],
            };
            csv_writer.write_record(&record).map_err(csv_err)?;
            count += 1;
        }
    }

    csv_writer.flush().map_err(|e| ExportError::Io {
        path: export_path.to_path_buf(),
        source: e,
    })?;

    Ok(count)
}

/// Export the full report list to JSON (pretty-printed array of objects).
pub fn export_json<W: Write>(
    reports: &[LogReport],
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    serde_json::to_writer_pretty(writer, reports).map_err(|e| ExportError::Json {
        path: export_path.to_path_buf(),
        source: e,
    })?;
    Ok(reports.len())
}

fn optional(value: Option<String>) -> String {
    value.unwrap_or_default()
}
