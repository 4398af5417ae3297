// FairMine - core/logfiles.rs
//
// Resolution of configured log sources into concrete event log files.
//
// A source is one of:
//   - a file path, taken as-is whatever its extension;
//   - a directory, walked (bounded depth) for files matching the include
//     patterns (`*.xes`, `*.xes.gz` by default);
//   - a glob pattern such as `logs/*_high.xes`.
//
// Only file metadata is read here. Unreadable entries below a directory are
// non-fatal and collected as warnings; a source that does not exist at all is
// an error.

use crate::util::constants;
use crate::util::error::LocateError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Limits for one resolution pass.
#[derive(Debug, Clone)]
pub struct LocateOptions {
    /// Maximum directory recursion depth.
    pub max_depth: usize,

    /// Maximum number of logs accepted for one experiment.
    pub max_logs: usize,

    /// Filename glob patterns a file below a directory must match.
    pub include_patterns: Vec<String>,
}

impl Default for LocateOptions {
    fn default() -> Self {
        Self {
            max_depth: constants::DEFAULT_MAX_DEPTH,
            max_logs: constants::ABSOLUTE_MAX_LOGS,
            include_patterns: constants::DEFAULT_LOG_INCLUDE_PATTERNS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

/// Resolved log files (source order, duplicates removed) plus non-fatal
/// warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocatedLogs {
    pub logs: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

/// Expand `sources` into a list of log files.
///
/// Files below one directory, and matches of one glob, are sorted by path so
/// the experiment order does not depend on filesystem enumeration order.
pub fn locate_logs(sources: &[String], options: &LocateOptions) -> Result<LocatedLogs, LocateError> {
    let max_logs = options.max_logs.min(constants::ABSOLUTE_MAX_LOGS);
    let include_pats = compile_patterns(&options.include_patterns);

    let mut located = LocatedLogs::default();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    for source in sources {
        let path = Path::new(source);
        let found = if path.is_file() {
            vec![path.to_path_buf()]
        } else if path.is_dir() {
            walk_directory(path, options.max_depth, &include_pats, &mut located.warnings)
        } else if is_glob(source) {
            expand_glob(source, &mut located.warnings)?
        } else {
            return Err(LocateError::NotFound {
                path: path.to_path_buf(),
            });
        };

        if found.is_empty() {
            located
                .warnings
                .push(format!("Log source '{source}' matched no event logs"));
        }
        tracing::debug!(source = %source, matched = found.len(), "Log source resolved");

        for log in found {
            if seen.insert(log.clone()) {
                located.logs.push(log);
            }
        }
    }

    if located.logs.is_empty() {
        return Err(LocateError::NoLogs);
    }
    if located.logs.len() > max_logs {
        return Err(LocateError::TooManyLogs {
            count: located.logs.len(),
            max: max_logs,
        });
    }

    tracing::debug!(
        logs = located.logs.len(),
        warnings = located.warnings.len(),
        "Log location complete"
    );
    Ok(located)
}

fn walk_directory(
    root: &Path,
    max_depth: usize,
    include_pats: &[glob::Pattern],
    warnings: &mut Vec<String>,
) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let walker = walkdir::WalkDir::new(root)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by_file_name();

    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(e) => {
                let path_str = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<unknown>".to_string());
                let msg = format!("Cannot access '{path_str}': {e}");
                tracing::debug!(warning = %msg, "Log location warning");
                warnings.push(msg);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(file_name) = entry.file_name().to_str() else {
            warnings.push(format!(
                "Skipping '{}': non-UTF-8 filename",
                entry.path().display()
            ));
            continue;
        };
        if include_pats.iter().any(|p| p.matches(file_name)) {
            files.push(entry.into_path());
        } else {
            tracing::trace!(file = file_name, "Not matched by include patterns");
        }
    }
    files.sort();
    files
}

fn expand_glob(pattern: &str, warnings: &mut Vec<String>) -> Result<Vec<PathBuf>, LocateError> {
    let paths = glob::glob(pattern).map_err(|source| LocateError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;
    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(p) if p.is_file() => files.push(p),
            Ok(_) => {}
            Err(e) => warnings.push(format!("Cannot access '{}': {e}", e.path().display())),
        }
    }
    files.sort();
    Ok(files)
}

fn is_glob(source: &str) -> bool {
    source.contains(['*', '?', '['])
}

/// Compile filename patterns; invalid ones are logged and skipped.
fn compile_patterns(patterns: &[String]) -> Vec<glob::Pattern> {
    patterns
        .iter()
        .filter_map(|p| match glob::Pattern::new(p) {
            Ok(compiled) => Some(compiled),
            Err(e) => {
                tracing::warn!(pattern = p, error = %e, "Invalid include pattern, skipping");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, rel: &str) -> PathBuf {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, "<log/>").unwrap();
        path
    }

    fn source(p: &Path) -> String {
        p.display().to_string()
    }

    #[test]
    fn test_directory_walk_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        let b = touch(dir.path(), "b_low.xes");
        let a = touch(dir.path(), "a_high.xes.gz");
        let nested = touch(dir.path(), "nested/c_medium.xes");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "model.bpmn");

        let located = locate_logs(&[source(dir.path())], &LocateOptions::default()).unwrap();
        assert_eq!(located.logs, vec![a, b, nested]);
        assert!(located.warnings.is_empty());
    }

    #[test]
    fn test_depth_limit() {
        let dir = TempDir::new().unwrap();
        let top = touch(dir.path(), "top.xes");
        touch(dir.path(), "deep/er/log.xes");

        let options = LocateOptions {
            max_depth: 1,
            ..LocateOptions::default()
        };
        let located = locate_logs(&[source(dir.path())], &options).unwrap();
        assert_eq!(located.logs, vec![top]);
    }

    #[test]
    fn test_plain_file_any_extension_and_dedup() {
        let dir = TempDir::new().unwrap();
        let odd = touch(dir.path(), "export.xml");
        let sources = vec![source(&odd), source(&odd)];
        let located = locate_logs(&sources, &LocateOptions::default()).unwrap();
        assert_eq!(located.logs, vec![odd]);
    }

    #[test]
    fn test_glob_source() {
        let dir = TempDir::new().unwrap();
        let high = touch(dir.path(), "hiring_high.xes");
        touch(dir.path(), "hiring_low.xes");

        let pattern = format!("{}/*_high.xes", dir.path().display());
        let located = locate_logs(&[pattern], &LocateOptions::default()).unwrap();
        assert_eq!(located.logs, vec![high]);

        let nothing = format!("{}/*_none.xes", dir.path().display());
        let err = locate_logs(&[nothing], &LocateOptions::default()).unwrap_err();
        assert!(matches!(err, LocateError::NoLogs));
    }

    #[test]
    fn test_missing_source_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = source(&dir.path().join("missing.xes"));
        let err = locate_logs(&[missing], &LocateOptions::default()).unwrap_err();
        assert!(matches!(err, LocateError::NotFound { .. }));
    }

    #[test]
    fn test_empty_and_too_many() {
        assert!(matches!(
            locate_logs(&[], &LocateOptions::default()),
            Err(LocateError::NoLogs)
        ));

        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.xes");
        touch(dir.path(), "b.xes");
        let options = LocateOptions {
            max_logs: 1,
            ..LocateOptions::default()
        };
        let err = locate_logs(&[source(dir.path())], &options).unwrap_err();
        assert!(matches!(err, LocateError::TooManyLogs { count: 2, max: 1 }));
    }
}
