// FairMine - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation between subsystems; every variant keeps
// the path, algorithm or program it concerns plus the underlying cause.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all FairMine operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum FairMineError {
    /// Configured log sources could not be resolved to files.
    Locate(LocateError),

    /// Result export failed.
    Export(ExportError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for FairMineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Locate(e) => write!(f, "Log location error: {e}"),
            Self::Export(e) => write!(f, "Export error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for FairMineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Locate(e) => Some(e),
            Self::Export(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Io { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

/// Errors raised while reading event logs and model files.
#[derive(Debug)]
pub enum ParseError {
    /// The event log file does not exist.
    NotFound { path: PathBuf },

    /// The XES importer rejected the file.
    Xes { path: PathBuf, reason: String },

    /// A trace has no `concept:name` attribute.
    MissingCaseId { path: PathBuf, trace_index: usize },

    /// An event has no `concept:name` attribute.
    MissingActivity {
        path: PathBuf,
        case_id: String,
        event_index: usize,
    },

    /// Source timestamps were requested but an event has none.
    MissingTimestamp {
        path: PathBuf,
        case_id: String,
        event_index: usize,
    },

    /// A BPMN document is malformed or structurally unusable.
    Bpmn { source_name: String, reason: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { path } => {
                write!(f, "Event log '{}' does not exist", path.display())
            }
            Self::Xes { path, reason } => {
                write!(f, "'{}' is not a readable XES log: {reason}", path.display())
            }
            Self::MissingCaseId { path, trace_index } => write!(
                f,
                "'{}': trace #{trace_index} has no concept:name attribute",
                path.display()
            ),
            Self::MissingActivity {
                path,
                case_id,
                event_index,
            } => write!(
                f,
                "'{}': event #{event_index} of case '{case_id}' has no concept:name attribute",
                path.display()
            ),
            Self::MissingTimestamp {
                path,
                case_id,
                event_index,
            } => write!(
                f,
                "'{}': event #{event_index} of case '{case_id}' has no time:timestamp attribute",
                path.display()
            ),
            Self::Bpmn {
                source_name,
                reason,
            } => write!(f, "BPMN model '{source_name}': {reason}"),
        }
    }
}

impl std::error::Error for ParseError {}

// ---------------------------------------------------------------------------
// Locate errors
// ---------------------------------------------------------------------------

/// Errors resolving configured log sources into concrete files.
#[derive(Debug)]
pub enum LocateError {
    /// A configured path does not exist and is not a glob pattern.
    NotFound { path: PathBuf },

    /// A glob pattern could not be compiled.
    InvalidPattern {
        pattern: String,
        source: glob::PatternError,
    },

    /// More logs were resolved than the experiment accepts.
    TooManyLogs { count: usize, max: usize },

    /// No log sources resolved to any file.
    NoLogs,
}

impl fmt::Display for LocateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { path } => {
                write!(f, "Log source '{}' does not exist", path.display())
            }
            Self::InvalidPattern { pattern, source } => {
                write!(f, "Invalid log glob pattern '{pattern}': {source}")
            }
            Self::TooManyLogs { count, max } => write!(
                f,
                "{count} logs were resolved, exceeding the maximum of {max} per experiment"
            ),
            Self::NoLogs => write!(
                f,
                "No event logs to analyse. Pass log paths on the command line \
                 or set [experiment] logs in the config file."
            ),
        }
    }
}

impl std::error::Error for LocateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidPattern { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<LocateError> for FairMineError {
    fn from(e: LocateError) -> Self {
        Self::Locate(e)
    }
}

// ---------------------------------------------------------------------------
// External tool errors
// ---------------------------------------------------------------------------

/// Errors running the external discovery tool.
#[derive(Debug)]
pub enum ExternalToolError {
    /// The program could not be started.
    Spawn { program: String, source: io::Error },

    /// Waiting on or killing the child process failed.
    Wait { program: String, source: io::Error },

    /// The tool exited unsuccessfully.
    NonZeroExit {
        program: String,
        code: Option<i32>,
        stderr_tail: String,
    },

    /// The tool did not finish within its time limit and was killed.
    Timeout { program: String, timeout_secs: u64 },

    /// The tool exited successfully but left no model file behind.
    MissingOutput { path: PathBuf },

    /// The model file exists but could not be read.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ExternalToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn { program, source } => {
                write!(f, "Could not start '{program}': {source}")
            }
            Self::Wait { program, source } => {
                write!(f, "Lost track of '{program}' while waiting: {source}")
            }
            Self::NonZeroExit {
                program,
                code,
                stderr_tail,
            } => {
                match code {
                    Some(c) => write!(f, "'{program}' exited with status {c}")?,
                    None => write!(f, "'{program}' was terminated by a signal")?,
                }
                if !stderr_tail.is_empty() {
                    write!(f, ": {stderr_tail}")?;
                }
                Ok(())
            }
            Self::Timeout {
                program,
                timeout_secs,
            } => write!(
                f,
                "'{program}' did not finish within {timeout_secs} s and was killed"
            ),
            Self::MissingOutput { path } => write!(
                f,
                "External tool finished but did not write '{}'",
                path.display()
            ),
            Self::Io { path, source } => {
                write!(f, "Could not read tool output '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ExternalToolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn { source, .. } => Some(source),
            Self::Wait { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Conformance errors
// ---------------------------------------------------------------------------

/// Errors raised by an algorithm's discover-and-check step.
#[derive(Debug)]
pub enum ConformanceError {
    /// The external discovery tool failed.
    External {
        algorithm: String,
        source: ExternalToolError,
    },

    /// The discovered model could not be read back.
    Model {
        algorithm: String,
        source: ParseError,
    },

    /// A hyperparameter is outside its meaningful range.
    InvalidParameter {
        algorithm: String,
        name: &'static str,
        value: f64,
    },

    /// The algorithm needs the log's source file but the log has none.
    NoSourcePath { algorithm: String },

    /// An external algorithm was requested but no tool is configured.
    NoExternalTool { algorithm: String },
}

impl fmt::Display for ConformanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::External { algorithm, source } => write!(f, "{algorithm}: {source}"),
            Self::Model { algorithm, source } => {
                write!(f, "{algorithm}: discovered model unusable: {source}")
            }
            Self::InvalidParameter {
                algorithm,
                name,
                value,
            } => write!(f, "{algorithm}: parameter {name} = {value} is out of range"),
            Self::NoSourcePath { algorithm } => write!(
                f,
                "{algorithm}: the event log was not loaded from a file"
            ),
            Self::NoExternalTool { algorithm } => write!(
                f,
                "{algorithm}: no external discovery tool is configured"
            ),
        }
    }
}

impl std::error::Error for ConformanceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::External { source, .. } => Some(source),
            Self::Model { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

/// Errors related to export operations.
#[derive(Debug)]
pub enum ExportError {
    /// I/O error writing the export file.
    Io { path: PathBuf, source: io::Error },

    /// CSV serialisation error.
    Csv { path: PathBuf, source: csv::Error },

    /// JSON serialisation error.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Export I/O error '{}': {source}", path.display())
            }
            Self::Csv { path, source } => {
                write!(f, "CSV export error '{}': {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "JSON export error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
        }
    }
}

impl From<ExportError> for FairMineError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// An explicitly requested config file does not exist.
    NotFound { path: PathBuf },

    /// The tier label pattern is not a valid regex.
    InvalidLabelPattern {
        pattern: String,
        source: regex::Error,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::NotFound { path } => {
                write!(f, "Config file '{}' does not exist", path.display())
            }
            Self::InvalidLabelPattern { pattern, source } => {
                write!(f, "Invalid label_pattern '{pattern}': {source}")
            }
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::InvalidLabelPattern { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for FairMineError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for FairMine results.
pub type Result<T> = std::result::Result<T, FairMineError>;
