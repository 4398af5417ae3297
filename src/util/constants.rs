// FairMine - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "FairMine";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "FairMine";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Config file looked up in the working directory before the platform dir.
pub const LOCAL_CONFIG_FILE_NAME: &str = "fairmine.toml";

/// Config file name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Default log level when neither RUST_LOG, --debug nor config set one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// Event log attributes
// =============================================================================

/// Standard XES key for case identifiers and activity labels.
pub const CONCEPT_NAME_KEY: &str = "concept:name";

/// Standard XES key for event timestamps.
pub const TIMESTAMP_KEY: &str = "time:timestamp";

/// Trace attribute carrying the protected-group flag.
pub const DEFAULT_PROTECTED_ATTRIBUTE: &str = "protected";

// =============================================================================
// Log file location
// =============================================================================

/// File name patterns accepted when a directory is given as a log source.
pub const DEFAULT_LOG_INCLUDE_PATTERNS: &[&str] = &["*.xes", "*.xes.gz"];

/// Maximum directory recursion depth when walking a log directory.
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Hard upper bound on the number of logs in a single experiment.
pub const ABSOLUTE_MAX_LOGS: usize = 256;

// =============================================================================
// Experiment defaults
// =============================================================================

/// Fraction of worst-performing cases considered outlier candidates.
pub const DEFAULT_OUTLIER_FRACTION: f64 = 0.2;

/// Default regex used to derive a tier label from a log file stem.
pub const DEFAULT_LABEL_PATTERN: &str = "(?i)(high|medium|low)";

/// Label of the dataset-wide baseline series in charts and exports.
pub const BASELINE_SERIES: &str = "Dataset";

/// Inductive miner (IMf) noise threshold.
pub const DEFAULT_INDUCTIVE_NOISE: f64 = 0.18;

/// Heuristics miner dependency threshold.
pub const DEFAULT_HEURISTICS_DEPENDENCY: f64 = 1.0;

/// ILP miner variant-coverage ratio.
pub const DEFAULT_ILP_ALPHA: f64 = 0.73;

/// Split Miner parallelism/proximity parameter.
pub const DEFAULT_SPLIT_MINER_EPSILON: f64 = 0.1;

/// Log skeleton noise threshold.
pub const DEFAULT_LOG_SKELETON_NOISE: f64 = 0.1;

/// Declare minimum confidence ratio.
pub const DEFAULT_DECLARE_MIN_CONFIDENCE: f64 = 0.8;

/// Declare minimum support ratio.
pub const DEFAULT_DECLARE_MIN_SUPPORT: f64 = 0.8;

// =============================================================================
// Discovery and replay limits
// =============================================================================

/// Heuristics miner AND-measure threshold for grouping split/join bindings.
pub const HEURISTICS_AND_THRESHOLD: f64 = 0.65;

/// Heuristics miner minimum directly-follows count for an edge.
pub const HEURISTICS_MIN_DFG_OCCURRENCES: u64 = 1;

/// Cap on alpha miner candidate (A, B) pairs before expansion stops.
pub const ALPHA_MAX_CANDIDATES: usize = 20_000;

/// Recursion depth after which the inductive miner falls back to a flower model.
pub const INDUCTIVE_MAX_DEPTH: usize = 64;

/// Maximum number of transitions in an ILP place preset or postset.
pub const ILP_MAX_ARC_SET: usize = 3;

/// Cap on candidate places examined per causal pair in the ILP miner.
pub const ILP_MAX_CANDIDATES_PER_PAIR: usize = 5_000;

/// Maximum markings explored when searching silent-transition paths during
/// token replay.
pub const REPLAY_MAX_SILENT_STATES: usize = 512;

/// Maximum silent firings in a single invisible path during token replay.
pub const REPLAY_MAX_SILENT_DEPTH: usize = 16;

/// Inclusive gateways with more outgoing flows than this are treated as
/// exclusive when converting BPMN to a Petri net.
pub const BPMN_MAX_INCLUSIVE_BRANCHES: usize = 4;

// =============================================================================
// External tool
// =============================================================================

/// Program used to launch Split Miner.
pub const DEFAULT_SPLIT_MINER_PROGRAM: &str = "java";

/// Argument template for Split Miner. Placeholders are substituted at launch.
pub const DEFAULT_SPLIT_MINER_ARGS: &[&str] = &[
    "-jar",
    "{jar}",
    "-i",
    "{input}",
    "-d",
    "{output_dir}",
    "-p",
    "{epsilon}",
];

/// Name of the BPMN file Split Miner writes into its output directory.
pub const DEFAULT_SPLIT_MINER_OUTPUT_NAME: &str = "output";

/// Wall-clock limit for one Split Miner run.
pub const DEFAULT_SPLIT_MINER_TIMEOUT_SECS: u64 = 600;

/// Smallest accepted Split Miner timeout.
pub const MIN_SPLIT_MINER_TIMEOUT_SECS: u64 = 1;

/// Largest accepted Split Miner timeout (24 h).
pub const MAX_SPLIT_MINER_TIMEOUT_SECS: u64 = 86_400;

/// Poll interval while waiting for the external tool to exit.
pub const SUBPROCESS_POLL_INTERVAL_MS: u64 = 50;

/// Number of trailing stderr bytes kept for error reports.
pub const SUBPROCESS_STDERR_TAIL_BYTES: usize = 2_048;

// =============================================================================
// Output artifacts
// =============================================================================

/// Suffix appended to a log's file stem for its set-overlap chart.
pub const OVERLAP_CHART_SUFFIX: &str = "_protected.svg";

/// File name of the cross-log percentage comparison chart.
pub const COMPARISON_CHART_FILE: &str = "protected_traces.svg";

/// File name of the CSV results table.
pub const RESULTS_CSV_FILE: &str = "results.csv";

/// File name of the JSON results document.
pub const RESULTS_JSON_FILE: &str = "results.json";
