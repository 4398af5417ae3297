// FairMine - platform/config.rs
//
// Platform-specific configuration directory resolution and fairmine.toml
// loading with startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.
//
// Lookup order: --config PATH, then ./fairmine.toml, then
// <platform config dir>/config.toml. No file at all means defaults.

use crate::core::conformance::{Algorithm, AlgorithmParams, ALGORITHM_KEYS};
use crate::core::model::TimestampMode;
use crate::core::xes::LoadOptions;
use crate::util::constants;
use crate::util::error::{ConfigError, FairMineError};
use directories::ProjectDirs;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolved platform paths for FairMine configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/fairmine/ or %APPDATA%\FairMine\config\)
    pub config_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            tracing::debug!(config = %config_dir.display(), "Platform paths resolved");
            Self { config_dir }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            Self {
                config_dir: PathBuf::from("."),
            }
        }
    }
}

// =============================================================================
// fairmine.toml shape
// =============================================================================

/// Raw deserialisable shape of the config file.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub experiment: ExperimentSection,
    pub algorithms: AlgorithmsSection,
    pub split_miner: SplitMinerSection,
    pub logging: LoggingSection,
}

/// `[experiment]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ExperimentSection {
    /// Log files, directories or glob patterns.
    pub logs: Option<Vec<String>>,
    /// Group label per log, by position.
    pub tier_labels: Option<Vec<String>>,
    /// Regex applied to the log file stem when no tier label is given.
    pub label_pattern: Option<String>,
    pub outlier_fraction: Option<f64>,
    pub protected_attribute: Option<String>,
    /// "record-order" or "source".
    pub timestamp_mode: Option<String>,
    pub output_dir: Option<String>,
}

/// `[algorithms]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct AlgorithmsSection {
    /// Algorithm keys to run; all seven when absent.
    pub enabled: Option<Vec<String>>,
    pub inductive_noise: Option<f64>,
    pub heuristics_dependency: Option<f64>,
    pub ilp_alpha: Option<f64>,
    pub split_miner_epsilon: Option<f64>,
    pub log_skeleton_noise: Option<f64>,
    pub declare_min_confidence: Option<f64>,
    pub declare_min_support: Option<f64>,
}

/// `[split_miner]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct SplitMinerSection {
    pub program: Option<String>,
    /// Path of the Split Miner jar. Split Miner is skipped when unset.
    pub jar: Option<String>,
    /// Argument template with `{jar}`, `{input}`, `{output_dir}`, `{epsilon}`.
    pub args: Option<Vec<String>>,
    /// Directory relative log paths are resolved against.
    pub project_root: Option<String>,
    /// Directory the tool writes its model into.
    pub output_dir: Option<String>,
    /// File name of the model the tool writes.
    pub output_name: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

// =============================================================================
// Validated configuration
// =============================================================================

/// Validated Split Miner launch settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitMinerSettings {
    pub program: String,
    pub jar: Option<PathBuf>,
    pub args: Vec<String>,
    pub project_root: PathBuf,
    pub output_dir: PathBuf,
    pub output_name: String,
    pub timeout: Duration,
}

impl Default for SplitMinerSettings {
    fn default() -> Self {
        Self {
            program: constants::DEFAULT_SPLIT_MINER_PROGRAM.to_string(),
            jar: None,
            args: constants::DEFAULT_SPLIT_MINER_ARGS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            project_root: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            output_name: constants::DEFAULT_SPLIT_MINER_OUTPUT_NAME.to_string(),
            timeout: Duration::from_secs(constants::DEFAULT_SPLIT_MINER_TIMEOUT_SECS),
        }
    }
}

/// Validated experiment configuration.
///
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    // -- Experiment --
    pub logs: Vec<String>,
    pub tier_labels: Vec<String>,
    /// Stem pattern for group labels; `None` labels logs by stem only.
    pub label_pattern: Option<Regex>,
    pub outlier_fraction: f64,
    pub protected_attribute: String,
    pub timestamp_mode: TimestampMode,
    pub output_dir: PathBuf,

    // -- Algorithms --
    /// Enabled algorithm keys in suite order.
    pub enabled: Vec<String>,
    pub params: AlgorithmParams,

    // -- External tool --
    pub split_miner: SplitMinerSettings,

    // -- Logging --
    pub log_level: Option<String>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            logs: Vec::new(),
            tier_labels: Vec::new(),
            label_pattern: default_label_pattern(),
            outlier_fraction: constants::DEFAULT_OUTLIER_FRACTION,
            protected_attribute: constants::DEFAULT_PROTECTED_ATTRIBUTE.to_string(),
            timestamp_mode: TimestampMode::default(),
            output_dir: PathBuf::from("."),
            enabled: ALGORITHM_KEYS.iter().map(|s| (*s).to_string()).collect(),
            params: AlgorithmParams::default(),
            split_miner: SplitMinerSettings::default(),
            log_level: None,
        }
    }
}

fn default_label_pattern() -> Option<Regex> {
    Regex::new(constants::DEFAULT_LABEL_PATTERN).ok()
}

impl ExperimentConfig {
    /// Algorithms to run, in suite order.
    pub fn suite(&self) -> Vec<Algorithm> {
        self.enabled
            .iter()
            .filter_map(|key| self.params.algorithm(key))
            .collect()
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            timestamp_mode: self.timestamp_mode,
            protected_attribute: self.protected_attribute.clone(),
        }
    }

    /// Group label for the `index`-th log.
    ///
    /// A configured tier label wins. Otherwise the first capture of
    /// `label_pattern` in the file stem is capitalised; failing that the stem
    /// itself is used.
    pub fn label_for(&self, index: usize, log_path: &Path) -> String {
        if let Some(label) = self.tier_labels.get(index).filter(|l| !l.is_empty()) {
            return label.clone();
        }
        let stem = crate::core::model::log_stem(log_path);
        self.label_pattern
            .as_ref()
            .and_then(|re| re.captures(&stem))
            .and_then(|c| c.get(1).or_else(|| c.get(0)))
            .map(|m| capitalise(m.as_str()))
            .filter(|l| !l.is_empty())
            .unwrap_or(stem)
    }
}

fn capitalise(s: &str) -> String {
    let lower = s.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Find the config file to load.
///
/// An explicit path must exist. Without one, `./fairmine.toml` and then the
/// platform config file are tried; `None` means run on defaults.
pub fn locate_config(
    explicit: Option<&Path>,
    paths: &PlatformPaths,
) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(Some(path.to_path_buf()));
        }
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let candidates = [
        PathBuf::from(constants::LOCAL_CONFIG_FILE_NAME),
        paths.config_dir.join(constants::CONFIG_FILE_NAME),
    ];
    Ok(candidates.into_iter().find(|p| p.is_file()))
}

/// Locate and load the config in one step, as the CLI does at startup.
pub fn resolve_config(
    explicit: Option<&Path>,
    paths: &PlatformPaths,
) -> Result<(ExperimentConfig, Vec<String>), FairMineError> {
    let path = locate_config(explicit, paths)?;
    Ok(load_config(path.as_deref())?)
}

/// Load and validate a config file.
///
/// Returns the validated config and a list of non-fatal warnings. `None`
/// yields defaults with no warnings. An unreadable or unparseable file yields
/// defaults plus a warning. Only an invalid `label_pattern` is fatal.
pub fn load_config(path: Option<&Path>) -> Result<(ExperimentConfig, Vec<String>), ConfigError> {
    let Some(path) = path else {
        tracing::debug!("No config file found; using defaults");
        return Ok((ExperimentConfig::default(), Vec::new()));
    };

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(source) => {
            let err = ConfigError::Io {
                path: path.to_path_buf(),
                source,
            };
            let msg = format!("{err}. Using defaults.");
            tracing::warn!("{}", msg);
            return Ok((ExperimentConfig::default(), vec![msg]));
        }
    };

    let (config, warnings) = parse_config(&content, path)?;
    tracing::info!(path = %path.display(), warnings = warnings.len(), "Loaded config");
    Ok((config, warnings))
}

/// Parse and validate config text. `path` is used for messages only.
pub fn parse_config(
    content: &str,
    path: &Path,
) -> Result<(ExperimentConfig, Vec<String>), ConfigError> {
    let raw: RawConfig = match toml::from_str(content) {
        Ok(r) => r,
        Err(source) => {
            let err = ConfigError::TomlParse {
                path: path.to_path_buf(),
                source,
            };
            let msg = format!(
                "{err}. Using defaults. See fairmine.example.toml for the expected format."
            );
            tracing::warn!("{}", msg);
            return Ok((ExperimentConfig::default(), vec![msg]));
        }
    };
    validate(raw)
}

/// Validate each field against named constants, accumulating all warnings.
fn validate(raw: RawConfig) -> Result<(ExperimentConfig, Vec<String>), ConfigError> {
    let mut config = ExperimentConfig::default();
    let mut warnings: Vec<String> = Vec::new();

    // -- Experiment --
    let exp = raw.experiment;
    if let Some(logs) = exp.logs {
        config.logs = logs;
    }
    if let Some(labels) = exp.tier_labels {
        config.tier_labels = labels;
    }
    if let Some(pattern) = exp.label_pattern {
        if pattern.is_empty() {
            config.label_pattern = None;
        } else {
            let re = Regex::new(&pattern).map_err(|source| ConfigError::InvalidLabelPattern {
                pattern: pattern.clone(),
                source,
            })?;
            config.label_pattern = Some(re);
        }
    }
    if let Some(fraction) = exp.outlier_fraction {
        if fraction > 0.0 && fraction <= 1.0 {
            config.outlier_fraction = fraction;
        } else {
            warnings.push(format!(
                "[experiment] outlier_fraction = {fraction} is out of range (0-1]. Using default ({}).",
                constants::DEFAULT_OUTLIER_FRACTION,
            ));
        }
    }
    if let Some(attr) = exp.protected_attribute {
        let attr = attr.trim().trim_start_matches("case:").to_string();
        if attr.is_empty() {
            warnings.push(format!(
                "[experiment] protected_attribute is empty. Using default ({}).",
                constants::DEFAULT_PROTECTED_ATTRIBUTE,
            ));
        } else {
            config.protected_attribute = attr;
        }
    }
    if let Some(mode) = exp.timestamp_mode {
        match mode.to_lowercase().as_str() {
            "record-order" | "record_order" => config.timestamp_mode = TimestampMode::RecordOrder,
            "source" => config.timestamp_mode = TimestampMode::Source,
            other => warnings.push(format!(
                "[experiment] timestamp_mode = \"{other}\" is not recognised. \
                 Expected \"record-order\" or \"source\". Using default (record-order).",
            )),
        }
    }
    if let Some(dir) = exp.output_dir.filter(|d| !d.is_empty()) {
        config.output_dir = PathBuf::from(dir);
    }

    // -- Algorithms --
    let algos = raw.algorithms;
    if let Some(enabled) = algos.enabled {
        let mut keys: Vec<String> = Vec::new();
        for key in &enabled {
            let key = key.trim().to_lowercase();
            if !ALGORITHM_KEYS.contains(&key.as_str()) {
                warnings.push(format!(
                    "[algorithms] enabled: \"{key}\" is not recognised. Valid values: {}.",
                    ALGORITHM_KEYS.join(", "),
                ));
            } else if !keys.contains(&key) {
                keys.push(key);
            }
        }
        if keys.is_empty() {
            warnings.push(
                "[algorithms] enabled lists no known algorithm. Running all of them.".to_string(),
            );
        } else {
            // Suite order regardless of the order given.
            config.enabled = ALGORITHM_KEYS
                .iter()
                .filter(|k| keys.iter().any(|e| e == *k))
                .map(|k| (*k).to_string())
                .collect();
        }
    }

    let defaults = AlgorithmParams::default();
    let params = &mut config.params;
    params.inductive_noise = unit_interval(
        &mut warnings,
        "inductive_noise",
        algos.inductive_noise,
        defaults.inductive_noise,
    );
    params.heuristics_dependency = ranged(
        &mut warnings,
        "heuristics_dependency",
        algos.heuristics_dependency,
        (-1.0, 1.0),
        defaults.heuristics_dependency,
    );
    params.ilp_alpha = unit_interval(&mut warnings, "ilp_alpha", algos.ilp_alpha, defaults.ilp_alpha);
    params.split_miner_epsilon = unit_interval(
        &mut warnings,
        "split_miner_epsilon",
        algos.split_miner_epsilon,
        defaults.split_miner_epsilon,
    );
    params.log_skeleton_noise = unit_interval(
        &mut warnings,
        "log_skeleton_noise",
        algos.log_skeleton_noise,
        defaults.log_skeleton_noise,
    );
    params.declare_min_confidence = unit_interval(
        &mut warnings,
        "declare_min_confidence",
        algos.declare_min_confidence,
        defaults.declare_min_confidence,
    );
    params.declare_min_support = unit_interval(
        &mut warnings,
        "declare_min_support",
        algos.declare_min_support,
        defaults.declare_min_support,
    );

    // -- Split Miner --
    let sm = raw.split_miner;
    let tool = &mut config.split_miner;
    if let Some(program) = sm.program.filter(|p| !p.trim().is_empty()) {
        tool.program = program;
    }
    tool.jar = sm.jar.filter(|j| !j.is_empty()).map(PathBuf::from);
    if let Some(args) = sm.args {
        if args.iter().any(|a| a.contains("{input}")) {
            tool.args = args;
        } else {
            warnings.push(
                "[split_miner] args has no {input} placeholder. Using the default template."
                    .to_string(),
            );
        }
    }
    if let Some(root) = sm.project_root.filter(|r| !r.is_empty()) {
        tool.project_root = PathBuf::from(root);
    }
    if let Some(dir) = sm.output_dir.filter(|d| !d.is_empty()) {
        tool.output_dir = PathBuf::from(dir);
    }
    if let Some(name) = sm.output_name {
        if name.is_empty() || name.contains(['/', '\\']) {
            warnings.push(format!(
                "[split_miner] output_name = \"{name}\" must be a plain file name. Using default ({}).",
                constants::DEFAULT_SPLIT_MINER_OUTPUT_NAME,
            ));
        } else {
            tool.output_name = name;
        }
    }
    if let Some(secs) = sm.timeout_secs {
        if (constants::MIN_SPLIT_MINER_TIMEOUT_SECS..=constants::MAX_SPLIT_MINER_TIMEOUT_SECS)
            .contains(&secs)
        {
            tool.timeout = Duration::from_secs(secs);
        } else {
            warnings.push(format!(
                "[split_miner] timeout_secs = {secs} is out of range ({}-{}). Using default ({}).",
                constants::MIN_SPLIT_MINER_TIMEOUT_SECS,
                constants::MAX_SPLIT_MINER_TIMEOUT_SECS,
                constants::DEFAULT_SPLIT_MINER_TIMEOUT_SECS,
            ));
        }
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.to_lowercase());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    if !warnings.is_empty() {
        tracing::warn!(count = warnings.len(), "Config validation produced warnings");
    }

    Ok((config, warnings))
}

fn unit_interval(warnings: &mut Vec<String>, key: &str, value: Option<f64>, default: f64) -> f64 {
    ranged(warnings, key, value, (0.0, 1.0), default)
}

fn ranged(
    warnings: &mut Vec<String>,
    key: &str,
    value: Option<f64>,
    (lo, hi): (f64, f64),
    default: f64,
) -> f64 {
    match value {
        None => default,
        Some(v) if v.is_finite() && (lo..=hi).contains(&v) => v,
        Some(v) => {
            warnings.push(format!(
                "[algorithms] {key} = {v} is out of range ({lo}-{hi}). Using default ({default})."
            ));
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(content: &str) -> (ExperimentConfig, Vec<String>) {
        parse_config(content, Path::new("fairmine.toml")).unwrap()
    }

    #[test]
    fn test_defaults_without_file() {
        let (config, warnings) = load_config(None).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(config.outlier_fraction, 0.2);
        assert_eq!(config.suite(), Algorithm::default_suite());
        assert_eq!(config.split_miner.timeout, Duration::from_secs(600));
        assert!(config.split_miner.jar.is_none());
    }

    #[test]
    fn test_full_config() {
        let (config, warnings) = parse(
            r#"
            [experiment]
            logs = ["event_logs/*.xes"]
            tier_labels = ["High", "Low"]
            outlier_fraction = 0.1
            protected_attribute = "case:gender"
            timestamp_mode = "source"
            output_dir = "out"

            [algorithms]
            enabled = ["declare", "alpha"]
            inductive_noise = 0.3

            [split_miner]
            jar = "/opt/sm2.jar"
            timeout_secs = 30

            [logging]
            level = "DEBUG"
            "#,
        );
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(config.logs, vec!["event_logs/*.xes"]);
        assert_eq!(config.outlier_fraction, 0.1);
        assert_eq!(config.protected_attribute, "gender");
        assert_eq!(config.timestamp_mode, TimestampMode::Source);
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.enabled, vec!["alpha", "declare"]);
        assert_eq!(config.params.inductive_noise, 0.3);
        assert_eq!(config.split_miner.jar, Some(PathBuf::from("/opt/sm2.jar")));
        assert_eq!(config.split_miner.timeout, Duration::from_secs(30));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_out_of_range_values_warn_and_default() {
        let (config, warnings) = parse(
            r#"
            [experiment]
            outlier_fraction = 1.5
            timestamp_mode = "wallclock"

            [algorithms]
            enabled = ["alpha", "magic"]
            ilp_alpha = 2.0

            [split_miner]
            timeout_secs = 0
            args = ["-jar", "{jar}"]

            [logging]
            level = "loud"
            "#,
        );
        assert_eq!(warnings.len(), 7, "{warnings:?}");
        assert_eq!(config.outlier_fraction, 0.2);
        assert_eq!(config.timestamp_mode, TimestampMode::RecordOrder);
        assert_eq!(config.enabled, vec!["alpha"]);
        assert_eq!(config.params.ilp_alpha, 0.73);
        assert_eq!(config.split_miner.timeout, Duration::from_secs(600));
        assert_eq!(config.split_miner.args.len(), 8);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_unparseable_file_falls_back() {
        let (config, warnings) = parse("[experiment\nlogs = ");
        assert_eq!(warnings.len(), 1);
        assert!(config.logs.is_empty());
    }

    #[test]
    fn test_invalid_label_pattern_is_fatal() {
        let err = parse_config(
            "[experiment]\nlabel_pattern = \"(unclosed\"",
            Path::new("fairmine.toml"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLabelPattern { .. }));
    }

    #[test]
    fn test_label_resolution() {
        let (config, _) = parse("[experiment]\ntier_labels = [\"Tier A\"]");
        assert_eq!(config.label_for(0, Path::new("x/hiring_log_high.xes")), "Tier A");
        assert_eq!(config.label_for(1, Path::new("x/hiring_log_HIGH.xes")), "High");
        assert_eq!(config.label_for(2, Path::new("x/lending_medium.xes.gz")), "Medium");
        assert_eq!(config.label_for(3, Path::new("x/renting.xes")), "renting");
    }

    #[test]
    fn test_locate_config() {
        let dir = TempDir::new().unwrap();
        let paths = PlatformPaths {
            config_dir: dir.path().to_path_buf(),
        };
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            locate_config(Some(&missing), &paths),
            Err(ConfigError::NotFound { .. })
        ));

        let platform_file = dir.path().join(constants::CONFIG_FILE_NAME);
        std::fs::write(&platform_file, "").unwrap();
        let explicit = dir.path().join("mine.toml");
        std::fs::write(&explicit, "").unwrap();
        assert_eq!(
            locate_config(Some(&explicit), &paths).unwrap(),
            Some(explicit.clone())
        );
        let (config, warnings) = load_config(Some(&explicit)).unwrap();
        assert!(warnings.is_empty());
        assert!(config.logs.is_empty());
    }

    #[test]
    fn test_resolve_config_surfaces_config_errors() {
        let dir = TempDir::new().unwrap();
        let paths = PlatformPaths {
            config_dir: dir.path().to_path_buf(),
        };
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            resolve_config(Some(&missing), &paths),
            Err(FairMineError::Config(ConfigError::NotFound { .. }))
        ));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[experiment]\nlabel_pattern = \"(\"").unwrap();
        assert!(matches!(
            resolve_config(Some(&bad), &paths),
            Err(FairMineError::Config(ConfigError::InvalidLabelPattern { .. }))
        ));

        let good = dir.path().join("good.toml");
        std::fs::write(&good, "[experiment]\noutlier_fraction = 0.3").unwrap();
        let (config, warnings) = resolve_config(Some(&good), &paths).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(config.outlier_fraction, 0.3);
    }
}
