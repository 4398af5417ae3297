// FairMine - platform/split_miner.rs
//
// Split Miner as an external discovery tool.
//
// The tool is launched as `program args...` with placeholders substituted:
//   {jar}        configured jar path (empty when unset)
//   {input}      log path, resolved against `project_root` when relative
//   {output_dir} directory the tool writes its model into
//   {epsilon}    filtering threshold
//
// stdout/stderr are drained on helper threads so a chatty child never blocks
// on a full pipe. The child is polled with `try_wait` and killed at the
// deadline. The model file is read back and removed on every exit path.

use crate::core::conformance::ExternalDiscovery;
use crate::platform::config::SplitMinerSettings;
use crate::platform::fs::ScopedFile;
use crate::util::constants;
use crate::util::error::ExternalToolError;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Split Miner subprocess wrapper.
#[derive(Debug, Clone)]
pub struct SplitMinerTool {
    settings: SplitMinerSettings,
}

impl SplitMinerTool {
    pub fn new(settings: SplitMinerSettings) -> Self {
        Self { settings }
    }

    /// A tool for `settings`, or `None` when no jar is configured.
    pub fn configured(settings: &SplitMinerSettings) -> Option<Self> {
        settings.jar.as_ref().map(|_| Self::new(settings.clone()))
    }

    /// Path of the model file the tool is expected to write.
    pub fn output_path(&self) -> PathBuf {
        self.settings.output_dir.join(&self.settings.output_name)
    }

    fn input_path(&self, log_path: &Path) -> PathBuf {
        if log_path.is_absolute() {
            log_path.to_path_buf()
        } else {
            self.settings.project_root.join(log_path)
        }
    }

    /// Argument list with every placeholder substituted.
    pub fn command_args(&self, log_path: &Path, epsilon: f64) -> Vec<String> {
        let jar = self
            .settings
            .jar
            .as_ref()
            .map(|j| j.display().to_string())
            .unwrap_or_default();
        let input = self.input_path(log_path).display().to_string();
        let output_dir = self.settings.output_dir.display().to_string();
        let epsilon = epsilon.to_string();

        self.settings
            .args
            .iter()
            .map(|arg| {
                arg.replace("{jar}", &jar)
                    .replace("{input}", &input)
                    .replace("{output_dir}", &output_dir)
                    .replace("{epsilon}", &epsilon)
            })
            .collect()
    }

    /// Run the program to completion or until the timeout.
    fn run(&self, args: &[String]) -> Result<(), ExternalToolError> {
        let program = self.settings.program.as_str();
        let timeout = self.settings.timeout;

        tracing::debug!(program, ?args, timeout_secs = timeout.as_secs(), "Launching external tool");
        let started = Instant::now();

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExternalToolError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let deadline = started + timeout;
        let poll = Duration::from_millis(constants::SUBPROCESS_POLL_INTERVAL_MS);
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    // Drain threads are left to finish on their own: a
                    // grandchild may still hold the pipes open.
                    tracing::warn!(
                        program,
                        timeout_secs = timeout.as_secs(),
                        "External tool timed out and was killed"
                    );
                    return Err(ExternalToolError::Timeout {
                        program: program.to_string(),
                        timeout_secs: timeout.as_secs(),
                    });
                }
                Ok(None) => thread::sleep(poll),
                Err(source) => {
                    let _ = child.kill();
                    return Err(ExternalToolError::Wait {
                        program: program.to_string(),
                        source,
                    });
                }
            }
        };

        let stdout = collect(stdout);
        let stderr = collect(stderr);
        tracing::debug!(
            program,
            status = %status,
            stdout_bytes = stdout.len(),
            stderr_bytes = stderr.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "External tool finished"
        );

        if status.success() {
            Ok(())
        } else {
            Err(ExternalToolError::NonZeroExit {
                program: program.to_string(),
                code: status.code(),
                stderr_tail: tail(&stderr, constants::SUBPROCESS_STDERR_TAIL_BYTES),
            })
        }
    }
}

impl ExternalDiscovery for SplitMinerTool {
    fn discover_bpmn(&self, log_path: &Path, epsilon: f64) -> Result<String, ExternalToolError> {
        let output = ScopedFile::new(self.output_path());
        // A model left behind by an earlier run must not be mistaken for ours.
        if output.path().exists() {
            tracing::debug!(path = %output.path().display(), "Removing stale tool output");
            let _ = std::fs::remove_file(output.path());
        }

        self.run(&self.command_args(log_path, epsilon))?;

        if !output.path().is_file() {
            return Err(ExternalToolError::MissingOutput {
                path: output.path().to_path_buf(),
            });
        }
        output.read_lossy().map_err(|source| ExternalToolError::Io {
            path: output.path().to_path_buf(),
            source,
        })
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Last `max` bytes of `bytes` as trimmed, lossy UTF-8.
fn tail(bytes: &[u8], max: usize) -> String {
    let start = bytes.len().saturating_sub(max);
    String::from_utf8_lossy(&bytes[start..]).trim().to_string()
}
