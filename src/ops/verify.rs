//! Verification runner: run the host test harness and gate the build on it.
//!
//! Harness output is logged line by line while the tests run; a failure
//! also carries the tail of that output.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use miette::Diagnostic;
use thiserror::Error;

use crate::util::config::VerifySettings;
use crate::util::process::{find_ctest, ProcessBuilder, ProcessOutcome};

/// Lines of harness output kept in error messages.
const OUTPUT_TAIL_LINES: usize = 40;

/// The test harness failed or could not be run.
#[derive(Debug, Error, Diagnostic)]
pub enum VerificationError {
    #[error("test harness `{program}` not found")]
    #[diagnostic(
        code(firmforge::verify::harness_not_found),
        help("install CMake (which ships ctest) or set [verify] harness in Firmforge.toml")
    )]
    HarnessNotFound { program: String },

    #[error("failed to run `{command}`: {message}")]
    #[diagnostic(code(firmforge::verify::spawn))]
    Spawn { command: String, message: String },

    #[error("unit tests failed (exit code {})\n{output}", exit_code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    #[diagnostic(
        code(firmforge::verify::tests_failed),
        help("fix the failing tests; no package was produced")
    )]
    TestsFailed {
        exit_code: Option<i32>,
        output: String,
    },

    #[error("unit tests did not finish within {}s\n{output}", timeout.as_secs())]
    #[diagnostic(
        code(firmforge::verify::timed_out),
        help("raise [verify] timeout_secs or --test-timeout")
    )]
    TimedOut { timeout: Duration, output: String },
}

/// Outcome of a passing verification run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub exit_code: i32,
    pub duration: Duration,
    /// Combined harness output
    pub output: String,
}

/// Runs the verification pass against a build tree.
pub trait Verifier {
    fn verify(&self, build_dir: &Path) -> Result<VerificationResult, VerificationError>;
}

/// Subprocess test harness (`ctest` unless configured otherwise).
#[derive(Debug, Clone)]
pub struct TestHarness {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
    default_args: bool,
}

impl TestHarness {
    /// Build a harness from settings. Without an explicit program this looks
    /// for `ctest` on PATH.
    pub fn from_settings(settings: &VerifySettings) -> Result<Self, VerificationError> {
        let (program, default_args) = match settings.harness {
            Some(ref program) => (program.clone(), false),
            None => (
                find_ctest().ok_or_else(|| VerificationError::HarnessNotFound {
                    program: "ctest".to_string(),
                })?,
                true,
            ),
        };

        Ok(TestHarness {
            program,
            args: settings.args.clone(),
            timeout: settings.timeout(),
            default_args,
        })
    }

    /// A harness running `program` with `args` and no ctest defaults.
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        TestHarness {
            program: program.into(),
            args,
            timeout: None,
            default_args: false,
        }
    }

    /// Override the timeout.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, build_dir: &Path) -> ProcessBuilder {
        let mut cmd = ProcessBuilder::new(&self.program).cwd(build_dir);
        if self.default_args {
            cmd = cmd
                .arg("--test-dir")
                .arg(build_dir)
                .arg("--output-on-failure");
        }
        cmd.args(&self.args)
    }
}

impl Verifier for TestHarness {
    fn verify(&self, build_dir: &Path) -> Result<VerificationResult, VerificationError> {
        let cmd = self.command(build_dir);
        tracing::info!("Running unit tests: {}", cmd.display_command());

        let start = Instant::now();
        let outcome = cmd
            .exec_with_deadline_streamed(self.timeout, &mut |line: &str| {
                tracing::info!("  {}", line)
            })
            .map_err(|e| VerificationError::Spawn {
                command: cmd.display_command(),
                message: format!("{:#}", e),
            })?;
        let duration = start.elapsed();

        match outcome {
            ProcessOutcome::Exited(output) => {
                let combined = combine_output(&output.stdout, &output.stderr);
                if output.status.success() {
                    tracing::info!("Unit tests passed in {:.2}s", duration.as_secs_f64());
                    return Ok(VerificationResult {
                        exit_code: 0,
                        duration,
                        output: combined,
                    });
                }

                Err(VerificationError::TestsFailed {
                    exit_code: output.status.code(),
                    output: tail(&combined, OUTPUT_TAIL_LINES),
                })
            }
            ProcessOutcome::TimedOut { stdout, stderr } => {
                let combined = combine_output(&stdout, &stderr);
                Err(VerificationError::TimedOut {
                    timeout: self.timeout.unwrap_or_default(),
                    output: tail(&combined, OUTPUT_TAIL_LINES),
                })
            }
        }
    }
}

fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    let mut combined = String::from_utf8_lossy(stdout).into_owned();
    let stderr = String::from_utf8_lossy(stderr);
    if !stderr.trim().is_empty() {
        if !combined.is_empty() && !combined.ends_with('\n') {
            combined.push('\n');
        }
        combined.push_str(&stderr);
    }
    combined
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}
