//! Subprocess execution utilities.

use std::ffi::OsStr;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

/// How often a child under a deadline is polled.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
}

/// Result of running a process under an optional deadline.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// The process exited on its own.
    Exited(Output),

    /// The deadline passed; the process was killed.
    TimedOut {
        /// Output captured before the kill.
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    },
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Execute the command and wait for completion, capturing output.
    pub fn exec(&self) -> Result<Output> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running `{}`", self.display_command());

        let child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;

        child
            .wait_with_output()
            .with_context(|| format!("failed to wait for `{}`", self.program.display()))
    }

    /// Execute with an optional deadline.
    ///
    /// With `timeout = None` this waits indefinitely.
    pub fn exec_with_deadline(&self, timeout: Option<Duration>) -> Result<ProcessOutcome> {
        self.exec_with_deadline_streamed(timeout, &mut |_: &str| {})
    }

    /// Like [`exec_with_deadline`](Self::exec_with_deadline), handing each
    /// complete output line to `on_line` while the child is still running.
    ///
    /// Output goes to temp files rather than pipes so a chatty child cannot
    /// block on a full pipe while we poll it. Each capture is followed through
    /// its own handle; stdout and stderr lines are interleaved per poll, not
    /// in exact write order.
    pub fn exec_with_deadline_streamed(
        &self,
        timeout: Option<Duration>,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<ProcessOutcome> {
        let mut stdout_file = NamedTempFile::new().context("failed to create stdout capture")?;
        let mut stderr_file = NamedTempFile::new().context("failed to create stderr capture")?;
        let mut followers = [
            CaptureFollower::new(stdout_file.reopen()?),
            CaptureFollower::new(stderr_file.reopen()?),
        ];

        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::from(stdout_file.reopen()?));
        cmd.stderr(Stdio::from(stderr_file.reopen()?));

        tracing::debug!(
            "Running `{}` (timeout: {:?})",
            self.display_command(),
            timeout
        );

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;

        let deadline = timeout.map(|t| Instant::now() + t);
        let status: Option<ExitStatus> = loop {
            for follower in followers.iter_mut() {
                follower.poll(on_line)?;
            }

            if let Some(status) = child
                .try_wait()
                .with_context(|| format!("failed to wait for `{}`", self.program.display()))?
            {
                break Some(status);
            }

            if deadline.is_some_and(|d| Instant::now() >= d) {
                let _ = child.kill();
                let _ = child.wait();
                break None;
            }

            std::thread::sleep(POLL_INTERVAL);
        };

        for follower in followers.iter_mut() {
            follower.finish(on_line)?;
        }

        let stdout = read_capture(stdout_file.as_file_mut())?;
        let stderr = read_capture(stderr_file.as_file_mut())?;

        Ok(match status {
            Some(status) => ProcessOutcome::Exited(Output {
                status,
                stdout,
                stderr,
            }),
            None => ProcessOutcome::TimedOut { stdout, stderr },
        })
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Reads a capture file as it grows and emits whole lines.
struct CaptureFollower {
    file: File,
    pending: Vec<u8>,
}

impl CaptureFollower {
    fn new(file: File) -> Self {
        CaptureFollower {
            file,
            pending: Vec::new(),
        }
    }

    fn poll(&mut self, on_line: &mut dyn FnMut(&str)) -> Result<()> {
        self.file
            .read_to_end(&mut self.pending)
            .context("failed to read process output")?;
        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            on_line(String::from_utf8_lossy(&line).trim_end());
        }
        Ok(())
    }

    /// Drain what is left, including a final unterminated line.
    fn finish(&mut self, on_line: &mut dyn FnMut(&str)) -> Result<()> {
        self.poll(on_line)?;
        if !self.pending.is_empty() {
            on_line(String::from_utf8_lossy(&self.pending).trim_end());
            self.pending.clear();
        }
        Ok(())
    }
}

fn read_capture(file: &mut File) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Find CMake.
pub fn find_cmake() -> Option<PathBuf> {
    find_executable("cmake")
}

/// Find CTest.
pub fn find_ctest() -> Option<PathBuf> {
    find_executable("ctest")
}
