//! Test utilities and mocks for firmforge unit tests.
//!
//! The mocks stand in for the three process/network boundaries of a build:
//! the native toolchain, the HTTP downloader and the test harness.
//!
//! # Example
//!
//! ```rust,ignore
//! use firmforge::test_support::{MockToolchain, MockDownloader};
//!
//! let mut toolchain = MockToolchain::new().fail_on("UART");
//! let downloader = MockDownloader::new().with_body(url, tarball_bytes);
//! ```

pub mod fixtures;

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use url::Url;

use crate::builder::toolchain::{BuildVariables, ConfigureRequest, Toolchain, ToolchainError};
use crate::core::target::TargetSpec;
use crate::ops::verify::{VerificationError, VerificationResult, Verifier};
use crate::sources::download::Downloader;

/// Directory under the build tree where [`MockToolchain`] writes artifacts.
pub const MOCK_OUTPUT_DIR: &str = "out";

/// In-memory toolchain that records calls and writes placeholder artifacts.
#[derive(Debug, Default)]
pub struct MockToolchain {
    fail_on: HashSet<String>,
    skip_artifacts: HashSet<String>,
    fail_configure: bool,
    fail_install: bool,
    configure_count: usize,
    install_count: usize,
    built: Vec<String>,
    variables: Option<BuildVariables>,
}

impl MockToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail when building `target`.
    pub fn fail_on(mut self, target: &str) -> Self {
        self.fail_on.insert(target.to_string());
        self
    }

    /// Report success for `target` without writing its output file.
    pub fn skip_artifact(mut self, target: &str) -> Self {
        self.skip_artifacts.insert(target.to_string());
        self
    }

    pub fn fail_configure(mut self) -> Self {
        self.fail_configure = true;
        self
    }

    pub fn fail_install(mut self) -> Self {
        self.fail_install = true;
        self
    }

    pub fn configure_count(&self) -> usize {
        self.configure_count
    }

    pub fn install_count(&self) -> usize {
        self.install_count
    }

    /// Targets built successfully, in order.
    pub fn built_targets(&self) -> Vec<String> {
        self.built.clone()
    }

    /// Variables from the most recent configure.
    pub fn last_variables(&self) -> Option<BuildVariables> {
        self.variables.clone()
    }
}

impl Toolchain for MockToolchain {
    fn configure(&mut self, request: &ConfigureRequest<'_>) -> Result<(), ToolchainError> {
        self.configure_count += 1;
        if self.fail_configure {
            return Err(ToolchainError::ConfigureFailed {
                build_dir: request.build_dir.to_path_buf(),
                stderr: "CMake Error: mock configure failure".to_string(),
            });
        }
        self.variables = Some(request.variables.clone());
        Ok(())
    }

    fn build_target(
        &mut self,
        build_dir: &Path,
        target: &TargetSpec,
    ) -> Result<(), ToolchainError> {
        if self.fail_on.contains(&target.name) {
            return Err(ToolchainError::TargetFailed {
                target: target.name.clone(),
                status: Some(2),
                stderr: format!("mock failure building {}", target.name),
            });
        }

        if !self.skip_artifacts.contains(&target.name) {
            let (platform, shared) = self
                .variables
                .as_ref()
                .map(|v| (v.platform, v.shared_libs))
                .unwrap_or_default();
            let out = build_dir.join(MOCK_OUTPUT_DIR);
            let file = out.join(target.output_filename(platform, shared));
            std::fs::create_dir_all(&out)
                .and_then(|_| std::fs::write(&file, target.name.as_bytes()))
                .map_err(|e| ToolchainError::Spawn {
                    command: format!("write {}", file.display()),
                    message: e.to_string(),
                })?;
        }

        self.built.push(target.name.clone());
        Ok(())
    }

    fn install(&mut self, _build_dir: &Path, prefix: &Path) -> Result<(), ToolchainError> {
        self.install_count += 1;
        if self.fail_install {
            return Err(ToolchainError::InstallFailed {
                prefix: prefix.to_path_buf(),
                stderr: "mock install failure".to_string(),
            });
        }
        std::fs::create_dir_all(prefix).map_err(|e| ToolchainError::InstallFailed {
            prefix: prefix.to_path_buf(),
            stderr: e.to_string(),
        })
    }
}

/// Downloader serving canned bodies by URL.
#[derive(Debug, Default)]
pub struct MockDownloader {
    bodies: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl MockDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    pub fn with_body(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }

    /// All requested URLs, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl Downloader for MockDownloader {
    fn download(&self, url: &Url, dest: &mut dyn Write) -> Result<u64> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }

        let Some(body) = self.bodies.get(url.as_str()) else {
            bail!("connection refused: {}", url);
        };
        dest.write_all(body)?;
        Ok(body.len() as u64)
    }
}

/// Verifier returning a fixed exit code.
#[derive(Debug, Default)]
pub struct MockVerifier {
    exit_code: i32,
    calls: Cell<usize>,
}

impl MockVerifier {
    pub fn passing() -> Self {
        Self::default()
    }

    pub fn failing(exit_code: i32) -> Self {
        MockVerifier {
            exit_code,
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Verifier for MockVerifier {
    fn verify(&self, build_dir: &Path) -> Result<VerificationResult, VerificationError> {
        self.calls.set(self.calls.get() + 1);
        if self.exit_code != 0 {
            return Err(VerificationError::TestsFailed {
                exit_code: Some(self.exit_code),
                output: format!("1 of 1 tests failed in {}", build_dir.display()),
            });
        }
        Ok(VerificationResult {
            exit_code: 0,
            duration: Duration::from_millis(1),
            output: "100% tests passed".to_string(),
        })
    }
}

/// Path of a placeholder artifact written by [`MockToolchain`].
pub fn mock_artifact(build_dir: &Path, file: &str) -> PathBuf {
    build_dir.join(MOCK_OUTPUT_DIR).join(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::Platform;
    use tempfile::TempDir;

    #[test]
    fn test_mock_downloader_records_requests() {
        let url = Url::parse("https://example.com/a.tar.gz").unwrap();
        let downloader = MockDownloader::new().with_body(url.as_str(), b"abc".to_vec());

        let mut out = Vec::new();
        assert_eq!(downloader.download(&url, &mut out).unwrap(), 3);
        assert_eq!(out, b"abc");

        let missing = Url::parse("https://example.com/missing").unwrap();
        assert!(downloader.download(&missing, &mut Vec::new()).is_err());
        assert_eq!(downloader.requests().len(), 2);
    }

    #[test]
    fn test_mock_toolchain_writes_artifacts() {
        let tmp = TempDir::new().unwrap();
        let mut toolchain = MockToolchain::new();
        toolchain
            .build_target(tmp.path(), &TargetSpec::library("UART", &[]))
            .unwrap();

        let expected = TargetSpec::library("UART", &[]).output_filename(Platform::Avr, false);
        assert!(mock_artifact(tmp.path(), &expected).is_file());
        assert_eq!(toolchain.built_targets(), vec!["UART"]);
    }
}
