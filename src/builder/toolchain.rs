//! Toolchain boundary: the variable set and the driver trait.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

use crate::core::options::{Configuration, Platform};
use crate::core::target::TargetSpec;
use crate::util::config::ToolchainSettings;

/// Default CMAKE_BUILD_TYPE.
pub const DEFAULT_BUILD_TYPE: &str = "Release";

/// A target failed to configure, compile, or install.
#[derive(Debug, Error, Diagnostic)]
pub enum ToolchainError {
    #[error("`{program}` not found")]
    #[diagnostic(
        code(firmforge::toolchain::not_found),
        help("install it and make sure it is on PATH, or set [toolchain] cmake in Firmforge.toml")
    )]
    NotFound { program: String },

    #[error("failed to run `{command}`: {message}")]
    #[diagnostic(code(firmforge::toolchain::spawn))]
    Spawn { command: String, message: String },

    #[error("configuring {} failed:\n{stderr}", build_dir.display())]
    #[diagnostic(code(firmforge::toolchain::configure))]
    ConfigureFailed { build_dir: PathBuf, stderr: String },

    #[error("target `{target}` failed to build (exit code {status:?}):\n{stderr}")]
    #[diagnostic(
        code(firmforge::toolchain::target_failed),
        help("run with --verbose to see the full toolchain output")
    )]
    TargetFailed {
        target: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("install into {} failed:\n{stderr}", prefix.display())]
    #[diagnostic(code(firmforge::toolchain::install))]
    InstallFailed { prefix: PathBuf, stderr: String },
}

/// Variables handed to the toolchain at configure time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildVariables {
    pub platform: Platform,
    pub enable_unit_tests: bool,
    pub presets_prefix: String,
    pub shared_libs: bool,
    pub position_independent_code: bool,
    pub enable_ethernet: bool,
    pub build_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toolchain_file: Option<PathBuf>,
}

impl BuildVariables {
    /// Derive the variable set from a configuration and toolchain settings.
    ///
    /// Unit tests are only compiled in for the host build; the avr toolchain
    /// file is only applied to the avr build.
    pub fn from_config(config: &Configuration, settings: &ToolchainSettings) -> Self {
        let platform = config.platform();
        BuildVariables {
            platform,
            enable_unit_tests: config.verification_enabled(),
            presets_prefix: platform.presets_prefix(),
            shared_libs: config.shared(),
            position_independent_code: config.position_independent_code(),
            enable_ethernet: config.network_enabled(),
            build_type: settings
                .build_type
                .clone()
                .unwrap_or_else(|| DEFAULT_BUILD_TYPE.to_string()),
            toolchain_file: match platform {
                Platform::Avr => settings.avr_toolchain_file.clone(),
                Platform::Linux => None,
            },
        }
    }

    /// `-D` definitions, in a stable order.
    pub fn definitions(&self) -> Vec<(&'static str, String)> {
        let mut defs = vec![
            ("ENABLE_UNIT_TESTS", on_off(self.enable_unit_tests)),
            ("PRESETS_PREFIX", self.presets_prefix.clone()),
            ("TARGET_PLATFORM", self.platform.as_str().to_string()),
            ("BUILD_SHARED_LIBS", on_off(self.shared_libs)),
            (
                "CMAKE_POSITION_INDEPENDENT_CODE",
                on_off(self.position_independent_code),
            ),
            ("ENABLE_ETHERNET", on_off(self.enable_ethernet)),
            ("CMAKE_BUILD_TYPE", self.build_type.clone()),
        ];
        if let Some(ref file) = self.toolchain_file {
            defs.push(("CMAKE_TOOLCHAIN_FILE", file.display().to_string()));
        }
        defs
    }
}

fn on_off(value: bool) -> String {
    if value { "ON" } else { "OFF" }.to_string()
}

/// Inputs to the one-per-invocation configure step.
#[derive(Debug, Clone, Copy)]
pub struct ConfigureRequest<'a> {
    pub source_dir: &'a Path,
    pub build_dir: &'a Path,
    pub variables: &'a BuildVariables,
}

/// A driver for the native build tool.
pub trait Toolchain {
    /// Configure a build tree.
    fn configure(&mut self, request: &ConfigureRequest<'_>) -> Result<(), ToolchainError>;

    /// Build one target in a configured tree.
    fn build_target(&mut self, build_dir: &Path, target: &TargetSpec)
        -> Result<(), ToolchainError>;

    /// Run the install step into `prefix`.
    fn install(&mut self, build_dir: &Path, prefix: &Path) -> Result<(), ToolchainError>;
}
