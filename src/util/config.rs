//! Configuration file support for firmforge.
//!
//! Two locations are read:
//! - Global: `~/.firmforge/config.toml` - user-wide toolchain defaults
//! - Project: the `[toolchain]`, `[verify]` and `[dependencies.*]` tables of
//!   `Firmforge.toml`
//!
//! Project settings take precedence over global ones, field by field.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Toolchain, verification and dependency settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Toolchain driver settings
    pub toolchain: ToolchainSettings,

    /// Verification runner settings
    pub verify: VerifySettings,

    /// Overrides for pinned external dependencies, keyed by identifier
    pub dependencies: BTreeMap<String, DependencyOverride>,
}

/// How the toolchain driver is invoked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSettings {
    /// Path to cmake (defaults to the one on PATH)
    pub cmake: Option<PathBuf>,

    /// CMake generator (e.g. "Ninja")
    pub generator: Option<String>,

    /// CMAKE_BUILD_TYPE, "Release" when unset
    pub build_type: Option<String>,

    /// CMake toolchain file used for the avr cross build
    pub avr_toolchain_file: Option<PathBuf>,

    /// Parallel jobs passed to `cmake --build`
    pub jobs: Option<usize>,
}

/// How the host test harness is invoked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifySettings {
    /// Harness program (defaults to `ctest`)
    pub harness: Option<PathBuf>,

    /// Extra harness arguments
    pub args: Vec<String>,

    /// Kill the harness after this many seconds
    pub timeout_secs: Option<u64>,
}

impl VerifySettings {
    /// The configured timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Replaces parts of a pinned dependency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DependencyOverride {
    pub version: Option<String>,
    pub url: Option<Url>,
    pub sha256: Option<String>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file is missing or broken.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        let tc = other.toolchain;
        if tc.cmake.is_some() {
            self.toolchain.cmake = tc.cmake;
        }
        if tc.generator.is_some() {
            self.toolchain.generator = tc.generator;
        }
        if tc.build_type.is_some() {
            self.toolchain.build_type = tc.build_type;
        }
        if tc.avr_toolchain_file.is_some() {
            self.toolchain.avr_toolchain_file = tc.avr_toolchain_file;
        }
        if tc.jobs.is_some() {
            self.toolchain.jobs = tc.jobs;
        }

        let verify = other.verify;
        if verify.harness.is_some() {
            self.verify.harness = verify.harness;
        }
        if !verify.args.is_empty() {
            self.verify.args = verify.args;
        }
        if verify.timeout_secs.is_some() {
            self.verify.timeout_secs = verify.timeout_secs;
        }

        self.dependencies.extend(other.dependencies);
    }
}

/// Load the effective configuration.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (from `Firmforge.toml`)
/// 2. Global config (`~/.firmforge/config.toml`)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project: Config) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }

    config.merge(project);
    config
}

/// Get the global firmforge config directory (~/.firmforge).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".firmforge"))
}

/// Get the global config path (~/.firmforge/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}
