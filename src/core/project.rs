//! Project file (`Firmforge.toml`) parsing and on-disk layout.
//!
//! ```toml
//! [project]
//! name = "atmega328_template"
//! version = "1.0.0"
//!
//! [options]
//! platform = "avr"
//! features = ["ethernet"]
//!
//! [toolchain]
//! avr_toolchain_file = "cmake/avr-gcc.cmake"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::core::options::{Platform, RawOptions};
use crate::util::config::Config;

/// Name of the project file.
pub const PROJECT_FILE: &str = "Firmforge.toml";

/// Directory (relative to the project root) holding all build trees.
pub const BUILD_DIR: &str = "build";

/// Directory (relative to the project root) where fetched dependencies land.
pub const THIRD_PARTY_DIR: &str = "third_party";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProjectFile {
    project: ProjectMeta,

    #[serde(default)]
    options: RawOptions,

    #[serde(flatten)]
    config: Config,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProjectMeta {
    name: String,
    version: Version,
}

/// A loaded project: identity, declared options, and settings.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    name: String,
    version: Version,
    options: RawOptions,
    config: Config,
}

impl Project {
    /// Load a project from its `Firmforge.toml`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = crate::util::fs::read_to_string(path)?;
        let file: ProjectFile = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Project {
            root,
            name: file.project.name,
            version: file.project.version,
            options: file.options,
            config: file.config,
        })
    }

    /// A project with default identity rooted at `root`, for commands that
    /// can run without a project file.
    pub fn detached(root: impl Into<PathBuf>) -> Self {
        Project {
            root: root.into(),
            name: "firmware".to_string(),
            version: Version::new(0, 1, 0),
            options: RawOptions::default(),
            config: Config::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Options declared in the project file.
    pub fn options(&self) -> &RawOptions {
        &self.options
    }

    /// Settings declared in the project file.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replace the settings (e.g. after merging the global config).
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Build tree for one platform. Keyed by platform so avr and linux
    /// builds from the same checkout never share a tree.
    pub fn build_dir(&self, platform: Platform) -> PathBuf {
        self.root.join(BUILD_DIR).join(platform.as_str())
    }

    /// Package tree: `build/package/<name>-<version>-<platform>`.
    pub fn package_dir(&self, platform: Platform) -> PathBuf {
        self.root
            .join(BUILD_DIR)
            .join("package")
            .join(format!("{}-{}-{}", self.name, self.version, platform))
    }

    /// Where a fetched dependency is placed.
    pub fn dependency_dir(&self, identifier: &str) -> PathBuf {
        self.root.join(THIRD_PARTY_DIR).join(identifier)
    }
}
