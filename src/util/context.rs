//! Global context for firmforge operations.
//!
//! Provides access to the working directory, the global config location and
//! project discovery.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use miette::Diagnostic;
use thiserror::Error;

use crate::core::project::{Project, PROJECT_FILE};
use crate::util::config::{global_config_path, load_config};

/// No project file in the working directory or any parent.
#[derive(Debug, Error, Diagnostic)]
#[error("could not find `Firmforge.toml` in {} or any parent directory", dir.display())]
#[diagnostic(
    code(firmforge::project::not_found),
    help("run from inside a firmware tree, or pass --manifest-path")
)]
pub struct ProjectNotFound {
    pub dir: PathBuf,
}

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Global config file (~/.firmforge/config.toml), if a home exists
    config_path: Option<PathBuf>,
}

impl GlobalContext {
    /// Create a new GlobalContext from the process environment.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(GlobalContext {
            cwd,
            config_path: global_config_path(),
        })
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    /// Override the global config file location.
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Find `Firmforge.toml` starting from cwd and searching upward.
    pub fn find_project_file(&self) -> Result<PathBuf, ProjectNotFound> {
        let mut current = self.cwd.clone();
        loop {
            let candidate = current.join(PROJECT_FILE);
            if candidate.is_file() {
                return Ok(candidate);
            }
            if !current.pop() {
                return Err(ProjectNotFound {
                    dir: self.cwd.clone(),
                });
            }
        }
    }

    /// Load a project and merge the global config under its settings.
    ///
    /// `manifest_path` overrides discovery. With `allow_detached`, a missing
    /// project file yields a default project rooted at cwd.
    pub fn load_project(
        &self,
        manifest_path: Option<&Path>,
        allow_detached: bool,
    ) -> Result<Project> {
        let project = match manifest_path {
            Some(path) => Project::load(&self.cwd.join(path))?,
            None => match self.find_project_file() {
                Ok(path) => Project::load(&path)?,
                Err(_) if allow_detached => {
                    tracing::debug!("no {} found; using defaults", PROJECT_FILE);
                    Project::detached(self.cwd.clone())
                }
                Err(e) => return Err(e.into()),
            },
        };

        let config = load_config(self.config_path(), project.config().clone());
        Ok(project.with_config(config))
    }
}
