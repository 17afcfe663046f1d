//! Build driver: configure once, then build every resolved target in order.

use std::path::{Path, PathBuf};
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

use crate::builder::toolchain::{BuildVariables, ConfigureRequest, Toolchain, ToolchainError};
use crate::core::options::{Configuration, Platform};
use crate::core::target::TargetSpec;
use crate::util::config::ToolchainSettings;

/// What a successful build produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    pub platform: Platform,
    pub build_dir: PathBuf,
    /// Targets built, in build order
    pub built: Vec<String>,
}

/// Runs the toolchain over a resolved target list.
pub struct BuildDriver<'a> {
    toolchain: &'a mut dyn Toolchain,
    source_dir: &'a Path,
    build_dir: &'a Path,
    settings: &'a ToolchainSettings,
    show_progress: bool,
}

impl<'a> BuildDriver<'a> {
    pub fn new(
        toolchain: &'a mut dyn Toolchain,
        source_dir: &'a Path,
        build_dir: &'a Path,
        settings: &'a ToolchainSettings,
    ) -> Self {
        BuildDriver {
            toolchain,
            source_dir,
            build_dir,
            settings,
            show_progress: false,
        }
    }

    /// Show a progress bar while building.
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Configure the build tree and build `targets` in order.
    ///
    /// Stops at the first failing target; later targets are not attempted.
    pub fn build(
        &mut self,
        targets: &[TargetSpec],
        config: &Configuration,
    ) -> Result<BuildResult, ToolchainError> {
        let start = Instant::now();
        let variables = BuildVariables::from_config(config, self.settings);

        std::fs::create_dir_all(self.build_dir).map_err(|e| ToolchainError::Spawn {
            command: format!("mkdir {}", self.build_dir.display()),
            message: e.to_string(),
        })?;

        self.toolchain.configure(&ConfigureRequest {
            source_dir: self.source_dir,
            build_dir: self.build_dir,
            variables: &variables,
        })?;

        let pb = self.progress_bar(targets.len());
        let mut built = Vec::with_capacity(targets.len());

        for target in targets {
            pb.set_message(target.name.clone());
            tracing::info!("Building {} `{}`", target.kind, target.name);

            if let Err(e) = self.toolchain.build_target(self.build_dir, target) {
                pb.abandon_with_message(format!("{} failed", target.name));
                tracing::error!("target `{}` failed; skipping remaining targets", target.name);
                return Err(e);
            }

            built.push(target.name.clone());
            pb.inc(1);
        }

        pb.finish_and_clear();
        tracing::info!(
            "Finished {} target(s) for {} in {:.2}s",
            built.len(),
            config.platform(),
            start.elapsed().as_secs_f64()
        );

        Ok(BuildResult {
            platform: config.platform(),
            build_dir: self.build_dir.to_path_buf(),
            built,
        })
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.show_progress || total < 2 {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}
