//! CMake toolchain driver.

use std::path::{Path, PathBuf};

use crate::builder::toolchain::{ConfigureRequest, Toolchain, ToolchainError};
use crate::core::target::TargetSpec;
use crate::util::config::ToolchainSettings;
use crate::util::process::{find_cmake, ProcessBuilder};

/// Drives `cmake` for configure, build and install.
#[derive(Debug, Clone)]
pub struct CMakeToolchain {
    cmake: PathBuf,
    generator: Option<String>,
    jobs: Option<usize>,
    build_type: Option<String>,
}

impl CMakeToolchain {
    /// Locate cmake (settings first, then PATH).
    pub fn new(settings: &ToolchainSettings) -> Result<Self, ToolchainError> {
        let cmake = settings
            .cmake
            .clone()
            .or_else(find_cmake)
            .ok_or_else(|| ToolchainError::NotFound {
                program: "cmake".to_string(),
            })?;

        Ok(CMakeToolchain {
            cmake,
            generator: settings.generator.clone(),
            jobs: settings.jobs,
            build_type: settings.build_type.clone(),
        })
    }

    fn command(&self) -> ProcessBuilder {
        ProcessBuilder::new(&self.cmake)
    }

    /// Arguments for the configure step.
    pub fn configure_args(&self, request: &ConfigureRequest<'_>) -> Vec<String> {
        let mut args = vec![
            "-S".to_string(),
            request.source_dir.display().to_string(),
            "-B".to_string(),
            request.build_dir.display().to_string(),
        ];

        if let Some(ref generator) = self.generator {
            args.push("-G".to_string());
            args.push(generator.clone());
        }

        for (key, value) in request.variables.definitions() {
            args.push(format!("-D{}={}", key, value));
        }

        args
    }

    /// Arguments for building one target.
    pub fn build_args(&self, build_dir: &Path, target: &TargetSpec) -> Vec<String> {
        let mut args = vec![
            "--build".to_string(),
            build_dir.display().to_string(),
            "--target".to_string(),
            target.name.clone(),
        ];

        // Multi-config generators pick the configuration at build time.
        if let Some(ref build_type) = self.build_type {
            args.push("--config".to_string());
            args.push(build_type.clone());
        }

        match self.jobs {
            Some(jobs) => {
                args.push("--parallel".to_string());
                args.push(jobs.to_string());
            }
            None => args.push("--parallel".to_string()),
        }

        args
    }

    fn run(&self, args: &[String]) -> Result<std::process::Output, ToolchainError> {
        let cmd = self.command().args(args);
        cmd.exec().map_err(|e| ToolchainError::Spawn {
            command: cmd.display_command(),
            message: format!("{:#}", e),
        })
    }
}

impl Toolchain for CMakeToolchain {
    fn configure(&mut self, request: &ConfigureRequest<'_>) -> Result<(), ToolchainError> {
        tracing::info!(
            "Configuring {} ({})",
            request.build_dir.display(),
            request.variables.presets_prefix
        );

        let output = self.run(&self.configure_args(request))?;
        if !output.status.success() {
            return Err(ToolchainError::ConfigureFailed {
                build_dir: request.build_dir.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(())
    }

    fn build_target(
        &mut self,
        build_dir: &Path,
        target: &TargetSpec,
    ) -> Result<(), ToolchainError> {
        let output = self.run(&self.build_args(build_dir, target))?;
        if !output.status.success() {
            let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            // Make and Ninja report compiler errors on stdout.
            if stderr.trim().is_empty() {
                stderr = String::from_utf8_lossy(&output.stdout).into_owned();
            }
            return Err(ToolchainError::TargetFailed {
                target: target.name.clone(),
                status: output.status.code(),
                stderr,
            });
        }

        tracing::debug!("{}", String::from_utf8_lossy(&output.stdout));
        Ok(())
    }

    fn install(&mut self, build_dir: &Path, prefix: &Path) -> Result<(), ToolchainError> {
        tracing::info!("Installing into {}", prefix.display());

        let args = vec![
            "--install".to_string(),
            build_dir.display().to_string(),
            "--prefix".to_string(),
            prefix.display().to_string(),
        ];

        let output = self.run(&args)?;
        if !output.status.success() {
            return Err(ToolchainError::InstallFailed {
                prefix: prefix.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(())
    }
}

/// Check if a directory contains a CMake project.
pub fn is_cmake_project(dir: &Path) -> bool {
    dir.join("CMakeLists.txt").exists()
}
