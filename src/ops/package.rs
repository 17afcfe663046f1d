//! Packager: install, then lay out binaries, libraries and headers.
//!
//! The toolchain's generic install step does not guarantee the directory
//! shape downstream consumers expect, so every resolved artifact is copied
//! explicitly into `bin/`, `lib/` and `include/` afterwards.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use semver::Version;
use thiserror::Error;

use crate::builder::driver::BuildResult;
use crate::builder::toolchain::{Toolchain, ToolchainError};
use crate::core::options::Configuration;
use crate::core::package::{PackageManifest, MANIFEST_FILE};
use crate::core::target::{TargetKind, TargetSpec};
use crate::resolver::library_names;
use crate::util::fs::{copy_file, find_file, glob_files, remove_dir_all_if_exists};

/// Public header patterns, relative to the source root.
pub const HEADER_PATTERNS: &[&str] = &["public/**/*.h", "public/**/*.hpp"];

/// Directory holding public headers in the source tree.
pub const PUBLIC_HEADER_DIR: &str = "public";

/// Packaging failed.
#[derive(Debug, Error, Diagnostic)]
pub enum PackageError {
    #[error("expected artifact `{file}` for target `{target}` not found under {}", build_dir.display())]
    #[diagnostic(
        code(firmforge::package::missing_artifact),
        help("the toolchain reported success but did not produce the file; check the target's output name")
    )]
    MissingArtifact {
        target: String,
        file: String,
        build_dir: PathBuf,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Install(#[from] ToolchainError),

    #[error("failed to write package at {}: {message}", path.display())]
    #[diagnostic(code(firmforge::package::io))]
    Io { path: PathBuf, message: String },
}

/// Fixed package layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLayout {
    root: PathBuf,
}

impl PackageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        PackageLayout { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.root.join("lib")
    }

    pub fn include_dir(&self) -> PathBuf {
        self.root.join("include")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }
}

/// Identity stamped into the manifest.
#[derive(Debug, Clone, Copy)]
pub struct PackageIdentity<'a> {
    pub name: &'a str,
    pub version: &'a Version,
}

/// Assembles a package from a finished build.
pub struct Packager<'a> {
    toolchain: &'a mut dyn Toolchain,
    source_dir: &'a Path,
    layout: PackageLayout,
    identity: PackageIdentity<'a>,
}

impl<'a> Packager<'a> {
    pub fn new(
        toolchain: &'a mut dyn Toolchain,
        source_dir: &'a Path,
        layout: PackageLayout,
        identity: PackageIdentity<'a>,
    ) -> Self {
        Packager {
            toolchain,
            source_dir,
            layout,
            identity,
        }
    }

    /// Install and copy the outputs of `targets`, then write the manifest.
    pub fn package(
        &mut self,
        build: &BuildResult,
        targets: &[TargetSpec],
        config: &Configuration,
    ) -> Result<PackageManifest, PackageError> {
        let root = self.layout.root().to_path_buf();
        remove_dir_all_if_exists(&root).map_err(io_err(&root))?;

        self.toolchain.install(&build.build_dir, &root)?;

        let mut binaries = BTreeMap::new();
        for target in targets {
            let file = target.output_filename(config.platform(), config.shared());
            let source = find_file(&build.build_dir, &file, &[root.as_path()]).ok_or_else(|| {
                PackageError::MissingArtifact {
                    target: target.name.clone(),
                    file: file.clone(),
                    build_dir: build.build_dir.clone(),
                }
            })?;

            let dest_dir = match target.kind {
                TargetKind::Library => self.layout.lib_dir(),
                TargetKind::Executable | TargetKind::DerivedArtifact => self.layout.bin_dir(),
            };
            let dest = dest_dir.join(&file);
            copy_file(&source, &dest).map_err(io_err(&dest))?;
            tracing::debug!("Packaged {} -> {}", source.display(), dest.display());

            if target.kind != TargetKind::Library {
                binaries.insert(target.name.clone(), dest);
            }
        }

        let headers = self.copy_headers()?;
        tracing::debug!("Packaged {} public header(s)", headers);

        let manifest = PackageManifest {
            name: self.identity.name.to_string(),
            version: self.identity.version.clone(),
            platform: config.platform(),
            binaries,
            libraries: library_names(targets),
            include_dirs: vec![self.layout.include_dir()],
            lib_dirs: vec![self.layout.lib_dir()],
            bin_dirs: vec![self.layout.bin_dir()],
        };

        let manifest_path = self.layout.manifest_path();
        manifest.save(&manifest_path).map_err(io_err(&manifest_path))?;

        tracing::info!(
            "Packaged {} {} ({}) at {}",
            manifest.name,
            manifest.version,
            manifest.platform,
            root.display()
        );

        Ok(manifest)
    }

    fn copy_headers(&self) -> Result<usize, PackageError> {
        let public = self.source_dir.join(PUBLIC_HEADER_DIR);
        if !public.is_dir() {
            tracing::warn!("no public header directory at {}", public.display());
            return Ok(0);
        }

        let headers = glob_files(self.source_dir, HEADER_PATTERNS).map_err(io_err(&public))?;
        let include = self.layout.include_dir();
        for header in &headers {
            let relative = header.strip_prefix(&public).unwrap_or(header);
            let dest = include.join(relative);
            copy_file(header, &dest).map_err(io_err(&dest))?;
        }

        Ok(headers.len())
    }
}

fn io_err(path: &Path) -> impl FnOnce(anyhow::Error) -> PackageError + '_ {
    move |e| PackageError::Io {
        path: path.to_path_buf(),
        message: format!("{:#}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::driver::BuildDriver;
    use crate::core::options::{validate, RawOptions};
    use crate::resolver::{resolve, DRIVER_LIBRARIES, FIRMWARE_IMAGE};
    use crate::test_support::fixtures::write_public_headers;
    use crate::test_support::MockToolchain;
    use crate::util::config::ToolchainSettings;
    use tempfile::TempDir;

    fn build_and_package(
        tmp: &TempDir,
        raw: RawOptions,
        toolchain: &mut MockToolchain,
    ) -> Result<PackageManifest, PackageError> {
        let config = validate(&raw).unwrap();
        let targets = resolve(&config).unwrap();
        let build_dir = tmp.path().join("build").join(config.platform().as_str());
        let settings = ToolchainSettings::default();

        let build = BuildDriver::new(&mut *toolchain, tmp.path(), &build_dir, &settings)
            .build(&targets, &config)
            .unwrap();

        let version = Version::new(1, 0, 0);
        let layout = PackageLayout::new(tmp.path().join("build/package/fw-1.0.0"));
        Packager::new(
            &mut *toolchain,
            tmp.path(),
            layout,
            PackageIdentity {
                name: "fw",
                version: &version,
            },
        )
        .package(&build, &targets, &config)
    }

    #[test]
    fn test_avr_package_layout() {
        let tmp = TempDir::new().unwrap();
        write_public_headers(tmp.path());

        let mut toolchain = MockToolchain::new();
        let manifest =
            build_and_package(&tmp, RawOptions::for_platform("avr"), &mut toolchain).unwrap();

        let root = tmp.path().join("build/package/fw-1.0.0");
        assert_eq!(manifest.libraries, DRIVER_LIBRARIES.to_vec());
        assert!(root.join("lib/libUART.a").is_file());
        assert!(root.join("bin/ATmega328__T_.hex").is_file());
        assert!(root.join("bin/ATmega328__T_.elf").is_file());
        assert!(root.join("include/Serial/UART.h").is_file());
        assert!(root.join(MANIFEST_FILE).is_file());
        assert_eq!(
            manifest.binaries[FIRMWARE_IMAGE],
            root.join("bin/ATmega328__T_.hex")
        );
        assert_eq!(manifest.lib_dirs, vec![root.join("lib")]);
        assert_eq!(toolchain.install_count(), 1);
    }

    #[test]
    fn test_missing_artifact_fails() {
        let tmp = TempDir::new().unwrap();
        let mut toolchain = MockToolchain::new().skip_artifact("SPI");

        let err =
            build_and_package(&tmp, RawOptions::for_platform("avr"), &mut toolchain).unwrap_err();

        match err {
            PackageError::MissingArtifact { target, file, .. } => {
                assert_eq!(target, "SPI");
                assert_eq!(file, "libSPI.a");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_install_failure_propagates() {
        let tmp = TempDir::new().unwrap();
        let mut toolchain = MockToolchain::new().fail_install();

        let err =
            build_and_package(&tmp, RawOptions::for_platform("linux"), &mut toolchain).unwrap_err();
        assert!(matches!(
            err,
            PackageError::Install(ToolchainError::InstallFailed { .. })
        ));
    }

    #[test]
    fn test_linux_package_has_test_binary_and_no_libraries() {
        let tmp = TempDir::new().unwrap();
        let mut toolchain = MockToolchain::new();

        let manifest =
            build_and_package(&tmp, RawOptions::for_platform("linux"), &mut toolchain).unwrap();

        assert!(manifest.libraries.is_empty());
        assert_eq!(manifest.binaries.len(), 1);
        assert!(manifest
            .binaries
            .values()
            .all(|p| p.is_file() && p.ends_with("bin/ATmega328__T_TESTS")));
    }
}
