//! Implementation of `firmforge build`, `firmforge plan` and `firmforge fetch`.
//!
//! A build runs resolve → fetch → configure/build → verify → package and
//! stops at the first error. Nothing is rolled back; a failed build leaves
//! the build tree as it was when the failing step ran, and no manifest.

use std::path::PathBuf;

use serde::Serialize;

use crate::builder::driver::{BuildDriver, BuildResult};
use crate::builder::toolchain::{BuildVariables, Toolchain};
use crate::core::dependency::{DependencySpec, PinnedDependency};
use crate::core::options::{Configuration, Platform};
use crate::core::package::PackageManifest;
use crate::core::project::Project;
use crate::core::target::TargetSpec;
use crate::ops::errors::BuildError;
use crate::ops::package::{PackageIdentity, PackageLayout, Packager};
use crate::ops::verify::{VerificationResult, Verifier};
use crate::resolver::{required_dependencies, resolve};
use crate::sources::download::Downloader;
use crate::sources::fetch::{DependencyFetcher, FetchError};

/// Options for the build command.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Re-download dependencies even if a verified copy exists
    pub force_fetch: bool,

    /// Show a progress bar while building targets
    pub show_progress: bool,
}

/// The process and network boundaries a build talks to.
pub struct Collaborators<'a> {
    pub toolchain: &'a mut dyn Toolchain,
    pub downloader: &'a dyn Downloader,
    pub verifier: &'a dyn Verifier,
}

/// Everything a successful build produced.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub build: BuildResult,
    /// Fetched dependency trees
    pub dependencies: Vec<PathBuf>,
    /// Present for host builds only
    pub verification: Option<VerificationResult>,
    pub manifest: PackageManifest,
    pub package_dir: PathBuf,
}

/// What a build would do, without doing it.
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    pub project: String,
    pub version: String,
    pub platform: Platform,
    pub build_dir: PathBuf,
    pub package_dir: PathBuf,
    pub targets: Vec<TargetSpec>,
    pub dependencies: Vec<DependencySpec>,
    pub variables: BuildVariables,
    pub verify: bool,
}

/// Run the full pipeline for a validated configuration.
pub fn build(
    project: &Project,
    config: &Configuration,
    opts: &BuildOptions,
    collab: Collaborators<'_>,
) -> Result<BuildOutcome, BuildError> {
    let Collaborators {
        toolchain,
        downloader,
        verifier,
    } = collab;

    let targets = resolve(config)?;

    let dependencies = fetch_dependencies(project, config, downloader, opts.force_fetch)?;

    let build_dir = project.build_dir(config.platform());
    let settings = &project.config().toolchain;
    let build = BuildDriver::new(&mut *toolchain, project.root(), &build_dir, settings)
        .show_progress(opts.show_progress)
        .build(&targets, config)?;

    let verification = if config.verification_enabled() {
        Some(verifier.verify(&build.build_dir)?)
    } else {
        if config.tests_enabled() {
            tracing::debug!(
                "unit tests are not run for {}; the flag has no effect",
                config.platform()
            );
        }
        None
    };

    let package_dir = project.package_dir(config.platform());
    let manifest = Packager::new(
        &mut *toolchain,
        project.root(),
        PackageLayout::new(package_dir.clone()),
        PackageIdentity {
            name: project.name(),
            version: project.version(),
        },
    )
    .package(&build, &targets, config)?;

    Ok(BuildOutcome {
        build,
        dependencies,
        verification,
        manifest,
        package_dir,
    })
}

/// Resolve everything a build would touch. No side effects.
pub fn plan(project: &Project, config: &Configuration) -> Result<BuildPlan, BuildError> {
    let targets = resolve(config)?;
    let dependencies = dependency_specs(project, config)?;

    Ok(BuildPlan {
        project: project.name().to_string(),
        version: project.version().to_string(),
        platform: config.platform(),
        build_dir: project.build_dir(config.platform()),
        package_dir: project.package_dir(config.platform()),
        targets,
        dependencies,
        variables: BuildVariables::from_config(config, &project.config().toolchain),
        verify: config.verification_enabled(),
    })
}

/// Dependency specs for `config`, with project overrides applied.
pub fn dependency_specs(
    project: &Project,
    config: &Configuration,
) -> Result<Vec<DependencySpec>, FetchError> {
    required_dependencies(config)
        .iter()
        .map(|pinned| pinned_spec(project, pinned))
        .collect()
}

/// Apply the project's override for `pinned`, if any.
fn pinned_spec(
    project: &Project,
    pinned: &PinnedDependency,
) -> Result<DependencySpec, FetchError> {
    let overrides = project.config().dependencies.get(pinned.identifier);
    pinned
        .to_spec(project.dependency_dir(pinned.identifier), overrides)
        .map_err(|e| FetchError::InvalidSource {
            identifier: pinned.identifier.to_string(),
            url: pinned.url.to_string(),
            message: e.to_string(),
        })
}

/// Fetch every dependency `config` requires. Returns the placed trees.
pub fn fetch_dependencies(
    project: &Project,
    config: &Configuration,
    downloader: &dyn Downloader,
    force: bool,
) -> Result<Vec<PathBuf>, FetchError> {
    let specs = dependency_specs(project, config)?;
    if specs.is_empty() {
        tracing::debug!("no external dependencies for this configuration");
        return Ok(Vec::new());
    }

    let fetcher = DependencyFetcher::new(downloader).force(force);
    specs.iter().map(|spec| fetcher.fetch(spec)).collect()
}
