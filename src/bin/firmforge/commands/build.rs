//! `firmforge build` command

use std::time::Duration;

use anyhow::{bail, Result};

use crate::cli::BuildArgs;
use crate::commands::load_configuration;
use firmforge::builder::cmake::{is_cmake_project, CMakeToolchain};
use firmforge::ops::firmforge_build::{build, BuildOptions, Collaborators};
use firmforge::ops::verify::TestHarness;
use firmforge::sources::HttpDownloader;
use firmforge::util::fs::relative_path;
use firmforge::util::GlobalContext;

pub fn execute(args: BuildArgs, verbose: bool) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let (mut project, config) = load_configuration(&ctx, &args.options, false)?;

    // Jobs: CLI > config > toolchain default
    if args.jobs.is_some() {
        let mut settings = project.config().clone();
        settings.toolchain.jobs = args.jobs;
        project = project.with_config(settings);
    }

    if !is_cmake_project(project.root()) {
        bail!(
            "no CMakeLists.txt in {}; firmforge drives an existing CMake tree",
            project.root().display()
        );
    }

    let mut toolchain = CMakeToolchain::new(&project.config().toolchain)?;
    let downloader = HttpDownloader::new()?;

    // Only host builds need a harness on PATH.
    let harness = match TestHarness::from_settings(&project.config().verify) {
        Ok(h) => h,
        Err(e) if config.verification_enabled() => return Err(e.into()),
        Err(_) => TestHarness::new("ctest", Vec::new()),
    };
    let harness = match args.test_timeout {
        Some(secs) => harness.timeout(Some(Duration::from_secs(secs))),
        None => harness,
    };

    let opts = BuildOptions {
        force_fetch: args.force_fetch,
        show_progress: !verbose,
    };

    let outcome = build(
        &project,
        &config,
        &opts,
        Collaborators {
            toolchain: &mut toolchain,
            downloader: &downloader,
            verifier: &harness,
        },
    )
    .map_err(|e| {
        if e.is_retryable() {
            tracing::warn!("the failure looks transient; re-running the build may succeed");
        }
        let stage = e.stage();
        anyhow::Error::new(e).context(format!("{} step failed", stage))
    })?;

    eprintln!(
        "    Finished {} target(s) for {}",
        outcome.build.built.len(),
        config.platform()
    );
    if let Some(ref verification) = outcome.verification {
        eprintln!(
            "      Tested unit tests passed in {:.2}s",
            verification.duration.as_secs_f64()
        );
    }
    eprintln!(
        "    Packaged {}",
        relative_path(ctx.cwd(), &outcome.package_dir).display()
    );

    Ok(())
}
