//! Implementation of `firmforge clean`.

use std::path::PathBuf;

use anyhow::Result;

use crate::core::options::Platform;
use crate::core::project::{Project, BUILD_DIR, THIRD_PARTY_DIR};
use crate::util::fs::remove_dir_all_if_exists;

/// Options for the clean command.
#[derive(Debug, Clone, Default)]
pub struct CleanOptions {
    /// Only remove this platform's build tree and package
    pub platform: Option<Platform>,

    /// Also remove fetched dependencies
    pub dependencies: bool,
}

/// Remove build output. Returns the directories that existed and were removed.
pub fn clean(project: &Project, opts: &CleanOptions) -> Result<Vec<PathBuf>> {
    let mut targets = match opts.platform {
        Some(platform) => vec![project.build_dir(platform), project.package_dir(platform)],
        None => vec![project.root().join(BUILD_DIR)],
    };
    if opts.dependencies {
        targets.push(project.root().join(THIRD_PARTY_DIR));
    }

    let mut removed = Vec::new();
    for dir in targets {
        if dir.exists() {
            remove_dir_all_if_exists(&dir)?;
            tracing::info!("Removed {}", dir.display());
            removed.push(dir);
        }
    }
    Ok(removed)
}
