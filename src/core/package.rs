//! Package manifest - link metadata for downstream consumers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::core::options::Platform;

/// File name of the serialized manifest inside the package root.
pub const MANIFEST_FILE: &str = "firmforge-package.json";

/// Description of a finished package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    pub name: String,
    pub version: Version,
    pub platform: Platform,

    /// Artifact (target) name -> packaged file
    pub binaries: BTreeMap<String, PathBuf>,

    /// Library names to link, in link order
    pub libraries: Vec<String>,

    pub include_dirs: Vec<PathBuf>,
    pub lib_dirs: Vec<PathBuf>,
    pub bin_dirs: Vec<PathBuf>,
}

impl PackageManifest {
    /// Write the manifest as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize manifest")?;
        crate::util::fs::write_string(path, &json)
    }
}
