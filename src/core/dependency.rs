//! External source dependencies fetched before compilation.

use std::path::PathBuf;

use serde::Serialize;
use url::Url;

use crate::util::config::DependencyOverride;

/// WIZnet ioLibrary_Driver, required by the `ethernet` feature.
pub const IOLIBRARY_IDENTIFIER: &str = "ioLibrary_Driver";
pub const IOLIBRARY_VERSION: &str = "3.2.0";
pub const IOLIBRARY_URL: &str =
    "https://github.com/Wiznet/ioLibrary_Driver/archive/refs/tags/v3.2.0.tar.gz";
/// No digest is compiled in for the driver release. Projects pin it with
/// `[dependencies.ioLibrary_Driver] sha256`; fetching refuses to run without one.
pub const IOLIBRARY_SHA256: Option<&str> = None;

/// A dependency whose source location and digest are compiled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinnedDependency {
    pub identifier: &'static str,
    pub version: &'static str,
    pub url: &'static str,
    pub sha256: Option<&'static str>,
}

/// The vendor Ethernet driver pin.
pub const IOLIBRARY_DRIVER: PinnedDependency = PinnedDependency {
    identifier: IOLIBRARY_IDENTIFIER,
    version: IOLIBRARY_VERSION,
    url: IOLIBRARY_URL,
    sha256: IOLIBRARY_SHA256,
};

impl PinnedDependency {
    /// Materialize a spec, applying a config override if one exists.
    pub fn to_spec(
        &self,
        destination: PathBuf,
        overrides: Option<&DependencyOverride>,
    ) -> Result<DependencySpec, url::ParseError> {
        let version = overrides
            .and_then(|o| o.version.clone())
            .unwrap_or_else(|| self.version.to_string());
        let source_url = match overrides.and_then(|o| o.url.clone()) {
            Some(url) => url,
            None => Url::parse(self.url)?,
        };
        let expected_digest = overrides
            .and_then(|o| o.sha256.clone())
            .or_else(|| self.sha256.map(str::to_string));

        Ok(DependencySpec {
            identifier: self.identifier.to_string(),
            version,
            source_url,
            expected_digest,
            destination,
        })
    }
}

/// One external archive to download, verify, and unpack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencySpec {
    pub identifier: String,
    pub version: String,
    pub source_url: Url,
    /// Hex SHA256 of the archive; `None` when nothing pins it
    pub expected_digest: Option<String>,
    pub destination: PathBuf,
}

impl DependencySpec {
    /// Name of the single top-level directory inside the archive.
    pub fn archive_root(&self) -> String {
        format!(
            "{}-{}",
            self.identifier,
            self.version.trim_start_matches('v')
        )
    }
}
