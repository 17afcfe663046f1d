//! Dependency fetcher: download, verify, unpack, place.
//!
//! The archive is hashed before anything is extracted, and the destination
//! is only touched after the new tree has been verified and unpacked, so a
//! tampered or truncated download never reaches the include path.

use std::fs;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

use crate::core::dependency::DependencySpec;
use crate::sources::archive::extract_tarball;
use crate::sources::download::Downloader;
use crate::util::hash::{digest_eq, is_sha256_hex, sha256_reader};

/// Marker written into a fetched tree, holding the verified digest.
pub const FETCH_STAMP: &str = ".firmforge-fetch";

/// Errors from fetching an external dependency.
#[derive(Debug, Error, Diagnostic)]
pub enum FetchError {
    #[error("failed to download `{identifier}` from {url}: {message}")]
    #[diagnostic(
        code(firmforge::fetch::network),
        help("check your network connection and retry")
    )]
    Network {
        identifier: String,
        url: String,
        message: String,
    },

    #[error("digest mismatch for `{identifier}`\n  expected: {expected}\n  actual:   {actual}")]
    #[diagnostic(
        code(firmforge::fetch::integrity),
        help("the archive was corrupted or tampered with, or the pinned version is wrong; nothing was extracted")
    )]
    Integrity {
        identifier: String,
        expected: String,
        actual: String,
    },

    #[error("no SHA256 digest is pinned for `{identifier}`")]
    #[diagnostic(
        code(firmforge::fetch::missing_digest),
        help("add `sha256 = \"<64 hex chars>\"` under [dependencies.{identifier}] in Firmforge.toml or ~/.firmforge/config.toml")
    )]
    MissingDigest { identifier: String },

    #[error("invalid source URL `{url}` for `{identifier}`: {message}")]
    #[diagnostic(
        code(firmforge::fetch::invalid_source),
        help("set [dependencies.{identifier}] url to a valid archive URL")
    )]
    InvalidSource {
        identifier: String,
        url: String,
        message: String,
    },

    #[error("pinned digest for `{identifier}` is not a SHA256 hex string: `{digest}`")]
    #[diagnostic(
        code(firmforge::fetch::invalid_digest),
        help("set [dependencies.<name>] sha256 to the 64-character hex digest of the archive")
    )]
    InvalidDigest { identifier: String, digest: String },

    #[error("failed to extract `{identifier}`: {message}")]
    #[diagnostic(code(firmforge::fetch::extraction))]
    Extraction { identifier: String, message: String },

    #[error("archive for `{identifier}` has no top-level directory `{expected_root}`")]
    #[diagnostic(
        code(firmforge::fetch::archive_root),
        help("the archive layout does not match the pinned version")
    )]
    MissingArchiveRoot {
        identifier: String,
        expected_root: String,
    },

    #[error("I/O error at {}", path.display())]
    #[diagnostic(code(firmforge::fetch::io))]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    /// Only transport failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Network { .. })
    }

    fn io(path: &Path) -> impl FnOnce(io::Error) -> FetchError + '_ {
        move |source| FetchError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Fetches [`DependencySpec`]s through a [`Downloader`].
pub struct DependencyFetcher<'a> {
    downloader: &'a dyn Downloader,
    force: bool,
}

impl<'a> DependencyFetcher<'a> {
    pub fn new(downloader: &'a dyn Downloader) -> Self {
        DependencyFetcher {
            downloader,
            force: false,
        }
    }

    /// Re-fetch even when a verified copy is already in place.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Make `spec` available at its destination and return that path.
    pub fn fetch(&self, spec: &DependencySpec) -> Result<PathBuf, FetchError> {
        let expected = spec
            .expected_digest
            .as_deref()
            .ok_or_else(|| FetchError::MissingDigest {
                identifier: spec.identifier.clone(),
            })?;

        if !self.force && is_fetched(spec) {
            tracing::info!(
                "Using verified {} {} at {}",
                spec.identifier,
                spec.version,
                spec.destination.display()
            );
            return Ok(spec.destination.clone());
        }

        if !is_sha256_hex(expected.trim()) {
            return Err(FetchError::InvalidDigest {
                identifier: spec.identifier.clone(),
                digest: expected.to_string(),
            });
        }

        tracing::info!("Fetching {} {}", spec.identifier, spec.version);

        let tmp_dir = std::env::temp_dir();
        let mut archive = tempfile::Builder::new()
            .prefix("firmforge-download-")
            .suffix(".tar.gz")
            .tempfile()
            .map_err(FetchError::io(&tmp_dir))?;

        self.downloader
            .download(&spec.source_url, archive.as_file_mut())
            .map_err(|e| FetchError::Network {
                identifier: spec.identifier.clone(),
                url: spec.source_url.to_string(),
                message: format!("{:#}", e),
            })?;

        let archive_path = archive.path().to_path_buf();
        let file = archive.as_file_mut();
        file.flush().map_err(FetchError::io(&archive_path))?;
        file.seek(SeekFrom::Start(0))
            .map_err(FetchError::io(&archive_path))?;

        let actual = sha256_reader(&mut *file).map_err(FetchError::io(&archive_path))?;
        if !digest_eq(&actual, expected) {
            return Err(FetchError::Integrity {
                identifier: spec.identifier.clone(),
                expected: expected.to_string(),
                actual,
            });
        }
        tracing::debug!("Digest verified for {}: {}", spec.identifier, &actual[..16]);

        file.seek(SeekFrom::Start(0))
            .map_err(FetchError::io(&archive_path))?;

        let parent = spec
            .destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(FetchError::io(parent))?;

        // Staging lives next to the destination so the final move is a rename.
        let staging = tempfile::Builder::new()
            .prefix(".firmforge-staging-")
            .tempdir_in(parent)
            .map_err(FetchError::io(parent))?;

        extract_tarball(&mut *file, staging.path()).map_err(|e| FetchError::Extraction {
            identifier: spec.identifier.clone(),
            message: format!("{:#}", e),
        })?;

        let root_name = spec.archive_root();
        let root = staging.path().join(&root_name);
        if !root.is_dir() {
            return Err(FetchError::MissingArchiveRoot {
                identifier: spec.identifier.clone(),
                expected_root: root_name,
            });
        }

        let stamp = root.join(FETCH_STAMP);
        fs::write(&stamp, format!("{}\n", actual)).map_err(FetchError::io(&stamp))?;

        if spec.destination.exists() {
            tracing::debug!("Replacing {}", spec.destination.display());
            fs::remove_dir_all(&spec.destination).map_err(FetchError::io(&spec.destination))?;
        }
        fs::rename(&root, &spec.destination).map_err(FetchError::io(&spec.destination))?;

        // Drops the downloaded archive from disk.
        archive.close().map_err(FetchError::io(&archive_path))?;

        tracing::info!(
            "Unpacked {} {} to {}",
            spec.identifier,
            spec.version,
            spec.destination.display()
        );

        Ok(spec.destination.clone())
    }
}

/// Whether the destination holds a tree verified against the spec's digest.
pub fn is_fetched(spec: &DependencySpec) -> bool {
    let Some(expected) = spec.expected_digest.as_deref() else {
        return false;
    };
    fs::read_to_string(spec.destination.join(FETCH_STAMP))
        .map(|stamp| digest_eq(&stamp, expected))
        .unwrap_or(false)
}
