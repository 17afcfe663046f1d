//! Errors surfaced by a build invocation.

use miette::Diagnostic;
use thiserror::Error;

use crate::builder::toolchain::ToolchainError;
use crate::core::options::ConfigError;
use crate::ops::package::PackageError;
use crate::ops::verify::VerificationError;
use crate::sources::fetch::FetchError;

/// Any step of the pipeline failed. Every variant is fatal.
#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Verification(#[from] VerificationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Package(#[from] PackageError),
}

impl BuildError {
    /// Short name of the step that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            BuildError::Config(_) => "configuration",
            BuildError::Fetch(_) => "fetch",
            BuildError::Toolchain(_) => "build",
            BuildError::Verification(_) => "verification",
            BuildError::Package(_) => "package",
        }
    }

    /// Whether re-running the same invocation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BuildError::Fetch(e) if e.is_retryable())
    }
}
