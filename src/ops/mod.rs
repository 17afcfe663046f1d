//! High-level operations.
//!
//! This module contains the implementation of firmforge commands.

pub mod clean;
pub mod errors;
pub mod firmforge_build;
pub mod package;
pub mod verify;

pub use clean::{clean, CleanOptions};
pub use errors::BuildError;
pub use firmforge_build::{
    build, dependency_specs, fetch_dependencies, plan, BuildOptions, BuildOutcome, BuildPlan,
    Collaborators,
};
pub use package::{PackageError, PackageLayout, Packager};
pub use verify::{TestHarness, VerificationError, VerificationResult, Verifier};
