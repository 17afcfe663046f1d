//! firmforge - build orchestration for dual-target embedded firmware
//!
//! This crate resolves a build configuration (avr firmware or host unit
//! tests, with optional Ethernet support) to an ordered target list, fetches
//! and verifies external sources, drives CMake, gates host builds on the
//! unit tests, and packages the result.

pub mod builder;
pub mod core;
pub mod ops;
pub mod resolver;
pub mod sources;
pub mod util;

/// Test utilities and mocks for firmforge unit tests.
///
/// Only compiled for tests. Provides a mock toolchain, downloader and
/// verifier, and archive fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{
    options::validate, Configuration, PackageManifest, Platform, Project, RawOptions, TargetSpec,
};

pub use resolver::resolve;
pub use util::context::GlobalContext;
