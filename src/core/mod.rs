//! Core data types: options, targets, dependencies, packages, projects.

pub mod dependency;
pub mod options;
pub mod package;
pub mod project;
pub mod target;

pub use dependency::{DependencySpec, PinnedDependency};
pub use options::{validate, ConfigError, Configuration, Feature, Platform, RawOptions};
pub use package::PackageManifest;
pub use project::Project;
pub use target::{TargetKind, TargetSpec};
