//! Build driver and toolchain adapters.

pub mod cmake;
pub mod driver;
pub mod toolchain;

pub use cmake::CMakeToolchain;
pub use driver::{BuildDriver, BuildResult};
pub use toolchain::{BuildVariables, ConfigureRequest, Toolchain, ToolchainError};
