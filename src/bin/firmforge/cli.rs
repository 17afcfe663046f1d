//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use firmforge::core::options::{Platform, RawOptions};

/// firmforge - build orchestration for avr firmware and host unit tests
#[derive(Parser)]
#[command(name = "firmforge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve, fetch, build, test (host only) and package
    Build(BuildArgs),

    /// Print the resolved build plan as JSON without building
    Plan(PlanArgs),

    /// Fetch and verify external sources for a configuration
    Fetch(FetchArgs),

    /// Remove build output
    Clean(CleanArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Build options, overlaid on `[options]` from Firmforge.toml.
#[derive(Args, Debug, Clone, Default)]
pub struct OptionArgs {
    /// Target platform: avr or linux
    #[arg(short, long, env = "FIRMFORGE_PLATFORM")]
    pub platform: Option<String>,

    /// Compile and run unit tests (host builds)
    #[arg(long, overrides_with = "no_tests")]
    pub tests: bool,

    /// Do not compile unit tests
    #[arg(long, overrides_with = "tests")]
    pub no_tests: bool,

    /// Enable a feature (repeatable), e.g. `ethernet`
    #[arg(short = 'F', long = "feature", value_name = "FEATURE")]
    pub features: Vec<String>,

    /// Ignore the features listed in Firmforge.toml
    #[arg(long)]
    pub no_default_features: bool,

    /// Build shared libraries
    #[arg(long)]
    pub shared: bool,

    /// Build position independent code
    #[arg(long)]
    pub fpic: bool,

    /// Path to Firmforge.toml
    #[arg(long, value_name = "PATH")]
    pub manifest_path: Option<PathBuf>,
}

impl OptionArgs {
    /// Options given on the command line; unset flags stay `None`.
    pub fn raw_options(&self) -> RawOptions {
        let tests = match (self.tests, self.no_tests) {
            (true, _) => Some(true),
            (false, true) => Some(false),
            (false, false) => None,
        };
        RawOptions {
            platform: self.platform.clone(),
            tests,
            features: self.features.clone(),
            shared: self.shared.then_some(true),
            fpic: self.fpic.then_some(true),
        }
    }
}

#[derive(Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub options: OptionArgs,

    /// Re-download dependencies even if a verified copy exists
    #[arg(long)]
    pub force_fetch: bool,

    /// Abort the unit tests after this many seconds
    #[arg(long, value_name = "SECS")]
    pub test_timeout: Option<u64>,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub options: OptionArgs,

    /// Print the CMake definitions instead of JSON
    #[arg(long, conflicts_with = "dot")]
    pub definitions: bool,

    /// Print the target graph in Graphviz format instead of JSON
    #[arg(long)]
    pub dot: bool,
}

#[derive(Args)]
pub struct FetchArgs {
    #[command(flatten)]
    pub options: OptionArgs,

    /// Re-download even if a verified copy exists
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct CleanArgs {
    /// Only clean this platform's build tree and package
    #[arg(short, long)]
    pub platform: Option<Platform>,

    /// Also remove fetched dependencies
    #[arg(long)]
    pub dependencies: bool,

    /// Path to Firmforge.toml
    #[arg(long, value_name = "PATH")]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
