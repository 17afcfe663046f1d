//! Command implementations

pub mod build;
pub mod clean;
pub mod completions;
pub mod fetch;
pub mod plan;

use anyhow::Result;

use crate::cli::OptionArgs;
use firmforge::core::options::{validate, Configuration};
use firmforge::core::Project;
use firmforge::util::GlobalContext;

/// Load the project and validate its options with the command line on top.
fn load_configuration(
    ctx: &GlobalContext,
    args: &OptionArgs,
    allow_detached: bool,
) -> Result<(Project, Configuration)> {
    let project = ctx.load_project(args.manifest_path.as_deref(), allow_detached)?;

    let mut raw = project.options().clone();
    if args.no_default_features {
        raw.features.clear();
    }
    raw.merge(args.raw_options());
    let config = validate(&raw)?;

    tracing::debug!(
        "Configuration: platform={} tests={} features={:?} shared={} fpic={}",
        config.platform(),
        config.tests_enabled(),
        config.features(),
        config.shared(),
        config.position_independent_code()
    );

    Ok((project, config))
}
