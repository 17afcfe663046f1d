//! `firmforge clean` command

use anyhow::Result;

use crate::cli::CleanArgs;
use firmforge::ops::clean::{clean, CleanOptions};
use firmforge::util::GlobalContext;

pub fn execute(args: CleanArgs) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let project = ctx.load_project(args.manifest_path.as_deref(), false)?;

    let removed = clean(
        &project,
        &CleanOptions {
            platform: args.platform,
            dependencies: args.dependencies,
        },
    )?;

    if removed.is_empty() {
        eprintln!("Nothing to clean");
    }
    for dir in removed {
        eprintln!("     Removed {}", dir.display());
    }

    Ok(())
}
