//! `firmforge fetch` command

use anyhow::Result;

use crate::cli::FetchArgs;
use crate::commands::load_configuration;
use firmforge::ops::firmforge_build::fetch_dependencies;
use firmforge::sources::HttpDownloader;
use firmforge::util::GlobalContext;

pub fn execute(args: FetchArgs) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let (project, config) = load_configuration(&ctx, &args.options, false)?;

    let downloader = HttpDownloader::new()?;
    let fetched =
        fetch_dependencies(&project, &config, &downloader, args.force).inspect_err(|e| {
            if e.is_retryable() {
                tracing::warn!("the download failed; re-running `firmforge fetch` may succeed");
            }
        })?;

    if fetched.is_empty() {
        eprintln!("Nothing to fetch for {}", config.platform());
    }
    for path in fetched {
        eprintln!("     Fetched {}", path.display());
    }

    Ok(())
}
