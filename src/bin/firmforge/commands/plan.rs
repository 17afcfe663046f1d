//! `firmforge plan` command

use anyhow::Result;

use crate::cli::PlanArgs;
use crate::commands::load_configuration;
use firmforge::ops::firmforge_build::plan;
use firmforge::resolver::TargetGraph;
use firmforge::util::GlobalContext;

pub fn execute(args: PlanArgs) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let (project, config) = load_configuration(&ctx, &args.options, true)?;

    let plan = plan(&project, &config)?;

    if args.definitions {
        for (name, value) in plan.variables.definitions() {
            println!("-D{}={}", name, value);
        }
    } else if args.dot {
        let graph = TargetGraph::new(&plan.targets).map_err(anyhow::Error::msg)?;
        println!("{}", graph.to_dot());
    } else {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    }

    Ok(())
}
