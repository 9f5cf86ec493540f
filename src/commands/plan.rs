// src/commands/plan.rs

//! Plan command - show what a cook would do

use super::{load_recipe, platform_from_args};
use crate::cli::PlatformArgs;
use anyhow::{Context, Result};
use sfml_kitchen::recipe::Plan;

/// Resolve the recipe for a platform and print the plan as JSON
pub fn cmd_plan(args: &PlatformArgs) -> Result<()> {
    let recipe = load_recipe(args.recipe.as_deref())?;
    let platform = platform_from_args(args)?;

    let plan = Plan::resolve(&recipe, &platform)
        .with_context(|| format!("Failed to resolve {} for {}", recipe.package.name, platform))?;

    let json = serde_json::to_string_pretty(&plan).context("Failed to serialize plan")?;
    println!("{}", json);

    Ok(())
}
