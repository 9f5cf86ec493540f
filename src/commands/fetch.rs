// src/commands/fetch.rs

//! Fetch command - warm the source cache

use super::load_recipe;
use anyhow::{Context, Result};
use sfml_kitchen::platform::PlatformDescriptor;
use sfml_kitchen::recipe::kitchen::{CmakeTool, PrefixProvider};
use sfml_kitchen::recipe::{Kitchen, KitchenConfig, Plan};
use std::path::PathBuf;
use std::sync::Arc;

/// Download the source archive without building
pub fn cmd_fetch(recipe_path: Option<&str>, source_cache: Option<&str>) -> Result<()> {
    let recipe = load_recipe(recipe_path)?;

    // The archive does not depend on the platform
    let plan = Plan::resolve(&recipe, &PlatformDescriptor::host())
        .with_context(|| format!("Failed to resolve {}", recipe.package.name))?;

    let mut config = KitchenConfig::default();
    if let Some(dir) = source_cache {
        config.source_cache = PathBuf::from(dir);
    }

    // Neither collaborator is used when only fetching
    let kitchen = Kitchen::new(
        config,
        Arc::new(PrefixProvider::new(".")),
        Arc::new(CmakeTool::new("cmake")),
    );

    if kitchen.sources_cached(&plan) {
        println!("[OK] {} is already cached", plan.archive_filename);
    } else {
        println!("Fetching {}...", plan.archive_url);
    }

    let path = kitchen
        .fetch(&plan)
        .with_context(|| format!("Failed to fetch sources for {}", plan.name))?;

    println!("\n[COMPLETE] Source archive: {}", path.display());
    Ok(())
}
