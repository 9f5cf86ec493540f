// src/commands/cook.rs

//! Cook command - build and package the library

use super::{load_recipe, platform_from_args};
use crate::cli::PlatformArgs;
use anyhow::{Context, Result};
use sfml_kitchen::recipe::kitchen::{AptPackageTool, CmakeTool, PrefixProvider};
use sfml_kitchen::recipe::{BuildCache, Kitchen, KitchenConfig, Plan, PlanFinding};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Flags of the `cook` command beyond the platform selection
#[derive(Debug, Clone, Default)]
pub struct CookOptions {
    pub deps_root: String,
    pub output: String,
    pub work_dir: Option<String>,
    pub source_cache: Option<String>,
    pub jobs: Option<u32>,
    pub no_system_packages: bool,
    pub cache_dir: Option<String>,
    pub no_cache: bool,
    pub keep_builddir: bool,
}

/// Cook the library for the requested platform
pub fn cmd_cook(platform_args: &PlatformArgs, options: &CookOptions) -> Result<()> {
    let recipe = load_recipe(platform_args.recipe.as_deref())?;
    let platform = platform_from_args(platform_args)?;
    let output_dir = Path::new(&options.output);

    println!(
        "Recipe: {} version {}",
        recipe.package.name, recipe.package.version
    );
    println!("Platform: {}", platform);

    let plan = Plan::resolve(&recipe, &platform)
        .with_context(|| format!("Failed to resolve {} for {}", recipe.package.name, platform))?;

    for finding in &plan.findings {
        match finding {
            PlanFinding::Redundant { reference } => {
                println!("Note: {} is declared more than once", reference)
            }
            PlanFinding::Conflicting {
                previous,
                replacement,
            } => println!("Warning: {} replaces {}", replacement, previous),
        }
    }

    // Configure the kitchen
    let mut config = KitchenConfig {
        work_dir: options.work_dir.as_ref().map(PathBuf::from),
        keep_builddir: options.keep_builddir,
        install_system_packages: !options.no_system_packages,
        use_cache: !options.no_cache,
        ..Default::default()
    };
    if let Some(dir) = &options.source_cache {
        config.source_cache = PathBuf::from(dir);
    }
    if let Some(dir) = &options.cache_dir {
        config.cache_dir = PathBuf::from(dir);
    }
    if let Some(j) = options.jobs {
        config.jobs = j;
    }

    let cmake = CmakeTool::locate().context("CMake is required to cook")?;
    let provider = PrefixProvider::new(&options.deps_root);

    let mut kitchen = Kitchen::new(config.clone(), Arc::new(provider), Arc::new(cmake))
        .with_system_tool(Arc::new(AptPackageTool::new()));
    if config.use_cache {
        let cache = BuildCache::at(&config.cache_dir).with_context(|| {
            format!("Failed to open build cache: {}", config.cache_dir.display())
        })?;
        kitchen = kitchen.with_cache(cache);
    }

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    println!("Cooking with {} parallel jobs...", config.jobs);
    if kitchen.sources_cached(&plan) {
        println!("  - Source archive already cached");
    }

    let result = kitchen
        .cook(&plan, output_dir)
        .with_context(|| format!("Failed to cook {}", plan.name))?;

    if let Some(system) = &result.system_packages
        && !system.newly_installed.is_empty()
    {
        println!("Installed system packages: {}", system.newly_installed.join(", "));
    }

    if result.from_cache {
        println!("\n[COMPLETE] Restored from cache: {}", result.package_dir.display());
    } else {
        println!(
            "\n[COMPLETE] Cooked: {} ({} files)",
            result.package_dir.display(),
            result.artifacts.len()
        );
    }
    println!("  libs: {}", result.metadata.libs.join(" "));

    if !result.warnings.is_empty() {
        println!("\nBuild warnings:");
        for warning in &result.warnings {
            println!("  - {}", warning);
        }
    }

    info!(
        "Successfully cooked {} to {}",
        plan.name,
        result.package_dir.display()
    );

    Ok(())
}
