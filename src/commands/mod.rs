// src/commands/mod.rs
//! Command handlers for the sfml-kitchen CLI

mod cache;
mod cook;
mod fetch;
mod info;
mod plan;

// Re-export all command handlers
pub use cache::{cmd_cache_clear, cmd_cache_stats};
pub use cook::{cmd_cook, CookOptions};
pub use fetch::cmd_fetch;
pub use info::cmd_info;
pub use plan::cmd_plan;

use crate::cli::PlatformArgs;
use anyhow::{Context, Result};
use sfml_kitchen::platform::{Arch, BuildType, Compiler, LinkMode, Os, PlatformDescriptor, Runtime};
use sfml_kitchen::recipe::{parse_recipe_file, sfml_recipe, validate_recipe, Recipe};
use std::path::Path;

/// Load the recipe from `path`, or the built-in one, and validate it
pub(crate) fn load_recipe(path: Option<&str>) -> Result<Recipe> {
    let recipe = match path {
        Some(path) => parse_recipe_file(Path::new(path))
            .with_context(|| format!("Failed to parse recipe: {}", path))?,
        None => sfml_recipe().context("Built-in recipe is invalid")?,
    };

    let warnings = validate_recipe(&recipe).context("Recipe validation failed")?;
    for warning in &warnings {
        tracing::debug!("Recipe warning: {}", warning);
    }

    Ok(recipe)
}

/// Build the platform descriptor from command-line flags
///
/// Unset fields fall back to the host; the distro is only detected when
/// the target OS is the host OS.
pub(crate) fn platform_from_args(args: &PlatformArgs) -> Result<PlatformDescriptor> {
    let host = PlatformDescriptor::host();

    let os: Os = match &args.os {
        Some(os) => os.parse().with_context(|| format!("Invalid --os: {}", os))?,
        None => host.os,
    };

    let mut platform = PlatformDescriptor::new(os);
    platform.distro = match &args.distro {
        Some(distro) => Some(distro.to_ascii_lowercase()),
        None if os == host.os => host.distro.clone(),
        None => None,
    };

    if let Some(compiler) = &args.compiler {
        platform.compiler = compiler
            .parse::<Compiler>()
            .with_context(|| format!("Invalid --compiler: {}", compiler))?;
    }
    if let Some(runtime) = &args.runtime {
        platform.runtime = Some(
            runtime
                .parse::<Runtime>()
                .with_context(|| format!("Invalid --runtime: {}", runtime))?,
        );
    }
    if let Some(arch) = &args.arch {
        platform.arch = arch
            .parse::<Arch>()
            .with_context(|| format!("Invalid --arch: {}", arch))?;
    }
    platform.build_type = args
        .build_type
        .parse::<BuildType>()
        .with_context(|| format!("Invalid --build-type: {}", args.build_type))?;
    platform.link = LinkMode::from_shared(args.shared);

    Ok(platform)
}
