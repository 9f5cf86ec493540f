// src/main.rs

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::{CacheCommands, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Plan { platform } => commands::cmd_plan(&platform),
        Commands::Cook {
            platform,
            deps_root,
            output,
            work_dir,
            source_cache,
            jobs,
            no_system_packages,
            cache_dir,
            no_cache,
            keep_builddir,
        } => commands::cmd_cook(
            &platform,
            &commands::CookOptions {
                deps_root,
                output,
                work_dir,
                source_cache,
                jobs,
                no_system_packages,
                cache_dir,
                no_cache,
                keep_builddir,
            },
        ),
        Commands::Fetch {
            recipe,
            source_cache,
        } => commands::cmd_fetch(recipe.as_deref(), source_cache.as_deref()),
        Commands::Info { package_dir } => commands::cmd_info(&package_dir),
        Commands::Cache(CacheCommands::Stats { cache_dir }) => {
            commands::cmd_cache_stats(cache_dir.as_deref())
        }
        Commands::Cache(CacheCommands::Clear { cache_dir }) => {
            commands::cmd_cache_clear(cache_dir.as_deref())
        }
    }
}
