// src/cli/mod.rs
//! CLI definitions for sfml-kitchen
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.
//!
//! - `plan` - Print the resolved plan for a platform
//! - `cook` - Fetch, patch, build and package
//! - `fetch` - Download the source archive only
//! - `info` - Show link metadata of a packaged directory
//! - `cache` - Build cache management

use clap::{Args, Parser, Subcommand};

mod cache;

pub use cache::CacheCommands;

#[derive(Parser)]
#[command(name = "sfml-kitchen")]
#[command(version)]
#[command(about = "Build SFML from source against externally resolved dependencies", long_about = None)]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Target platform and recipe selection shared by several commands
#[derive(Args, Debug, Clone)]
pub struct PlatformArgs {
    /// Operating system: Linux, Macos, Windows, FreeBSD (default: host)
    #[arg(long)]
    pub os: Option<String>,

    /// Linux distribution id, e.g. ubuntu (default: detected on a Linux host)
    #[arg(long)]
    pub distro: Option<String>,

    /// Compiler family: gcc, clang, apple-clang, "Visual Studio"
    #[arg(long)]
    pub compiler: Option<String>,

    /// Visual Studio runtime: MT, MTd, MD, MDd
    #[arg(long)]
    pub runtime: Option<String>,

    /// CMake build type
    #[arg(long, default_value = "Release")]
    pub build_type: String,

    /// Target architecture (default: host)
    #[arg(long)]
    pub arch: Option<String>,

    /// Build shared libraries instead of static ones
    #[arg(long)]
    pub shared: bool,

    /// Recipe file (default: the built-in SFML recipe)
    #[arg(long)]
    pub recipe: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the plan resolved for a platform as JSON
    Plan {
        #[command(flatten)]
        platform: PlatformArgs,
    },

    /// Build and package the library
    Cook {
        #[command(flatten)]
        platform: PlatformArgs,

        /// Dependency prefix laid out as <root>/<name>/<version>
        #[arg(long)]
        deps_root: String,

        /// Package output directory
        #[arg(short, long, default_value = "./package")]
        output: String,

        /// Work directory for extraction and the CMake build tree
        /// (default: a temporary directory)
        #[arg(long)]
        work_dir: Option<String>,

        /// Source archive cache directory
        #[arg(long)]
        source_cache: Option<String>,

        /// Number of parallel build jobs (default: CPU count)
        #[arg(short, long)]
        jobs: Option<u32>,

        /// Do not install system packages
        #[arg(long)]
        no_system_packages: bool,

        /// Build cache directory
        #[arg(long)]
        cache_dir: Option<String>,

        /// Skip the build cache
        #[arg(long)]
        no_cache: bool,

        /// Keep the temporary build directory after completion
        #[arg(long)]
        keep_builddir: bool,
    },

    /// Download the source archive into the source cache
    Fetch {
        /// Recipe file (default: the built-in SFML recipe)
        #[arg(long)]
        recipe: Option<String>,

        /// Source archive cache directory
        #[arg(long)]
        source_cache: Option<String>,
    },

    /// Show link metadata of a packaged directory
    Info {
        /// Package directory produced by `cook`
        package_dir: String,
    },

    /// Build cache management
    #[command(subcommand)]
    Cache(CacheCommands),
}
