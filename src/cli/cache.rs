// src/cli/cache.rs
//! Build cache subcommands

use clap::Subcommand;

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Show cache size and entry count
    Stats {
        /// Build cache directory
        #[arg(long)]
        cache_dir: Option<String>,
    },

    /// Remove every cached build
    Clear {
        /// Build cache directory
        #[arg(long)]
        cache_dir: Option<String>,
    },
}
