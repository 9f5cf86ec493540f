// src/recipe/kitchen/config.rs

//! Configuration types for the Kitchen

use super::link::LinkMetadata;
use super::package::ArtifactSet;
use super::system::SystemPackagesResult;
use crate::recipe::plan::PlanFinding;
use std::path::PathBuf;

/// Base directory for everything the kitchen caches
pub fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("sfml-kitchen")
}

/// Configuration for the Kitchen
#[derive(Debug, Clone)]
pub struct KitchenConfig {
    /// Directory for downloaded source archives
    pub source_cache: PathBuf,
    /// Directory for extraction and CMake build trees; a temporary
    /// directory is used when unset
    pub work_dir: Option<PathBuf>,
    /// Number of parallel build jobs
    pub jobs: u32,
    /// Keep build directory after completion (for debugging)
    pub keep_builddir: bool,
    /// Install the plan's system packages before building
    pub install_system_packages: bool,
    /// Look up and store packaged output in the build cache
    pub use_cache: bool,
    /// Build cache location
    pub cache_dir: PathBuf,
}

impl Default for KitchenConfig {
    fn default() -> Self {
        let jobs = std::thread::available_parallelism()
            .map(|p| p.get() as u32)
            .unwrap_or(4);
        let root = default_cache_root();

        Self {
            source_cache: root.join("sources"),
            work_dir: None,
            jobs,
            keep_builddir: false,
            install_system_packages: true,
            use_cache: true,
            cache_dir: root.join("builds"),
        }
    }
}

impl KitchenConfig {
    /// Configuration rooted entirely under one directory, with no system
    /// package installation
    pub fn isolated(root: &std::path::Path) -> Self {
        Self {
            source_cache: root.join("sources"),
            work_dir: Some(root.join("work")),
            install_system_packages: false,
            cache_dir: root.join("builds"),
            ..Self::default()
        }
    }
}

/// Result of cooking a recipe
#[derive(Debug)]
pub struct CookResult {
    /// Directory holding `include/`, `lib/`, `bin/` and the metadata file
    pub package_dir: PathBuf,
    pub metadata: LinkMetadata,
    /// Empty when the package came from the cache
    pub artifacts: ArtifactSet,
    /// Build log
    pub log: String,
    /// Warnings generated during the build
    pub warnings: Vec<String>,
    /// System package installation result, if any were requested
    pub system_packages: Option<SystemPackagesResult>,
    /// Whether this result came from cache
    pub from_cache: bool,
    /// Cache key used (if caching was enabled)
    pub cache_key: Option<String>,
    /// Dependency declaration findings from the plan
    pub findings: Vec<PlanFinding>,
}
