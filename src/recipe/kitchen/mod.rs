// src/recipe/kitchen/mod.rs

//! Kitchen: where plans are cooked into packages
//!
//! The Kitchen drives one plan through every stage:
//! - Installing the plan's system packages
//! - Resolving the dependency closure
//! - Fetching and extracting the source archive
//! - Patching the build description
//! - Configuring and building with CMake
//! - Copying artifacts and writing link metadata

mod archive;
pub mod buildinfo;
pub mod cmake;
mod config;
mod cook;
pub mod deps;
pub mod link;
pub mod package;
pub mod patch;
pub mod system;

pub use archive::{download_file, extract_archive, remove_dirs};
pub use cmake::{BuildTool, CmakeInvocation, CmakeTool, StepOutput};
pub use config::{default_cache_root, CookResult, KitchenConfig};
pub use cook::Cook;
pub use deps::{DependencyProvider, PrefixProvider, ResolvedDependency};
pub use link::{LinkMetadata, METADATA_FILE};
pub use package::{Artifact, ArtifactKind, ArtifactSet};
pub use patch::PatchOutcome;
pub use system::{AptPackageTool, NoopPackageTool, SystemPackageTool, SystemPackagesResult};

use crate::error::{Error, Result};
use crate::hash::{verify_file, Checksum};
use crate::recipe::cache::BuildCache;
use crate::recipe::plan::Plan;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The Kitchen: where plans are cooked
pub struct Kitchen {
    pub(crate) config: KitchenConfig,
    provider: Arc<dyn DependencyProvider>,
    build_tool: Arc<dyn BuildTool>,
    /// Installer for OS packages; `None` assumes the host is provisioned
    system_tool: Option<Arc<dyn SystemPackageTool>>,
    cache: Option<BuildCache>,
}

impl Kitchen {
    /// Create a new Kitchen with the given configuration and collaborators
    pub fn new(
        config: KitchenConfig,
        provider: Arc<dyn DependencyProvider>,
        build_tool: Arc<dyn BuildTool>,
    ) -> Self {
        Self {
            config,
            provider,
            build_tool,
            system_tool: None,
            cache: None,
        }
    }

    /// Set the system package installer
    pub fn with_system_tool(mut self, tool: Arc<dyn SystemPackageTool>) -> Self {
        self.system_tool = Some(tool);
        self
    }

    /// Set the build cache
    pub fn with_cache(mut self, cache: BuildCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &KitchenConfig {
        &self.config
    }

    /// Install the plan's system packages
    ///
    /// Returns `None` when the plan needs none or installation is disabled.
    pub fn install_system_packages(&self, plan: &Plan) -> Result<Option<SystemPackagesResult>> {
        let wanted = &plan.system_packages;
        if wanted.is_empty() {
            debug!("No system packages for {}", plan.platform);
            return Ok(None);
        }
        if !self.config.install_system_packages {
            info!("Skipping system packages: {}", wanted.packages.join(", "));
            return Ok(None);
        }

        let Some(tool) = &self.system_tool else {
            debug!("No system package tool configured, assuming packages are present");
            return Ok(Some(SystemPackagesResult {
                already_installed: wanted.packages.clone(),
                newly_installed: Vec::new(),
            }));
        };

        info!("Checking system packages: {}", wanted.packages.join(", "));
        let missing = tool.check_missing(&wanted.packages)?;
        let already_installed: Vec<String> = wanted
            .packages
            .iter()
            .filter(|p| !missing.contains(p))
            .cloned()
            .collect();

        if missing.is_empty() {
            info!("All system packages are already installed");
            return Ok(Some(SystemPackagesResult {
                already_installed,
                newly_installed: Vec::new(),
            }));
        }

        if wanted.update {
            tool.update()?;
        }

        info!("Installing missing system packages: {}", missing.join(", "));
        let newly_installed = tool.install(&missing)?;

        let unresolved: Vec<&String> = missing
            .iter()
            .filter(|p| !newly_installed.contains(*p))
            .collect();
        if !unresolved.is_empty() {
            return Err(Error::SystemPackageError(format!(
                "not installed: {}",
                unresolved
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        Ok(Some(SystemPackagesResult {
            already_installed,
            newly_installed,
        }))
    }

    /// Resolve every dependency of the plan
    pub fn resolve_dependencies(&self, plan: &Plan) -> Result<Vec<ResolvedDependency>> {
        info!(
            "Resolving {} dependencies for {}",
            plan.dependencies.len(),
            plan.platform
        );
        deps::resolve_all(self.provider.as_ref(), &plan.dependencies)
    }

    /// Cook a plan into `output_dir`
    ///
    /// ## Cooking Process
    /// 1. **System packages**: install what the plan lists (if enabled)
    /// 2. **Dependencies**: resolve the closure; a failure here aborts
    ///    before anything is downloaded
    /// 3. **Output**: a previous package in `output_dir` is replaced; any
    ///    other non-empty directory is refused
    /// 4. **Cache**: a hit copies the cached package and stops
    /// 5. **Prep**: fetch the source archive
    /// 6. **Unpack**: extract, remove bundled libraries, apply patches
    /// 7. **Simmer**: write build info, configure and build
    /// 8. **Plate**: copy artifacts and write link metadata
    pub fn cook(&self, plan: &Plan, output_dir: &Path) -> Result<CookResult> {
        info!("Cooking {} version {} for {}", plan.name, plan.version, plan.platform);

        let system_packages = self.install_system_packages(plan)?;
        let deps = self.resolve_dependencies(plan)?;
        prepare_output_dir(output_dir)?;

        let cache = self.cache.as_ref().filter(|_| self.config.use_cache);
        if let Some(cache) = cache
            && let Some(entry) = cache.get(plan, &deps)?
        {
            info!(
                "Using cached build for {}-{} (key: {})",
                plan.name,
                plan.version,
                &entry.cache_key[..16]
            );
            cache.copy_to(&entry, output_dir)?;
            let metadata = LinkMetadata::read(output_dir)?;

            return Ok(CookResult {
                package_dir: output_dir.to_path_buf(),
                metadata,
                artifacts: ArtifactSet::default(),
                log: format!("Cache hit: {}", entry.cache_key),
                warnings: Vec::new(),
                system_packages,
                from_cache: true,
                cache_key: Some(entry.cache_key),
                findings: plan.findings.clone(),
            });
        }

        let mut cook = Cook::new(self, plan, &deps)?;

        info!("Prep: fetching ingredients...");
        cook.prep()?;

        info!("Unpacking and patching sources...");
        cook.unpack()?;
        cook.patch()?;

        info!("Simmering: running build...");
        cook.simmer()?;

        info!("Plating: packaging artifacts...");
        let (artifacts, metadata) = cook.plate(output_dir)?;
        let (log, warnings) = cook.finish();

        let mut cache_key = None;
        if let Some(cache) = cache {
            match cache.put(plan, &deps, output_dir) {
                Ok(entry) => cache_key = Some(entry.cache_key),
                // Don't fail the build just because caching failed
                Err(e) => warn!("Failed to cache build output: {}", e),
            }
        }

        Ok(CookResult {
            package_dir: output_dir.to_path_buf(),
            metadata,
            artifacts,
            log,
            warnings,
            system_packages,
            from_cache: false,
            cache_key,
            findings: plan.findings.clone(),
        })
    }

    /// Fetch the source archive without building
    ///
    /// Useful for warming the source cache before an offline build.
    pub fn fetch(&self, plan: &Plan) -> Result<PathBuf> {
        info!("Fetching sources for {} version {}", plan.name, plan.version);
        self.fetch_source(plan)
    }

    fn cached_source_path(&self, plan: &Plan) -> PathBuf {
        self.config.source_cache.join(&plan.archive_filename)
    }

    /// Check if the source archive is already cached
    pub fn sources_cached(&self, plan: &Plan) -> bool {
        self.cached_source_path(plan).exists()
    }

    /// Fetch the source archive into the source cache, reusing a cached copy
    pub(crate) fn fetch_source(&self, plan: &Plan) -> Result<PathBuf> {
        fs::create_dir_all(&self.config.source_cache)?;

        let checksum = plan.checksum.as_deref().map(Checksum::parse).transpose()?;
        let cached_path = self.cached_source_path(plan);

        if cached_path.exists() {
            match &checksum {
                Some(expected) => match verify_file(&cached_path, expected) {
                    Ok(()) => return Ok(cached_path),
                    Err(e) => {
                        warn!("Cached source rejected ({}), re-downloading", e);
                        fs::remove_file(&cached_path)?;
                    }
                },
                None => {
                    debug!("Using cached source: {}", cached_path.display());
                    return Ok(cached_path);
                }
            }
        }

        download_file(&plan.archive_url, &cached_path)?;

        if let Some(expected) = &checksum
            && let Err(e) = verify_file(&cached_path, expected)
        {
            let _ = fs::remove_file(&cached_path);
            return Err(e);
        }

        Ok(cached_path)
    }
}

/// Leave `output_dir` as an empty directory
///
/// Artifacts and link metadata are collected from whatever the directory
/// holds, so stale files from an earlier build must not survive.
fn prepare_output_dir(output_dir: &Path) -> Result<()> {
    if output_dir.is_dir() && fs::read_dir(output_dir)?.next().is_some() {
        if !output_dir.join(METADATA_FILE).is_file() {
            return Err(Error::AlreadyExists(format!(
                "output directory {} is not empty and holds no package",
                output_dir.display()
            )));
        }
        info!("Replacing previous package in {}", output_dir.display());
        fs::remove_dir_all(output_dir)?;
    }
    fs::create_dir_all(output_dir)?;
    Ok(())
}
