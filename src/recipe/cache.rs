// src/recipe/cache.rs

//! Build output caching for the Kitchen
//!
//! Caches packaged output directories keyed by a hash of the resolved plan
//! (library name and version, platform descriptor, patch set, CMake
//! definitions) and of the resolved dependencies it was built against.
//! A hit skips download, patching and the CMake build.
//!
//! Layout: `<cache_dir>/<first two hex chars>/<key>/` holds the package
//! tree and `<key>.meta` next to it holds JSON metadata.

use crate::error::{Error, Result};
use crate::hash::{hash_bytes, HashAlgorithm};
use crate::recipe::kitchen::deps::{self, ResolvedDependency};
use crate::recipe::kitchen::METADATA_FILE;
use crate::recipe::plan::Plan;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Configuration for the build cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Root directory for cached packages
    pub cache_dir: PathBuf,
    /// Maximum cache size in bytes (0 = unlimited)
    pub max_size: u64,
    /// Maximum age for cache entries (0 = no expiry)
    pub max_age: Duration,
    /// Whether to check cached packages before use
    pub verify_integrity: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: crate::recipe::kitchen::default_cache_root().join("builds"),
            max_size: 2 * 1024 * 1024 * 1024, // 2 GB
            max_age: Duration::from_secs(30 * 24 * 60 * 60), // 30 days
            verify_integrity: true,
        }
    }
}

/// Metadata stored next to each cached package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub name: String,
    pub version: String,
    pub platform: String,
}

/// A cache entry for a packaged build
#[derive(Debug)]
pub struct CacheEntry {
    /// Path to the cached package directory
    pub package_dir: PathBuf,
    /// Cache key used
    pub cache_key: String,
    /// When the entry was created
    pub created: SystemTime,
    /// Total size of the cached files in bytes
    pub size: u64,
    pub meta: CacheMeta,
}

/// Build output cache
#[derive(Debug)]
pub struct BuildCache {
    config: CacheConfig,
}

impl BuildCache {
    /// Create a new build cache with the given configuration
    pub fn new(config: CacheConfig) -> Result<Self> {
        fs::create_dir_all(&config.cache_dir)?;
        Ok(Self { config })
    }

    /// Create a build cache rooted at `cache_dir` with default limits
    pub fn at(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::new(CacheConfig {
            cache_dir: cache_dir.into(),
            ..CacheConfig::default()
        })
    }

    /// Compute the cache key for a plan built against `deps`
    ///
    /// Patch templates such as `%(lib:flac)s` expand from the dependency
    /// libraries, so hashing the templates together with the resolved
    /// dependencies covers the substituted patch set.
    pub fn cache_key(&self, plan: &Plan, deps: &[ResolvedDependency]) -> String {
        let mut data = plan.fingerprint();
        data.push_str(&deps::fingerprint(deps));
        let key = hash_bytes(HashAlgorithm::Sha256, data.as_bytes());
        debug!("Cache key for {}-{}: {}", plan.name, plan.version, &key[..16]);
        key
    }

    fn shard_dir(&self, key: &str) -> PathBuf {
        self.config.cache_dir.join(&key[..2])
    }

    fn entry_dir(&self, key: &str) -> PathBuf {
        self.shard_dir(key).join(key)
    }

    fn metadata_path(&self, key: &str) -> PathBuf {
        self.shard_dir(key).join(format!("{}.meta", key))
    }

    fn remove_entry(&self, key: &str) {
        let _ = fs::remove_dir_all(self.entry_dir(key));
        let _ = fs::remove_file(self.metadata_path(key));
    }

    /// Check if a cached package exists for the plan and dependencies
    pub fn get(&self, plan: &Plan, deps: &[ResolvedDependency]) -> Result<Option<CacheEntry>> {
        let key = self.cache_key(plan, deps);
        self.get_by_key(&key)
    }

    /// Get a cached package by key
    pub fn get_by_key(&self, key: &str) -> Result<Option<CacheEntry>> {
        if key.len() < 16 {
            return Err(Error::ParseError(format!("Invalid cache key: {}", key)));
        }

        let package_dir = self.entry_dir(key);
        let meta_path = self.metadata_path(key);
        if !package_dir.is_dir() || !meta_path.exists() {
            debug!("Cache miss: {}", &key[..16]);
            return Ok(None);
        }

        let created = fs::metadata(&meta_path)?
            .modified()
            .unwrap_or(SystemTime::UNIX_EPOCH);

        // Zero max_age means no expiry
        if !self.config.max_age.is_zero() {
            let age = SystemTime::now()
                .duration_since(created)
                .unwrap_or(Duration::ZERO);
            if age > self.config.max_age {
                debug!("Cache expired: {} (age: {:?})", &key[..16], age);
                self.remove_entry(key);
                return Ok(None);
            }
        }

        if self.config.verify_integrity && !package_dir.join(METADATA_FILE).is_file() {
            warn!("Cache corruption detected: {}", &key[..16]);
            self.remove_entry(key);
            return Ok(None);
        }

        let meta: CacheMeta = serde_json::from_str(&fs::read_to_string(&meta_path)?)?;
        let size = dir_size(&package_dir)?;
        info!("Cache hit: {} ({} bytes)", &key[..16], size);

        Ok(Some(CacheEntry {
            package_dir,
            cache_key: key.to_string(),
            created,
            size,
            meta,
        }))
    }

    /// Store a packaged directory in the cache
    pub fn put(
        &self,
        plan: &Plan,
        deps: &[ResolvedDependency],
        package_dir: &Path,
    ) -> Result<CacheEntry> {
        let key = self.cache_key(plan, deps);
        let entry_dir = self.entry_dir(&key);

        if entry_dir.exists() {
            fs::remove_dir_all(&entry_dir)?;
        }
        copy_tree(package_dir, &entry_dir)?;

        let meta = CacheMeta {
            name: plan.name.clone(),
            version: plan.version.clone(),
            platform: plan.platform.to_string(),
        };
        fs::write(self.metadata_path(&key), serde_json::to_string_pretty(&meta)?)?;

        let size = dir_size(&entry_dir)?;
        info!(
            "Cached: {}-{} as {} ({} bytes)",
            plan.name,
            plan.version,
            &key[..16],
            size
        );

        self.enforce_limits()?;

        Ok(CacheEntry {
            package_dir: entry_dir,
            cache_key: key,
            created: SystemTime::now(),
            size,
            meta,
        })
    }

    /// Copy a cached package to a destination directory
    pub fn copy_to(&self, entry: &CacheEntry, dest: &Path) -> Result<PathBuf> {
        copy_tree(&entry.package_dir, dest)?;
        Ok(dest.to_path_buf())
    }

    /// Collect (key, created, size) for every entry
    fn entries(&self) -> Result<Vec<(String, SystemTime, u64)>> {
        let mut entries = Vec::new();

        for shard_entry in fs::read_dir(&self.config.cache_dir)? {
            let shard_entry = shard_entry?;
            if !shard_entry.file_type()?.is_dir() {
                continue;
            }

            for file_entry in fs::read_dir(shard_entry.path())? {
                let path = file_entry?.path();
                if path.extension().is_none_or(|e| e != "meta") {
                    continue;
                }
                let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let mtime = fs::metadata(&path)
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                let size = dir_size(&shard_entry.path().join(key)).unwrap_or(0);
                entries.push((key.to_string(), mtime, size));
            }
        }

        Ok(entries)
    }

    /// Enforce cache size limits, evicting the oldest entries first
    pub fn enforce_limits(&self) -> Result<()> {
        if self.config.max_size == 0 {
            return Ok(());
        }

        let mut entries = self.entries()?;
        let mut total_size: u64 = entries.iter().map(|(_, _, s)| s).sum();
        if total_size <= self.config.max_size {
            return Ok(());
        }

        entries.sort_by_key(|(_, mtime, _)| *mtime);

        for (key, _, size) in entries {
            if total_size <= self.config.max_size {
                break;
            }
            debug!("Evicting {} ({} bytes)", &key[..16.min(key.len())], size);
            self.remove_entry(&key);
            total_size = total_size.saturating_sub(size);
        }

        Ok(())
    }

    /// Clear all cached builds, returning the number of entries removed
    pub fn clear(&self) -> Result<u64> {
        let entries = self.entries()?;
        for (key, _, _) in &entries {
            self.remove_entry(key);
        }

        for shard in fs::read_dir(&self.config.cache_dir)? {
            let path = shard?.path();
            if path.is_dir() {
                // Only succeeds once the shard is empty
                let _ = fs::remove_dir(&path);
            }
        }

        info!("Cleared {} cache entries", entries.len());
        Ok(entries.len() as u64)
    }

    /// Get cache statistics
    pub fn stats(&self) -> Result<CacheStats> {
        let entries = self.entries()?;

        Ok(CacheStats {
            total_size: entries.iter().map(|(_, _, s)| s).sum(),
            entry_count: entries.len() as u64,
            max_size: self.config.max_size,
            oldest: entries.iter().map(|(_, t, _)| *t).min(),
            newest: entries.iter().map(|(_, t, _)| *t).max(),
        })
    }
}

/// Cache statistics
#[derive(Debug)]
pub struct CacheStats {
    /// Total size of cached packages in bytes
    pub total_size: u64,
    /// Number of cached entries
    pub entry_count: u64,
    /// Maximum configured size
    pub max_size: u64,
    /// Oldest cache entry
    pub oldest: Option<SystemTime>,
    /// Newest cache entry
    pub newest: Option<SystemTime>,
}

impl CacheStats {
    /// Get cache utilization as a percentage
    pub fn utilization(&self) -> f64 {
        if self.max_size == 0 {
            0.0
        } else {
            (self.total_size as f64 / self.max_size as f64) * 100.0
        }
    }
}

fn dir_size(dir: &Path) -> Result<u64> {
    let mut total = 0;
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry?;
        if entry.file_type().is_file() {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

/// Recursively copy a directory, recreating symlinks on Unix
pub(crate) fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| Error::IoError(e.to_string()))?;
        let target = dest.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            #[cfg(unix)]
            {
                let link = fs::read_link(entry.path())?;
                if target.symlink_metadata().is_ok() {
                    fs::remove_file(&target)?;
                }
                std::os::unix::fs::symlink(link, &target)?;
            }
            #[cfg(not(unix))]
            fs::copy(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
