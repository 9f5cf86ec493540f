// src/recipe/kitchen/deps.rs

//! Resolution of declared dependencies to installed packages

use crate::error::{Error, Result};
use crate::recipe::format::DependencyRef;
use crate::recipe::kitchen::link::collect_libs;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A dependency located on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    pub reference: DependencyRef,
    pub root: PathBuf,
    pub include_dirs: Vec<PathBuf>,
    pub lib_dirs: Vec<PathBuf>,
    /// Library names, in link order
    pub libs: Vec<String>,
}

/// Trait for locating dependency packages
///
/// Every closure entry must resolve; a single failure aborts the run
/// before anything is downloaded.
pub trait DependencyProvider: Send + Sync {
    fn resolve(&self, reference: &DependencyRef) -> Result<ResolvedDependency>;
}

/// Optional `package.toml` inside a dependency root
#[derive(Debug, Default, Deserialize)]
struct PackageInfo {
    #[serde(default)]
    libs: Vec<String>,
    #[serde(default)]
    include_dirs: Vec<String>,
    #[serde(default)]
    lib_dirs: Vec<String>,
}

/// Resolves dependencies from a local prefix laid out as
/// `<root>/<name>/<version>/{include,lib}`
pub struct PrefixProvider {
    root: PathBuf,
}

impl PrefixProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn package_root(&self, reference: &DependencyRef) -> PathBuf {
        self.root.join(&reference.name).join(&reference.version)
    }
}

impl DependencyProvider for PrefixProvider {
    fn resolve(&self, reference: &DependencyRef) -> Result<ResolvedDependency> {
        let root = self.package_root(reference);
        if !root.is_dir() {
            return Err(Error::ResolutionError(format!(
                "{} not found at {}",
                reference,
                root.display()
            )));
        }

        let info_path = root.join("package.toml");
        let info: PackageInfo = if info_path.exists() {
            let content = fs::read_to_string(&info_path)?;
            toml::from_str(&content).map_err(|e| {
                Error::ParseError(format!("{}: {}", info_path.display(), e))
            })?
        } else {
            PackageInfo::default()
        };

        let dirs_or = |dirs: &[String], default: &str| -> Vec<PathBuf> {
            if dirs.is_empty() {
                vec![root.join(default)]
            } else {
                dirs.iter().map(|d| root.join(d)).collect()
            }
        };
        let include_dirs = dirs_or(&info.include_dirs, "include");
        let lib_dirs = dirs_or(&info.lib_dirs, "lib");

        let libs = if info.libs.is_empty() {
            let mut libs = Vec::new();
            for dir in &lib_dirs {
                for lib in collect_libs(dir)? {
                    if !libs.contains(&lib) {
                        libs.push(lib);
                    }
                }
            }
            libs
        } else {
            info.libs
        };

        debug!("Resolved {} at {} ({} libs)", reference, root.display(), libs.len());

        Ok(ResolvedDependency {
            reference: reference.clone(),
            root,
            include_dirs,
            lib_dirs,
            libs,
        })
    }
}

/// Resolve every reference, failing on the first one that cannot be found
pub fn resolve_all(
    provider: &dyn DependencyProvider,
    references: &[DependencyRef],
) -> Result<Vec<ResolvedDependency>> {
    references.iter().map(|r| provider.resolve(r)).collect()
}

/// Look up a resolved dependency by name
pub fn find<'a>(deps: &'a [ResolvedDependency], name: &str) -> Option<&'a ResolvedDependency> {
    deps.iter().find(|d| d.reference.name == name)
}

/// Template lookup for `lib:<name>` and `libs:<name>`
pub fn lookup_variable(deps: &[ResolvedDependency], key: &str) -> Option<String> {
    if let Some(name) = key.strip_prefix("lib:") {
        return find(deps, name).and_then(|d| d.libs.first().cloned());
    }
    if let Some(name) = key.strip_prefix("libs:") {
        return find(deps, name).map(|d| d.libs.join(" "));
    }
    None
}

/// Stable text form of resolved dependencies, part of the build cache key
pub fn fingerprint(deps: &[ResolvedDependency]) -> String {
    let mut data = String::new();
    for dep in deps {
        data.push_str(&format!("dep:{}
root:{}
", dep.reference, dep.root.display()));
        for dir in &dep.include_dirs {
            data.push_str(&format!("include:{}
", dir.display()));
        }
        for dir in &dep.lib_dirs {
            data.push_str(&format!("libdir:{}
", dir.display()));
        }
        data.push_str(&format!("libs:{}
", dep.libs.join(" ")));
    }
    data
}

/// Create a dependency prefix entry, used by tests and fixtures
pub fn write_prefix_package(root: &Path, reference: &DependencyRef, libs: &[&str]) -> Result<PathBuf> {
    let pkg = root.join(&reference.name).join(&reference.version);
    fs::create_dir_all(pkg.join("include"))?;
    fs::create_dir_all(pkg.join("lib"))?;
    for lib in libs {
        fs::write(pkg.join("lib").join(format!("lib{}.a", lib)), b"")?;
    }
    Ok(pkg)
}
