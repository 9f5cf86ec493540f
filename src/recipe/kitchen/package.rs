// src/recipe/kitchen/package.rs

//! Artifact packaging
//!
//! Copy rules select build outputs by file-name glob and place them in the
//! package directory. A rule that matches nothing is not an error; the
//! resulting artifact set is simply smaller.

use crate::error::{Error, Result};
use crate::platform::LinkMode;
use crate::recipe::format::{CopyEntry, CopyRoot};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Classification of a packaged file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Header,
    StaticLib,
    /// `.lib` accompanying a DLL
    ImportLib,
    SharedLib,
    Dll,
}

impl ArtifactKind {
    /// Classify a file by name; `.lib` depends on the link mode
    pub fn classify(file_name: &str, link: LinkMode) -> Option<Self> {
        let lower = file_name.to_ascii_lowercase();
        if lower.ends_with(".hpp") || lower.ends_with(".inl") {
            Some(Self::Header)
        } else if lower.ends_with(".a") {
            Some(Self::StaticLib)
        } else if lower.ends_with(".lib") {
            Some(match link {
                LinkMode::Static => Self::StaticLib,
                LinkMode::Shared => Self::ImportLib,
            })
        } else if lower.ends_with(".dll") {
            Some(Self::Dll)
        } else if lower.ends_with(".so") || lower.contains(".so.") || lower.contains(".dylib") {
            Some(Self::SharedLib)
        } else {
            None
        }
    }
}

/// One file placed in the package directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    /// Path relative to the package directory
    pub path: PathBuf,
    /// Recreated as a symlink rather than copied
    pub symlink: bool,
}

/// Everything the packager produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactSet {
    pub artifacts: Vec<Artifact>,
}

impl ArtifactSet {
    pub fn of_kind(&self, kind: ArtifactKind) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter().filter(move |a| a.kind == kind)
    }

    pub fn count(&self, kind: ArtifactKind) -> usize {
        self.of_kind(kind).count()
    }

    /// Any shared library or DLL present
    pub fn has_shared(&self) -> bool {
        self.artifacts
            .iter()
            .any(|a| matches!(a.kind, ArtifactKind::SharedLib | ArtifactKind::Dll))
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

/// Apply every copy rule in order
pub fn package(
    rules: &[CopyEntry],
    link: LinkMode,
    source_dir: &Path,
    build_dir: &Path,
    package_dir: &Path,
) -> Result<ArtifactSet> {
    fs::create_dir_all(package_dir)?;
    let mut set = ArtifactSet::default();

    for rule in rules {
        let root = match rule.root {
            CopyRoot::Source => source_dir,
            CopyRoot::Build => build_dir,
        };
        let copied = apply_rule(rule, link, root, package_dir)?;
        if copied.is_empty() {
            debug!(
                "Copy rule {:?} from {} matched nothing",
                rule.patterns,
                root.join(&rule.src).display()
            );
        }
        set.artifacts.extend(copied);
    }

    info!(
        "Packaged {} files ({} headers, {} static, {} import, {} shared, {} dll)",
        set.len(),
        set.count(ArtifactKind::Header),
        set.count(ArtifactKind::StaticLib),
        set.count(ArtifactKind::ImportLib),
        set.count(ArtifactKind::SharedLib),
        set.count(ArtifactKind::Dll),
    );

    Ok(set)
}

fn apply_rule(
    rule: &CopyEntry,
    link: LinkMode,
    root: &Path,
    package_dir: &Path,
) -> Result<Vec<Artifact>> {
    let src_dir = root.join(&rule.src);
    if !src_dir.is_dir() {
        return Ok(Vec::new());
    }

    let patterns = rule
        .patterns
        .iter()
        .map(|p| {
            glob::Pattern::new(p)
                .map_err(|e| Error::ParseError(format!("Invalid copy pattern '{}': {}", p, e)))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut copied = Vec::new();
    for entry in WalkDir::new(&src_dir).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }

        let Some(file_name) = entry.file_name().to_str() else {
            continue;
        };
        if !patterns.iter().any(|p| p.matches(file_name)) {
            continue;
        }

        let relative = if rule.keep_path {
            entry
                .path()
                .strip_prefix(&src_dir)
                .map_err(|e| Error::IoError(e.to_string()))?
                .to_path_buf()
        } else {
            PathBuf::from(file_name)
        };
        let dest_rel = Path::new(&rule.dst).join(&relative);
        let dest = package_dir.join(&dest_rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let symlink = rule.symlinks && file_type.is_symlink();
        if symlink {
            copy_symlink(entry.path(), &dest)?;
        } else {
            if dest.symlink_metadata().is_ok() {
                fs::remove_file(&dest)?;
            }
            fs::copy(entry.path(), &dest)?;
        }

        let Some(kind) = ArtifactKind::classify(file_name, link) else {
            debug!("Copied unclassified file {}", dest_rel.display());
            continue;
        };
        copied.push(Artifact {
            kind,
            path: dest_rel,
            symlink,
        });
    }

    Ok(copied)
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dest: &Path) -> Result<()> {
    let target = fs::read_link(src)?;
    if dest.symlink_metadata().is_ok() {
        fs::remove_file(dest)?;
    }
    std::os::unix::fs::symlink(&target, dest)?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dest: &Path) -> Result<()> {
    fs::copy(src, dest)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Os, PlatformDescriptor};
    use crate::recipe::parser::sfml_recipe;
    use crate::recipe::plan::Plan;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    fn layout(tmp: &Path) -> (PathBuf, PathBuf) {
        let source = tmp.join("SFML-2.4.2");
        let build = tmp.join("build");
        touch(&source.join("include/SFML/Graphics.hpp"));
        touch(&source.join("include/SFML/System/Vector2.inl"));
        touch(&source.join("include/SFML/README.md"));
        touch(&build.join("lib/libsfml-system-s.a"));
        touch(&build.join("lib/nested/libsfml-window-s.a"));
        (source, build)
    }

    #[test]
    fn test_classify() {
        assert_eq!(ArtifactKind::classify("Window.hpp", LinkMode::Static), Some(ArtifactKind::Header));
        assert_eq!(ArtifactKind::classify("sfml-system.lib", LinkMode::Static), Some(ArtifactKind::StaticLib));
        assert_eq!(ArtifactKind::classify("sfml-system.lib", LinkMode::Shared), Some(ArtifactKind::ImportLib));
        assert_eq!(ArtifactKind::classify("libsfml-system.so.2.4.2", LinkMode::Shared), Some(ArtifactKind::SharedLib));
        assert_eq!(ArtifactKind::classify("libsfml-system.2.4.dylib", LinkMode::Shared), Some(ArtifactKind::SharedLib));
        assert_eq!(ArtifactKind::classify("sfml-system-2.dll", LinkMode::Shared), Some(ArtifactKind::Dll));
        assert_eq!(ArtifactKind::classify("notes.txt", LinkMode::Shared), None);
    }

    #[test]
    fn test_static_packaging() {
        let tmp = TempDir::new().unwrap();
        let (source, build) = layout(tmp.path());
        let plan = Plan::resolve(&sfml_recipe().unwrap(), &PlatformDescriptor::new(Os::Linux)).unwrap();

        let out = tmp.path().join("package");
        let set = package(&plan.copy_rules, LinkMode::Static, &source, &build, &out).unwrap();

        assert!(out.join("include/SFML/Graphics.hpp").exists());
        assert!(out.join("include/SFML/System/Vector2.inl").exists());
        assert!(!out.join("include/SFML/README.md").exists());
        // flattened
        assert!(out.join("lib/libsfml-window-s.a").exists());
        assert!(!out.join("lib/nested").exists());

        assert_eq!(set.count(ArtifactKind::Header), 2);
        assert_eq!(set.count(ArtifactKind::StaticLib), 2);
        assert!(!set.has_shared());
    }

    #[cfg(unix)]
    #[test]
    fn test_shared_packaging_keeps_symlinks() {
        let tmp = TempDir::new().unwrap();
        let (source, build) = layout(tmp.path());
        let lib = build.join("lib");
        touch(&lib.join("libsfml-system.so.2.4.2"));
        std::os::unix::fs::symlink("libsfml-system.so.2.4.2", lib.join("libsfml-system.so.2.4")).unwrap();
        std::os::unix::fs::symlink("libsfml-system.so.2.4", lib.join("libsfml-system.so")).unwrap();

        let platform = PlatformDescriptor::new(Os::Linux).with_link(LinkMode::Shared);
        let plan = Plan::resolve(&sfml_recipe().unwrap(), &platform).unwrap();

        let out = tmp.path().join("package");
        let set = package(&plan.copy_rules, LinkMode::Shared, &source, &build, &out).unwrap();

        assert_eq!(set.count(ArtifactKind::SharedLib), 3);
        assert!(set.has_shared());
        let link = fs::read_link(out.join("lib/libsfml-system.so")).unwrap();
        assert_eq!(link, PathBuf::from("libsfml-system.so.2.4"));
        assert!(out.join("lib/libsfml-system.so").exists());
    }

    #[test]
    fn test_missing_source_dir_is_silent() {
        let tmp = TempDir::new().unwrap();
        let plan = Plan::resolve(&sfml_recipe().unwrap(), &PlatformDescriptor::new(Os::Linux)).unwrap();
        let set = package(
            &plan.copy_rules,
            LinkMode::Static,
            &tmp.path().join("nope"),
            &tmp.path().join("nope-build"),
            &tmp.path().join("package"),
        )
        .unwrap();
        assert!(set.is_empty());
    }
}
