// src/recipe/format.rs

//! Recipe file format definitions
//!
//! Recipes are TOML files describing how to fetch, patch, build and package
//! one pinned version of an upstream library. Any list entry may carry a
//! `when` table restricting it to matching platforms.

use crate::error::{Error, Result};
use crate::platform::{Compiler, LinkMode, Os, PlatformDescriptor, RuntimeLinkage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A complete recipe for packaging a library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// Package metadata
    pub package: PackageSection,

    /// Upstream source archive
    pub source: SourceSection,

    /// Dependency declarations, in declaration order
    #[serde(default)]
    pub requires: Vec<RequireEntry>,

    /// OS packages installed before building
    #[serde(default)]
    pub system_packages: Vec<SystemPackageEntry>,

    /// Textual patches applied to the extracted tree, in order
    #[serde(default)]
    pub patches: Vec<PatchEntry>,

    /// CMake configuration
    #[serde(default)]
    pub build: BuildSection,

    /// Artifact copy rules
    #[serde(default, rename = "copy")]
    pub copy_rules: Vec<CopyEntry>,

    /// Consumer link metadata additions
    #[serde(default)]
    pub link: Vec<LinkEntry>,

    /// Variables for substitution
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

impl Recipe {
    /// Value of a built-in or custom variable
    pub fn variable(&self, key: &str) -> Option<String> {
        match key {
            "name" => Some(self.package.name.clone()),
            "version" => Some(self.package.version.clone()),
            _ => self.variables.get(key).cloned(),
        }
    }

    /// Substitute recipe-level variables only
    pub fn substitute(&self, template: &str) -> Result<String> {
        substitute(template, |key| self.variable(key))
    }

    /// Get the archive URL with variables substituted
    pub fn archive_url(&self) -> Result<String> {
        self.substitute(&self.source.archive)
    }

    /// Get the archive filename from the URL
    pub fn archive_filename(&self) -> Result<String> {
        let url = self.archive_url()?;
        let name = url.rsplit('/').next().unwrap_or_default();
        if name.is_empty() {
            return Err(Error::ParseError(format!(
                "Archive URL has no file name: {}",
                url
            )));
        }
        let prefix = self.package.name.to_lowercase();
        if name.to_lowercase().starts_with(&prefix) {
            return Ok(name.to_string());
        }
        // GitHub tag archives are named after the bare version
        Ok(format!("{}-{}", prefix, name))
    }

    /// Top-level directory the archive extracts to
    pub fn folder_name(&self) -> Result<String> {
        match &self.source.folder {
            Some(folder) => self.substitute(folder),
            None => Ok(format!("{}-{}", self.package.name, self.package.version)),
        }
    }
}

/// Package metadata section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSection {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    /// Where the recipe itself is maintained
    #[serde(default)]
    pub url: Option<String>,
}

/// Source archive section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSection {
    /// Archive URL, supports `%(version)s`
    pub archive: String,

    /// Optional `sha256:...` checksum of the archive
    #[serde(default)]
    pub checksum: Option<String>,

    /// Directory name after extraction
    #[serde(default)]
    pub folder: Option<String>,

    /// Directories (relative to the folder) deleted after extraction
    #[serde(default)]
    pub remove: Vec<String>,
}

/// Platform filter attached to recipe entries
///
/// Every field that is set must match; an empty condition always matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Condition {
    #[serde(default)]
    pub os: Option<Os>,
    /// Any of these distro ids
    #[serde(default)]
    pub distro: Option<Vec<String>>,
    #[serde(default)]
    pub compiler: Option<Compiler>,
    #[serde(default)]
    pub runtime: Option<RuntimeLinkage>,
    #[serde(default)]
    pub link: Option<LinkMode>,
}

impl Condition {
    pub fn matches(&self, platform: &PlatformDescriptor) -> bool {
        if self.os.is_some_and(|os| os != platform.os) {
            return false;
        }
        if let Some(distros) = &self.distro {
            let Some(current) = platform.distro.as_deref() else {
                return false;
            };
            if !distros.iter().any(|d| d.eq_ignore_ascii_case(current)) {
                return false;
            }
        }
        if self.compiler.is_some_and(|c| c != platform.compiler) {
            return false;
        }
        if let Some(runtime) = self.runtime
            && platform.runtime_linkage() != Some(runtime)
        {
            return false;
        }
        if self.link.is_some_and(|l| l != platform.link) {
            return false;
        }
        true
    }

    pub fn is_unconditional(&self) -> bool {
        *self == Self::default()
    }
}

fn applies(when: &Option<Condition>, platform: &PlatformDescriptor) -> bool {
    when.as_ref().is_none_or(|c| c.matches(platform))
}

/// Reference to a dependency package: `name/version@user/channel`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DependencyRef {
    pub name: String,
    pub version: String,
    pub user: String,
    pub channel: String,
}

impl DependencyRef {
    /// `user/channel`, the source repository of the package
    pub fn repository(&self) -> String {
        format!("{}/{}", self.user, self.channel)
    }
}

impl FromStr for DependencyRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            Error::ParseError(format!(
                "Invalid dependency reference '{}', expected name/version@user/channel",
                s
            ))
        };

        let (package, repo) = s.split_once('@').ok_or_else(invalid)?;
        let (name, version) = package.split_once('/').ok_or_else(invalid)?;
        let (user, channel) = repo.split_once('/').ok_or_else(invalid)?;

        if [name, version, user, channel]
            .iter()
            .any(|part| part.is_empty() || part.contains(['/', '@', ' ']))
        {
            return Err(invalid());
        }

        Ok(Self {
            name: name.to_string(),
            version: version.to_string(),
            user: user.to_string(),
            channel: channel.to_string(),
        })
    }
}

impl TryFrom<String> for DependencyRef {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<DependencyRef> for String {
    fn from(r: DependencyRef) -> Self {
        r.to_string()
    }
}

impl fmt::Display for DependencyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}@{}/{}",
            self.name, self.version, self.user, self.channel
        )
    }
}

/// One dependency declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequireEntry {
    pub reference: DependencyRef,
    #[serde(default)]
    pub when: Option<Condition>,
}

impl RequireEntry {
    pub fn applies_to(&self, platform: &PlatformDescriptor) -> bool {
        applies(&self.when, platform)
    }
}

/// System packages to install through the OS package manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemPackageEntry {
    pub packages: Vec<String>,
    /// Refresh the package index first
    #[serde(default)]
    pub update: bool,
    #[serde(default)]
    pub when: Option<Condition>,
}

impl SystemPackageEntry {
    pub fn applies_to(&self, platform: &PlatformDescriptor) -> bool {
        applies(&self.when, platform)
    }
}

/// A find-and-replace directive against a file in the source folder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchEntry {
    /// Path relative to the source folder
    pub file: String,
    /// Exact text that must be present
    pub search: String,
    /// Replacement, supports `%(...)s` variables
    pub replace: String,
    #[serde(default)]
    pub when: Option<Condition>,
}

impl PatchEntry {
    pub fn applies_to(&self, platform: &PlatformDescriptor) -> bool {
        applies(&self.when, platform)
    }
}

/// CMake configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSection {
    /// Request verbose toolchain output
    #[serde(default = "default_true")]
    pub verbose: bool,
    /// Request a parallel build
    #[serde(default = "default_true")]
    pub parallel: bool,
    /// Optional CMake generator (`-G`)
    #[serde(default)]
    pub generator: Option<String>,
    /// Cache definitions passed as `-DNAME=VALUE`
    #[serde(default)]
    pub definitions: Vec<DefinitionEntry>,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            verbose: true,
            parallel: true,
            generator: None,
            definitions: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// One CMake definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinitionEntry {
    pub name: String,
    /// Value, supports `%(shared)s` (`ON`/`OFF`) and recipe variables
    pub value: String,
    #[serde(default)]
    pub when: Option<Condition>,
}

impl DefinitionEntry {
    pub fn applies_to(&self, platform: &PlatformDescriptor) -> bool {
        applies(&self.when, platform)
    }
}

/// Which tree a copy rule reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyRoot {
    /// The extracted, patched source folder
    Source,
    /// The CMake binary directory
    #[default]
    Build,
}

/// Artifact copy rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyEntry {
    /// File name glob patterns
    pub patterns: Vec<String>,
    #[serde(default)]
    pub root: CopyRoot,
    /// Directory under the root to search
    #[serde(default)]
    pub src: String,
    /// Directory under the package folder to copy into
    pub dst: String,
    /// Preserve the path relative to `src`
    #[serde(default)]
    pub keep_path: bool,
    /// Recreate symlinks instead of copying their targets
    #[serde(default)]
    pub symlinks: bool,
    #[serde(default)]
    pub when: Option<Condition>,
}

impl CopyEntry {
    pub fn applies_to(&self, platform: &PlatformDescriptor) -> bool {
        applies(&self.when, platform)
    }
}

/// Link metadata added for consumers on matching platforms
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkEntry {
    /// Extra system library names
    #[serde(default)]
    pub system_libs: Vec<String>,
    /// Raw linker flag strings
    #[serde(default)]
    pub raw_flags: Vec<String>,
    /// Executable link flags (frameworks)
    #[serde(default)]
    pub exe_flags: Vec<String>,
    #[serde(default)]
    pub when: Option<Condition>,
}

impl LinkEntry {
    pub fn applies_to(&self, platform: &PlatformDescriptor) -> bool {
        applies(&self.when, platform)
    }
}

/// Replace `%(key)s` patterns using `lookup`
///
/// Unknown keys are an error rather than being left in place.
pub fn substitute<F>(template: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("%(") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find(")s").ok_or_else(|| {
            Error::ParseError(format!("Unterminated variable in template: {}", template))
        })?;
        let key = &after[..end];
        let value = lookup(key).ok_or_else(|| Error::MissingVariable(key.to_string()))?;
        result.push_str(&value);
        rest = &after[end + 2..];
    }

    result.push_str(rest);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RECIPE: &str = r#"
[package]
name = "zlib"
version = "1.2.11"
license = "Zlib"

[source]
archive = "https://example.com/zlib/archive/v%(version)s.tar.gz"
checksum = "sha256:c3e5e9fdd5004dcb542feda5ee4f0ff0744628baf8ed2dd5d66f8ca1197cb1a1"
remove = ["contrib"]

[[requires]]
reference = "bzip2/1.0.6@bincrafters/stable"

[[requires]]
reference = "libpng/1.6.34@bincrafters/stable"
when = { os = "Windows", link = "shared" }

[[patches]]
file = "CMakeLists.txt"
search = "project(zlib C)"
replace = "project(zlib C) # %(name)s %(version)s"

[[build.definitions]]
name = "BUILD_SHARED_LIBS"
value = "%(shared)s"

[[copy]]
patterns = ["*.h"]
root = "source"
dst = "include"
keep_path = true
"#;

    #[test]
    fn test_parse_recipe() {
        let recipe: Recipe = toml::from_str(SAMPLE_RECIPE).unwrap();

        assert_eq!(recipe.package.name, "zlib");
        assert_eq!(recipe.requires.len(), 2);
        assert_eq!(recipe.requires[0].reference.name, "bzip2");
        assert_eq!(recipe.requires[1].reference.repository(), "bincrafters/stable");
        assert_eq!(recipe.patches.len(), 1);
        assert!(recipe.build.verbose);
        assert!(recipe.build.parallel);
        assert_eq!(recipe.copy_rules[0].root, CopyRoot::Source);
        assert!(recipe.link.is_empty());
    }

    #[test]
    fn test_archive_helpers() {
        let recipe: Recipe = toml::from_str(SAMPLE_RECIPE).unwrap();
        assert_eq!(
            recipe.archive_url().unwrap(),
            "https://example.com/zlib/archive/v1.2.11.tar.gz"
        );
        assert_eq!(recipe.archive_filename().unwrap(), "zlib-v1.2.11.tar.gz");
        assert_eq!(recipe.folder_name().unwrap(), "zlib-1.2.11");
    }

    #[test]
    fn test_dependency_ref_round_trip_and_errors() {
        let r: DependencyRef = "stb/73990fe@conan/testing".parse().unwrap();
        assert_eq!(r.name, "stb");
        assert_eq!(r.version, "73990fe");
        assert_eq!(r.channel, "testing");
        assert_eq!(r.to_string(), "stb/73990fe@conan/testing");

        assert!("stb/73990fe".parse::<DependencyRef>().is_err());
        assert!("stb@conan/testing".parse::<DependencyRef>().is_err());
        assert!("/1.0@a/b".parse::<DependencyRef>().is_err());
    }

    #[test]
    fn test_condition_matching() {
        let linux = PlatformDescriptor::new(Os::Linux).with_distro("ubuntu");
        let mac = PlatformDescriptor::new(Os::Macos).with_link(LinkMode::Shared);

        assert!(Condition::default().matches(&linux));
        assert!(Condition::default().is_unconditional());

        let on_linux = Condition {
            os: Some(Os::Linux),
            ..Default::default()
        };
        assert!(on_linux.matches(&linux));
        assert!(!on_linux.matches(&mac));

        let debian_family = Condition {
            distro: Some(vec!["Ubuntu".to_string(), "linuxmint".to_string()]),
            ..Default::default()
        };
        assert!(debian_family.matches(&linux));
        assert!(!debian_family.matches(&mac));

        let shared_only = Condition {
            link: Some(LinkMode::Shared),
            ..Default::default()
        };
        assert!(shared_only.matches(&mac));
        assert!(!shared_only.matches(&linux));
    }

    #[test]
    fn test_runtime_condition_requires_visual_studio() {
        let cond = Condition {
            runtime: Some(RuntimeLinkage::Dynamic),
            ..Default::default()
        };
        assert!(!cond.matches(&PlatformDescriptor::new(Os::Linux)));
        // Unset runtime on Visual Studio is the static one
        assert!(!cond.matches(&PlatformDescriptor::new(Os::Windows)));
        let md = PlatformDescriptor::new(Os::Windows)
            .with_compiler(Compiler::VisualStudio, Some(crate::platform::Runtime::MD));
        assert!(cond.matches(&md));
    }

    #[test]
    fn test_unknown_condition_field_rejected() {
        let bad = r#"
[package]
name = "x"
version = "1"

[source]
archive = "https://example.com/x.zip"

[[requires]]
reference = "a/1@b/c"
when = { platform = "Linux" }
"#;
        assert!(toml::from_str::<Recipe>(bad).is_err());
    }

    #[test]
    fn test_substitute() {
        let out = substitute("a %(x)s b %(y)s", |k| match k {
            "x" => Some("1".to_string()),
            "y" => Some("2".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(out, "a 1 b 2");

        let untouched = substitute("${CMAKE_BINARY_DIR}/x", |_| None).unwrap();
        assert_eq!(untouched, "${CMAKE_BINARY_DIR}/x");

        assert!(matches!(
            substitute("%(nope)s", |_| None),
            Err(Error::MissingVariable(k)) if k == "nope"
        ));
        assert!(substitute("%(open", |_| None).is_err());
    }
}
