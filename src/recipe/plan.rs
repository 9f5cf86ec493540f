// src/recipe/plan.rs

//! Platform resolution of a recipe
//!
//! `Plan::resolve` consults every `when` table exactly once and freezes the
//! outcome: dependency closure, system packages, patch directives, CMake
//! definitions, copy rules and link additions. Later stages only read the
//! plan and never look at the platform again.

use crate::error::{Error, Result};
use crate::platform::{BuildType, PlatformDescriptor};
use crate::recipe::format::{substitute, CopyEntry, DependencyRef, Recipe};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Something odd about the recipe noticed while planning
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanFinding {
    /// The same reference was declared again
    Redundant { reference: DependencyRef },
    /// A name was re-declared with a different version or channel;
    /// the later declaration wins
    Conflicting {
        previous: DependencyRef,
        replacement: DependencyRef,
    },
}

/// OS packages to install before building
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SystemPackages {
    pub packages: Vec<String>,
    pub update: bool,
}

impl SystemPackages {
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// A patch directive selected for this platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchDirective {
    /// Path relative to the source folder
    pub file: String,
    pub search: String,
    /// Replacement template; dependency variables are filled at patch time
    pub replace: String,
}

/// Link additions for consumers on this platform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkRules {
    pub system_libs: Vec<String>,
    pub raw_flags: Vec<String>,
    pub exe_flags: Vec<String>,
}

/// Recipe resolved against one platform
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub name: String,
    pub version: String,
    pub platform: PlatformDescriptor,
    pub archive_url: String,
    pub archive_filename: String,
    pub checksum: Option<String>,
    /// Top-level folder inside the archive
    pub folder: String,
    /// Folders deleted after extraction
    pub remove: Vec<String>,
    /// Every applicable declaration, in declaration order
    pub declarations: Vec<DependencyRef>,
    /// One reference per dependency name
    pub dependencies: Vec<DependencyRef>,
    pub findings: Vec<PlanFinding>,
    pub system_packages: SystemPackages,
    pub patches: Vec<PatchDirective>,
    /// CMake definitions in declaration order
    pub definitions: Vec<(String, String)>,
    pub build_type: BuildType,
    pub generator: Option<String>,
    pub verbose: bool,
    pub parallel: bool,
    pub copy_rules: Vec<CopyEntry>,
    pub link: LinkRules,
    #[serde(skip)]
    variables: HashMap<String, String>,
}

impl Plan {
    /// Resolve `recipe` for `platform`
    pub fn resolve(recipe: &Recipe, platform: &PlatformDescriptor) -> Result<Self> {
        let declarations: Vec<DependencyRef> = recipe
            .requires
            .iter()
            .filter(|r| r.applies_to(platform))
            .map(|r| r.reference.clone())
            .collect();

        let (dependencies, findings) = close_dependencies(&declarations);
        for finding in &findings {
            match finding {
                PlanFinding::Redundant { reference } => {
                    debug!("Dependency {} is declared twice", reference)
                }
                PlanFinding::Conflicting {
                    previous,
                    replacement,
                } => warn!(
                    "Dependency {} overrides earlier declaration {}",
                    replacement, previous
                ),
            }
        }

        let mut system_packages = SystemPackages::default();
        for entry in recipe.system_packages.iter().filter(|e| e.applies_to(platform)) {
            system_packages.update |= entry.update;
            for package in &entry.packages {
                if !system_packages.packages.contains(package) {
                    system_packages.packages.push(package.clone());
                }
            }
        }

        let mut variables = recipe.variables.clone();
        variables.insert("name".to_string(), recipe.package.name.clone());
        variables.insert("version".to_string(), recipe.package.version.clone());
        let folder = recipe.folder_name()?;
        variables.insert("folder".to_string(), folder.clone());
        let shared = if platform.is_shared() { "ON" } else { "OFF" };
        variables.insert("shared".to_string(), shared.to_string());

        let lookup = |key: &str| variables.get(key).cloned();

        let mut patches = Vec::new();
        for entry in recipe.patches.iter().filter(|e| e.applies_to(platform)) {
            patches.push(PatchDirective {
                file: substitute(&entry.file, lookup)?,
                search: substitute(&entry.search, lookup)?,
                replace: entry.replace.clone(),
            });
        }

        let mut definitions: Vec<(String, String)> = Vec::new();
        for entry in recipe.build.definitions.iter().filter(|e| e.applies_to(platform)) {
            let value = substitute(&entry.value, lookup)?;
            match definitions.iter_mut().find(|(name, _)| *name == entry.name) {
                Some(existing) => existing.1 = value,
                None => definitions.push((entry.name.clone(), value)),
            }
        }

        let copy_rules: Vec<CopyEntry> = recipe
            .copy_rules
            .iter()
            .filter(|e| e.applies_to(platform))
            .cloned()
            .collect();

        let mut link = LinkRules::default();
        for entry in recipe.link.iter().filter(|e| e.applies_to(platform)) {
            link.system_libs.extend(entry.system_libs.iter().cloned());
            link.raw_flags.extend(entry.raw_flags.iter().cloned());
            link.exe_flags.extend(entry.exe_flags.iter().cloned());
        }

        Ok(Self {
            name: recipe.package.name.clone(),
            version: recipe.package.version.clone(),
            platform: platform.clone(),
            archive_url: recipe.archive_url()?,
            archive_filename: recipe.archive_filename()?,
            checksum: recipe.source.checksum.clone(),
            folder,
            remove: recipe.source.remove.clone(),
            declarations,
            dependencies,
            findings,
            system_packages,
            patches,
            definitions,
            build_type: platform.build_type,
            generator: recipe.build.generator.clone(),
            verbose: recipe.build.verbose,
            parallel: recipe.build.parallel,
            copy_rules,
            link,
            variables,
        })
    }

    /// Value of a plan-level template variable
    pub fn variable(&self, key: &str) -> Option<String> {
        self.variables.get(key).cloned()
    }

    /// Look up a definition by name
    pub fn definition(&self, name: &str) -> Option<&str> {
        self.definitions
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Look up the closure entry for a dependency name
    pub fn dependency(&self, name: &str) -> Result<&DependencyRef> {
        self.dependencies
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| Error::ResolutionError(format!("{} is not a dependency", name)))
    }

    /// Deterministic text covering everything that shapes the output,
    /// used as the build cache key input
    pub fn fingerprint(&self) -> String {
        let mut data = format!(
            "name:{}\nversion:{}\narchive:{}\nchecksum:{}\n",
            self.name,
            self.version,
            self.archive_url,
            self.checksum.as_deref().unwrap_or("")
        );
        data.push_str(&self.platform.fingerprint());

        // Declaration order matters for overrides, keep it
        for dep in &self.declarations {
            data.push_str(&format!("requires:{}\n", dep));
        }
        for dir in &self.remove {
            data.push_str(&format!("remove:{}\n", dir));
        }
        for patch in &self.patches {
            data.push_str(&format!(
                "patch:{}\n{}\n=>\n{}\n",
                patch.file, patch.search, patch.replace
            ));
        }
        for (name, value) in &self.definitions {
            data.push_str(&format!("define:{}={}\n", name, value));
        }
        for rule in &self.copy_rules {
            data.push_str(&format!(
                "copy:{:?}:{}:{}:{}:{}:{}\n",
                rule.root,
                rule.src,
                rule.dst,
                rule.patterns.join(","),
                rule.keep_path,
                rule.symlinks
            ));
        }
        for lib in &self.link.system_libs {
            data.push_str(&format!("link.lib:{}\n", lib));
        }
        for flag in &self.link.raw_flags {
            data.push_str(&format!("link.raw:{}\n", flag));
        }
        for flag in &self.link.exe_flags {
            data.push_str(&format!("link.exe:{}\n", flag));
        }
        data
    }
}

/// Collapse declarations to one reference per name
fn close_dependencies(declarations: &[DependencyRef]) -> (Vec<DependencyRef>, Vec<PlanFinding>) {
    let mut closure: Vec<DependencyRef> = Vec::new();
    let mut findings = Vec::new();

    for dep in declarations {
        match closure.iter_mut().find(|d| d.name == dep.name) {
            Some(existing) if existing == dep => findings.push(PlanFinding::Redundant {
                reference: dep.clone(),
            }),
            Some(existing) => {
                findings.push(PlanFinding::Conflicting {
                    previous: existing.clone(),
                    replacement: dep.clone(),
                });
                *existing = dep.clone();
            }
            None => closure.push(dep.clone()),
        }
    }

    (closure, findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Compiler, LinkMode, Os, Runtime};
    use crate::recipe::parser::sfml_recipe;

    fn names(refs: &[DependencyRef]) -> Vec<&str> {
        refs.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn test_linux_closure_adds_openal() {
        let recipe = sfml_recipe().unwrap();
        let plan = Plan::resolve(&recipe, &PlatformDescriptor::new(Os::Linux)).unwrap();

        assert_eq!(
            names(&plan.dependencies),
            vec!["libjpeg", "flac", "vorbis", "freetype", "stb", "openal"]
        );
        assert_eq!(plan.declarations.len(), 6);
        assert!(plan.findings.is_empty());
        assert_eq!(
            plan.dependency("openal").unwrap().to_string(),
            "openal/1.18.2@bincrafters/stable"
        );
    }

    #[test]
    fn test_windows_closure_is_the_base_set() {
        let recipe = sfml_recipe().unwrap();
        let plan = Plan::resolve(&recipe, &PlatformDescriptor::new(Os::Windows)).unwrap();

        assert_eq!(
            names(&plan.dependencies),
            vec!["libjpeg", "flac", "vorbis", "freetype", "stb"]
        );
        assert!(plan.dependency("openal").is_err());
    }

    #[test]
    fn test_macos_duplicates_are_flagged() {
        let recipe = sfml_recipe().unwrap();
        let plan = Plan::resolve(&recipe, &PlatformDescriptor::new(Os::Macos)).unwrap();

        assert_eq!(plan.declarations.len(), 10);
        assert_eq!(
            names(&plan.dependencies),
            vec!["libjpeg", "flac", "vorbis", "freetype", "stb"]
        );
        assert_eq!(
            plan.dependency("stb").unwrap().to_string(),
            "stb/73990fe@conan/testing"
        );

        let redundant = plan
            .findings
            .iter()
            .filter(|f| matches!(f, PlanFinding::Redundant { .. }))
            .count();
        assert_eq!(redundant, 4);
        assert!(plan.findings.contains(&PlanFinding::Conflicting {
            previous: "stb/20180214@conan/stable".parse().unwrap(),
            replacement: "stb/73990fe@conan/testing".parse().unwrap(),
        }));
    }

    #[test]
    fn test_linux_patch_set_includes_flac_workaround() {
        let recipe = sfml_recipe().unwrap();
        let linux = Plan::resolve(&recipe, &PlatformDescriptor::new(Os::Linux)).unwrap();
        let mac = Plan::resolve(&recipe, &PlatformDescriptor::new(Os::Macos)).unwrap();

        assert_eq!(linux.patches.len(), 3);
        assert_eq!(linux.patches[2].file, "src/SFML/Audio/CMakeLists.txt");
        assert_eq!(linux.patches[2].search, "find_package(FLAC REQUIRED)");
        assert_eq!(mac.patches.len(), 2);
        assert_eq!(mac.patches[0].file, "CMakeLists.txt");
        assert_eq!(mac.patches[1].file, "src/SFML/Graphics/CMakeLists.txt");
    }

    #[test]
    fn test_static_definitions() {
        let recipe = sfml_recipe().unwrap();
        let plan = Plan::resolve(&recipe, &PlatformDescriptor::new(Os::Linux)).unwrap();

        assert_eq!(plan.definition("BUILD_SHARED_LIBS"), Some("OFF"));
        assert_eq!(plan.definition("SFML_STATIC_LIBRARIES"), Some("ON"));
        assert_eq!(plan.definition("CMAKE_POSITION_INDEPENDENT_CODE"), Some("ON"));
        assert_eq!(plan.definition("SFML_BUILD_EXAMPLES"), Some("OFF"));
        assert_eq!(plan.definition("SFML_BUILD_DOC"), Some("OFF"));
        assert_eq!(plan.definition("SFML_USE_STATIC_STD_LIBS"), None);
    }

    #[test]
    fn test_shared_definitions() {
        let recipe = sfml_recipe().unwrap();
        let platform = PlatformDescriptor::new(Os::Macos).with_link(LinkMode::Shared);
        let plan = Plan::resolve(&recipe, &platform).unwrap();

        assert_eq!(plan.definition("BUILD_SHARED_LIBS"), Some("ON"));
        assert_eq!(plan.definition("SFML_STATIC_LIBRARIES"), None);
    }

    #[test]
    fn test_visual_studio_static_runtime_toggle() {
        let recipe = sfml_recipe().unwrap();

        let mt = PlatformDescriptor::new(Os::Windows)
            .with_compiler(Compiler::VisualStudio, Some(Runtime::MT));
        let plan = Plan::resolve(&recipe, &mt).unwrap();
        assert_eq!(plan.definition("SFML_USE_STATIC_STD_LIBS"), Some("ON"));

        let md = PlatformDescriptor::new(Os::Windows)
            .with_compiler(Compiler::VisualStudio, Some(Runtime::MD));
        let plan = Plan::resolve(&recipe, &md).unwrap();
        assert_eq!(plan.definition("SFML_USE_STATIC_STD_LIBS"), Some("OFF"));

        let mingw = PlatformDescriptor::new(Os::Windows).with_compiler(Compiler::Gcc, None);
        let plan = Plan::resolve(&recipe, &mingw).unwrap();
        assert_eq!(plan.definition("SFML_USE_STATIC_STD_LIBS"), None);
    }

    #[test]
    fn test_system_packages_only_on_debian_family() {
        let recipe = sfml_recipe().unwrap();

        let ubuntu = PlatformDescriptor::new(Os::Linux).with_distro("ubuntu");
        let plan = Plan::resolve(&recipe, &ubuntu).unwrap();
        assert!(plan.system_packages.update);
        assert_eq!(plan.system_packages.packages.len(), 7);
        assert!(plan.system_packages.packages.contains(&"libudev-dev".to_string()));

        let fedora = PlatformDescriptor::new(Os::Linux).with_distro("fedora");
        let plan = Plan::resolve(&recipe, &fedora).unwrap();
        assert!(plan.system_packages.is_empty());
    }

    #[test]
    fn test_copy_rules_follow_link_mode() {
        let recipe = sfml_recipe().unwrap();

        let static_plan = Plan::resolve(&recipe, &PlatformDescriptor::new(Os::Linux)).unwrap();
        assert_eq!(static_plan.copy_rules.len(), 2);

        let shared = PlatformDescriptor::new(Os::Linux).with_link(LinkMode::Shared);
        let shared_plan = Plan::resolve(&recipe, &shared).unwrap();
        assert_eq!(shared_plan.copy_rules.len(), 4);
    }

    #[test]
    fn test_fingerprint_changes_with_platform() {
        let recipe = sfml_recipe().unwrap();
        let a = Plan::resolve(&recipe, &PlatformDescriptor::new(Os::Linux)).unwrap();
        let b = Plan::resolve(
            &recipe,
            &PlatformDescriptor::new(Os::Linux).with_link(LinkMode::Shared),
        )
        .unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
    }

    #[test]
    fn test_plan_serializes() {
        let recipe = sfml_recipe().unwrap();
        let plan = Plan::resolve(&recipe, &PlatformDescriptor::new(Os::Macos)).unwrap();
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["name"], "SFML");
        assert_eq!(json["findings"][4]["kind"], "conflicting");
    }
}
