// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use sfml_kitchen::platform::{LinkMode, Os, PlatformDescriptor};
use sfml_kitchen::recipe::kitchen::deps::write_prefix_package;
use sfml_kitchen::recipe::kitchen::{
    BuildTool, CmakeInvocation, PrefixProvider, StepOutput, SystemPackageTool,
};
use sfml_kitchen::recipe::{sfml_recipe, BuildCache, Kitchen, KitchenConfig, Plan};
use sfml_kitchen::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

pub const SFML_MODULES: [&str; 5] = ["system", "window", "graphics", "audio", "network"];

/// Stand-in for CMake that records invocations and drops plausible
/// libraries into the binary directory.
pub struct FakeCmake {
    pub os: Os,
    pub invocations: Mutex<Vec<CmakeInvocation>>,
    /// When set, the build step fails with this text on stderr
    pub fail_with: Option<String>,
}

impl FakeCmake {
    pub fn new(os: Os) -> Self {
        Self {
            os,
            invocations: Mutex::new(Vec::new()),
            fail_with: None,
        }
    }

    pub fn failing(os: Os, stderr: &str) -> Self {
        Self {
            fail_with: Some(stderr.to_string()),
            ..Self::new(os)
        }
    }

    pub fn configure_count(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }

    fn shared(invocation: &CmakeInvocation) -> bool {
        invocation
            .definitions
            .iter()
            .any(|(k, v)| k == "BUILD_SHARED_LIBS" && v == "ON")
    }

    fn write_libraries(&self, invocation: &CmakeInvocation) -> std::io::Result<()> {
        let lib = invocation.build_dir.join("lib");
        let bin = invocation.build_dir.join("bin");
        fs::create_dir_all(&lib)?;
        fs::create_dir_all(&bin)?;

        let shared = Self::shared(invocation);
        for module in SFML_MODULES {
            match (self.os, shared) {
                (Os::Windows, false) => {
                    fs::write(lib.join(format!("sfml-{}-s.lib", module)), b"lib")?;
                }
                (Os::Windows, true) => {
                    fs::write(lib.join(format!("sfml-{}.lib", module)), b"implib")?;
                    fs::write(bin.join(format!("sfml-{}-2.dll", module)), b"dll")?;
                }
                (_, false) => {
                    fs::write(lib.join(format!("libsfml-{}-s.a", module)), b"archive")?;
                }
                (Os::Macos, true) => {
                    let real = format!("libsfml-{}.2.4.2.dylib", module);
                    fs::write(lib.join(&real), b"dylib")?;
                    symlink(&real, &lib.join(format!("libsfml-{}.2.4.dylib", module)))?;
                    symlink(&real, &lib.join(format!("libsfml-{}.dylib", module)))?;
                }
                (_, true) => {
                    let real = format!("libsfml-{}.so.2.4.2", module);
                    let soname = format!("libsfml-{}.so.2.4", module);
                    fs::write(lib.join(&real), b"elf")?;
                    symlink(&real, &lib.join(&soname))?;
                    symlink(&soname, &lib.join(format!("libsfml-{}.so", module)))?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(unix)]
fn symlink(target: &str, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn symlink(target: &str, link: &Path) -> std::io::Result<()> {
    let dir = link.parent().unwrap_or(Path::new("."));
    fs::copy(dir.join(target), link).map(|_| ())
}

impl BuildTool for FakeCmake {
    fn configure(&self, invocation: &CmakeInvocation) -> Result<StepOutput> {
        // The patched top-level file must pick up the generated build info
        let top = fs::read_to_string(invocation.source_dir.join("CMakeLists.txt"))?;
        if !top.contains("kitchen_basic_setup()") {
            return Err(Error::BuildFailed {
                step: "cmake configure".to_string(),
                code: Some(1),
                stderr: "kitchen_basic_setup() not called".to_string(),
            });
        }
        if !invocation.build_dir.join("kitchenbuildinfo.cmake").exists() {
            return Err(Error::BuildFailed {
                step: "cmake configure".to_string(),
                code: Some(1),
                stderr: "kitchenbuildinfo.cmake missing".to_string(),
            });
        }

        self.invocations.lock().unwrap().push(invocation.clone());
        Ok(StepOutput {
            stdout: "-- Configuring done\n-- Generating done\n".to_string(),
            stderr: String::new(),
        })
    }

    fn build(&self, invocation: &CmakeInvocation) -> Result<StepOutput> {
        if let Some(stderr) = &self.fail_with {
            return Err(Error::BuildFailed {
                step: "cmake build".to_string(),
                code: Some(2),
                stderr: stderr.clone(),
            });
        }

        self.write_libraries(invocation)?;
        Ok(StepOutput {
            stdout: "[100%] Built target sfml-audio\n".to_string(),
            stderr: String::new(),
        })
    }
}

/// System package tool backed by an in-memory installed set
pub struct FakePackageTool {
    pub installed: Mutex<Vec<String>>,
    pub updates: Mutex<u32>,
}

impl FakePackageTool {
    pub fn new(installed: &[&str]) -> Self {
        Self {
            installed: Mutex::new(installed.iter().map(|s| s.to_string()).collect()),
            updates: Mutex::new(0),
        }
    }
}

impl SystemPackageTool for FakePackageTool {
    fn update(&self) -> Result<()> {
        *self.updates.lock().unwrap() += 1;
        Ok(())
    }

    fn check_missing(&self, packages: &[String]) -> Result<Vec<String>> {
        let installed = self.installed.lock().unwrap();
        Ok(packages
            .iter()
            .filter(|p| !installed.contains(p))
            .cloned()
            .collect())
    }

    fn install(&self, packages: &[String]) -> Result<Vec<String>> {
        let mut installed = self.installed.lock().unwrap();
        installed.extend(packages.iter().cloned());
        Ok(packages.to_vec())
    }
}

/// Top-level CMakeLists.txt of the fixture archive
pub const TOP_CMAKELISTS: &str = "cmake_minimum_required(VERSION 2.8.3)\n\
project(SFML)\n\
set(VERSION_MAJOR 2)\n";

/// Write a zip shaped like the upstream SFML release archive
///
/// `top_cmakelists` lets a test break the patch anchor.
pub fn write_sfml_zip(path: &Path, folder: &str, top_cmakelists: &str) {
    let file = fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    let files: Vec<(String, &str)> = vec![
        (format!("{}/CMakeLists.txt", folder), top_cmakelists),
        (
            format!("{}/src/SFML/Graphics/CMakeLists.txt", folder),
            "sfml_add_library(sfml-graphics\n    EXTERNAL_LIBS ${GRAPHICS_EXT_LIBS})\n",
        ),
        (
            format!("{}/src/SFML/Audio/CMakeLists.txt", folder),
            "find_package(OpenAL REQUIRED)\nfind_package(FLAC REQUIRED)\n",
        ),
        (
            format!("{}/include/SFML/Graphics.hpp", folder),
            "#include <SFML/System.hpp>\n",
        ),
        (
            format!("{}/include/SFML/System/Vector2.inl", folder),
            "// inline\n",
        ),
        (
            format!("{}/include/SFML/System/Export.h", folder),
            "// not copied\n",
        ),
        (
            format!("{}/extlibs/headers/stb_image/stb_image.h", folder),
            "// bundled\n",
        ),
    ];

    for (name, content) in files {
        zip.start_file(name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

/// Library names a fake dependency package provides
pub fn dependency_libs(name: &str) -> Vec<&'static str> {
    match name {
        "flac" => vec!["FLAC", "FLAC++"],
        "vorbis" => vec!["vorbisfile", "vorbisenc", "vorbis"],
        "libjpeg" => vec!["jpeg"],
        "freetype" => vec!["freetype"],
        "openal" => vec!["openal"],
        _ => Vec::new(),
    }
}

/// Populate a dependency prefix with every closure entry of `plan`
pub fn write_deps_prefix(root: &Path, plan: &Plan) {
    for reference in &plan.dependencies {
        let libs = dependency_libs(&reference.name);
        write_prefix_package(root, reference, &libs).unwrap();
    }
}

/// A scratch kitchen with a seeded source cache and dependency prefix
pub struct TestKitchen {
    pub temp_dir: TempDir,
    pub config: KitchenConfig,
    pub deps_root: PathBuf,
}

impl TestKitchen {
    /// Prepare everything `plan` needs so no network access happens
    pub fn for_plan(plan: &Plan) -> Self {
        Self::with_sources(plan, TOP_CMAKELISTS)
    }

    pub fn with_sources(plan: &Plan, top_cmakelists: &str) -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = KitchenConfig::isolated(temp_dir.path());

        fs::create_dir_all(&config.source_cache).unwrap();
        write_sfml_zip(
            &config.source_cache.join(&plan.archive_filename),
            &plan.folder,
            top_cmakelists,
        );

        let deps_root = temp_dir.path().join("deps");
        write_deps_prefix(&deps_root, plan);

        Self {
            temp_dir,
            config,
            deps_root,
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn work_dir(&self) -> PathBuf {
        self.path().join("work")
    }

    pub fn output_dir(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }

    pub fn kitchen(&self, build_tool: Arc<FakeCmake>) -> Kitchen {
        self.kitchen_with_deps(build_tool, &self.deps_root)
    }

    pub fn kitchen_with_deps(&self, build_tool: Arc<FakeCmake>, deps_root: &Path) -> Kitchen {
        Kitchen::new(
            self.config.clone(),
            Arc::new(PrefixProvider::new(deps_root)),
            build_tool,
        )
    }

    pub fn cached_kitchen(&self, build_tool: Arc<FakeCmake>) -> Kitchen {
        let cache = BuildCache::at(&self.config.cache_dir).unwrap();
        self.kitchen(build_tool).with_cache(cache)
    }
}

/// Resolve the bundled recipe for a platform
pub fn plan_for(platform: &PlatformDescriptor) -> Plan {
    Plan::resolve(&sfml_recipe().unwrap(), platform).unwrap()
}

pub fn ubuntu_static() -> PlatformDescriptor {
    PlatformDescriptor::new(Os::Linux).with_distro("ubuntu")
}

pub fn ubuntu_shared() -> PlatformDescriptor {
    ubuntu_static().with_link(LinkMode::Shared)
}

pub fn macos_shared() -> PlatformDescriptor {
    PlatformDescriptor::new(Os::Macos).with_link(LinkMode::Shared)
}
