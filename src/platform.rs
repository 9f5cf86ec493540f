// src/platform.rs

//! Platform descriptor: the settings a recipe is cooked for
//!
//! A descriptor is supplied once per run and never mutated. Spellings follow
//! the package-manager convention (`Linux`, `Macos`, `Visual Studio`, `MD`,
//! `x86_64`) so recipes and command lines read the same way.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Target operating system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Os {
    Linux,
    Macos,
    Windows,
    #[serde(rename = "FreeBSD")]
    FreeBsd,
}

impl Os {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "Linux",
            Self::Macos => "Macos",
            Self::Windows => "Windows",
            Self::FreeBsd => "FreeBSD",
        }
    }

    /// The OS this binary was compiled for
    pub fn host() -> Self {
        match std::env::consts::OS {
            "macos" => Self::Macos,
            "windows" => Self::Windows,
            "freebsd" => Self::FreeBsd,
            _ => Self::Linux,
        }
    }
}

impl FromStr for Os {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linux" => Ok(Self::Linux),
            "macos" | "darwin" | "osx" => Ok(Self::Macos),
            "windows" => Ok(Self::Windows),
            "freebsd" => Ok(Self::FreeBsd),
            _ => Err(Error::ParseError(format!("Unknown os: {}", s))),
        }
    }
}

/// Compiler family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compiler {
    #[serde(rename = "gcc")]
    Gcc,
    #[serde(rename = "clang")]
    Clang,
    #[serde(rename = "apple-clang")]
    AppleClang,
    #[serde(rename = "Visual Studio")]
    VisualStudio,
}

impl Compiler {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gcc => "gcc",
            Self::Clang => "clang",
            Self::AppleClang => "apple-clang",
            Self::VisualStudio => "Visual Studio",
        }
    }

    /// Usual compiler for an OS when none is given
    pub fn default_for(os: Os) -> Self {
        match os {
            Os::Linux => Self::Gcc,
            Os::Macos => Self::AppleClang,
            Os::Windows => Self::VisualStudio,
            Os::FreeBsd => Self::Clang,
        }
    }
}

impl FromStr for Compiler {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gcc" => Ok(Self::Gcc),
            "clang" => Ok(Self::Clang),
            "apple-clang" | "apple_clang" => Ok(Self::AppleClang),
            "visual studio" | "visual-studio" | "msvc" => Ok(Self::VisualStudio),
            _ => Err(Error::ParseError(format!("Unknown compiler: {}", s))),
        }
    }
}

/// MSVC C runtime selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Runtime {
    MT,
    MTd,
    MD,
    MDd,
}

impl Runtime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MT => "MT",
            Self::MTd => "MTd",
            Self::MD => "MD",
            Self::MDd => "MDd",
        }
    }

    pub fn linkage(&self) -> RuntimeLinkage {
        match self {
            Self::MD | Self::MDd => RuntimeLinkage::Dynamic,
            Self::MT | Self::MTd => RuntimeLinkage::Static,
        }
    }
}

impl FromStr for Runtime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "MT" => Ok(Self::MT),
            "MTd" => Ok(Self::MTd),
            "MD" => Ok(Self::MD),
            "MDd" => Ok(Self::MDd),
            _ => Err(Error::ParseError(format!("Unknown runtime: {}", s))),
        }
    }
}

/// Whether the C runtime is linked statically or dynamically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeLinkage {
    Static,
    Dynamic,
}

/// CMake build type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BuildType {
    Debug,
    #[default]
    Release,
    RelWithDebInfo,
    MinSizeRel,
}

impl BuildType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "Debug",
            Self::Release => "Release",
            Self::RelWithDebInfo => "RelWithDebInfo",
            Self::MinSizeRel => "MinSizeRel",
        }
    }
}

impl FromStr for BuildType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "release" => Ok(Self::Release),
            "relwithdebinfo" => Ok(Self::RelWithDebInfo),
            "minsizerel" => Ok(Self::MinSizeRel),
            _ => Err(Error::ParseError(format!("Unknown build type: {}", s))),
        }
    }
}

/// Target architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    X86,
    X86_64,
    Armv7,
    Armv8,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X86_64 => "x86_64",
            Self::Armv7 => "armv7",
            Self::Armv8 => "armv8",
        }
    }

    pub fn host() -> Self {
        match std::env::consts::ARCH {
            "x86" => Self::X86,
            "arm" => Self::Armv7,
            "aarch64" => Self::Armv8,
            _ => Self::X86_64,
        }
    }
}

impl FromStr for Arch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "x86" | "i686" => Ok(Self::X86),
            "x86_64" | "amd64" => Ok(Self::X86_64),
            "armv7" | "arm" => Ok(Self::Armv7),
            "armv8" | "aarch64" | "arm64" => Ok(Self::Armv8),
            _ => Err(Error::ParseError(format!("Unknown arch: {}", s))),
        }
    }
}

/// Static or shared library output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    #[default]
    Static,
    Shared,
}

impl LinkMode {
    pub fn from_shared(shared: bool) -> Self {
        if shared { Self::Shared } else { Self::Static }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Shared => "shared",
        }
    }
}

/// Everything the recipe branches on, fixed for the whole run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformDescriptor {
    pub os: Os,
    /// Linux distribution id (`ubuntu`, `linuxmint`, ...)
    #[serde(default)]
    pub distro: Option<String>,
    pub compiler: Compiler,
    /// Only meaningful for Visual Studio
    #[serde(default)]
    pub runtime: Option<Runtime>,
    pub build_type: BuildType,
    pub arch: Arch,
    pub link: LinkMode,
}

impl PlatformDescriptor {
    /// Descriptor for a given OS with its usual compiler, a release build
    /// and static linkage
    pub fn new(os: Os) -> Self {
        Self {
            os,
            distro: None,
            compiler: Compiler::default_for(os),
            runtime: None,
            build_type: BuildType::Release,
            arch: Arch::host(),
            link: LinkMode::Static,
        }
    }

    /// Descriptor for the machine running the kitchen
    pub fn host() -> Self {
        let mut platform = Self::new(Os::host());
        if platform.os == Os::Linux {
            platform.distro = detect_distro(Path::new("/etc/os-release"));
        }
        platform
    }

    pub fn with_distro(mut self, distro: impl Into<String>) -> Self {
        self.distro = Some(distro.into());
        self
    }

    pub fn with_link(mut self, link: LinkMode) -> Self {
        self.link = link;
        self
    }

    pub fn with_compiler(mut self, compiler: Compiler, runtime: Option<Runtime>) -> Self {
        self.compiler = compiler;
        self.runtime = runtime;
        self
    }

    pub fn is_shared(&self) -> bool {
        self.link == LinkMode::Shared
    }

    /// Runtime linkage, only defined for Visual Studio builds
    ///
    /// Only an explicit `MD`/`MDd` selects the dynamic runtime; an unset
    /// runtime counts as static.
    pub fn runtime_linkage(&self) -> Option<RuntimeLinkage> {
        if self.compiler != Compiler::VisualStudio {
            return None;
        }
        Some(self.runtime.map_or(RuntimeLinkage::Static, |r| r.linkage()))
    }

    /// Stable text form used for cache keys
    pub fn fingerprint(&self) -> String {
        format!(
            "os:{}\ndistro:{}\ncompiler:{}\nruntime:{}\nbuild_type:{}\narch:{}\nlink:{}\n",
            self.os.as_str(),
            self.distro.as_deref().unwrap_or(""),
            self.compiler.as_str(),
            self.runtime.map(|r| r.as_str()).unwrap_or(""),
            self.build_type.as_str(),
            self.arch.as_str(),
            self.link.as_str()
        )
    }
}

impl fmt::Display for PlatformDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.os.as_str())?;
        if let Some(distro) = &self.distro {
            write!(f, "/{}", distro)?;
        }
        write!(
            f,
            " {} {} {} ({})",
            self.compiler.as_str(),
            self.arch.as_str(),
            self.build_type.as_str(),
            self.link.as_str()
        )
    }
}

/// Read the `ID=` field of an os-release file
pub fn detect_distro(os_release: &Path) -> Option<String> {
    std::fs::read_to_string(os_release)
        .ok()
        .and_then(|content| parse_os_release_id(&content))
}

pub fn parse_os_release_id(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("ID="))
        .map(|id| id.trim().trim_matches('"').to_ascii_lowercase())
        .filter(|id| !id.is_empty())
}
