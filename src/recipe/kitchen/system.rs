// src/recipe/kitchen/system.rs

//! OS package installation before building

use crate::error::{Error, Result};
use std::process::Command;
use tracing::{debug, info};

/// Trait for the OS package manager
///
/// Keeps the Kitchen decoupled from any particular distro tooling.
pub trait SystemPackageTool: Send + Sync {
    /// Refresh the package index
    fn update(&self) -> Result<()>;

    /// Return the packages that are not installed yet
    fn check_missing(&self, packages: &[String]) -> Result<Vec<String>>;

    /// Install packages, returning the ones actually installed
    fn install(&self, packages: &[String]) -> Result<Vec<String>>;
}

/// Tool that installs nothing, for pre-provisioned build hosts
pub struct NoopPackageTool;

impl SystemPackageTool for NoopPackageTool {
    fn update(&self) -> Result<()> {
        Ok(())
    }

    fn check_missing(&self, _packages: &[String]) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn install(&self, _packages: &[String]) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// apt-get based tool for the Debian family (ubuntu, linuxmint)
pub struct AptPackageTool {
    /// Prefix commands with sudo when not running as root
    pub use_sudo: bool,
}

impl AptPackageTool {
    pub fn new() -> Self {
        let use_sudo = which::which("sudo").is_ok() && !running_as_root();
        Self { use_sudo }
    }

    fn apt_get(&self, args: &[&str]) -> Result<()> {
        let mut cmd = if self.use_sudo {
            let mut c = Command::new("sudo");
            c.arg("-E").arg("apt-get");
            c
        } else {
            Command::new("apt-get")
        };
        cmd.args(args).env("DEBIAN_FRONTEND", "noninteractive");

        debug!("Running apt-get {}", args.join(" "));
        let output = cmd.output().map_err(|e| {
            Error::SystemPackageError(format!("failed to run apt-get: {}", e))
        })?;

        if !output.status.success() {
            return Err(Error::SystemPackageError(format!(
                "apt-get {} exited with {:?}: {}",
                args.first().copied().unwrap_or_default(),
                output.status.code(),
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        Ok(())
    }
}

impl Default for AptPackageTool {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemPackageTool for AptPackageTool {
    fn update(&self) -> Result<()> {
        info!("Updating apt package index");
        self.apt_get(&["update"])
    }

    fn check_missing(&self, packages: &[String]) -> Result<Vec<String>> {
        let mut missing = Vec::new();
        for package in packages {
            let installed = Command::new("dpkg-query")
                .args(["-W", "-f=${Status}", package])
                .output()
                .map(|o| {
                    o.status.success()
                        && String::from_utf8_lossy(&o.stdout).contains("install ok installed")
                })
                .unwrap_or(false);
            if !installed {
                missing.push(package.clone());
            }
        }
        Ok(missing)
    }

    fn install(&self, packages: &[String]) -> Result<Vec<String>> {
        if packages.is_empty() {
            return Ok(Vec::new());
        }
        let mut args = vec!["install", "-y", "--no-install-recommends"];
        args.extend(packages.iter().map(String::as_str));
        self.apt_get(&args)?;
        Ok(packages.to_vec())
    }
}

#[cfg(unix)]
fn running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(not(unix))]
fn running_as_root() -> bool {
    false
}

/// Result of system package installation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SystemPackagesResult {
    /// Packages that were already present
    pub already_installed: Vec<String>,
    /// Packages installed by this run
    pub newly_installed: Vec<String>,
}
