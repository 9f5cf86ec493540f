// src/recipe/kitchen/cmake.rs

//! CMake invocation

use crate::error::{Error, Result};
use crate::platform::BuildType;
use crate::recipe::plan::Plan;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Everything needed to configure and build one tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmakeInvocation {
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    pub build_type: BuildType,
    pub generator: Option<String>,
    /// `-DNAME=VALUE` pairs in order
    pub definitions: Vec<(String, String)>,
    pub verbose: bool,
    /// Parallel job count, `None` for a serial build
    pub jobs: Option<u32>,
}

impl CmakeInvocation {
    pub fn from_plan(plan: &Plan, source_dir: &Path, build_dir: &Path, jobs: u32) -> Self {
        Self {
            source_dir: source_dir.to_path_buf(),
            build_dir: build_dir.to_path_buf(),
            build_type: plan.build_type,
            generator: plan.generator.clone(),
            definitions: plan.definitions.clone(),
            verbose: plan.verbose,
            jobs: plan.parallel.then_some(jobs.max(1)),
        }
    }

    /// Arguments for the configure step, run from the build directory
    pub fn configure_args(&self) -> Vec<String> {
        let mut args = vec![self.source_dir.to_string_lossy().to_string()];

        if let Some(generator) = &self.generator {
            args.push("-G".to_string());
            args.push(generator.clone());
        }

        args.push(format!("-DCMAKE_BUILD_TYPE={}", self.build_type.as_str()));
        if self.verbose {
            args.push("-DCMAKE_VERBOSE_MAKEFILE=ON".to_string());
        }
        for (name, value) in &self.definitions {
            args.push(format!("-D{}={}", name, value));
        }

        args
    }

    /// Arguments for the build step
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "--build".to_string(),
            self.build_dir.to_string_lossy().to_string(),
            "--config".to_string(),
            self.build_type.as_str().to_string(),
        ];
        if let Some(jobs) = self.jobs {
            args.push("--parallel".to_string());
            args.push(jobs.to_string());
        }
        args
    }
}

/// Captured output of a toolchain step
#[derive(Debug, Clone, Default)]
pub struct StepOutput {
    pub stdout: String,
    pub stderr: String,
}

/// The external build system
pub trait BuildTool: Send + Sync {
    fn configure(&self, invocation: &CmakeInvocation) -> Result<StepOutput>;
    fn build(&self, invocation: &CmakeInvocation) -> Result<StepOutput>;
}

/// Runs the `cmake` executable
pub struct CmakeTool {
    program: PathBuf,
}

impl CmakeTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Find `cmake` on `PATH`
    pub fn locate() -> Result<Self> {
        let program = which::which("cmake").map_err(|_| Error::ToolNotFound("cmake".to_string()))?;
        debug!("Using cmake at {}", program.display());
        Ok(Self::new(program))
    }

    fn run(&self, step: &str, args: &[String], cwd: &Path) -> Result<StepOutput> {
        info!("Running cmake {} step", step);
        debug!("cmake {}", args.join(" "));

        let output = Command::new(&self.program)
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|e| Error::IoError(format!("Failed to run cmake {}: {}", step, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(Error::BuildFailed {
                step: format!("cmake {}", step),
                code: output.status.code(),
                stderr,
            });
        }

        Ok(StepOutput { stdout, stderr })
    }
}

impl BuildTool for CmakeTool {
    fn configure(&self, invocation: &CmakeInvocation) -> Result<StepOutput> {
        std::fs::create_dir_all(&invocation.build_dir)?;
        self.run("configure", &invocation.configure_args(), &invocation.build_dir)
    }

    fn build(&self, invocation: &CmakeInvocation) -> Result<StepOutput> {
        self.run("build", &invocation.build_args(), &invocation.build_dir)
    }
}
