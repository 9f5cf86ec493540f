// src/recipe/kitchen/cook.rs

//! Cook: the actual build execution for a single plan

use crate::error::{Error, Result};
use crate::recipe::format::substitute;
use crate::recipe::plan::Plan;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

use super::archive::{extract_archive, remove_dirs};
use super::buildinfo;
use super::cmake::{CmakeInvocation, StepOutput};
use super::deps::{lookup_variable, ResolvedDependency};
use super::link::LinkMetadata;
use super::package::{package, ArtifactSet};
use super::patch::{apply_directive, PatchOutcome};
use super::Kitchen;

/// Where extraction and the CMake binary tree live
enum WorkDir {
    Temp(TempDir),
    Fixed(PathBuf),
}

impl WorkDir {
    fn path(&self) -> &Path {
        match self {
            WorkDir::Temp(dir) => dir.path(),
            WorkDir::Fixed(path) => path,
        }
    }
}

/// A single cook operation
pub struct Cook<'a> {
    pub(super) kitchen: &'a Kitchen,
    pub(super) plan: &'a Plan,
    pub(super) deps: &'a [ResolvedDependency],
    work_dir: WorkDir,
    /// Extracted `<folder>` inside the work directory
    pub(super) source_dir: PathBuf,
    /// CMake binary directory
    pub(super) build_dir: PathBuf,
    /// Build log accumulator
    pub(super) log: String,
    /// Warnings
    pub(super) warnings: Vec<String>,
}

impl<'a> Cook<'a> {
    pub(super) fn new(
        kitchen: &'a Kitchen,
        plan: &'a Plan,
        deps: &'a [ResolvedDependency],
    ) -> Result<Self> {
        let work_dir = match &kitchen.config.work_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                WorkDir::Fixed(dir.clone())
            }
            None => WorkDir::Temp(TempDir::new().map_err(|e| {
                Error::IoError(format!("Failed to create build directory: {}", e))
            })?),
        };

        let source_dir = work_dir.path().join(&plan.folder);
        let build_dir = work_dir.path().join("build");

        Ok(Self {
            kitchen,
            plan,
            deps,
            work_dir,
            source_dir,
            build_dir,
            log: String::new(),
            warnings: Vec::new(),
        })
    }

    fn local_archive(&self) -> PathBuf {
        self.work_dir.path().join(&self.plan.archive_filename)
    }

    /// Phase 1: Prep - fetch the source archive into the work directory
    pub(super) fn prep(&mut self) -> Result<()> {
        let cached = self.kitchen.fetch_source(self.plan)?;
        fs::copy(&cached, self.local_archive())?;
        self.log_line(&format!("Fetched source: {}", self.plan.archive_url));
        Ok(())
    }

    /// Phase 2a: Unpack sources and strip the bundled libraries
    pub(super) fn unpack(&mut self) -> Result<()> {
        if self.source_dir.exists() {
            return Err(Error::AlreadyExists(format!(
                "source folder {} (remove it or use a fresh work directory)",
                self.source_dir.display()
            )));
        }

        let archive = self.local_archive();
        extract_archive(&archive, self.work_dir.path())?;
        fs::remove_file(&archive)?;

        if !self.source_dir.is_dir() {
            return Err(Error::NotFound(format!(
                "archive did not contain {}",
                self.plan.folder
            )));
        }
        self.log_line(&format!("Extracted source to {}", self.source_dir.display()));

        for removed in remove_dirs(&self.source_dir, &self.plan.remove)? {
            self.log_line(&format!("Removed {}", removed.display()));
        }

        Ok(())
    }

    /// Phase 2b: Apply patch directives in order
    pub(super) fn patch(&mut self) -> Result<()> {
        let (plan, deps) = (self.plan, self.deps);
        for directive in &plan.patches {
            let replacement = substitute(&directive.replace, |key| {
                plan.variable(key).or_else(|| lookup_variable(deps, key))
            })?;

            match apply_directive(&self.source_dir, directive, &replacement)? {
                PatchOutcome::Applied(count) => {
                    self.log_line(&format!("Patched {} ({} occurrence(s))", directive.file, count))
                }
                PatchOutcome::AlreadyApplied => {
                    self.log_line(&format!("Patch for {} already applied", directive.file))
                }
            }
        }

        Ok(())
    }

    /// Phase 3: Simmer - generate build info, configure and build
    pub(super) fn simmer(&mut self) -> Result<()> {
        let buildinfo = buildinfo::write(&self.build_dir, self.deps)?;
        debug!("Wrote {}", buildinfo.display());

        let invocation = CmakeInvocation::from_plan(
            self.plan,
            &self.source_dir,
            &self.build_dir,
            self.kitchen.config.jobs,
        );

        let tool = self.kitchen.build_tool.clone();
        let output = tool.configure(&invocation)?;
        self.log_build_output("configure", &output);

        let output = tool.build(&invocation)?;
        self.log_build_output("build", &output);

        Ok(())
    }

    /// Phase 4: Plate - copy artifacts and write link metadata
    pub(super) fn plate(&mut self, package_dir: &Path) -> Result<(ArtifactSet, LinkMetadata)> {
        let artifacts = package(
            &self.plan.copy_rules,
            self.plan.platform.link,
            &self.source_dir,
            &self.build_dir,
            package_dir,
        )?;

        let metadata = LinkMetadata::emit(package_dir, &self.plan.link)?;
        let duplicated = metadata.duplicated_flags();
        if !duplicated.is_empty() {
            self.warnings.push(format!(
                "Link flags duplicate library names: {}",
                duplicated.join(" ")
            ));
        }
        metadata.write(package_dir)?;

        self.log_line(&format!(
            "Packaged {} files into {}",
            artifacts.len(),
            package_dir.display()
        ));
        info!("Cooked: {} ({} files)", package_dir.display(), artifacts.len());

        Ok((artifacts, metadata))
    }

    /// Keep the temporary work directory around after the cook
    pub(super) fn finish(self) -> (String, Vec<String>) {
        if self.kitchen.config.keep_builddir
            && let WorkDir::Temp(dir) = self.work_dir
        {
            let kept = dir.into_path();
            warn!("Keeping build directory {}", kept.display());
        }
        (self.log, self.warnings)
    }

    fn log_line(&mut self, line: &str) {
        self.log.push_str(line);
        self.log.push('\n');
    }

    /// Log build step output (stdout/stderr) with a phase header
    fn log_build_output(&mut self, phase: &str, output: &StepOutput) {
        self.log_line(&format!("=== {} ===", phase));
        if !output.stdout.is_empty() {
            self.log.push_str(&output.stdout);
            self.log.push('\n');
        }
        if !output.stderr.is_empty() {
            self.log.push_str(&output.stderr);
            self.log.push('\n');
        }
    }
}
