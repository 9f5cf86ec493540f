// src/recipe/kitchen/patch.rs

//! Textual patching of the extracted build description
//!
//! A directive is verified before it is applied: the search text must be
//! present, and a file that already contains the replacement is left alone
//! so running the patcher twice is harmless.

use crate::error::{Error, Result};
use crate::recipe::plan::PatchDirective;
use std::fs;
use std::path::{Component, Path};
use tracing::{debug, info};

/// What applying a directive did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// Search text replaced this many times
    Applied(usize),
    /// Replacement already present, nothing written
    AlreadyApplied,
}

/// Apply one directive whose replacement is already substituted
pub fn apply_directive(
    source_dir: &Path,
    directive: &PatchDirective,
    replacement: &str,
) -> Result<PatchOutcome> {
    let relative = Path::new(&directive.file);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(Error::PathTraversal(directive.file.clone()));
    }

    let path = source_dir.join(relative);
    let content = fs::read_to_string(&path).map_err(|e| {
        Error::IoError(format!("Failed to read patch target {}: {}", path.display(), e))
    })?;

    // Injections keep their anchor in the replacement, so a patched file
    // still matches the search text.
    if replacement != directive.search && content.contains(replacement) {
        debug!("{} already patched", directive.file);
        return Ok(PatchOutcome::AlreadyApplied);
    }

    let count = content.matches(directive.search.as_str()).count();
    if count == 0 {
        return Err(Error::PatchMismatch {
            file: directive.file.clone(),
            search: directive.search.clone(),
        });
    }

    let patched = content.replace(&directive.search, replacement);
    fs::write(&path, patched)?;
    info!("Patched {} ({} occurrence(s))", directive.file, count);

    Ok(PatchOutcome::Applied(count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TOP_LEVEL: &str = "cmake_minimum_required(VERSION 2.8.3)\nproject(SFML)\nset(VERSION_MAJOR 2)\n";

    fn inject() -> PatchDirective {
        PatchDirective {
            file: "CMakeLists.txt".to_string(),
            search: "project(SFML)".to_string(),
            replace: "project(SFML)\ninclude(${CMAKE_BINARY_DIR}/kitchenbuildinfo.cmake)\nkitchen_basic_setup()\n".to_string(),
        }
    }

    #[test]
    fn test_inject_after_project_line() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("CMakeLists.txt"), TOP_LEVEL).unwrap();

        let d = inject();
        let outcome = apply_directive(tmp.path(), &d, &d.replace).unwrap();
        assert_eq!(outcome, PatchOutcome::Applied(1));

        let content = fs::read_to_string(tmp.path().join("CMakeLists.txt")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[1], "project(SFML)");
        assert_eq!(lines[2], "include(${CMAKE_BINARY_DIR}/kitchenbuildinfo.cmake)");
        assert_eq!(lines[3], "kitchen_basic_setup()");
    }

    #[test]
    fn test_second_application_is_noop() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("CMakeLists.txt"), TOP_LEVEL).unwrap();

        let d = inject();
        apply_directive(tmp.path(), &d, &d.replace).unwrap();
        let once = fs::read_to_string(tmp.path().join("CMakeLists.txt")).unwrap();

        let outcome = apply_directive(tmp.path(), &d, &d.replace).unwrap();
        assert_eq!(outcome, PatchOutcome::AlreadyApplied);
        let twice = fs::read_to_string(tmp.path().join("CMakeLists.txt")).unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice.matches("kitchen_basic_setup()").count(), 1);
    }

    #[test]
    fn test_missing_search_text_fails() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("CMakeLists.txt"), "project(Other)\n").unwrap();

        let d = inject();
        let err = apply_directive(tmp.path(), &d, &d.replace).unwrap_err();
        assert!(matches!(err, Error::PatchMismatch { ref file, .. } if file == "CMakeLists.txt"));
    }

    #[test]
    fn test_missing_file_fails() {
        let tmp = TempDir::new().unwrap();
        let d = inject();
        assert!(apply_directive(tmp.path(), &d, &d.replace).is_err());
    }

    #[test]
    fn test_rejects_escaping_path() {
        let tmp = TempDir::new().unwrap();
        let mut d = inject();
        d.file = "../CMakeLists.txt".to_string();
        assert!(matches!(
            apply_directive(tmp.path(), &d, &d.replace),
            Err(Error::PathTraversal(_))
        ));
    }

    #[test]
    fn test_replaces_every_occurrence() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("src/SFML/Graphics");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("CMakeLists.txt"),
            "sfml_add_library(a EXTERNAL_LIBS ${GRAPHICS_EXT_LIBS})\nsfml_add_library(b EXTERNAL_LIBS ${GRAPHICS_EXT_LIBS})\n",
        )
        .unwrap();

        let d = PatchDirective {
            file: "src/SFML/Graphics/CMakeLists.txt".to_string(),
            search: "EXTERNAL_LIBS ${GRAPHICS_EXT_LIBS}".to_string(),
            replace: "EXTERNAL_LIBS ${KITCHEN_LIBS}".to_string(),
        };
        assert_eq!(
            apply_directive(tmp.path(), &d, &d.replace).unwrap(),
            PatchOutcome::Applied(2)
        );
        let content = fs::read_to_string(dir.join("CMakeLists.txt")).unwrap();
        assert!(!content.contains("GRAPHICS_EXT_LIBS"));
    }
}
