// src/recipe/kitchen/link.rs

//! Consumer-facing link metadata

use crate::error::Result;
use crate::recipe::plan::LinkRules;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// File name written next to `include/` and `lib/`
pub const METADATA_FILE: &str = "kitchen-info.json";

/// Everything a consumer needs to link against the package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkMetadata {
    /// Libraries to link, package libraries first, then system libraries
    pub libs: Vec<String>,
    /// Raw linker flag strings
    #[serde(default)]
    pub link_flags: Vec<String>,
    /// Executable link flags such as `-framework Cocoa`
    #[serde(default)]
    pub exe_link_flags: Vec<String>,
    /// Include directories relative to the package
    #[serde(default)]
    pub include_dirs: Vec<String>,
    /// Library directories relative to the package
    #[serde(default)]
    pub lib_dirs: Vec<String>,
    /// Runtime binary directories relative to the package
    #[serde(default)]
    pub bin_dirs: Vec<String>,
}

impl LinkMetadata {
    /// Build metadata from a packaged directory and the plan's link rules
    pub fn emit(package_dir: &Path, rules: &LinkRules) -> Result<Self> {
        let mut libs = collect_libs(&package_dir.join("lib"))?;
        debug!("Collected package libraries: {}", libs.join(", "));

        libs.extend(rules.system_libs.iter().cloned());

        let metadata = Self {
            libs,
            link_flags: rules.raw_flags.clone(),
            exe_link_flags: rules.exe_flags.clone(),
            include_dirs: vec!["include".to_string()],
            lib_dirs: vec!["lib".to_string()],
            bin_dirs: vec!["bin".to_string()],
        };

        let duplicated = metadata.duplicated_flags();
        if !duplicated.is_empty() {
            warn!(
                "Raw link flags repeat structured libraries: {}",
                duplicated.join(", ")
            );
        }

        Ok(metadata)
    }

    /// `-l` flags in `link_flags` that name a library already in `libs`
    ///
    /// Upstream emits the X11/GL stack both ways; this makes the overlap
    /// visible instead of guessing which form consumers rely on.
    pub fn duplicated_flags(&self) -> Vec<String> {
        self.link_flags
            .iter()
            .flat_map(|flags| flags.split_whitespace())
            .filter_map(|flag| flag.strip_prefix("-l"))
            .filter(|name| self.libs.iter().any(|l| l == name))
            .map(|name| format!("-l{}", name))
            .collect()
    }

    pub fn write(&self, package_dir: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(package_dir.join(METADATA_FILE), json)?;
        Ok(())
    }

    pub fn read(package_dir: &Path) -> Result<Self> {
        let content = fs::read_to_string(package_dir.join(METADATA_FILE))?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Library names found directly inside `lib_dir`
///
/// Only unversioned `.so`, `.a`, `.lib` and `.dylib` files count. The `lib`
/// prefix is stripped except for MSVC `.lib` files. Sorted, no duplicates.
pub fn collect_libs(lib_dir: &Path) -> Result<Vec<String>> {
    if !lib_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut names = BTreeSet::new();
    for entry in fs::read_dir(lib_dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        let Some((stem, ext)) = file_name.rsplit_once('.') else {
            continue;
        };
        if !matches!(ext, "so" | "a" | "lib" | "dylib") {
            continue;
        }
        // libfoo.2.4.dylib is a versioned alias of libfoo.dylib
        if stem
            .rsplit_once('.')
            .is_some_and(|(_, last)| !last.is_empty() && last.chars().all(|c| c.is_ascii_digit()))
        {
            continue;
        }

        let name = match (ext, stem.strip_prefix("lib")) {
            ("lib", _) => stem,
            (_, Some(stripped)) if !stripped.is_empty() => stripped,
            _ => stem,
        };
        names.insert(name.to_string());
    }

    Ok(names.into_iter().collect())
}
