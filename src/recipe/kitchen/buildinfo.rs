// src/recipe/kitchen/buildinfo.rs

//! CMake include file describing the resolved dependencies
//!
//! The patched top-level `CMakeLists.txt` includes this file from the binary
//! directory and calls `kitchen_basic_setup()`.

use crate::error::Result;
use crate::recipe::kitchen::deps::ResolvedDependency;
use std::fs;
use std::path::{Path, PathBuf};

pub const BUILDINFO_FILE: &str = "kitchenbuildinfo.cmake";

/// Render the include file contents
pub fn render(deps: &[ResolvedDependency]) -> String {
    let mut out = String::from("# Generated by sfml-kitchen, do not edit\n\n");

    for dep in deps {
        let upper = cmake_ident(&dep.reference.name);
        out.push_str(&format!("set(KITCHEN_{}_ROOT {})\n", upper, quote(&dep.root)));
        out.push_str(&format!(
            "set(KITCHEN_INCLUDE_DIRS_{} {})\n",
            upper,
            join_paths(&dep.include_dirs)
        ));
        out.push_str(&format!(
            "set(KITCHEN_LIB_DIRS_{} {})\n",
            upper,
            join_paths(&dep.lib_dirs)
        ));
        out.push_str(&format!("set(KITCHEN_LIBS_{} {})\n\n", upper, dep.libs.join(" ")));
    }

    let all_includes: Vec<PathBuf> = deps.iter().flat_map(|d| d.include_dirs.clone()).collect();
    let all_lib_dirs: Vec<PathBuf> = deps.iter().flat_map(|d| d.lib_dirs.clone()).collect();
    let all_libs: Vec<&str> = deps
        .iter()
        .flat_map(|d| d.libs.iter().map(String::as_str))
        .collect();
    let roots: Vec<PathBuf> = deps.iter().map(|d| d.root.clone()).collect();

    out.push_str(&format!("set(KITCHEN_INCLUDE_DIRS {})\n", join_paths(&all_includes)));
    out.push_str(&format!("set(KITCHEN_LIB_DIRS {})\n", join_paths(&all_lib_dirs)));
    out.push_str(&format!("set(KITCHEN_LIBS {})\n", all_libs.join(" ")));
    out.push_str(&format!("set(KITCHEN_ROOTS {})\n", join_paths(&roots)));
    out.push_str(
        "\nmacro(kitchen_basic_setup)\n\
         \x20   include_directories(${KITCHEN_INCLUDE_DIRS})\n\
         \x20   link_directories(${KITCHEN_LIB_DIRS})\n\
         \x20   set(CMAKE_PREFIX_PATH ${KITCHEN_ROOTS} ${CMAKE_PREFIX_PATH})\n\
         \x20   set(CMAKE_INCLUDE_PATH ${KITCHEN_INCLUDE_DIRS} ${CMAKE_INCLUDE_PATH})\n\
         \x20   set(CMAKE_LIBRARY_PATH ${KITCHEN_LIB_DIRS} ${CMAKE_LIBRARY_PATH})\n\
         endmacro()\n",
    );

    out
}

/// Write the include file into the CMake binary directory
pub fn write(build_dir: &Path, deps: &[ResolvedDependency]) -> Result<PathBuf> {
    fs::create_dir_all(build_dir)?;
    let path = build_dir.join(BUILDINFO_FILE);
    fs::write(&path, render(deps))?;
    Ok(path)
}

fn cmake_ident(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

fn quote(path: &Path) -> String {
    // CMake wants forward slashes even on Windows
    format!("\"{}\"", path.to_string_lossy().replace('\\', "/"))
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths.iter().map(|p| quote(p)).collect::<Vec<_>>().join(" ")
}
