// src/recipe/parser.rs

//! Recipe file parsing

use crate::error::{Error, Result};
use crate::hash::Checksum;
use crate::recipe::format::Recipe;
use std::collections::HashSet;
use std::path::Path;

/// The SFML recipe shipped with the binary
pub const SFML_RECIPE: &str = include_str!("../../recipes/sfml.toml");

/// Parse a recipe from a TOML string
pub fn parse_recipe(content: &str) -> Result<Recipe> {
    toml::from_str(content).map_err(|e| Error::ParseError(format!("Invalid recipe: {}", e)))
}

/// Parse a recipe from a file
pub fn parse_recipe_file(path: &Path) -> Result<Recipe> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::IoError(format!("Failed to read recipe file: {}", e)))?;

    parse_recipe(&content)
}

/// Parse the embedded SFML recipe
pub fn sfml_recipe() -> Result<Recipe> {
    parse_recipe(SFML_RECIPE)
}

/// Validate a recipe for completeness and correctness
///
/// Hard errors are returned as `Err`; soft issues come back as warnings.
pub fn validate_recipe(recipe: &Recipe) -> Result<Vec<String>> {
    let mut warnings = Vec::new();

    if recipe.package.name.is_empty() {
        return Err(Error::ParseError("Recipe package name cannot be empty".to_string()));
    }
    if recipe.package.version.is_empty() {
        return Err(Error::ParseError("Recipe package version cannot be empty".to_string()));
    }

    let url = recipe.archive_url()?;
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(Error::ParseError(format!("Archive URL is not http(s): {}", url)));
    }

    match &recipe.source.checksum {
        Some(checksum) => {
            Checksum::parse(checksum)?;
        }
        None => warnings.push("Source archive has no checksum".to_string()),
    }

    for dir in &recipe.source.remove {
        if dir.is_empty() || Path::new(dir).is_absolute() || dir.split('/').any(|c| c == "..") {
            return Err(Error::PathTraversal(format!("source.remove entry: {}", dir)));
        }
    }

    for patch in &recipe.patches {
        if patch.search.is_empty() {
            return Err(Error::ParseError(format!(
                "Patch for {} has an empty search text",
                patch.file
            )));
        }
        if Path::new(&patch.file).is_absolute() || patch.file.split('/').any(|c| c == "..") {
            return Err(Error::PathTraversal(format!("patch target: {}", patch.file)));
        }
    }

    let mut seen = HashSet::new();
    for entry in &recipe.requires {
        if entry.when.is_none() && !seen.insert(entry.reference.name.as_str()) {
            warnings.push(format!(
                "Dependency {} is declared more than once unconditionally",
                entry.reference.name
            ));
        }
    }

    if recipe.package.license.is_none() {
        warnings.push("Missing package license".to_string());
    }
    if recipe.copy_rules.is_empty() {
        warnings.push("No copy rules, the package will be empty".to_string());
    }

    Ok(warnings)
}
