// src/recipe/mod.rs

//! Recipe system for building SFML from source
//!
//! A recipe describes the library, its source archive, platform-conditional
//! dependencies, patches to the upstream build description, CMake settings,
//! artifact copy rules and link metadata for consumers.
//!
//! # Culinary Terminology
//!
//! - **Recipe**: The build specification (like a recipe card)
//! - **Plan**: The recipe with every platform condition evaluated
//! - **Kitchen**: The orchestrator that cooks a plan
//! - **Prep**: Fetch the source archive
//! - **Simmer**: Configure and build with CMake
//! - **Plate**: Copy artifacts and write link metadata
//!
//! # Example Recipe
//!
//! ```toml
//! [package]
//! name = "SFML"
//! version = "2.4.2"
//!
//! [source]
//! archive = "https://github.com/SFML/SFML/archive/%(version)s.zip"
//! remove = ["extlibs"]
//!
//! [[requires]]
//! reference = "openal/1.18.2@bincrafters/stable"
//! when = { os = "Linux" }
//!
//! [[build.definitions]]
//! name = "BUILD_SHARED_LIBS"
//! value = "%(shared)s"
//! ```

pub mod cache;
pub mod format;
pub mod kitchen;
pub mod parser;
pub mod plan;

pub use cache::{BuildCache, CacheConfig, CacheStats};
pub use format::{
    substitute, Condition, CopyEntry, CopyRoot, DependencyRef, PatchEntry, Recipe, RequireEntry,
};
pub use kitchen::{Cook, CookResult, Kitchen, KitchenConfig};
pub use parser::{parse_recipe, parse_recipe_file, sfml_recipe, validate_recipe, SFML_RECIPE};
pub use plan::{LinkRules, PatchDirective, Plan, PlanFinding, SystemPackages};
