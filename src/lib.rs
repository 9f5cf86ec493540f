// src/lib.rs

//! SFML Kitchen
//!
//! Builds the SFML multimedia library from source against externally
//! resolved dependencies and packages it for consumers.
//!
//! # Architecture
//!
//! - Recipe: declarative TOML with platform conditions on every entry
//! - Plan: the recipe resolved once for a platform descriptor
//! - Kitchen: fetch, patch, build with CMake, package, emit link metadata
//! - Build cache: packaged output keyed by a hash of the plan

mod error;
pub mod hash;
pub mod platform;
pub mod recipe;

pub use error::{Error, Result};
pub use hash::{Checksum, HashAlgorithm, Hasher};
pub use platform::{Compiler, LinkMode, Os, PlatformDescriptor};
pub use recipe::{BuildCache, CookResult, Kitchen, KitchenConfig, Plan, Recipe};
