// src/commands/cache.rs

//! Cache commands - inspect and clear the build cache

use anyhow::{Context, Result};
use sfml_kitchen::recipe::{BuildCache, KitchenConfig};
use std::path::PathBuf;
use std::time::SystemTime;

fn open_cache(cache_dir: Option<&str>) -> Result<BuildCache> {
    let dir = cache_dir
        .map(PathBuf::from)
        .unwrap_or_else(|| KitchenConfig::default().cache_dir);
    BuildCache::at(&dir).with_context(|| format!("Failed to open build cache: {}", dir.display()))
}

fn format_size(bytes: u64) -> String {
    const MB: f64 = 1024.0 * 1024.0;
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / MB)
    } else {
        format!("{} bytes", bytes)
    }
}

fn format_age(time: Option<SystemTime>) -> String {
    match time.and_then(|t| SystemTime::now().duration_since(t).ok()) {
        Some(age) if age.as_secs() >= 86400 => format!("{} days ago", age.as_secs() / 86400),
        Some(age) if age.as_secs() >= 3600 => format!("{} hours ago", age.as_secs() / 3600),
        Some(age) => format!("{} minutes ago", age.as_secs() / 60),
        None => "-".to_string(),
    }
}

/// Show build cache statistics
pub fn cmd_cache_stats(cache_dir: Option<&str>) -> Result<()> {
    let cache = open_cache(cache_dir)?;
    let stats = cache.stats().context("Failed to read cache statistics")?;

    println!("Build cache:");
    println!("  Entries: {}", stats.entry_count);
    println!(
        "  Size: {} of {} ({:.1}%)",
        format_size(stats.total_size),
        format_size(stats.max_size),
        stats.utilization()
    );
    println!("  Oldest: {}", format_age(stats.oldest));
    println!("  Newest: {}", format_age(stats.newest));

    Ok(())
}

/// Remove every cached build
pub fn cmd_cache_clear(cache_dir: Option<&str>) -> Result<()> {
    let cache = open_cache(cache_dir)?;
    let removed = cache.clear().context("Failed to clear build cache")?;
    println!("Removed {} cached build(s)", removed);
    Ok(())
}
