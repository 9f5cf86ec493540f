// src/commands/info.rs

//! Info command - show link metadata of a package

use anyhow::{Context, Result};
use sfml_kitchen::recipe::kitchen::LinkMetadata;
use std::path::Path;

fn print_list(label: &str, items: &[String]) {
    if items.is_empty() {
        println!("{}: (none)", label);
    } else {
        println!("{}: {}", label, items.join(" "));
    }
}

/// Print the metadata stored in a packaged directory
pub fn cmd_info(package_dir: &str) -> Result<()> {
    let package_dir = Path::new(package_dir);
    let metadata = LinkMetadata::read(package_dir)
        .with_context(|| format!("No package metadata in {}", package_dir.display()))?;

    println!("Package: {}", package_dir.display());
    print_list("  libs", &metadata.libs);
    print_list("  link flags", &metadata.link_flags);
    print_list("  exe link flags", &metadata.exe_link_flags);
    print_list("  include dirs", &metadata.include_dirs);
    print_list("  lib dirs", &metadata.lib_dirs);
    print_list("  bin dirs", &metadata.bin_dirs);

    let duplicated = metadata.duplicated_flags();
    if !duplicated.is_empty() {
        println!("\nNote: link flags repeat libraries: {}", duplicated.join(" "));
    }

    Ok(())
}
