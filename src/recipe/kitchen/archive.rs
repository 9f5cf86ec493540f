// src/recipe/kitchen/archive.rs

//! Archive and source file utilities for the Kitchen

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use zip::read::ZipArchive;

const HTTP_TIMEOUT: Duration = Duration::from_secs(300);
const STREAM_BUFFER_SIZE: usize = 64 * 1024;

fn create_progress_bar(name: &str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_message(name.to_string());
    pb
}

/// Download a file from a URL, returning the number of bytes written
///
/// The body is streamed to `<dest>.tmp` and renamed into place once
/// complete, so an interrupted download never looks cached.
pub fn download_file(url: &str, dest: &Path) -> Result<u64> {
    info!("Downloading {} to {}", url, dest.display());

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| Error::DownloadError(format!("Failed to create HTTP client: {e}")))?;

    let mut response = client
        .get(url)
        .send()
        .map_err(|e| Error::DownloadError(format!("Failed to download {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(Error::DownloadError(format!(
            "HTTP {} from {}",
            response.status(),
            url
        )));
    }

    let display_name = url.rsplit('/').next().unwrap_or(url);
    let pb = create_progress_bar(display_name);
    if let Some(total) = response.content_length() {
        pb.set_length(total);
    }

    let temp_path = dest.with_extension("tmp");
    let mut file = File::create(&temp_path)
        .map_err(|e| Error::IoError(format!("Failed to create file {}: {e}", temp_path.display())))?;

    let mut downloaded: u64 = 0;
    let mut buffer = vec![0u8; STREAM_BUFFER_SIZE];
    loop {
        let n = response
            .read(&mut buffer)
            .map_err(|e| Error::DownloadError(format!("Failed to read response: {e}")))?;
        if n == 0 {
            break;
        }
        file.write_all(&buffer[..n])?;
        downloaded += n as u64;
        pb.set_position(downloaded);
    }
    file.flush()?;
    pb.finish_with_message(format!("{} [done]", display_name));

    fs::rename(&temp_path, dest).map_err(|e| {
        Error::IoError(format!(
            "Failed to move {} to {}: {e}",
            temp_path.display(),
            dest.display()
        ))
    })?;

    info!("Downloaded {} bytes", downloaded);
    Ok(downloaded)
}

/// Extract an archive to a destination directory
///
/// Supports: .zip, .tar.gz, .tgz, .tar
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    let filename = archive
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    fs::create_dir_all(dest)?;
    let file = File::open(archive)
        .map_err(|e| Error::IoError(format!("Failed to open {}: {e}", archive.display())))?;

    if filename.ends_with(".zip") {
        extract_zip(file, dest, archive)
    } else if filename.ends_with(".tar.gz") || filename.ends_with(".tgz") {
        unpack_tar(GzDecoder::new(file), dest, archive)
    } else if filename.ends_with(".tar") {
        unpack_tar(file, dest, archive)
    } else {
        Err(Error::ParseError(format!(
            "Unknown archive format: {}",
            filename
        )))
    }
}

fn unpack_tar<R: Read>(reader: R, dest: &Path, archive: &Path) -> Result<()> {
    let mut tar = tar::Archive::new(reader);
    tar.unpack(dest).map_err(|e| {
        Error::IoError(format!("Failed to extract {}: {e}", archive.display()))
    })?;
    debug!("Extracted {} into {}", archive.display(), dest.display());
    Ok(())
}

fn extract_zip(file: File, dest: &Path, archive_path: &Path) -> Result<()> {
    let mut archive = ZipArchive::new(file).map_err(|e| {
        Error::IoError(format!("Failed to open ZIP {}: {e}", archive_path.display()))
    })?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| {
            Error::IoError(format!(
                "Error reading ZIP index {} in {}: {e}",
                i,
                archive_path.display()
            ))
        })?;

        let Some(relative) = entry.enclosed_name() else {
            return Err(Error::PathTraversal(entry.name().to_string()));
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)
            .map_err(|e| Error::IoError(format!("Failed to create {}: {e}", target.display())))?;
        io::copy(&mut entry, &mut out)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o777))?;
        }
    }

    debug!(
        "Extracted {} entries from {} into {}",
        archive.len(),
        archive_path.display(),
        dest.display()
    );
    Ok(())
}

/// Delete directories relative to `source_dir`, returning the ones removed
///
/// A listed directory that does not exist is skipped.
pub fn remove_dirs(source_dir: &Path, relative: &[String]) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();

    for rel in relative {
        let rel_path = Path::new(rel);
        if rel_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(Error::PathTraversal(rel.clone()));
        }

        let path = source_dir.join(rel_path);
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
            info!("Removed bundled {}", path.display());
            removed.push(path);
        } else {
            debug!("Nothing to remove at {}", path.display());
        }
    }

    Ok(removed)
}
