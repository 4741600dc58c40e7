use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::errors::{LauncherError, Result};
use crate::utils::file::is_safe_relative_path;

/// Unpack a downloaded release archive under `target_dir` and return the
/// directory holding the release.
///
/// Some archives are rooted in a single top-level directory and some are
/// not. A single-rooted archive is extracted in place and its own root is
/// returned; anything else is extracted into a synthetic directory named
/// after the archive file stem.
pub async fn extract_archive(archive_path: &Path, target_dir: &Path) -> Result<PathBuf> {
    let archive_path = archive_path.to_path_buf();
    let target_dir = target_dir.to_path_buf();
    tokio::task::spawn_blocking(move || extract_archive_blocking(&archive_path, &target_dir))
        .await
        .map_err(|err| LauncherError::Archive(err.to_string()))?
}

pub fn extract_archive_blocking(archive_path: &Path, target_dir: &Path) -> Result<PathBuf> {
    if !archive_path.exists() {
        return Err(LauncherError::NotFound(format!(
            "archive missing: {}",
            archive_path.display()
        )));
    }
    std::fs::create_dir_all(target_dir)?;

    let file = File::open(archive_path)?;
    let mut archive =
        ZipArchive::new(file).map_err(|err| LauncherError::Archive(err.to_string()))?;

    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    let extracted_dir = match detect_single_root(&names) {
        Some(root) => {
            unpack_entries(&mut archive, target_dir)?;
            target_dir.join(root)
        }
        None => {
            let synthetic = target_dir.join(archive_stem(archive_path));
            if synthetic.exists() {
                std::fs::remove_dir_all(&synthetic)?;
            }
            std::fs::create_dir_all(&synthetic)?;
            unpack_entries(&mut archive, &synthetic)?;
            synthetic
        }
    };

    tracing::info!(
        "extracted {} -> {}",
        archive_path.display(),
        extracted_dir.display()
    );
    Ok(extracted_dir)
}

/// The archive's sole top-level directory, or `None` when entries live
/// under more than one first segment or directly at the top level.
fn detect_single_root(names: &[String]) -> Option<String> {
    let mut root: Option<String> = None;
    for name in names {
        let normalized = name.replace('\\', "/");
        let trimmed = normalized.trim_start_matches('/');
        if trimmed.is_empty() {
            continue;
        }
        let mut parts = trimmed.split('/');
        let first = parts.next()?;
        if parts.next().is_none() {
            // A bare top-level entry means there is no common root directory.
            return None;
        }
        match root.as_deref() {
            None => root = Some(first.to_string()),
            Some(existing) if existing == first => {}
            Some(_) => return None,
        }
    }
    root
}

fn archive_stem(archive_path: &Path) -> String {
    archive_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "extracted".to_string())
}

fn unpack_entries(archive: &mut ZipArchive<File>, extract_root: &Path) -> Result<()> {
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|err| LauncherError::Archive(err.to_string()))?;
        let name = entry.name().replace('\\', "/");
        if name.is_empty() {
            continue;
        }
        let entry_path = Path::new(&name);
        if !is_safe_relative_path(entry_path) {
            tracing::warn!("skipping unsafe archive entry: {}", name);
            continue;
        }
        let out_path = extract_root.join(entry_path);
        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(&out_path)?;
        io::copy(&mut entry, &mut outfile)?;
    }
    Ok(())
}
