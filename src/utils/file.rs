use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path};

/// Write `contents` to `path` through a sibling temp file and rename, so a
/// crash mid-write never leaves a truncated document behind.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let temp_path = path.with_extension("tmp");
    if let Some(parent) = temp_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(&temp_path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);
    fs::rename(temp_path, path)?;
    Ok(())
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    if bytes >= GB {
        format!("{:.2}GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2}MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2}KB", bytes as f64 / KB as f64)
    } else {
        format!("{}B", bytes)
    }
}

/// Reject archive entry paths that could escape the extraction root.
pub fn is_safe_relative_path(path: &Path) -> bool {
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::ParentDir => return false,
            _ => {}
        }
    }
    true
}
