use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, watch};

use crate::errors::{LauncherError, Result};
use crate::services::chunk_downloader::{DownloadControl, TransferProgress};

/// Sequential fallback used when the server cannot serve byte ranges or
/// multi-threaded transfers are disabled.
///
/// Streams the body into `<dest>.part`, then renames it over the
/// destination. Cancel or error removes the partial file.
pub(crate) async fn download_single_stream(
    client: &reqwest::Client,
    url: &str,
    dest_path: &Path,
    control: watch::Receiver<DownloadControl>,
    progress_tx: mpsc::Sender<TransferProgress>,
) -> Result<PathBuf> {
    let part_path = part_path_for(dest_path);
    if let Some(parent) = part_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    match stream_to_part(client, url, &part_path, control, progress_tx).await {
        Ok(()) => {
            if dest_path.exists() {
                let _ = tokio::fs::remove_file(dest_path).await;
            }
            tokio::fs::rename(&part_path, dest_path).await?;
            tracing::info!("single-stream download complete: {}", dest_path.display());
            Ok(dest_path.to_path_buf())
        }
        Err(error) => {
            let _ = tokio::fs::remove_file(&part_path).await;
            Err(error)
        }
    }
}

pub(crate) fn part_path_for(dest_path: &Path) -> PathBuf {
    let mut name = dest_path
        .file_name()
        .map(|value| value.to_os_string())
        .unwrap_or_else(|| "download".into());
    name.push(".part");
    dest_path.with_file_name(name)
}

async fn stream_to_part(
    client: &reqwest::Client,
    url: &str,
    part_path: &Path,
    mut control: watch::Receiver<DownloadControl>,
    progress_tx: mpsc::Sender<TransferProgress>,
) -> Result<()> {
    if *control.borrow() == DownloadControl::Cancelled {
        return Err(LauncherError::Cancelled);
    }

    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(LauncherError::Http(format!(
            "{} -> HTTP {}",
            url,
            response.status()
        )));
    }

    // Unknown lengths are tolerated here; progress just reports total 0.
    let total = response
        .headers()
        .get(reqwest::header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(0);

    let mut stream = response.bytes_stream();
    let mut file = tokio::fs::File::create(part_path).await?;
    let mut downloaded: u64 = 0;

    loop {
        tokio::select! {
            biased;
            changed = control.changed() => {
                if changed.is_err() || *control.borrow() == DownloadControl::Cancelled {
                    return Err(LauncherError::Cancelled);
                }
            }
            next = stream.next() => {
                let Some(next) = next else { break; };
                let bytes = next?;
                file.write_all(&bytes).await?;
                downloaded = downloaded.saturating_add(bytes.len() as u64);
                let _ = progress_tx.send(TransferProgress { downloaded, total }).await;
            }
        }
    }

    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_path_appends_suffix() {
        let dest = Path::new("/tmp/downloads/blender-4.1.1-windows-x64.zip");
        assert_eq!(
            part_path_for(dest),
            Path::new("/tmp/downloads/blender-4.1.1-windows-x64.zip.part")
        );
    }

    #[tokio::test]
    async fn cancelled_before_start_cleans_part_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let dest = dir.path().join("archive.zip");
        let (control_tx, control_rx) = watch::channel(DownloadControl::Cancelled);
        let (progress_tx, _progress_rx) = mpsc::channel(8);

        let client = reqwest::Client::new();
        let result = download_single_stream(
            &client,
            "http://127.0.0.1:9/archive.zip",
            &dest,
            control_rx,
            progress_tx,
        )
        .await;

        drop(control_tx);
        assert!(matches!(result, Err(LauncherError::Cancelled)));
        assert!(!dest.exists());
        assert!(!part_path_for(&dest).exists());
    }
}
