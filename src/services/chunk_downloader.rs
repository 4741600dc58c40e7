use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, watch};

use crate::errors::{LauncherError, Result};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Cooperative control state shared between a download task and its chunk
/// workers. Workers observe the channel at every received buffer, so a
/// cancel takes effect within one buffer read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DownloadControl {
    Running,
    Cancelled,
}

/// Raw progress snapshot forwarded to the coordinator after every buffer.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TransferProgress {
    pub downloaded: u64,
    pub total: u64,
}

#[derive(Clone, Debug)]
pub(crate) struct ChunkRange {
    pub index: usize,
    pub start: u64,
    pub end: u64,
}

impl ChunkRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

enum ChunkSignal {
    Progress { bytes: u64 },
    Done { index: usize },
    Failed { index: usize, error: LauncherError },
}

/// Partition `total_size` bytes into contiguous, non-overlapping inclusive
/// ranges. The last range absorbs the division remainder. A file smaller
/// than the requested worker count gets one range per byte at most.
pub(crate) fn compute_chunk_ranges(total_size: u64, chunk_count: usize) -> Vec<ChunkRange> {
    let count = (chunk_count as u64).clamp(1, total_size.max(1)) as usize;
    let chunk_size = total_size / count as u64;

    (0..count)
        .map(|index| {
            let start = index as u64 * chunk_size;
            let end = if index == count - 1 {
                total_size - 1
            } else {
                (index as u64 + 1) * chunk_size - 1
            };
            ChunkRange { index, start, end }
        })
        .collect()
}

/// HEAD the target for its Content-Length. A missing or zero length means
/// the file cannot be partitioned and the caller should fall back to a
/// sequential transfer.
pub(crate) async fn probe_content_length(client: &reqwest::Client, url: &str) -> Result<u64> {
    let response = client.head(url).timeout(PROBE_TIMEOUT).send().await?;
    if !response.status().is_success() {
        return Err(LauncherError::Http(format!(
            "{} -> HTTP {}",
            url,
            response.status()
        )));
    }

    let length = response
        .headers()
        .get(reqwest::header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());

    match length {
        Some(length) if length > 0 => Ok(length),
        _ => Err(LauncherError::SizeUnknown(url.to_string())),
    }
}

pub(crate) fn chunk_temp_dir(dest_path: &Path) -> PathBuf {
    let mut name = dest_path
        .file_name()
        .map(|value| value.to_os_string())
        .unwrap_or_else(|| "download".into());
    name.push(".chunks");
    dest_path.with_file_name(name)
}

/// Download `url` into `dest_path` using `chunk_count` parallel ranged
/// requests.
///
/// Probes the size, spawns one worker per byte range, aggregates progress
/// through a single channel, and merges the chunk files in index order once
/// every worker has finished. Any worker failure (or an external cancel)
/// stops the remaining workers and removes every temporary artifact along
/// with any partially written destination.
pub(crate) async fn download_chunked(
    client: &reqwest::Client,
    url: &str,
    dest_path: &Path,
    chunk_count: usize,
    external_control: watch::Receiver<DownloadControl>,
    progress_tx: mpsc::Sender<TransferProgress>,
) -> Result<PathBuf> {
    let total_size = probe_content_length(client, url).await?;
    let ranges = compute_chunk_ranges(total_size, chunk_count);
    let temp_dir = chunk_temp_dir(dest_path);
    tokio::fs::create_dir_all(&temp_dir).await?;
    tracing::info!(
        "chunked download start url={} size={} chunks={}",
        url,
        total_size,
        ranges.len()
    );

    // Task-local control: carries the external cancel through to the
    // workers and lets the aggregator abort the rest after one failure.
    let (task_tx, task_rx) = watch::channel(DownloadControl::Running);
    let task_tx = Arc::new(task_tx);
    let forwarder = {
        let task_tx = task_tx.clone();
        let mut external = external_control;
        tokio::spawn(async move {
            loop {
                if *external.borrow() == DownloadControl::Cancelled {
                    let _ = task_tx.send(DownloadControl::Cancelled);
                    return;
                }
                if external.changed().await.is_err() {
                    return;
                }
            }
        })
    };

    let (signal_tx, mut signal_rx) = mpsc::channel::<ChunkSignal>(256);
    for range in &ranges {
        let client = client.clone();
        let url = url.to_string();
        let chunk_path = temp_dir.join(format!("chunk_{}", range.index));
        let tx = signal_tx.clone();
        let mut control = task_rx.clone();
        let range = range.clone();

        tokio::spawn(async move {
            match fetch_chunk(&client, &url, &range, &chunk_path, &tx, &mut control).await {
                Ok(()) => {
                    let _ = tx.send(ChunkSignal::Done { index: range.index }).await;
                }
                Err(error) => {
                    let _ = tx
                        .send(ChunkSignal::Failed {
                            index: range.index,
                            error,
                        })
                        .await;
                }
            }
        });
    }
    drop(signal_tx);

    let mut downloaded: u64 = 0;
    let mut completed: HashSet<usize> = HashSet::new();
    let mut failure: Option<LauncherError> = None;

    while let Some(signal) = signal_rx.recv().await {
        match signal {
            ChunkSignal::Progress { bytes } => {
                if failure.is_some() {
                    continue;
                }
                downloaded = downloaded.saturating_add(bytes);
                let _ = progress_tx
                    .send(TransferProgress {
                        downloaded,
                        total: total_size,
                    })
                    .await;
            }
            ChunkSignal::Done { index } => {
                completed.insert(index);
            }
            ChunkSignal::Failed { index, error } => {
                if failure.is_none() {
                    if !error.is_cancelled() {
                        tracing::warn!("chunk {} failed: {}", index, error);
                    }
                    let _ = task_tx.send(DownloadControl::Cancelled);
                    failure = Some(error);
                }
            }
        }
    }
    forwarder.abort();

    if let Some(error) = failure {
        cleanup_chunks(&temp_dir, dest_path).await;
        return Err(error);
    }
    if completed.len() != ranges.len() {
        cleanup_chunks(&temp_dir, dest_path).await;
        return Err(LauncherError::Http(format!(
            "only {}/{} chunks completed for {}",
            completed.len(),
            ranges.len(),
            url
        )));
    }

    if let Err(error) = merge_chunks(&temp_dir, dest_path, ranges.len()).await {
        cleanup_chunks(&temp_dir, dest_path).await;
        return Err(error);
    }
    let _ = tokio::fs::remove_dir_all(&temp_dir).await;

    tracing::info!("chunked download complete: {}", dest_path.display());
    Ok(dest_path.to_path_buf())
}

/// One ranged GET streamed into the chunk's temp file. Reports every buffer
/// to the aggregator and observes the control channel between buffers.
async fn fetch_chunk(
    client: &reqwest::Client,
    url: &str,
    range: &ChunkRange,
    chunk_path: &Path,
    tx: &mpsc::Sender<ChunkSignal>,
    control: &mut watch::Receiver<DownloadControl>,
) -> Result<()> {
    if *control.borrow() == DownloadControl::Cancelled {
        return Err(LauncherError::Cancelled);
    }

    let response = client
        .get(url)
        .header(
            reqwest::header::RANGE,
            format!("bytes={}-{}", range.start, range.end),
        )
        .send()
        .await?;

    let status = response.status();
    let full_body_ok = status == reqwest::StatusCode::OK && range.start == 0;
    if status != reqwest::StatusCode::PARTIAL_CONTENT && !full_body_ok {
        return Err(LauncherError::Http(format!(
            "ranged request {}-{} -> HTTP {}",
            range.start, range.end, status
        )));
    }

    let mut stream = response.bytes_stream();
    let mut file = tokio::fs::File::create(chunk_path).await?;
    let mut written: u64 = 0;

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
                // A 200 response carries the whole file; keep only this
                // worker's slice of it.
                let keep = if full_body_ok {
                    clip_to_range(&bytes, written, range.len())
                } else {
                    Some(&bytes[..])
                };
                written = written.saturating_add(bytes.len() as u64);
                if let Some(keep) = keep {
                    file.write_all(keep).await?;
                    let _ = tx.send(ChunkSignal::Progress { bytes: keep.len() as u64 }).await;
                }
            }
        }
    }

    file.flush().await?;
    Ok(())
}

fn clip_to_range(bytes: &[u8], already_written: u64, range_len: u64) -> Option<&[u8]> {
    if already_written >= range_len {
        return None;
    }
    let room = (range_len - already_written).min(bytes.len() as u64) as usize;
    if room == 0 {
        None
    } else {
        Some(&bytes[..room])
    }
}

/// Concatenate the chunk files strictly in index order. Runs only after
/// every worker reported success.
async fn merge_chunks(temp_dir: &Path, dest_path: &Path, chunk_count: usize) -> Result<()> {
    if let Some(parent) = dest_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut out = tokio::fs::File::create(dest_path).await?;
    for index in 0..chunk_count {
        let chunk_path = temp_dir.join(format!("chunk_{index}"));
        let data = tokio::fs::read(&chunk_path).await?;
        out.write_all(&data).await?;
    }
    out.flush().await?;
    Ok(())
}

/// Remove every temporary artifact and any partially written destination.
/// Shared by the cancellation, failure and merge-error paths.
pub(crate) async fn cleanup_chunks(temp_dir: &Path, dest_path: &Path) {
    let _ = tokio::fs::remove_dir_all(temp_dir).await;
    let _ = tokio::fs::remove_file(dest_path).await;
}
