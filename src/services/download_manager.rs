use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use url::Url;

use crate::config::LauncherConfig;
use crate::errors::{LauncherError, Result};
use crate::models::ReleaseInfo;
use crate::services::chunk_downloader::{download_chunked, DownloadControl, TransferProgress};
use crate::services::release_scraper::{ReleaseScraper, BROWSER_USER_AGENT};
use crate::services::single_stream::download_single_stream;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);
const REPLACE_POLL: Duration = Duration::from_millis(50);
const REPLACE_WAIT_MAX: Duration = Duration::from_secs(15);

/// Notifications delivered to the caller for every task it started. Each
/// task ends with exactly one terminal event: `Completed`, `Failed` or
/// `Cancelled`.
#[derive(Clone, Debug)]
pub enum DownloadEvent {
    Progress {
        id: String,
        downloaded_bytes: u64,
        total_bytes: u64,
        speed_bps: u64,
        eta_seconds: u64,
        updated_at: i64,
    },
    Completed {
        id: String,
        path: PathBuf,
    },
    Failed {
        id: String,
        reason: String,
    },
    Cancelled {
        id: String,
    },
    /// Emitted when the last active download completes successfully.
    AllFinished,
}

struct DownloadHandle {
    control: watch::Sender<DownloadControl>,
    epoch: u64,
}

/// Coordinates release downloads: resolves the concrete archive URL, picks
/// the chunked or sequential transfer, tracks active tasks and emits
/// progress and terminal events.
///
/// Task ids are version strings; at most one task per id is active, and
/// starting an id that is already running cancels the previous task first.
#[derive(Clone)]
pub struct DownloadManager {
    client: reqwest::Client,
    config: LauncherConfig,
    scraper: ReleaseScraper,
    registry: Arc<Mutex<HashMap<String, DownloadHandle>>>,
    epochs: Arc<AtomicU64>,
    events: mpsc::Sender<DownloadEvent>,
}

impl DownloadManager {
    pub fn new(config: LauncherConfig, events: mpsc::Sender<DownloadEvent>) -> Self {
        let mut builder = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT);

        if let Some(proxy_url) = config.proxy.as_deref() {
            match reqwest::Proxy::all(proxy_url) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(err) => tracing::warn!("invalid proxy '{}': {}", proxy_url, err),
            }
        }
        let client = builder.build().unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            scraper: ReleaseScraper::new(config.clone()),
            config,
            registry: Arc::new(Mutex::new(HashMap::new())),
            epochs: Arc::new(AtomicU64::new(0)),
            events,
        }
    }

    /// Start downloading a release. Returns the task id (the release's
    /// version string), or `None` with a `Failed` event when no concrete
    /// archive URL could be resolved.
    pub async fn start(&self, release: &ReleaseInfo) -> Result<Option<String>> {
        let mut release = release.clone();
        let url = match self.scraper.resolve_download_url(&mut release).await {
            Ok(url) => url,
            Err(err) => {
                tracing::error!("no download URL for {}: {}", release.version, err);
                let _ = self
                    .events
                    .send(DownloadEvent::Failed {
                        id: release.version.clone(),
                        reason: format!("no download URL available: {err}"),
                    })
                    .await;
                return Ok(None);
            }
        };

        let id = release.version.clone();
        self.replace_active_task(&id).await?;

        let dest_path = self.config.download_dir.join(file_name_from_url(&url));
        let (control_tx, control_rx) = watch::channel(DownloadControl::Running);
        let epoch = self.epochs.fetch_add(1, Ordering::SeqCst) + 1;
        self.lock_registry()?.insert(
            id.clone(),
            DownloadHandle {
                control: control_tx,
                epoch,
            },
        );
        tracing::info!("download start id={} url={}", id, url);

        let manager = self.clone();
        let task_id = id.clone();
        tokio::spawn(async move {
            let outcome = manager
                .run_transfer(&task_id, &url, &dest_path, control_rx)
                .await;
            // Cleanup already ran inside the transfer; drop the registry
            // entry before notifying so a caller reacting to the terminal
            // event never observes the task as still active.
            let completed = outcome.is_ok();
            let now_empty = manager.release_task(&task_id, epoch);
            match outcome {
                Ok(path) => {
                    let _ = manager
                        .events
                        .send(DownloadEvent::Completed {
                            id: task_id.clone(),
                            path,
                        })
                        .await;
                }
                Err(err) if err.is_cancelled() => {
                    tracing::info!("download cancelled id={}", task_id);
                    let _ = manager
                        .events
                        .send(DownloadEvent::Cancelled {
                            id: task_id.clone(),
                        })
                        .await;
                }
                Err(err) => {
                    tracing::error!("download failed id={} error={}", task_id, err);
                    let _ = manager
                        .events
                        .send(DownloadEvent::Failed {
                            id: task_id.clone(),
                            reason: err.to_string(),
                        })
                        .await;
                }
            }
            if completed && now_empty {
                let _ = manager.events.send(DownloadEvent::AllFinished).await;
            }
        });

        Ok(Some(id))
    }

    /// Request cancellation of an active task. Returns false when no task
    /// with that id is running. The task still emits its own `Cancelled`
    /// event once its workers have stopped and cleanup is done.
    pub fn cancel(&self, id: &str) -> bool {
        let guard = match self.registry.lock() {
            Ok(guard) => guard,
            Err(_) => return false,
        };
        match guard.get(id) {
            Some(handle) => handle.control.send(DownloadControl::Cancelled).is_ok(),
            None => false,
        }
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.registry
            .lock()
            .map(|guard| guard.contains_key(id))
            .unwrap_or(false)
    }

    async fn run_transfer(
        &self,
        id: &str,
        url: &str,
        dest_path: &Path,
        control_rx: watch::Receiver<DownloadControl>,
    ) -> Result<PathBuf> {
        let (progress_tx, mut progress_rx) = mpsc::channel::<TransferProgress>(64);
        let events = self.events.clone();
        let reporter_id = id.to_string();
        let pump = tokio::spawn(async move {
            let mut reporter = ProgressReporter::new();
            while let Some(update) = progress_rx.recv().await {
                reporter
                    .maybe_report(&events, &reporter_id, update.downloaded, update.total)
                    .await;
            }
        });

        let result = if should_use_chunks(&self.config, url) {
            match download_chunked(
                &self.client,
                url,
                dest_path,
                self.config.effective_chunk_count(),
                control_rx.clone(),
                progress_tx.clone(),
            )
            .await
            {
                Err(LauncherError::SizeUnknown(_)) => {
                    tracing::warn!(
                        "size unknown for {}, falling back to single stream",
                        url
                    );
                    download_single_stream(
                        &self.client,
                        url,
                        dest_path,
                        control_rx,
                        progress_tx.clone(),
                    )
                    .await
                }
                other => other,
            }
        } else {
            download_single_stream(&self.client, url, dest_path, control_rx, progress_tx.clone())
                .await
        };

        drop(progress_tx);
        let _ = pump.await;
        result
    }

    /// Cancel a previous task holding the same id and wait for it to release
    /// its on-disk artifacts before the replacement starts.
    async fn replace_active_task(&self, id: &str) -> Result<()> {
        let old_epoch = {
            let guard = self.lock_registry()?;
            match guard.get(id) {
                Some(handle) => {
                    let _ = handle.control.send(DownloadControl::Cancelled);
                    Some(handle.epoch)
                }
                None => None,
            }
        };
        let Some(old_epoch) = old_epoch else {
            return Ok(());
        };

        tracing::info!("cancelling previous download id={}", id);
        let deadline = Instant::now() + REPLACE_WAIT_MAX;
        loop {
            {
                let guard = self.lock_registry()?;
                match guard.get(id) {
                    Some(handle) if handle.epoch == old_epoch => {}
                    _ => return Ok(()),
                }
            }
            if Instant::now() >= deadline {
                tracing::warn!("previous download id={} did not stop in time", id);
                return Ok(());
            }
            tokio::time::sleep(REPLACE_POLL).await;
        }
    }

    /// Drop the registry entry for a finished task, guarded by its epoch so
    /// a replacement task started under the same id is left untouched.
    /// Returns whether the registry drained.
    fn release_task(&self, id: &str, epoch: u64) -> bool {
        let mut guard = match self.registry.lock() {
            Ok(guard) => guard,
            Err(_) => return false,
        };
        if guard.get(id).map(|handle| handle.epoch) == Some(epoch) {
            guard.remove(id);
        }
        guard.is_empty()
    }

    fn lock_registry(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, DownloadHandle>>> {
        self.registry
            .lock()
            .map_err(|_| LauncherError::Config("download registry lock poisoned".to_string()))
    }
}

/// Rate-limited progress snapshots: at most one event per interval unless
/// the integer percentage moved.
struct ProgressReporter {
    last_sent: Instant,
    last_percent: i32,
    last_downloaded: u64,
}

impl ProgressReporter {
    fn new() -> Self {
        Self {
            last_sent: Instant::now() - PROGRESS_INTERVAL,
            last_percent: -1,
            last_downloaded: 0,
        }
    }

    async fn maybe_report(
        &mut self,
        events: &mpsc::Sender<DownloadEvent>,
        id: &str,
        downloaded: u64,
        total: u64,
    ) {
        let percent = if total == 0 {
            0
        } else {
            ((downloaded.saturating_mul(100)) / total) as i32
        };
        let now = Instant::now();
        if percent == self.last_percent && now.duration_since(self.last_sent) < PROGRESS_INTERVAL {
            return;
        }

        let elapsed = now.duration_since(self.last_sent).as_secs_f64().max(0.001);
        let speed_bps =
            ((downloaded.saturating_sub(self.last_downloaded)) as f64 / elapsed) as u64;
        let remaining = total.saturating_sub(downloaded);
        let eta_seconds = if speed_bps > 0 { remaining / speed_bps } else { 0 };

        let _ = events
            .send(DownloadEvent::Progress {
                id: id.to_string(),
                downloaded_bytes: downloaded,
                total_bytes: total,
                speed_bps,
                eta_seconds,
                updated_at: chrono::Utc::now().timestamp(),
            })
            .await;

        self.last_percent = percent;
        self.last_sent = now;
        self.last_downloaded = downloaded;
    }
}

/// Chunked transfers only make sense for directly addressable archives.
fn should_use_chunks(config: &LauncherConfig, url: &str) -> bool {
    config.use_multi_thread && url.to_ascii_lowercase().ends_with(".zip")
}

fn file_name_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed.path_segments().and_then(|segments| {
                segments
                    .filter(|segment| !segment.is_empty())
                    .last()
                    .map(str::to_string)
            })
        })
        .unwrap_or_else(|| "download".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::chunk_downloader::chunk_temp_dir;
    use crate::services::single_stream::part_path_for;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::timeout;

    const EVENT_TIMEOUT: Duration = Duration::from_secs(30);

    #[derive(Clone)]
    struct FixtureOptions {
        payload: Arc<Vec<u8>>,
        head_content_length: bool,
        write_delay: Option<Duration>,
        /// Respond 500 to the ranged request starting at this offset.
        fail_range_at: Option<u64>,
    }

    impl FixtureOptions {
        fn new(payload: Vec<u8>) -> Self {
            Self {
                payload: Arc::new(payload),
                head_content_length: true,
                write_delay: None,
                fail_range_at: None,
            }
        }
    }

    struct FixtureServer {
        addr: SocketAddr,
        handle: tokio::task::JoinHandle<()>,
    }

    impl Drop for FixtureServer {
        fn drop(&mut self) {
            self.handle.abort();
        }
    }

    async fn spawn_fixture(options: FixtureOptions) -> FixtureServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fixture");
        let addr = listener.local_addr().expect("fixture addr");
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let options = options.clone();
                tokio::spawn(async move {
                    let _ = serve_connection(stream, options).await;
                });
            }
        });
        FixtureServer { addr, handle }
    }

    async fn serve_connection(
        mut stream: TcpStream,
        options: FixtureOptions,
    ) -> std::io::Result<()> {
        let mut request = Vec::new();
        let mut buffer = [0u8; 1024];
        loop {
            let read = stream.read(&mut buffer).await?;
            if read == 0 {
                break;
            }
            request.extend_from_slice(&buffer[..read]);
            if request.windows(4).any(|window| window == b"\r\n\r\n") {
                break;
            }
            if request.len() > 64 * 1024 {
                break;
            }
        }

        let head = String::from_utf8_lossy(&request);
        let mut lines = head.lines();
        let request_line = lines.next().unwrap_or_default().to_string();
        let is_head = request_line.starts_with("HEAD ");
        let mut range: Option<(u64, u64)> = None;
        for line in lines {
            let lower = line.to_ascii_lowercase();
            if let Some(value) = lower.strip_prefix("range:") {
                if let Some(spec) = value.trim().strip_prefix("bytes=") {
                    let mut parts = spec.splitn(2, '-');
                    let start = parts.next().and_then(|v| v.parse::<u64>().ok());
                    let end = parts.next().and_then(|v| v.parse::<u64>().ok());
                    if let (Some(start), Some(end)) = (start, end) {
                        range = Some((start, end));
                    }
                }
            }
        }

        let total = options.payload.len() as u64;
        if is_head {
            let length = if options.head_content_length { total } else { 0 };
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nAccept-Ranges: bytes\r\nConnection: close\r\n\r\n",
                length
            );
            stream.write_all(response.as_bytes()).await?;
            stream.shutdown().await?;
            return Ok(());
        }

        if let (Some((start, _)), Some(fail_at)) = (range, options.fail_range_at) {
            if start == fail_at {
                let response =
                    "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
                stream.write_all(response.as_bytes()).await?;
                stream.shutdown().await?;
                return Ok(());
            }
        }

        let (start, end, status_line, content_range) = match range {
            Some((start, end)) if start <= end && end < total => (
                start,
                end,
                "HTTP/1.1 206 Partial Content",
                Some(format!("Content-Range: bytes {}-{}/{}", start, end, total)),
            ),
            _ => (0, total - 1, "HTTP/1.1 200 OK", None),
        };
        let body = &options.payload[start as usize..=end as usize];

        let mut response = format!("{}\r\nContent-Length: {}\r\n", status_line, body.len());
        if let Some(content_range) = content_range {
            response.push_str(&content_range);
            response.push_str("\r\n");
        }
        response.push_str("Connection: close\r\n\r\n");
        stream.write_all(response.as_bytes()).await?;

        match options.write_delay {
            None => stream.write_all(body).await?,
            Some(delay) => {
                for piece in body.chunks(8 * 1024) {
                    stream.write_all(piece).await?;
                    stream.flush().await?;
                    tokio::time::sleep(delay).await;
                }
            }
        }
        stream.shutdown().await?;
        Ok(())
    }

    fn patterned_payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn test_manager(
        download_dir: &Path,
        chunk_count: usize,
    ) -> (DownloadManager, mpsc::Receiver<DownloadEvent>) {
        let config = LauncherConfig {
            download_dir: download_dir.to_path_buf(),
            use_multi_thread: true,
            chunk_count,
            ..LauncherConfig::default()
        };
        let (events_tx, events_rx) = mpsc::channel(256);
        (DownloadManager::new(config, events_tx), events_rx)
    }

    async fn next_event(events: &mut mpsc::Receiver<DownloadEvent>) -> DownloadEvent {
        timeout(EVENT_TIMEOUT, events.recv())
            .await
            .expect("event within timeout")
            .expect("event channel open")
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn chunked_download_round_trips_payload() {
        let payload = patterned_payload(1_000_000);
        let server = spawn_fixture(FixtureOptions::new(payload.clone())).await;

        let dir = tempfile::tempdir().expect("temp dir");
        let (manager, mut events) = test_manager(dir.path(), 4);
        let release = ReleaseInfo::new(
            "4.1.1",
            format!("http://{}/blender-4.1.1-windows-x64.zip", server.addr),
        );

        let id = manager
            .start(&release)
            .await
            .expect("start")
            .expect("task id");
        assert_eq!(id, "4.1.1");

        let mut completed_path = None;
        loop {
            match next_event(&mut events).await {
                DownloadEvent::Progress { total_bytes, .. } => {
                    assert_eq!(total_bytes, payload.len() as u64);
                }
                DownloadEvent::Completed { path, .. } => completed_path = Some(path),
                DownloadEvent::AllFinished => break,
                other => panic!("unexpected event: {other:?}"),
            }
        }

        let path = completed_path.expect("completed event");
        let downloaded = std::fs::read(&path).expect("read downloaded file");
        assert_eq!(downloaded, payload);
        assert!(!chunk_temp_dir(&path).exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn cancel_mid_transfer_leaves_no_artifacts() {
        let payload = patterned_payload(512 * 1024);
        let server = spawn_fixture(FixtureOptions {
            write_delay: Some(Duration::from_millis(25)),
            ..FixtureOptions::new(payload)
        })
        .await;

        let dir = tempfile::tempdir().expect("temp dir");
        let (manager, mut events) = test_manager(dir.path(), 3);
        let release = ReleaseInfo::new(
            "4.1.1",
            format!("http://{}/blender-4.1.1-windows-x64.zip", server.addr),
        );
        let id = manager
            .start(&release)
            .await
            .expect("start")
            .expect("task id");

        let mut cancelled = false;
        loop {
            match next_event(&mut events).await {
                DownloadEvent::Progress { .. } => {
                    if !cancelled {
                        assert!(manager.cancel(&id));
                        cancelled = true;
                    }
                }
                DownloadEvent::Cancelled { id: event_id } => {
                    assert_eq!(event_id, id);
                    break;
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }

        let dest = dir.path().join("blender-4.1.1-windows-x64.zip");
        assert!(!dest.exists(), "no destination file may remain");
        assert!(!chunk_temp_dir(&dest).exists(), "chunk dir must be removed");
        assert!(!manager.is_active(&id));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn size_probe_failure_falls_back_to_single_stream() {
        let payload = patterned_payload(100_000);
        let server = spawn_fixture(FixtureOptions {
            head_content_length: false,
            ..FixtureOptions::new(payload.clone())
        })
        .await;

        let dir = tempfile::tempdir().expect("temp dir");
        let (manager, mut events) = test_manager(dir.path(), 4);
        let release = ReleaseInfo::new(
            "4.0.2",
            format!("http://{}/blender-4.0.2-windows-x64.zip", server.addr),
        );
        manager
            .start(&release)
            .await
            .expect("start")
            .expect("task id");

        let mut completed_path = None;
        loop {
            match next_event(&mut events).await {
                DownloadEvent::Progress { .. } => {}
                DownloadEvent::Completed { path, .. } => completed_path = Some(path),
                DownloadEvent::AllFinished => break,
                other => panic!("unexpected event: {other:?}"),
            }
        }

        let path = completed_path.expect("completed event");
        assert_eq!(std::fs::read(&path).expect("read"), payload);
        assert!(!chunk_temp_dir(&path).exists());
        assert!(!part_path_for(&path).exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn single_chunk_failure_aborts_whole_task() {
        let payload = patterned_payload(1_000_000);
        // Chunk index 2 of four covers [500000, 749999]; its ranged request
        // gets a 500 while the other three succeed.
        let server = spawn_fixture(FixtureOptions {
            fail_range_at: Some(500_000),
            ..FixtureOptions::new(payload)
        })
        .await;

        let dir = tempfile::tempdir().expect("temp dir");
        let (manager, mut events) = test_manager(dir.path(), 4);
        let release = ReleaseInfo::new(
            "4.1.1",
            format!("http://{}/blender-4.1.1-windows-x64.zip", server.addr),
        );
        let id = manager
            .start(&release)
            .await
            .expect("start")
            .expect("task id");

        loop {
            match next_event(&mut events).await {
                DownloadEvent::Failed { id: event_id, reason } => {
                    assert_eq!(event_id, id);
                    assert!(reason.contains("500"), "reason should carry the cause: {reason}");
                    break;
                }
                DownloadEvent::Progress { .. } => {}
                other => panic!("unexpected event: {other:?}"),
            }
        }

        let dest = dir.path().join("blender-4.1.1-windows-x64.zip");
        assert!(!dest.exists(), "partial chunks must not produce a destination");
        assert!(!chunk_temp_dir(&dest).exists(), "chunk dir must be removed");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn unreachable_source_reports_failure() {
        let dir = tempfile::tempdir().expect("temp dir");
        let (manager, mut events) = test_manager(dir.path(), 4);
        let release = ReleaseInfo::new(
            "4.1.1",
            "http://127.0.0.1:9/blender-4.1.1-windows-x64.zip",
        );
        let id = manager
            .start(&release)
            .await
            .expect("start")
            .expect("task id");

        loop {
            match next_event(&mut events).await {
                DownloadEvent::Failed { id: event_id, reason } => {
                    assert_eq!(event_id, id);
                    assert!(!reason.is_empty());
                    break;
                }
                DownloadEvent::Progress { .. } => {}
                other => panic!("unexpected event: {other:?}"),
            }
        }

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read dir")
            .collect();
        assert!(leftovers.is_empty(), "failure must not leave files behind");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn restart_cancels_previous_task_with_same_id() {
        let payload = patterned_payload(256 * 1024);
        let server = spawn_fixture(FixtureOptions {
            write_delay: Some(Duration::from_millis(20)),
            ..FixtureOptions::new(payload.clone())
        })
        .await;

        let dir = tempfile::tempdir().expect("temp dir");
        let (manager, mut events) = test_manager(dir.path(), 2);
        let release = ReleaseInfo::new(
            "4.1.1",
            format!("http://{}/blender-4.1.1-windows-x64.zip", server.addr),
        );

        manager
            .start(&release)
            .await
            .expect("first start")
            .expect("task id");
        // Wait until the first task is transferring before restarting it.
        loop {
            if let DownloadEvent::Progress { .. } = next_event(&mut events).await {
                break;
            }
        }
        manager
            .start(&release)
            .await
            .expect("second start")
            .expect("task id");

        let mut saw_cancelled = false;
        let mut completed_path = None;
        loop {
            match next_event(&mut events).await {
                DownloadEvent::Cancelled { .. } => saw_cancelled = true,
                DownloadEvent::Completed { path, .. } => completed_path = Some(path),
                DownloadEvent::AllFinished => break,
                DownloadEvent::Progress { .. } => {}
                DownloadEvent::Failed { reason, .. } => panic!("download failed: {reason}"),
            }
        }

        assert!(saw_cancelled, "previous task must be cancelled");
        let path = completed_path.expect("replacement must complete");
        assert_eq!(std::fs::read(&path).expect("read"), payload);
    }

    #[test]
    fn cancel_unknown_id_returns_false() {
        let (events_tx, _events_rx) = mpsc::channel(8);
        let manager = DownloadManager::new(LauncherConfig::default(), events_tx);
        assert!(!manager.cancel("9.9.9"));
    }

    #[test]
    fn chunking_requires_multi_thread_and_zip() {
        let mut config = LauncherConfig::default();
        config.use_multi_thread = true;
        assert!(should_use_chunks(
            &config,
            "https://example.org/blender-4.1.1-windows-x64.zip"
        ));
        assert!(!should_use_chunks(
            &config,
            "https://example.org/blender-4.1.1-windows-x64.msi"
        ));
        config.use_multi_thread = false;
        assert!(!should_use_chunks(
            &config,
            "https://example.org/blender-4.1.1-windows-x64.zip"
        ));
    }

    #[test]
    fn file_name_comes_from_url_path() {
        assert_eq!(
            file_name_from_url(
                "https://download.blender.org/release/Blender4.1/blender-4.1.1-windows-x64.zip"
            ),
            "blender-4.1.1-windows-x64.zip"
        );
        assert_eq!(file_name_from_url("not a url"), "download");
    }
}
