use std::path::PathBuf;

const DEFAULT_RELEASE_INDEX_URL: &str = "https://download.blender.org/release/";
const DEFAULT_MIRROR_URL: &str = "https://mirrors.aliyun.com/blender/";
const DEFAULT_OFFICIAL_URL: &str = "https://www.blender.org/download/";
const DEFAULT_CHUNK_COUNT: usize = 10;
const MAX_CHUNK_COUNT: usize = 64;

/// Runtime configuration for the download subsystem. Callers usually start
/// from `LauncherConfig::default()` and override fields; environment
/// variables win over both.
#[derive(Clone, Debug)]
pub struct LauncherConfig {
    /// Directory that receives downloaded archives and extracted releases.
    pub download_dir: PathBuf,
    /// Directory index listing every published release series.
    pub release_index_url: String,
    /// Mirror root, tried when the release index yields nothing.
    pub mirror_url: String,
    /// Official download page, the last scraping resort.
    pub official_url: String,
    /// Split archive downloads into parallel ranged requests.
    pub use_multi_thread: bool,
    /// Number of byte-range workers per chunked download.
    pub chunk_count: usize,
    /// Proxy URL applied to every HTTP client, e.g. `http://127.0.0.1:7890`.
    pub proxy: Option<String>,
    /// Optional curated version list shipped alongside the launcher.
    pub bundled_versions_file: Option<PathBuf>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        let download_dir = std::env::var("VORTEX_DOWNLOAD_DIR")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("downloads"));
        let chunk_count = env_usize("VORTEX_CHUNK_COUNT")
            .map(|value| value.clamp(1, MAX_CHUNK_COUNT))
            .unwrap_or(DEFAULT_CHUNK_COUNT);
        let proxy = std::env::var("VORTEX_PROXY")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        Self {
            download_dir,
            release_index_url: DEFAULT_RELEASE_INDEX_URL.to_string(),
            mirror_url: DEFAULT_MIRROR_URL.to_string(),
            official_url: DEFAULT_OFFICIAL_URL.to_string(),
            use_multi_thread: !env_truthy("VORTEX_DISABLE_MULTI_THREAD"),
            chunk_count,
            proxy,
            bundled_versions_file: None,
        }
    }
}

impl LauncherConfig {
    /// Chunk count clamped to the supported range, so a zero from a caller
    /// never produces a divide-by-zero partition.
    pub fn effective_chunk_count(&self) -> usize {
        self.chunk_count.clamp(1, MAX_CHUNK_COUNT)
    }
}

pub(crate) fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
}

pub(crate) fn env_truthy(key: &str) -> bool {
    std::env::var(key)
        .ok()
        .map(|value| {
            let normalized = value.trim().to_ascii_lowercase();
            matches!(normalized.as_str(), "1" | "true" | "yes" | "on")
        })
        .unwrap_or(false)
}
