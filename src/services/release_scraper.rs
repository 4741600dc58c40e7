use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::config::LauncherConfig;
use crate::errors::{LauncherError, Result};
use crate::models::{version_sort_key, ReleaseInfo};
use crate::utils::file::format_bytes;

/// Some listing services reject clients that do not look like a browser.
pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const LISTING_TIMEOUT: Duration = Duration::from_secs(20);
const SUBPAGE_TIMEOUT: Duration = Duration::from_secs(15);
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Directory listings carry dozens of historical series; descending only the
/// newest few bounds the worst-case number of network calls per refresh.
const MAX_SERIES_PER_SOURCE: usize = 5;
const MAX_FILES_PER_SERIES: usize = 3;

static ANCHOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*"([^"]*)"[^>]*>(.*?)</a>"#).expect("anchor regex")
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag regex"));
static SERIES_DIR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Blender(\d+\.\d+)").expect("series dir regex"));
static MIRROR_DIR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"blender-(\d+\.\d+)").expect("mirror dir regex"));
static WINDOWS_ZIP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"blender-(\d+\.\d+\.\d+)-windows-x64\.zip$").expect("archive regex"));
static OFFICIAL_VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Blender (\d+\.\d+\.\d+)").expect("official version regex"));

/// Scrapes release descriptors out of the HTML directory listings and
/// download pages of the configured sources.
///
/// Every public strategy swallows its own network and parse failures: a
/// broken source logs a warning and yields an empty list so resolution can
/// continue with the next source.
#[derive(Clone)]
pub struct ReleaseScraper {
    client: reqwest::Client,
    config: LauncherConfig,
}

impl ReleaseScraper {
    pub fn new(config: LauncherConfig) -> Self {
        let mut builder = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(LISTING_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT);

        if let Some(proxy_url) = config.proxy.as_deref() {
            match reqwest::Proxy::all(proxy_url) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(err) => tracing::warn!("invalid proxy '{}': {}", proxy_url, err),
            }
        }

        let client = builder.build().unwrap_or_else(|_| reqwest::Client::new());
        Self { client, config }
    }

    /// Strategy 1: the release directory index, one `Blender<x.y>/`
    /// directory per series.
    pub async fn fetch_from_release_index(&self) -> Vec<ReleaseInfo> {
        match self
            .scrape_directory_source(&self.config.release_index_url, &SERIES_DIR_RE)
            .await
        {
            Ok(releases) => releases,
            Err(err) => {
                tracing::warn!(
                    "release index {} unavailable: {}",
                    self.config.release_index_url,
                    err
                );
                Vec::new()
            }
        }
    }

    /// Strategy 2: the mirror root, `blender-<x.y>` directory anchors.
    pub async fn fetch_from_mirror(&self) -> Vec<ReleaseInfo> {
        match self
            .scrape_directory_source(&self.config.mirror_url, &MIRROR_DIR_RE)
            .await
        {
            Ok(releases) => releases,
            Err(err) => {
                tracing::warn!("mirror {} unavailable: {}", self.config.mirror_url, err);
                Vec::new()
            }
        }
    }

    /// Strategy 3: the official download page. Coarser than the directory
    /// sources; each advertised version links to a page that in turn links
    /// to the platform archives.
    pub async fn fetch_from_official(&self) -> Vec<ReleaseInfo> {
        match self.scrape_official().await {
            Ok(releases) => releases,
            Err(err) => {
                tracing::warn!(
                    "official site {} unavailable: {}",
                    self.config.official_url,
                    err
                );
                Vec::new()
            }
        }
    }

    /// Resolve a descriptor whose URL is still a release directory down to a
    /// concrete 64-bit Windows archive. Backfills the exact version, probed
    /// size and description on success.
    pub async fn resolve_download_url(&self, release: &mut ReleaseInfo) -> Result<String> {
        if release.has_concrete_url() {
            return Ok(release.url.clone());
        }

        tracing::info!(
            "resolving archive for {} from {}",
            release.version,
            release.url
        );
        let html = self.fetch_page(&release.url, LISTING_TIMEOUT).await?;
        let major_prefix = release
            .version
            .split('.')
            .next()
            .unwrap_or_default()
            .to_string();

        let mut archives = versioned_links(&parse_anchors(&html), &WINDOWS_ZIP_RE);
        archives.retain(|(version, _)| version.split('.').next() == Some(major_prefix.as_str()));
        sort_newest_first(&mut archives);

        let Some((exact_version, href)) = archives.into_iter().next() else {
            return Err(LauncherError::NotFound(format!(
                "no Windows archive for {} under {}",
                release.version, release.url
            )));
        };

        let file_url = resolve_href(&release.url, &href);
        if let Some(size) = self.probe_human_size(&file_url).await {
            release.size = Some(size);
        }
        release.version = exact_version.clone();
        release.description = Some(format!("Blender {} Windows 64-bit", exact_version));

        tracing::info!("resolved {} -> {}", exact_version, file_url);
        Ok(file_url)
    }

    async fn scrape_directory_source(
        &self,
        base_url: &str,
        dir_pattern: &Regex,
    ) -> Result<Vec<ReleaseInfo>> {
        let html = self.fetch_page(base_url, LISTING_TIMEOUT).await?;
        let mut series = versioned_links(&parse_anchors(&html), dir_pattern);
        sort_newest_first(&mut series);
        series.truncate(MAX_SERIES_PER_SOURCE);
        tracing::info!("{}: descending {} series", base_url, series.len());

        let mut releases = Vec::new();
        for (series_version, href) in series {
            let dir_url = resolve_href(base_url, &href);
            match self.scrape_series_dir(&dir_url).await {
                Ok(mut found) => {
                    tracing::debug!("series {}: {} archives", series_version, found.len());
                    releases.append(&mut found);
                }
                Err(err) => {
                    tracing::warn!("series {} listing failed: {}", series_version, err);
                }
            }
        }
        Ok(releases)
    }

    async fn scrape_series_dir(&self, dir_url: &str) -> Result<Vec<ReleaseInfo>> {
        let html = self.fetch_page(dir_url, SUBPAGE_TIMEOUT).await?;
        // The full x.y.z version lives in the archive file name; directory
        // names only carry x.y and must not be trusted for the key.
        let mut archives = versioned_links(&parse_anchors(&html), &WINDOWS_ZIP_RE);
        sort_newest_first(&mut archives);
        archives.truncate(MAX_FILES_PER_SERIES);

        let mut releases = Vec::new();
        for (version, href) in archives {
            let file_url = resolve_href(dir_url, &href);
            let mut release = ReleaseInfo::new(&version, &file_url);
            release.size = self.probe_human_size(&file_url).await;
            release.description = Some(format!("Blender {} Windows 64-bit", version));
            releases.push(release);
        }
        Ok(releases)
    }

    async fn scrape_official(&self) -> Result<Vec<ReleaseInfo>> {
        let base_url = self.config.official_url.clone();
        let html = self.fetch_page(&base_url, LISTING_TIMEOUT).await?;

        let mut releases = Vec::new();
        for (href, text) in parse_anchors(&html) {
            let Some(captures) = OFFICIAL_VERSION_RE.captures(&text) else {
                continue;
            };
            let Some(version) = captures.get(1).map(|m| m.as_str().to_string()) else {
                continue;
            };

            let page_url = resolve_href(&base_url, &href);
            match self.find_windows_archive(&page_url).await {
                Some(archive_url) => {
                    let mut release = ReleaseInfo::new(&version, &archive_url);
                    release.description = Some(format!("Blender {} Windows 64-bit", version));
                    releases.push(release);
                }
                None => {
                    tracing::warn!("no Windows archive linked from {}", page_url);
                }
            }
        }
        Ok(releases)
    }

    /// Follow an official download page and pick the first link that looks
    /// like a 64-bit Windows archive.
    async fn find_windows_archive(&self, page_url: &str) -> Option<String> {
        let html = match self.fetch_page(page_url, SUBPAGE_TIMEOUT).await {
            Ok(html) => html,
            Err(err) => {
                tracing::warn!("download page {} failed: {}", page_url, err);
                return None;
            }
        };

        for (href, text) in parse_anchors(&html) {
            let href_lower = href.to_ascii_lowercase();
            let text_lower = text.to_ascii_lowercase();
            let is_windows = href_lower.contains("windows")
                || href_lower.contains("win64")
                || text_lower.contains("windows")
                || text_lower.contains("win64");
            let is_archive = href_lower.ends_with(".zip") || href_lower.ends_with(".msi");
            if is_windows && is_archive {
                return Some(resolve_href(page_url, &href));
            }
        }
        None
    }

    async fn fetch_page(&self, url: &str, timeout: Duration) -> Result<String> {
        let response = self.client.get(url).timeout(timeout).send().await?;
        if !response.status().is_success() {
            return Err(LauncherError::Http(format!(
                "{} -> HTTP {}",
                url,
                response.status()
            )));
        }
        Ok(response.text().await?)
    }

    /// HEAD the archive for its Content-Length; failures are tolerated, the
    /// size is cosmetic at this stage.
    async fn probe_human_size(&self, url: &str) -> Option<String> {
        let response = self
            .client
            .head(url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|length| *length > 0)
            .map(format_bytes)
    }
}

/// Extract `(href, inner text)` pairs from every anchor element, with
/// nested markup stripped from the text.
fn parse_anchors(html: &str) -> Vec<(String, String)> {
    ANCHOR_RE
        .captures_iter(html)
        .filter_map(|captures| {
            let href = captures.get(1)?.as_str().trim().to_string();
            let inner = captures.get(2)?.as_str();
            let text = TAG_RE.replace_all(inner, "").trim().to_string();
            Some((href, text))
        })
        .collect()
}

/// Anchors whose href matches `pattern`, keyed by the captured version.
fn versioned_links(anchors: &[(String, String)], pattern: &Regex) -> Vec<(String, String)> {
    anchors
        .iter()
        .filter_map(|(href, _)| {
            let captures = pattern.captures(href)?;
            let version = captures.get(1)?.as_str().to_string();
            Some((version, href.clone()))
        })
        .collect()
}

fn sort_newest_first(links: &mut Vec<(String, String)>) {
    links.sort_by(|a, b| version_sort_key(&b.0).cmp(&version_sort_key(&a.0)));
}

/// Resolve a possibly-relative href against the page it appeared on.
fn resolve_href(base: &str, href: &str) -> String {
    match Url::parse(base).and_then(|parsed| parsed.join(href)) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => href.to_string(),
    }
}
