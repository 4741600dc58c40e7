use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::config::LauncherConfig;
use crate::errors::Result;
use crate::models::{version_sort_key, ReleaseInfo};
use crate::services::release_scraper::ReleaseScraper;
use crate::services::version_cache::VersionCache;

/// Shape of the curated version list shipped alongside the launcher. The
/// `{URL}` placeholder in download URLs stands for the configured mirror
/// base.
#[derive(Deserialize)]
struct BundledVersionsFile {
    #[serde(default)]
    versions: Vec<BundledVersionEntry>,
}

#[derive(Deserialize)]
struct BundledVersionEntry {
    version: String,
    #[serde(default)]
    build_date: Option<String>,
    #[serde(default)]
    download_url: String,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    changes: Option<String>,
}

/// Orchestrates the scraping strategies in fixed priority order and falls
/// back to the version cache when every live source comes up empty.
#[derive(Clone)]
pub struct ReleaseResolver {
    scraper: ReleaseScraper,
    cache: VersionCache,
    config: LauncherConfig,
}

impl ReleaseResolver {
    pub fn new(scraper: ReleaseScraper, cache: VersionCache, config: LauncherConfig) -> Self {
        Self {
            scraper,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &VersionCache {
        &self.cache
    }

    /// Discover available releases, newest first.
    ///
    /// Strategies run sequentially: the release index, then the mirror, then
    /// the official site, each only consulted when its predecessors yielded
    /// nothing. An empty combined result degrades to the cache contents; an
    /// empty cache yields an empty list, never an error.
    pub async fn resolve(&self) -> Result<Vec<ReleaseInfo>> {
        let mut found = self.scraper.fetch_from_release_index().await;
        if found.is_empty() {
            tracing::info!("release index empty, trying mirror");
            found = self.scraper.fetch_from_mirror().await;
        }
        if found.is_empty() {
            tracing::info!("mirror empty, trying official site");
            found = self.scraper.fetch_from_official().await;
        }

        let mut releases = dedupe_by_version(found);
        sort_releases(&mut releases);

        if releases.is_empty() {
            let cached = self.cache.entries_sorted()?;
            if cached.is_empty() {
                tracing::warn!("no versions available from any source or cache");
            } else {
                tracing::info!("all sources empty, serving {} cached releases", cached.len());
            }
            return Ok(cached);
        }

        self.cache.merge(&releases)?;
        if let Err(err) = self.cache.save() {
            tracing::warn!("version cache flush failed: {}", err);
        }

        tracing::info!("resolved {} releases", releases.len());
        Ok(releases)
    }

    /// Load the curated version list, substituting `{URL}` with the mirror
    /// base. Missing or malformed files log a warning and yield nothing.
    pub fn load_bundled_versions(&self) -> Result<Vec<ReleaseInfo>> {
        let Some(path) = self.config.bundled_versions_file.as_deref() else {
            return Ok(Vec::new());
        };
        let releases = match read_bundled_versions(path, &self.config.mirror_url) {
            Ok(releases) => releases,
            Err(err) => {
                tracing::warn!("bundled version list {} unusable: {}", path.display(), err);
                return Ok(Vec::new());
            }
        };
        self.cache.merge(&releases)?;
        Ok(releases)
    }
}

fn read_bundled_versions(path: &Path, mirror_url: &str) -> Result<Vec<ReleaseInfo>> {
    let raw = std::fs::read_to_string(path)?;
    let parsed: BundledVersionsFile = serde_json::from_str(&raw)?;
    let mirror_base = mirror_url.trim_end_matches('/');

    let releases = parsed
        .versions
        .into_iter()
        .map(|entry| ReleaseInfo {
            version: entry.version,
            build_date: entry.build_date,
            url: entry.download_url.replace("{URL}", mirror_base),
            size: entry.size,
            description: entry.description,
            changes: entry.changes,
        })
        .collect();
    Ok(releases)
}

/// Keep the first descriptor seen for each version key; earlier entries come
/// from higher-priority strategies.
fn dedupe_by_version(releases: Vec<ReleaseInfo>) -> Vec<ReleaseInfo> {
    let mut seen = HashSet::new();
    releases
        .into_iter()
        .filter(|release| seen.insert(release.version.clone()))
        .collect()
}

fn sort_releases(releases: &mut [ReleaseInfo]) {
    releases.sort_by(|a, b| version_sort_key(&b.version).cmp(&version_sort_key(&a.version)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use uuid::Uuid;

    fn release(version: &str, url: &str) -> ReleaseInfo {
        ReleaseInfo::new(version, url)
    }

    fn unreachable_config() -> LauncherConfig {
        LauncherConfig {
            release_index_url: "http://127.0.0.1:9/release/".to_string(),
            mirror_url: "http://127.0.0.1:9/mirror/".to_string(),
            official_url: "http://127.0.0.1:9/download/".to_string(),
            ..LauncherConfig::default()
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("vortex-resolver-{}-{}", name, Uuid::new_v4()))
    }

    #[test]
    fn dedupe_keeps_highest_priority_descriptor() {
        let from_index = release("4.1.0", "https://index.example.org/blender-4.1.0.zip");
        let from_mirror = release("4.1.0", "https://mirror.example.org/blender-4.1.0.zip");
        let deduped = dedupe_by_version(vec![from_index.clone(), from_mirror]);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].url, from_index.url);
    }

    #[test]
    fn releases_sort_descending_numerically() {
        let mut releases = vec![
            release("4.2.0", "a"),
            release("4.10.1", "b"),
            release("3.6.14", "c"),
        ];
        sort_releases(&mut releases);
        let versions: Vec<&str> = releases.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(versions, vec!["4.10.1", "4.2.0", "3.6.14"]);
    }

    #[tokio::test]
    async fn unreachable_sources_fall_back_to_cache() {
        let config = unreachable_config();
        let cache = VersionCache::load(temp_path("cache.json"));
        cache
            .merge(&[
                release("4.0.2", "https://cached.example.org/blender-4.0.2-windows-x64.zip"),
                release("4.1.1", "https://cached.example.org/blender-4.1.1-windows-x64.zip"),
            ])
            .expect("seed cache");

        let resolver = ReleaseResolver::new(
            ReleaseScraper::new(config.clone()),
            cache.clone(),
            config,
        );
        let resolved = resolver.resolve().await.expect("resolve");

        let expected = cache.entries_sorted().expect("cache entries");
        assert_eq!(resolved, expected);
        assert_eq!(resolved[0].version, "4.1.1");
    }

    #[tokio::test]
    async fn empty_sources_and_cache_yield_empty_list() {
        let config = unreachable_config();
        let resolver = ReleaseResolver::new(
            ReleaseScraper::new(config.clone()),
            VersionCache::load(temp_path("empty.json")),
            config,
        );
        let resolved = resolver.resolve().await.expect("resolve");
        assert!(resolved.is_empty());
    }

    #[test]
    fn bundled_versions_substitute_mirror_base() {
        let path = temp_path("bundled.json");
        std::fs::write(
            &path,
            r#"{
                "versions": [
                    {
                        "version": "4.1.1",
                        "build_date": "2024-04-16",
                        "download_url": "{URL}/release/Blender4.1/blender-4.1.1-windows-x64.zip",
                        "size": "331.85MB",
                        "description": "Blender 4.1.1 Windows 64-bit",
                        "changes": "Bug fixes"
                    }
                ]
            }"#,
        )
        .expect("write bundled list");

        let config = LauncherConfig {
            mirror_url: "https://mirrors.example.org/blender/".to_string(),
            bundled_versions_file: Some(path.clone()),
            ..LauncherConfig::default()
        };
        let resolver = ReleaseResolver::new(
            ReleaseScraper::new(config.clone()),
            VersionCache::load(temp_path("bundled-cache.json")),
            config,
        );

        let releases = resolver.load_bundled_versions().expect("load bundled");
        assert_eq!(releases.len(), 1);
        assert_eq!(
            releases[0].url,
            "https://mirrors.example.org/blender/release/Blender4.1/blender-4.1.1-windows-x64.zip"
        );
        assert_eq!(
            resolver.cache().len().expect("cache len"),
            1,
            "bundled entries must land in the cache"
        );

        let _ = std::fs::remove_file(&path);
    }
}
