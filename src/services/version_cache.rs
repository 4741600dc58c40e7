use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::errors::{LauncherError, Result};
use crate::models::{version_sort_key, ReleaseInfo};
use crate::utils::file::write_atomic;

/// Durable `version -> ReleaseInfo` store backing release discovery when
/// every live source is unreachable.
///
/// The whole document is loaded once at startup and written back in full
/// after updates. Entries are merged, never evicted: a newer descriptor for
/// the same version key overwrites the old one, everything else survives.
#[derive(Clone)]
pub struct VersionCache {
    path: PathBuf,
    entries: Arc<Mutex<HashMap<String, ReleaseInfo>>>,
}

impl VersionCache {
    /// Open the cache at `path`, loading any existing document. A missing
    /// or unreadable file degrades to an empty cache rather than an error.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, ReleaseInfo>>(&raw) {
                Ok(parsed) => {
                    tracing::info!("loaded {} cached release entries", parsed.len());
                    parsed
                }
                Err(err) => {
                    tracing::warn!("version cache {} unreadable: {}", path.display(), err);
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        Self {
            path,
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    pub fn insert(&self, release: ReleaseInfo) -> Result<()> {
        self.lock()?.insert(release.version.clone(), release);
        Ok(())
    }

    /// Merge every descriptor into the cache, overwriting only matching
    /// version keys.
    pub fn merge(&self, releases: &[ReleaseInfo]) -> Result<()> {
        let mut guard = self.lock()?;
        for release in releases {
            guard.insert(release.version.clone(), release.clone());
        }
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    /// All cached descriptors, newest version first.
    pub fn entries_sorted(&self) -> Result<Vec<ReleaseInfo>> {
        let mut entries: Vec<ReleaseInfo> = self.lock()?.values().cloned().collect();
        entries.sort_by(|a, b| version_sort_key(&b.version).cmp(&version_sort_key(&a.version)));
        Ok(entries)
    }

    /// Flush the full document to disk, pretty-printed UTF-8 JSON.
    pub fn save(&self) -> Result<()> {
        let snapshot = self.lock()?.clone();
        let payload = serde_json::to_string_pretty(&snapshot)?;
        write_atomic(&self.path, payload.as_bytes())?;
        tracing::debug!(
            "version cache saved: {} entries -> {}",
            snapshot.len(),
            self.path.display()
        );
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, ReleaseInfo>>> {
        self.entries
            .lock()
            .map_err(|_| LauncherError::Config("version cache lock poisoned".to_string()))
    }
}
