use serde::{Deserialize, Serialize};

/// Metadata describing one downloadable Blender release.
///
/// Built by a scraper strategy or loaded from the version cache. `version`
/// is the unique key (dotted numeric string). `url` may point either at a
/// concrete archive file or at a release directory that still needs to be
/// resolved to a file before downloading.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub version: String,
    #[serde(default)]
    pub build_date: Option<String>,
    pub url: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub changes: Option<String>,
}

impl ReleaseInfo {
    pub fn new(version: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            build_date: None,
            url: url.into(),
            size: None,
            description: None,
            changes: None,
        }
    }

    /// True when the URL already names a downloadable archive rather than a
    /// directory listing.
    pub fn has_concrete_url(&self) -> bool {
        let lower = self.url.to_ascii_lowercase();
        lower.ends_with(".zip") || lower.ends_with(".msi")
    }
}

/// Numeric ordering key for dotted version strings. Non-numeric components
/// rank as zero, so `"4.1.0"` sorts above `"4.1.beta"`.
pub(crate) fn version_sort_key(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map(|part| part.parse::<u64>().unwrap_or(0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concrete_url_detection() {
        let zip = ReleaseInfo::new("4.1.1", "https://example.org/blender-4.1.1-windows-x64.zip");
        let dir = ReleaseInfo::new("4.1", "https://example.org/release/Blender4.1/");
        assert!(zip.has_concrete_url());
        assert!(!dir.has_concrete_url());
    }

    #[test]
    fn version_keys_order_numerically() {
        assert!(version_sort_key("4.10.0") > version_sort_key("4.9.1"));
        assert!(version_sort_key("4.2.0") > version_sort_key("4.2"));
        assert_eq!(version_sort_key("4.1.beta"), vec![4, 1, 0]);
    }
}
