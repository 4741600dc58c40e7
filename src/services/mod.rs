pub mod archive_extractor;
pub mod chunk_downloader;
pub mod download_manager;
pub mod release_scraper;
pub mod single_stream;
pub mod version_cache;
pub mod version_resolver;

pub use archive_extractor::extract_archive;
pub use download_manager::{DownloadEvent, DownloadManager};
pub use release_scraper::ReleaseScraper;
pub use version_cache::VersionCache;
pub use version_resolver::ReleaseResolver;
