//! Core download subsystem of the Vortex Blender launcher.
//!
//! The crate discovers downloadable Blender releases from several unreliable
//! web sources (directory indexes, a mirror, the official download page),
//! caches what it finds, and retrieves release archives efficiently with
//! parallel ranged HTTP transfers. Presentation layers stay outside: callers
//! hand a [`models::ReleaseInfo`] to the [`services::DownloadManager`] and
//! listen on its event channel for progress and terminal notifications.

pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod services;
pub mod utils;

pub use config::LauncherConfig;
pub use errors::{LauncherError, Result};
pub use models::ReleaseInfo;
pub use services::{
    extract_archive, DownloadEvent, DownloadManager, ReleaseResolver, ReleaseScraper, VersionCache,
};
