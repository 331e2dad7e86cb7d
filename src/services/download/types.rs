//! Download service types and events.

use std::path::PathBuf;

use crate::services::dedup::DuplicateReason;

/// Events emitted during a download run.
#[derive(Debug, Clone)]
pub enum DownloadEvent {
    /// Listing page parsed
    LinksFound { count: usize },
    /// Processing started for a link
    Started {
        index: usize,
        url: String,
        title: String,
    },
    /// Link skipped as a duplicate of a stored flyer
    Skipped {
        url: String,
        reason: DuplicateReason,
        existing: String,
    },
    /// Flyer written to disk and recorded
    Completed {
        url: String,
        path: PathBuf,
        bytes: u64,
    },
    /// Flyer could not be fetched or written
    Failed {
        url: String,
        error: String,
        diagnostic: Option<PathBuf>,
    },
}

/// Result of a download run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Paths written during this run, in order.
    pub files: Vec<PathBuf>,
}

/// Configuration for download service.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub listing_url: String,
    /// Substring identifying flyer links on the listing page.
    pub link_pattern: String,
    /// Leading filename component.
    pub store_name: String,
}
