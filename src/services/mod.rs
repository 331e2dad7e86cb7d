//! Service layer for flyer acquisition.
//!
//! Domain logic separated from UI concerns. The CLI drives these services
//! and renders their events.

pub mod dedup;
pub mod descriptor;
pub mod download;

pub use dedup::{find_duplicate, is_duplicate, DuplicateMatch, DuplicateReason};
pub use descriptor::DescriptorParser;
pub use download::{DownloadConfig, DownloadEvent, DownloadResult, DownloadService};
