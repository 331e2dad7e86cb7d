//! Prospekt - Aldi Süd flyer downloader.
//!
//! Scrapes the retailer's flyer listing, resolves each flyer to its PDF,
//! and stores new ones alongside a JSON metadata file used for duplicate
//! detection across runs.

pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod scrapers;
pub mod services;

pub use error::{ProspektError, Result};
pub use models::{FlyerDescriptor, FlyerRecord, FlyerType, Month};
pub use repository::{JsonMetadataStore, MemoryMetadataStore, MetadataStore};
pub use services::{DownloadConfig, DownloadEvent, DownloadResult, DownloadService};
