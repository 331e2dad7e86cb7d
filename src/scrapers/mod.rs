//! Page rendering and fetching for the flyer listing site.
//!
//! The orchestrator only talks to [`PageContentProvider`] and
//! [`PdfFetcher`]; the browser and static implementations live behind them.

pub mod browser;
pub mod http_client;
pub mod links;
pub mod pdf_link;
pub mod static_page;

pub use browser::{BrowserEngineConfig, BrowserFetcher};
pub use http_client::HttpClient;
pub use links::{extract_flyer_links, is_pdf_url, DEFAULT_LINK_PATTERN};
pub use pdf_link::{find_pdf_url, find_viewer_frame, PdfSource};
pub use static_page::StaticPageProvider;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;

use crate::error::Result;

/// A candidate flyer found on the listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlyerLink {
    pub url: String,
    pub title: String,
}

/// Bytes fetched for a flyer.
#[derive(Debug, Clone)]
pub struct FetchedPdf {
    /// URL after redirects.
    pub final_url: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Source of rendered page HTML.
#[async_trait]
pub trait PageContentProvider: Send {
    /// Short name for log output.
    fn name(&self) -> &'static str;

    /// Load the listing page, dismiss the cookie banner and wait until links
    /// containing `link_pattern` are present. Returns the rendered HTML.
    ///
    /// Any failure here is a navigation error.
    async fn open_listing(&mut self, url: &str, link_pattern: &str) -> Result<String>;

    /// Render an arbitrary page and return its HTML.
    async fn render(&mut self, url: &str) -> Result<String>;

    /// Render `url`, press its download button and return the updated HTML.
    ///
    /// Returns `None` when the page has no download button or the provider
    /// cannot interact with pages.
    async fn click_download(&mut self, _url: &str) -> Result<Option<String>> {
        Ok(None)
    }

    /// Write a snapshot of the current page into `dir`.
    ///
    /// Returns `None` when there is nothing to snapshot.
    async fn capture_diagnostic(&mut self, dir: &Path) -> Result<Option<PathBuf>>;

    /// Release any resources. Safe to call more than once.
    async fn close(&mut self);
}

/// Fetches flyer bytes.
#[async_trait]
pub trait PdfFetcher: Send + Sync {
    /// Fetch `url`. Non-2xx responses and timeouts are fetch errors.
    async fn fetch_pdf(&self, url: &str) -> Result<FetchedPdf>;
}

/// `<dir>/<prefix>_<unix-ts>.<ext>`.
pub fn diagnostic_path(dir: &Path, prefix: &str, extension: &str) -> PathBuf {
    dir.join(format!("{}_{}.{}", prefix, Utc::now().timestamp(), extension))
}
