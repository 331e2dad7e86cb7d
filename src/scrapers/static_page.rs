//! Plain HTTP page provider for pages that render without JavaScript.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use super::{diagnostic_path, HttpClient, PageContentProvider};
use crate::error::{ProspektError, Result};

/// Fetches pages with a plain GET. No cookie banner, no script execution.
pub struct StaticPageProvider {
    client: HttpClient,
    last_page: Option<String>,
}

impl StaticPageProvider {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            last_page: None,
        }
    }
}

#[async_trait]
impl PageContentProvider for StaticPageProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn open_listing(&mut self, url: &str, link_pattern: &str) -> Result<String> {
        info!("Fetching listing page {}", url);
        let html = self
            .client
            .get_text(url)
            .await
            .map_err(|e| ProspektError::navigation(url, e))?;
        if !html.contains(link_pattern) {
            debug!("Listing page has no '{}' links in its static HTML", link_pattern);
        }
        self.last_page = Some(html.clone());
        Ok(html)
    }

    async fn render(&mut self, url: &str) -> Result<String> {
        let html = self.client.get_text(url).await?;
        self.last_page = Some(html.clone());
        Ok(html)
    }

    async fn capture_diagnostic(&mut self, dir: &Path) -> Result<Option<PathBuf>> {
        let Some(html) = self.last_page.as_ref() else {
            return Ok(None);
        };
        let path = diagnostic_path(dir, "debug_page", "html");
        tokio::fs::write(&path, html)
            .await
            .map_err(|source| ProspektError::Write {
                path: path.clone(),
                source,
            })?;
        Ok(Some(path))
    }

    async fn close(&mut self) {
        self.last_page = None;
    }
}
