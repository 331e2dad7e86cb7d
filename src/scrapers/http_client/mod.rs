//! Thin reqwest wrapper used for PDF downloads and static page fetches.

mod response;
mod user_agent;

pub use response::HttpResponse;
pub use user_agent::{resolve_user_agent, IMPERSONATE_USER_AGENTS, USER_AGENT};

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{FetchedPdf, PdfFetcher};
use crate::error::{ProspektError, Result};

/// HTTP client with a fixed user agent and per-request timeout.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client.
    /// - None: `prospekt/<version>` user agent
    /// - Some("impersonate"): a real browser user agent
    /// - Some(custom): custom user agent string
    pub fn new(timeout: Duration, user_agent_config: Option<&str>) -> Result<Self> {
        let user_agent = resolve_user_agent(user_agent_config);
        let client = Client::builder()
            .user_agent(&user_agent)
            .timeout(timeout)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| ProspektError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Make a GET request.
    pub async fn get(&self, url: &str) -> std::result::Result<HttpResponse, reqwest::Error> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        Ok(HttpResponse::new(response))
    }

    /// Get page content as text, failing on non-2xx responses.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self
            .get(url)
            .await
            .map_err(|e| ProspektError::fetch(url, e))?;
        if !response.is_success() {
            return Err(ProspektError::fetch(url, format!("HTTP {}", response.status)));
        }
        response.text().await.map_err(|e| ProspektError::fetch(url, e))
    }
}

#[async_trait]
impl PdfFetcher for HttpClient {
    async fn fetch_pdf(&self, url: &str) -> Result<FetchedPdf> {
        let response = self
            .get(url)
            .await
            .map_err(|e| ProspektError::fetch(url, e))?;

        if !response.is_success() {
            return Err(ProspektError::fetch(url, format!("HTTP {}", response.status)));
        }

        let content_type = response.content_type().map(|s| s.to_string());
        let final_url = response.final_url.clone();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProspektError::fetch(url, e))?;

        Ok(FetchedPdf {
            final_url,
            content_type,
            bytes,
        })
    }
}
