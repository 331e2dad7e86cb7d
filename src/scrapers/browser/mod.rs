//! Headless Chromium page provider for the JavaScript-rendered listing page.
//!
//! Uses chromiumoxide (CDP). One browser and one tab are kept for the whole
//! run so the diagnostic screenshot shows whatever was loaded last.

mod config;

pub use config::BrowserEngineConfig;

use std::path::{Path, PathBuf};
#[cfg(feature = "browser")]
use std::time::Duration;

use async_trait::async_trait;
#[cfg(feature = "browser")]
use tracing::{debug, info, warn};

use super::PageContentProvider;
#[cfg(feature = "browser")]
use super::diagnostic_path;
use crate::error::{ProspektError, Result};

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
#[cfg(feature = "browser")]
use chromiumoxide::page::ScreenshotParams;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;

#[cfg(feature = "browser")]
const READY_STATE_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete' || document.readyState === 'interactive') {
            resolve(document.readyState);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
            setTimeout(() => resolve('timeout'), 10000);
        }
    })
"#;

#[cfg(feature = "browser")]
const HIDE_WEBDRIVER_SCRIPT: &str = r#"
    Object.defineProperty(navigator, 'webdriver', {
        get: () => undefined,
        configurable: true
    });
"#;

#[cfg(feature = "browser")]
const CLICK_DOWNLOAD_SCRIPT: &str = r#"
    (() => {
        const buttons = document.querySelectorAll('button');
        for (const el of buttons) {
            const text = (el.innerText || el.textContent || '');
            if (text.includes('Download') || (el.className || '').toString().includes('download')) {
                el.click();
                return true;
            }
        }
        return false;
    })()
"#;

#[cfg(feature = "browser")]
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Time given to the page to insert the PDF link after a download click.
#[cfg(feature = "browser")]
const DOWNLOAD_REVEAL_DELAY: Duration = Duration::from_secs(2);

/// Browser-backed page provider.
#[cfg(feature = "browser")]
pub struct BrowserFetcher {
    config: BrowserEngineConfig,
    browser: Option<Browser>,
    handler: Option<tokio::task::JoinHandle<()>>,
    page: Option<Page>,
}

#[cfg(feature = "browser")]
impl BrowserFetcher {
    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];

    /// Create a new browser fetcher. The browser is launched on first use.
    pub fn new(config: BrowserEngineConfig) -> Self {
        Self {
            config,
            browser: None,
            handler: None,
            page: None,
        }
    }

    fn find_chrome() -> Result<PathBuf> {
        for path in Self::CHROME_PATHS {
            let p = Path::new(path);
            if p.exists() {
                debug!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in [
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(path) = which::which(cmd) {
                debug!("Found Chrome in PATH: {}", path.display());
                return Ok(path);
            }
        }

        Err(ProspektError::Browser(
            "Chrome/Chromium not found. Install it, set browser.remote_url, or use --static"
                .to_string(),
        ))
    }

    /// Launch or connect to the browser if not already running.
    async fn ensure_browser(&mut self) -> Result<()> {
        if self.browser.is_some() {
            return Ok(());
        }

        let (browser, mut handler) = match self.config.remote_url.clone() {
            Some(remote_url) => self.connect_remote(&remote_url).await?,
            None => {
                info!("Launching browser (headless={})", self.config.headless);
                let chrome_path = Self::find_chrome()?;

                let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);

                // with_head means NOT headless
                if !self.config.headless {
                    builder = builder.with_head();
                }

                builder = builder
                    .arg("--disable-blink-features=AutomationControlled")
                    .arg("--disable-infobars")
                    .arg("--disable-dev-shm-usage")
                    .arg("--no-first-run")
                    .arg("--no-default-browser-check")
                    .arg("--no-sandbox")
                    .arg("--disable-gpu")
                    .arg("--lang=de-DE");

                for arg in &self.config.chrome_args {
                    builder = builder.arg(arg);
                }

                let config = builder.build().map_err(|e| {
                    ProspektError::Browser(format!("Failed to build browser config: {}", e))
                })?;

                Browser::launch(config).await.map_err(|e| {
                    ProspektError::Browser(format!("Failed to launch browser: {}", e))
                })?
            }
        };

        self.handler = Some(tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        }));
        self.browser = Some(browser);

        Ok(())
    }

    /// Connect to a remote Chrome instance.
    async fn connect_remote(
        &self,
        url: &str,
    ) -> Result<(Browser, chromiumoxide::handler::Handler)> {
        info!("Connecting to remote browser at {}", url);

        // The WebSocket URL comes from the /json/version endpoint
        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let remote_err =
            |e: reqwest::Error| ProspektError::Browser(format!("Remote browser unreachable: {}", e));
        let resp: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .send()
            .await
            .map_err(remote_err)?
            .json()
            .await
            .map_err(remote_err)?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProspektError::Browser("No webSocketDebuggerUrl in response".into()))?;

        let handler_config = chromiumoxide::handler::HandlerConfig {
            request_timeout: Duration::from_secs(self.config.timeout),
            ..Default::default()
        };

        Browser::connect_with_config(ws_url, handler_config)
            .await
            .map_err(|e| ProspektError::Browser(format!("Failed to connect to remote browser: {}", e)))
    }

    /// The shared tab, opened on first use.
    async fn page(&mut self) -> Result<Page> {
        if let Some(page) = &self.page {
            return Ok(page.clone());
        }

        self.ensure_browser().await?;
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| ProspektError::Browser("Browser not running".into()))?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ProspektError::Browser(format!("Failed to open tab: {}", e)))?;

        if let Some(ref user_agent) = self.config.user_agent {
            page.execute(SetUserAgentOverrideParams::new(user_agent.clone()))
                .await
                .map_err(|e| ProspektError::Browser(format!("Failed to set user agent: {}", e)))?;
        }

        self.page = Some(page.clone());
        Ok(page)
    }

    /// Navigate and wait for the document to be ready.
    async fn navigate(&self, page: &Page, url: &str) -> std::result::Result<(), String> {
        debug!("Navigating to {}", url);
        let timeout = Duration::from_secs(self.config.timeout);

        match tokio::time::timeout(timeout, page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(e.to_string()),
            Err(_) => return Err(format!("timed out after {}s", self.config.timeout)),
        }

        match tokio::time::timeout(timeout, page.evaluate(READY_STATE_SCRIPT.to_string())).await {
            Ok(Ok(result)) => {
                let state: String = result
                    .into_value()
                    .unwrap_or_else(|_| "unknown".to_string());
                debug!("Page ready state: {}", state);
            }
            Ok(Err(e)) => debug!("Could not check ready state: {}", e),
            Err(_) => warn!("Timeout waiting for page ready state"),
        }

        if let Err(e) = page.evaluate(HIDE_WEBDRIVER_SCRIPT.to_string()).await {
            debug!("Webdriver patch skipped: {}", e);
        }

        Ok(())
    }

    /// Click the consent button if it shows up within the cookie timeout.
    async fn accept_cookies(&self, page: &Page) -> bool {
        let label = serde_json::to_string(&self.config.cookie_button_text)
            .unwrap_or_else(|_| "\"\"".to_string());
        let script = format!(
            r#"(() => {{
                const label = {label};
                const candidates = document.querySelectorAll('button, [role="button"]');
                for (const el of candidates) {{
                    const text = (el.innerText || el.textContent || '').trim();
                    if (text.includes(label)) {{
                        el.click();
                        return true;
                    }}
                }}
                return false;
            }})()"#
        );

        let deadline = tokio::time::Instant::now() + Duration::from_secs(self.config.cookie_timeout);
        while tokio::time::Instant::now() < deadline {
            if let Ok(result) = page.evaluate(script.clone()).await {
                if result.into_value::<bool>().unwrap_or(false) {
                    info!("Accepted cookie banner");
                    return true;
                }
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        debug!(
            "No cookie banner within {}s",
            self.config.cookie_timeout
        );
        false
    }

    /// Wait until an element matching `selector` exists.
    async fn wait_for_selector(&self, page: &Page, selector: &str) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(self.config.timeout);
        while tokio::time::Instant::now() < deadline {
            if page.find_element(selector).await.is_ok() {
                return true;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        false
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl PageContentProvider for BrowserFetcher {
    fn name(&self) -> &'static str {
        "browser"
    }

    async fn open_listing(&mut self, url: &str, link_pattern: &str) -> Result<String> {
        let page = self.page().await?;
        info!("Loading listing page {}", url);
        self.navigate(&page, url)
            .await
            .map_err(|reason| ProspektError::navigation(url, reason))?;

        self.accept_cookies(&page).await;

        let selector = format!("a[href*='{}']", link_pattern.replace('\'', "\\'"));
        if !self.wait_for_selector(&page, &selector).await {
            warn!("No flyer links appeared on {}", url);
        }

        page.content()
            .await
            .map_err(|e| ProspektError::navigation(url, e))
    }

    async fn render(&mut self, url: &str) -> Result<String> {
        let page = self.page().await?;
        self.navigate(&page, url)
            .await
            .map_err(|reason| ProspektError::fetch(url, reason))?;
        page.content().await.map_err(|e| ProspektError::fetch(url, e))
    }

    async fn click_download(&mut self, url: &str) -> Result<Option<String>> {
        let page = self.page().await?;
        self.navigate(&page, url)
            .await
            .map_err(|reason| ProspektError::fetch(url, reason))?;

        let clicked = match page.evaluate(CLICK_DOWNLOAD_SCRIPT.to_string()).await {
            Ok(result) => result.into_value::<bool>().unwrap_or(false),
            Err(e) => {
                debug!("Download button lookup failed on {}: {}", url, e);
                false
            }
        };
        if !clicked {
            return Ok(None);
        }

        debug!("Clicked download button on {}", url);
        tokio::time::sleep(DOWNLOAD_REVEAL_DELAY).await;
        page.content()
            .await
            .map(Some)
            .map_err(|e| ProspektError::fetch(url, e))
    }

    async fn capture_diagnostic(&mut self, dir: &Path) -> Result<Option<PathBuf>> {
        let Some(page) = self.page.clone() else {
            return Ok(None);
        };

        let png = page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .map_err(|e| ProspektError::Browser(format!("Screenshot failed: {}", e)))?;

        let path = diagnostic_path(dir, "debug_screenshot", "png");
        tokio::fs::write(&path, png)
            .await
            .map_err(|source| ProspektError::Write {
                path: path.clone(),
                source,
            })?;
        Ok(Some(path))
    }

    async fn close(&mut self) {
        if let Some(page) = self.page.take() {
            let _ = page.close().await;
        }
        if let Some(mut browser) = self.browser.take() {
            if self.config.remote_url.is_none() {
                if let Err(e) = browser.close().await {
                    debug!("Browser close failed: {}", e);
                }
                let _ = browser.wait().await;
            }
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}

// Stub for when browser feature is disabled
#[cfg(not(feature = "browser"))]
pub struct BrowserFetcher {
    #[allow(dead_code)]
    config: BrowserEngineConfig,
}

#[cfg(not(feature = "browser"))]
impl BrowserFetcher {
    pub fn new(config: BrowserEngineConfig) -> Self {
        Self { config }
    }

    fn unavailable() -> ProspektError {
        ProspektError::Browser(
            "Browser support not compiled. Rebuild with --features browser or use --static"
                .to_string(),
        )
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl PageContentProvider for BrowserFetcher {
    fn name(&self) -> &'static str {
        "browser"
    }

    async fn open_listing(&mut self, _url: &str, _link_pattern: &str) -> Result<String> {
        Err(Self::unavailable())
    }

    async fn render(&mut self, _url: &str) -> Result<String> {
        Err(Self::unavailable())
    }

    async fn capture_diagnostic(&mut self, _dir: &Path) -> Result<Option<PathBuf>> {
        Ok(None)
    }

    async fn close(&mut self) {}
}
