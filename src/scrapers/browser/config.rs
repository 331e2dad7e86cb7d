//! Browser engine configuration.

use serde::{Deserialize, Serialize};

/// Browser engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserEngineConfig {
    /// Run in headless mode (default: true).
    /// Set to false to watch the page while debugging.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Page load timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// How long to look for the cookie consent button, in seconds.
    #[serde(default = "default_cookie_timeout")]
    pub cookie_timeout: u64,

    /// Label of the consent button to click.
    #[serde(default = "default_cookie_button")]
    pub cookie_button_text: String,

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to existing browser instead of launching one.
    #[serde(default)]
    pub remote_url: Option<String>,

    /// User agent override applied to every page.
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            timeout: default_timeout(),
            cookie_timeout: default_cookie_timeout(),
            cookie_button_text: default_cookie_button(),
            chrome_args: Vec::new(),
            remote_url: None,
            user_agent: None,
        }
    }
}

pub fn default_headless() -> bool {
    true
}

pub fn default_timeout() -> u64 {
    30
}

pub fn default_cookie_timeout() -> u64 {
    10
}

pub fn default_cookie_button() -> String {
    "Alle bestätigen".to_string()
}
