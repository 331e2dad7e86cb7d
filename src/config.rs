//! Configuration management using the prefer crate for file discovery.
//!
//! Precedence: command-line flags (including their environment variables),
//! then the config file, then built-in defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ProspektError, Result};
use crate::repository::METADATA_FILENAME;
use crate::scrapers::{BrowserEngineConfig, DEFAULT_LINK_PATTERN};

/// Flyer listing page.
pub const DEFAULT_LISTING_URL: &str = "https://www.aldi-sued.de/de/angebote/prospekte.html";

/// Default output directory, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "./prospekte";

/// Leading component of generated filenames.
pub const DEFAULT_STORE_NAME: &str = "Aldi_Sued";

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory flyers and the metadata file are written to.
    pub output_dir: PathBuf,
    pub listing_url: String,
    /// Substring identifying flyer links.
    pub link_pattern: String,
    pub store_name: String,
    pub metadata_filename: String,
    /// None, "impersonate" or a literal user agent.
    pub user_agent: Option<String>,
    /// Per-request timeout for PDF downloads, in seconds.
    pub request_timeout: u64,
    pub browser: BrowserEngineConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            listing_url: DEFAULT_LISTING_URL.to_string(),
            link_pattern: DEFAULT_LINK_PATTERN.to_string(),
            store_name: DEFAULT_STORE_NAME.to_string(),
            metadata_filename: METADATA_FILENAME.to_string(),
            user_agent: Some("impersonate".to_string()),
            request_timeout: 60,
            browser: BrowserEngineConfig::default(),
        }
    }
}

impl Settings {
    /// Full path of the metadata store.
    pub fn metadata_path(&self) -> PathBuf {
        self.output_dir.join(&self.metadata_filename)
    }
}

/// `[browser]` table of the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrowserSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headless: Option<bool>,
    /// Page load timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_button_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chrome_args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    #[serde(default)]
    pub browser: BrowserSection,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Discover a `prospekt.{toml,yaml,json,...}` file via prefer.
    /// No file found means an empty config.
    pub async fn load() -> Result<Self> {
        match prefer::load("prospekt").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => Self::load_from_path(path).await,
                None => Ok(Self::default()),
            },
            Err(e) => {
                tracing::debug!("No config file discovered: {}", e);
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific file path.
    /// The format is chosen by extension: TOML, YAML, otherwise JSON.
    pub async fn load_from_path(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            ProspektError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let mut config = Self::parse(&contents, path)?;
        config.source_path = Some(path.to_path_buf());
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let parsed = match ext {
            "toml" => toml::from_str(contents).map_err(|e| e.to_string()),
            "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| e.to_string()),
            _ => serde_json::from_str(contents).map_err(|e| e.to_string()),
        };
        parsed.map_err(|e| {
            ProspektError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Directory of the config file, if it came from one.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are joined onto `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref output_dir) = self.output_dir {
            settings.output_dir = self.resolve_path(output_dir, base_dir);
        }
        if let Some(ref url) = self.listing_url {
            settings.listing_url = url.clone();
        }
        if let Some(ref pattern) = self.link_pattern {
            settings.link_pattern = pattern.clone();
        }
        if let Some(ref store) = self.store_name {
            settings.store_name = store.clone();
        }
        if let Some(ref filename) = self.metadata_filename {
            settings.metadata_filename = filename.clone();
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = Some(user_agent.clone());
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }

        let browser = &self.browser;
        if let Some(headless) = browser.headless {
            settings.browser.headless = headless;
        }
        if let Some(timeout) = browser.timeout {
            settings.browser.timeout = timeout;
        }
        if let Some(timeout) = browser.cookie_timeout {
            settings.browser.cookie_timeout = timeout;
        }
        if let Some(ref text) = browser.cookie_button_text {
            settings.browser.cookie_button_text = text.clone();
        }
        if !browser.chrome_args.is_empty() {
            settings.browser.chrome_args = browser.chrome_args.clone();
        }
        if let Some(ref remote) = browser.remote_url {
            settings.browser.remote_url = Some(remote.clone());
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Use CWD for relative paths instead of config file directory.
    pub use_cwd: bool,
}

/// Load settings with explicit options.
/// Returns (Settings, Config) tuple.
pub async fn load_settings_with_options(options: LoadOptions) -> Result<(Settings, Config)> {
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await?,
        None => Config::load().await?,
    };

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let base_dir = if options.use_cwd {
        cwd
    } else {
        config.base_dir().unwrap_or(cwd)
    };

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);

    if settings.request_timeout == 0 || settings.browser.timeout == 0 {
        return Err(ProspektError::Config(
            "timeouts must be greater than zero".to_string(),
        ));
    }
    if settings.link_pattern.is_empty() {
        return Err(ProspektError::Config("link_pattern must not be empty".to_string()));
    }

    Ok((settings, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.output_dir, PathBuf::from("./prospekte"));
        assert_eq!(settings.listing_url, DEFAULT_LISTING_URL);
        assert!(settings.browser.headless);
        assert_eq!(
            settings.metadata_path(),
            PathBuf::from("./prospekte/prospekte_metadata.json")
        );
    }

    #[tokio::test]
    async fn test_toml_config_applies_and_resolves_relative_paths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prospekt.toml");
        std::fs::write(
            &path,
            r#"
output_dir = "flyers"
request_timeout = 15

[browser]
headless = false
cookie_timeout = 3
"#,
        )
        .unwrap();

        let (settings, config) = load_settings_with_options(LoadOptions {
            config_path: Some(path.clone()),
            use_cwd: false,
        })
        .await
        .unwrap();

        assert_eq!(config.source_path.as_deref(), Some(path.as_path()));
        assert_eq!(settings.output_dir, dir.path().join("flyers"));
        assert_eq!(settings.request_timeout, 15);
        assert!(!settings.browser.headless);
        assert_eq!(settings.browser.cookie_timeout, 3);
        assert_eq!(settings.browser.timeout, 30);
    }

    #[tokio::test]
    async fn test_yaml_and_json_configs() {
        let dir = tempdir().unwrap();
        let yaml = dir.path().join("prospekt.yaml");
        std::fs::write(&yaml, "store_name: Aldi_Nord\n").unwrap();
        let config = Config::load_from_path(&yaml).await.unwrap();
        assert_eq!(config.store_name.as_deref(), Some("Aldi_Nord"));

        let json = dir.path().join("prospekt.json");
        std::fs::write(&json, r#"{"listing_url": "http://localhost/x.html"}"#).unwrap();
        let config = Config::load_from_path(&json).await.unwrap();
        assert_eq!(config.listing_url.as_deref(), Some("http://localhost/x.html"));
    }

    #[tokio::test]
    async fn test_invalid_config_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prospekt.toml");
        std::fs::write(&path, "request_timeout = \"soon\"").unwrap();
        let err = Config::load_from_path(&path).await.unwrap_err();
        assert!(matches!(err, ProspektError::Config(_)));
    }

    #[tokio::test]
    async fn test_missing_explicit_config_is_an_error() {
        let dir = tempdir().unwrap();
        let result = load_settings_with_options(LoadOptions {
            config_path: Some(dir.path().join("nope.toml")),
            use_cwd: false,
        })
        .await;
        assert!(matches!(result, Err(ProspektError::Config(_))));
    }

    #[tokio::test]
    async fn test_zero_timeout_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prospekt.json");
        std::fs::write(&path, r#"{"request_timeout": 0}"#).unwrap();
        let result = load_settings_with_options(LoadOptions {
            config_path: Some(path),
            use_cwd: false,
        })
        .await;
        assert!(matches!(result, Err(ProspektError::Config(_))));
    }

    #[test]
    fn test_tilde_is_expanded() {
        let config = Config::default();
        let resolved = config.resolve_path("~/flyers", Path::new("/base"));
        assert!(!resolved.to_string_lossy().starts_with('~'));
        assert_eq!(
            config.resolve_path("/abs/flyers", Path::new("/base")),
            PathBuf::from("/abs/flyers")
        );
    }
}
