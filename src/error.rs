//! Error types for flyer acquisition.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while acquiring flyers.
///
/// `Fetch` and `Write` are per-flyer failures that the download loop records
/// and moves past. Everything else aborts the run.
#[derive(Debug, Error)]
pub enum ProspektError {
    #[error("Failed to load listing page {url}: {reason}")]
    Navigation { url: String, reason: String },
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("Metadata store {} is corrupt: {source}", path.display())]
    CorruptStore {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to persist metadata store {}: {source}", path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Browser error: {0}")]
    Browser(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProspektError {
    /// Shorthand for a per-flyer fetch failure.
    pub fn fetch(url: &str, reason: impl std::fmt::Display) -> Self {
        ProspektError::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Shorthand for a listing page navigation failure.
    pub fn navigation(url: &str, reason: impl std::fmt::Display) -> Self {
        ProspektError::Navigation {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error only affects a single flyer.
    pub fn is_per_item(&self) -> bool {
        matches!(self, ProspektError::Fetch { .. } | ProspektError::Write { .. })
    }
}

pub type Result<T> = std::result::Result<T, ProspektError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_item_classification() {
        assert!(ProspektError::fetch("http://a/1.pdf", "timeout").is_per_item());
        assert!(ProspektError::Write {
            path: PathBuf::from("/x"),
            source: std::io::Error::other("disk full"),
        }
        .is_per_item());
        assert!(!ProspektError::navigation("http://a", "timeout").is_per_item());
        assert!(!ProspektError::Config("bad".into()).is_per_item());
    }

    #[test]
    fn test_fetch_message() {
        let err = ProspektError::fetch("http://a/1.pdf", "HTTP 404");
        assert_eq!(err.to_string(), "Failed to fetch http://a/1.pdf: HTTP 404");
    }
}
