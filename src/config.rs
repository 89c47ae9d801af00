//! Router configuration.
//!
//! Every field has a default, so an empty JSON object (or
//! [`RouterConfig::default`]) yields a working router.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Default block size used when streaming static files.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Errors produced while loading a [`RouterConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid router config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("chunk_size must be greater than zero")]
    InvalidChunkSize,
}

/// Settings shared by every route registered on a [`Router`](crate::Router).
///
/// # Examples
///
/// ```
/// use rttp_dispatch::config::RouterConfig;
///
/// let config = RouterConfig::from_json(r#"{ "views_dir": "/srv/app/views", "chunk_size": 4096 }"#).unwrap();
/// assert_eq!(config.chunk_size, 4096);
/// assert!(config.log_requests);
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RouterConfig {
    /// Template root given to every new context.
    pub views_dir: Option<PathBuf>,

    /// Directory holding `default_index.html` and `not_found.html` for the
    /// built-in not-found handler. Embedded pages are used when unset.
    pub pages_dir: Option<PathBuf>,

    /// Block size, in bytes, for static file streaming.
    pub chunk_size: usize,

    /// Install [`log_event`](crate::filter::log_event) as the first after-filter.
    pub log_requests: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            views_dir: None,
            pages_dir: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            log_requests: true,
        }
    }
}

impl RouterConfig {
    /// Parses and validates a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: RouterConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize);
        }
        Ok(())
    }

    /// The configured views directory, or `<executable dir>/views`.
    pub fn resolved_views_dir(&self) -> PathBuf {
        self.views_dir.clone().unwrap_or_else(default_views_dir)
    }
}

/// `views` next to the running executable, falling back to a relative `views`.
pub fn default_views_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .as_deref()
        .and_then(Path::parent)
        .map(|dir| dir.join("views"))
        .unwrap_or_else(|| PathBuf::from("views"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = RouterConfig::from_json("{}").unwrap();
        assert_eq!(config, RouterConfig::default());
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let err = RouterConfig::from_json(r#"{ "chunk_size": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidChunkSize));
    }

    #[test]
    fn unknown_field_rejected() {
        let err = RouterConfig::from_json(r#"{ "view_dir": "x" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn explicit_views_dir_wins() {
        let config = RouterConfig {
            views_dir: Some(PathBuf::from("/tmp/views")),
            ..RouterConfig::default()
        };
        assert_eq!(config.resolved_views_dir(), PathBuf::from("/tmp/views"));
    }

    #[test]
    fn default_views_dir_ends_in_views() {
        assert!(default_views_dir().ends_with("views"));
    }
}
