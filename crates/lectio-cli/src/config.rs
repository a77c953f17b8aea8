//! Environment configuration for the `lectio` binary.

use std::path::PathBuf;

use miette::Diagnostic;
use reqwest::Url;

#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("no config directory on this platform; set LECTIO_STORE")]
    #[diagnostic(code(lectio::config::no_config_dir))]
    NoConfigDir,

    #[error("invalid passage url {url:?}: {message}")]
    #[diagnostic(code(lectio::config::url))]
    UrlParse { url: String, message: String },
}

/// Where records live and where passages come from.
#[derive(Debug, Clone, PartialEq)]
pub struct LectioConfig {
    pub store_path: PathBuf,
    pub passage_url: Url,
}

impl LectioConfig {
    pub const DEFAULT_PASSAGE_URL: &'static str = "http://localhost:3001/api/get-passage";

    /// Load configuration from environment variables.
    ///
    /// Optional env vars:
    /// - `LECTIO_STORE`: JSON store file (default: `<config dir>/lectio/store.json`)
    /// - `LECTIO_PASSAGE_URL`: passage endpoint (default: `http://localhost:3001/api/get-passage`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let store_path = match lookup("LECTIO_STORE").filter(|s| !s.is_empty()) {
            Some(path) => PathBuf::from(path),
            None => Self::default_store_path()?,
        };
        let url = lookup("LECTIO_PASSAGE_URL")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_PASSAGE_URL.to_string());

        Ok(Self {
            store_path,
            passage_url: parse_url(url)?,
        })
    }

    pub fn default_store_path() -> Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join("lectio").join("store.json"))
    }

    /// Apply command-line overrides.
    pub fn with_overrides(
        mut self,
        store_path: Option<PathBuf>,
        passage_url: Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = store_path {
            self.store_path = path;
        }
        if let Some(url) = passage_url {
            self.passage_url = parse_url(url)?;
        }
        Ok(self)
    }
}

fn parse_url(url: String) -> Result<Url, ConfigError> {
    Url::parse(&url).map_err(|e| ConfigError::UrlParse {
        message: e.to_string(),
        url,
    })
}
