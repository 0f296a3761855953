//! Configuration loading and validation.
//!
//! Loads `doc-chat.toml` (or the file named by `DOC_CHAT_CONFIG`), with
//! `GEMINI_API_KEY` overriding the configured key.

use crate::llm::gemini::GeminiConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "doc-chat.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address for the HTTP API
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Upper bound on request bodies, which carry whole PDFs
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind() -> String {
    "127.0.0.1:8787".into()
}
fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl AppConfig {
    /// Load from the default location and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("DOC_CHAT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = Self::load_from(&path)?;
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            if !key.trim().is_empty() {
                config.gemini.api_key = key;
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gemini.api_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "Gemini API key not configured (set gemini.api_key or GEMINI_API_KEY)".into(),
            ));
        }
        if self.gemini.model.trim().is_empty() {
            return Err(ConfigError::Invalid("gemini.model must not be empty".into()));
        }
        if self.gemini.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "gemini.timeout_secs must be greater than 0".into(),
            ));
        }
        self.bind_addr()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("server.bind {:?}: {}", self.server.bind, e)))
    }
}

/// Mask a secret for display: first and last four characters only.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "****".into()
    }
}
