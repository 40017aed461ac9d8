//! Configuration for the aggregation service.
//!
//! The config file is optional — a missing file yields `Config::default()`,
//! which matches the compiled-in behavior of the original deployment.
//! The feed list itself is a compiled-in constant; the file only tunes the
//! cache window, per-feed cap, fetch timeout and listen port.
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::model::FeedSource;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration
// ============================================================================

/// The compiled-in feed list. Read-only for the process lifetime.
const DEFAULT_FEEDS: &[(&str, &str)] = &[
    ("OpenAI Blog", "https://openai.com/blog/rss.xml"),
    ("Hugging Face Blog", "https://huggingface.co/blog/feed.xml"),
    ("Google AI Blog", "https://blog.research.google/feeds/posts/default"),
    ("DeepMind Blog", "https://deepmind.google/blog/rss.xml"),
    (
        "MIT News AI",
        "https://news.mit.edu/rss/topic/artificial-intelligence2",
    ),
];

/// Service configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be
/// specified. Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds a successful aggregation stays fresh. 300 = 5 minutes.
    pub cache_ttl_seconds: u64,

    /// Maximum articles taken from any single feed.
    pub per_feed_limit: usize,

    /// Per-request timeout for outbound feed fetches, in seconds.
    pub fetch_timeout_seconds: u64,

    /// TCP port the API listens on.
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: 300,
            per_feed_limit: 10,
            fetch_timeout_seconds: 10,
            port: 5000,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading to bound memory use on a
        // corrupted or hostile file
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse as a raw table first to flag likely typos
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "cache_ttl_seconds",
                "per_feed_limit",
                "fetch_timeout_seconds",
                "port",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            cache_ttl_seconds = config.cache_ttl_seconds,
            "Loaded configuration"
        );
        Ok(config)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }
}

/// Builds the process-wide source list from the compiled-in feeds.
///
/// Sources with unusable URLs are skipped with a warning rather than
/// aborting startup — the aggregator treats a short list the same way it
/// treats a failing feed.
pub fn feed_sources() -> Vec<FeedSource> {
    DEFAULT_FEEDS
        .iter()
        .filter_map(|(name, url)| match validate_feed_url(url) {
            Ok(_) => Some(FeedSource::new(*name, *url)),
            Err(e) => {
                tracing::warn!(name = %name, url = %url, error = %e, "Skipping feed with invalid URL");
                None
            }
        })
        .collect()
}

fn validate_feed_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{other}'")),
    }
}

// ============================================================================
// Tests
// ============================================================================
