//! Village-Archiver: a static mirror builder for the 1Village platform
//!
//! This crate drives a headless browser through every page of every
//! village × phase, captures the resources the pages load, and rewrites the
//! rendered markup and stylesheets into a flat file tree that can be served
//! without a backend.

pub mod browser;
pub mod cache;
pub mod config;
pub mod crawler;
pub mod output;
pub mod rewrite;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Village-Archiver operations
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Browser error: {0}")]
    Browser(#[from] browser::BrowserError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTML rewrite error: {0}")]
    Rewrite(String),

    #[error("Resource map error: {0}")]
    ResourceMap(#[from] serde_json::Error),

    #[error("No authenticated session: {0}")]
    Session(String),

    #[error("Entry page of {unit} could not be loaded: {source}")]
    UnitEntry {
        unit: String,
        source: browser::BrowserError,
    },

    #[error("Archive run interrupted")]
    Interrupted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),
}

/// Result type alias for Village-Archiver operations
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use cache::ResourceCache;
pub use config::Config;
pub use state::{CrawlUnit, VisitedSet};
pub use crate::url::{archive_url, canonicalize};
