//! Deepcrawl: a bounded, polite web crawler with an LLM extraction layer
//!
//! This crate implements a depth- and page-count-bounded crawler that fetches
//! pages over HTTP (with an optional render fallback), follows links under
//! scope and politeness rules, persists page artifacts and a metadata ledger,
//! and can hand scraped text to a hosted language model for structured
//! product extraction.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod graph;
pub mod politeness;
pub mod store;
pub mod url;

use thiserror::Error;

/// Main error type for crawl operations
///
/// Per-page problems (fetch failures, out-of-scope links, robots denials) are
/// never surfaced through this type; they are recorded in the ledger and
/// counted. `CrawlError` is reserved for conditions that abort a whole run.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

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

    #[error("Invalid seed URL: {0}")]
    InvalidSeed(String),

    #[error("Invalid URL pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{BackendKind, CrawlConfig, CrawlMethod};
pub use crawler::{CrawlEngine, CrawlReport, CrawlState, CrawlStats};
pub use store::{PageOutcome, PageRecord, PageStore};
pub use url::{normalize_url, ScopeRejection, UrlScope};
