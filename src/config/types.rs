use clap::ValueEnum;
use serde::Deserialize;
use std::path::PathBuf;

/// Traversal order for the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CrawlMethod {
    /// FIFO frontier: all depth-N pages are visited before any depth-(N+1) page
    Breadth,
    /// LIFO frontier: follows one branch down before backtracking
    Depth,
}

impl std::fmt::Display for CrawlMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Breadth => write!(f, "breadth"),
            Self::Depth => write!(f, "depth"),
        }
    }
}

/// Which fetch backend drives the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Sequential fetches with retry and a render fallback
    Simple,
    /// Bounded worker pool issuing overlapping fetches
    Concurrent,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Concurrent => write!(f, "concurrent"),
        }
    }
}

/// Immutable crawl configuration snapshot
///
/// Loadable from a TOML file (kebab-case keys) or assembled from CLI flags.
/// Consumed by value when building a [`crate::CrawlEngine`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CrawlConfig {
    /// Start URL for the crawl
    pub seed: String,

    /// Directory receiving page artifacts and the metadata ledger
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Maximum link depth from the seed (seed is depth 0)
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum number of pages to fetch
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Delay between consecutive fetches, in seconds
    #[serde(default = "default_delay")]
    pub delay: f64,

    /// Sample each delay uniformly from [0.5*delay, 1.5*delay]
    #[serde(default)]
    pub delay_randomize: bool,

    /// Frontier ordering: breadth-first or depth-first
    #[serde(default = "default_crawl_method")]
    pub crawl_method: CrawlMethod,

    /// Regex a discovered URL must contain (search semantics) to be followed
    #[serde(default)]
    pub url_pattern: Option<String>,

    /// Follow links to subdomains of the seed host
    #[serde(default)]
    pub follow_subdomains: bool,

    /// Honor robots.txt disallow rules
    #[serde(default = "default_true")]
    pub respect_robots_txt: bool,

    /// Fetch backend selector
    #[serde(default = "default_backend")]
    pub backend: BackendKind,

    /// Worker count for the concurrent backend
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// User-agent override; a crate identifier is used when unset
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl CrawlConfig {
    /// Creates a configuration for the given seed with all defaults
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            output_dir: default_output_dir(),
            max_depth: default_max_depth(),
            max_pages: default_max_pages(),
            delay: default_delay(),
            delay_randomize: false,
            crawl_method: default_crawl_method(),
            url_pattern: None,
            follow_subdomains: false,
            respect_robots_txt: default_true(),
            backend: default_backend(),
            concurrency: default_concurrency(),
            user_agent: None,
        }
    }

    /// The effective user-agent string for HTTP requests
    pub fn user_agent_string(&self) -> String {
        self.user_agent.clone().unwrap_or_else(|| {
            format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            )
        })
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./crawl_data")
}

fn default_max_depth() -> u32 {
    5
}

fn default_max_pages() -> usize {
    1000
}

fn default_delay() -> f64 {
    0.1
}

fn default_crawl_method() -> CrawlMethod {
    CrawlMethod::Breadth
}

fn default_backend() -> BackendKind {
    BackendKind::Simple
}

fn default_concurrency() -> usize {
    8
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_defaults() {
        let config = CrawlConfig::new("https://example.com");
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.max_pages, 1000);
        assert_eq!(config.crawl_method, CrawlMethod::Breadth);
        assert_eq!(config.backend, BackendKind::Simple);
        assert!(config.respect_robots_txt);
        assert!(!config.delay_randomize);
        assert!(config.url_pattern.is_none());
    }

    #[test]
    fn test_default_user_agent_carries_version() {
        let config = CrawlConfig::new("https://example.com");
        let ua = config.user_agent_string();
        assert!(ua.starts_with("deepcrawl/"));
    }

    #[test]
    fn test_user_agent_override() {
        let mut config = CrawlConfig::new("https://example.com");
        config.user_agent = Some("custom-bot/2.0".to_string());
        assert_eq!(config.user_agent_string(), "custom-bot/2.0");
    }
}
