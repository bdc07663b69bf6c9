//! Crawl configuration: types, TOML loading, and validation
//!
//! A [`CrawlConfig`] is an immutable snapshot captured before a crawl starts.
//! It is consumed by value when the engine is constructed, so configuration
//! cannot change mid-run.

mod types;
mod validation;

pub use types::{BackendKind, CrawlConfig, CrawlMethod};
pub use validation::validate;

use crate::ConfigError;
use std::path::Path;

/// Loads and validates a crawl configuration from a TOML file
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use deepcrawl::config::load_config;
///
/// let config = load_config(Path::new("crawl.toml")).unwrap();
/// println!("Max depth: {}", config.max_depth);
/// ```
pub fn load_config(path: &Path) -> Result<CrawlConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: CrawlConfig = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
seed = "https://example.com/"
output-dir = "./crawl_data"
max-depth = 3
max-pages = 50
delay = 0.5
crawl-method = "depth"
follow-subdomains = true
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.seed, "https://example.com/");
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.max_pages, 50);
        assert_eq!(config.crawl_method, CrawlMethod::Depth);
        assert!(config.follow_subdomains);
        // Unspecified fields fall back to defaults
        assert_eq!(config.backend, BackendKind::Simple);
        assert!(config.respect_robots_txt);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/crawl.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_config_rejects_bad_seed() {
        let config_content = r#"
seed = "not a url"
"#;
        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::InvalidSeed(_)));
    }
}
