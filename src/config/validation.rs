use crate::config::CrawlConfig;
use crate::ConfigError;
use url::Url;

/// Validates a crawl configuration
///
/// All violations are fatal: a config that fails here must never reach the
/// engine. Checks are ordered cheapest-first.
pub fn validate(config: &CrawlConfig) -> Result<(), ConfigError> {
    validate_seed(&config.seed)?;
    validate_limits(config)?;
    validate_pattern(config)?;
    Ok(())
}

/// Validates that the seed is an absolute http(s) URL with a host
fn validate_seed(seed: &str) -> Result<(), ConfigError> {
    let url = Url::parse(seed).map_err(|e| ConfigError::InvalidSeed(format!("{}: {}", seed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidSeed(format!(
            "unsupported scheme '{}' in {}",
            url.scheme(),
            seed
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidSeed(format!("no host in {}", seed)));
    }

    Ok(())
}

/// Validates numeric bounds
fn validate_limits(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if !config.delay.is_finite() || config.delay < 0.0 {
        return Err(ConfigError::Validation(format!(
            "delay must be a finite number >= 0, got {}",
            config.delay
        )));
    }

    if config.concurrency < 1 || config.concurrency > 64 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 64, got {}",
            config.concurrency
        )));
    }

    if config.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates that the URL pattern compiles
fn validate_pattern(config: &CrawlConfig) -> Result<(), ConfigError> {
    if let Some(pattern) = &config.url_pattern {
        regex::Regex::new(pattern)
            .map_err(|e| ConfigError::InvalidPattern(format!("{}: {}", pattern, e)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> CrawlConfig {
        CrawlConfig::new("https://example.com/")
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_rejects_malformed_seed() {
        let mut config = valid_config();
        config.seed = "not a url".to_string();
        assert!(matches!(
            validate(&config).unwrap_err(),
            ConfigError::InvalidSeed(_)
        ));
    }

    #[test]
    fn test_rejects_non_http_seed() {
        let mut config = valid_config();
        config.seed = "ftp://example.com/".to_string();
        assert!(matches!(
            validate(&config).unwrap_err(),
            ConfigError::InvalidSeed(_)
        ));
    }

    #[test]
    fn test_rejects_zero_max_pages() {
        let mut config = valid_config();
        config.max_pages = 0;
        assert!(matches!(
            validate(&config).unwrap_err(),
            ConfigError::Validation(_)
        ));
    }

    #[test]
    fn test_rejects_negative_delay() {
        let mut config = valid_config();
        config.delay = -1.0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_nan_delay() {
        let mut config = valid_config();
        config.delay = f64::NAN;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_excessive_concurrency() {
        let mut config = valid_config();
        config.concurrency = 200;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_bad_pattern() {
        let mut config = valid_config();
        config.url_pattern = Some("products/(".to_string());
        assert!(matches!(
            validate(&config).unwrap_err(),
            ConfigError::InvalidPattern(_)
        ));
    }

    #[test]
    fn test_accepts_valid_pattern() {
        let mut config = valid_config();
        config.url_pattern = Some(r"product/.*".to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_delay_is_allowed() {
        let mut config = valid_config();
        config.delay = 0.0;
        assert!(validate(&config).is_ok());
    }
}
