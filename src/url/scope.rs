use crate::url::normalize::{normalize_url, path_extension};
use crate::url::SKIP_EXTENSIONS;
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Why a discovered link was refused admission to the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeRejection {
    /// The link could not be parsed or resolved, or has a non-http(s) scheme
    Malformed,
    /// The link points at a non-document resource (image, archive, ...)
    Extension(String),
    /// The link's host is outside the crawl domain
    OutOfDomain(String),
    /// The link does not match the configured URL pattern
    PatternMismatch,
}

impl std::fmt::Display for ScopeRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed URL"),
            Self::Extension(ext) => write!(f, "non-document extension .{}", ext),
            Self::OutOfDomain(host) => write!(f, "host {} out of scope", host),
            Self::PatternMismatch => write!(f, "URL pattern mismatch"),
        }
    }
}

/// Scope policy for one crawl run
///
/// Captures the seed host, the subdomain rule, and the optional URL pattern.
/// Admission composes normalization with every filter, so anything it returns
/// is ready for the visited-set and the frontier.
#[derive(Debug)]
pub struct UrlScope {
    seed_host: String,
    follow_subdomains: bool,
    pattern: Option<Regex>,
}

impl UrlScope {
    /// Builds the scope policy from the normalized seed URL
    pub fn new(
        seed: &Url,
        follow_subdomains: bool,
        url_pattern: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let seed_host = seed
            .host_str()
            .ok_or_else(|| ConfigError::InvalidSeed(format!("no host in {}", seed)))?;

        let pattern = url_pattern
            .map(|p| {
                Regex::new(p).map_err(|e| ConfigError::InvalidPattern(format!("{}: {}", p, e)))
            })
            .transpose()?;

        Ok(Self {
            seed_host: strip_www(seed_host).to_string(),
            follow_subdomains,
            pattern,
        })
    }

    /// Normalizes a discovered link and checks it against the scope policy
    ///
    /// Returns the normalized URL when the link should be followed, or the
    /// first rejection reason otherwise. Malformed links fail closed.
    pub fn admit(&self, raw: &str, base: &Url) -> Result<Url, ScopeRejection> {
        let url = normalize_url(raw, Some(base)).map_err(|_| ScopeRejection::Malformed)?;

        if let Some(ext) = path_extension(&url) {
            if SKIP_EXTENSIONS.contains(&ext.as_str()) {
                return Err(ScopeRejection::Extension(ext));
            }
        }

        let host = url.host_str().ok_or(ScopeRejection::Malformed)?;
        if !self.host_in_scope(host) {
            return Err(ScopeRejection::OutOfDomain(host.to_string()));
        }

        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(url.as_str()) {
                return Err(ScopeRejection::PatternMismatch);
            }
        }

        Ok(url)
    }

    /// Domain rule: exact host match, or any subdomain of the seed host when
    /// `follow_subdomains` is set. A leading `www.` is ignored on both sides.
    fn host_in_scope(&self, host: &str) -> bool {
        let host = strip_www(host);

        if host == self.seed_host {
            return true;
        }

        self.follow_subdomains && host.ends_with(&format!(".{}", self.seed_host))
    }
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}
