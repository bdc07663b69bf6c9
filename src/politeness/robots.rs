//! Robots.txt policy wrapper
//!
//! Thin wrapper around the robotstxt crate's matcher with an explicit
//! allow-all escape hatch used when a robots.txt cannot be fetched.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt policy for one host
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    /// Raw robots.txt content; `None` means allow everything
    content: Option<String>,
}

impl RobotsPolicy {
    /// Creates a policy from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
        }
    }

    /// Creates a permissive policy that allows every URL
    ///
    /// Used when robots.txt is missing or unreachable: a host that does not
    /// publish one must not block the crawl.
    pub fn allow_all() -> Self {
        Self { content: None }
    }

    /// Checks whether a URL is allowed for the given user agent
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        match &self.content {
            None => true,
            Some(content) if content.is_empty() => true,
            Some(content) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(content, user_agent, url)
            }
        }
    }
}
