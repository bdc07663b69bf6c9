//! Running crawl counters

use serde::Serialize;

/// Counters mutated only by the traversal engine while a crawl runs
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    /// Pages fetched and recorded successfully
    pub pages_crawled: usize,

    /// Pages whose fetch failed after the backend gave up
    pub pages_failed: usize,

    /// Targets denied by the politeness gate (robots.txt), never fetched
    pub pages_skipped: usize,

    /// Discovered links rejected by scope rules before entering the frontier
    pub links_rejected: usize,

    /// Total HTML bytes received
    pub bytes_fetched: u64,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pages that were consumed from the frontier, whatever the outcome
    pub fn pages_seen(&self) -> usize {
        self.pages_crawled + self.pages_failed + self.pages_skipped
    }
}
