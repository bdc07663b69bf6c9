//! Crawler module: traversal engine, frontier, fetch backends, and parsing
//!
//! The engine owns all mutable crawl state and drives the loop; the fetch
//! backends turn URLs into HTML (or failures); the parser turns HTML into
//! links and text.

mod concurrent;
mod engine;
mod fetch;
mod frontier;
mod parser;
mod render;
mod stats;

pub use engine::{CrawlEngine, CrawlReport, CrawlState, StopHandle};
pub use fetch::{build_http_client, FetchFailure, FetchOutcome, SimpleFetcher};
pub use frontier::{CrawlTarget, Frontier, VisitedSet};
pub use parser::{parse_page, visible_text, ParsedPage};
pub use render::{NullRenderer, PageRenderer, RenderError};
pub use stats::CrawlStats;

use crate::config::CrawlConfig;
use crate::CrawlError;

/// Runs a complete crawl for the given configuration
///
/// Convenience wrapper: builds an engine and drives it to a terminal state.
///
/// # Example
///
/// ```no_run
/// use deepcrawl::config::CrawlConfig;
/// use deepcrawl::crawler::crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = CrawlConfig::new("https://example.com/");
/// let report = crawl(config).await?;
/// println!("{} pages crawled", report.stats.pages_crawled);
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: CrawlConfig) -> Result<CrawlReport, CrawlError> {
    let engine = CrawlEngine::new(config)?;
    Ok(engine.run().await)
}
