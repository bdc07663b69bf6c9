//! The traversal engine: frontier-driven, bounded crawl orchestration
//!
//! State machine: `Idle -> Running -> {Completed, Aborted}`. A constructed
//! engine has done no network activity; `run` consumes it and drives the
//! crawl to a terminal state. Per-page failures are recorded and counted but
//! never unwind the loop; only construction errors and ledger write failures
//! abort a run.

use crate::config::{BackendKind, CrawlConfig};
use crate::crawler::concurrent::ConcurrentCrawler;
use crate::crawler::fetch::{build_http_client, FetchOutcome, SimpleFetcher};
use crate::crawler::frontier::{CrawlTarget, Frontier, VisitedSet};
use crate::crawler::parser::parse_page;
use crate::crawler::render::PageRenderer;
use crate::crawler::stats::CrawlStats;
use crate::politeness::PolitenessGate;
use crate::store::{PageRecord, PageStore};
use crate::url::{normalize_url, UrlScope};
use crate::{ConfigError, CrawlError};
use reqwest::Client;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use url::Url;

/// Lifecycle of one crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    /// Constructed, no network activity yet
    Idle,
    /// Traversal loop in progress
    Running,
    /// Frontier drained or a bound reached; stats are final
    Completed,
    /// Stopped early; partial stats are still valid
    Aborted,
}

/// Cooperative cancellation handle
///
/// The flag is checked once per loop iteration between fetches; a fetch
/// already in flight is not interrupted.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Requests that the crawl stop at the next loop iteration
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Final report of a crawl run
#[derive(Debug)]
pub struct CrawlReport {
    pub state: CrawlState,
    pub stats: CrawlStats,
    /// Path of the metadata ledger, for the visualization collaborator
    pub ledger_path: PathBuf,
    /// Why the run aborted, when it did
    pub abort_reason: Option<String>,
}

/// How the traversal loop ended
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum RunEnd {
    /// Frontier drained or max_pages/max_depth bounds reached
    Completed,
    /// The stop handle fired
    Stopped,
}

/// Frontier & traversal engine
///
/// Owns all mutable crawl state (frontier, visited set, counters); nothing is
/// process-global, so several engines can crawl concurrently in one process.
pub struct CrawlEngine {
    config: CrawlConfig,
    seed: Url,
    scope: Arc<UrlScope>,
    gate: Arc<PolitenessGate>,
    store: Arc<PageStore>,
    client: Client,
    renderer: Option<Arc<dyn PageRenderer>>,
    frontier: Frontier,
    visited: VisitedSet,
    stats: CrawlStats,
    state: CrawlState,
    stop: Arc<AtomicBool>,
}

impl std::fmt::Debug for CrawlEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrawlEngine").finish_non_exhaustive()
    }
}

impl CrawlEngine {
    /// Builds an engine from a configuration snapshot
    ///
    /// The config is consumed, so it cannot change once the engine exists.
    /// All fatal conditions surface here, before any network activity: an
    /// invalid seed or pattern, and an unwritable output directory.
    pub fn new(config: CrawlConfig) -> Result<Self, CrawlError> {
        crate::config::validate(&config)?;

        let seed = normalize_url(&config.seed, None)
            .map_err(|e| ConfigError::InvalidSeed(e.to_string()))?;

        let scope = UrlScope::new(
            &seed,
            config.follow_subdomains,
            config.url_pattern.as_deref(),
        )?;

        let client = build_http_client(&config.user_agent_string())?;
        let gate = PolitenessGate::new(client.clone(), &config);
        let store = PageStore::open(&config.output_dir)?;
        let frontier = Frontier::new(config.crawl_method);

        Ok(Self {
            config,
            seed,
            scope: Arc::new(scope),
            gate: Arc::new(gate),
            store: Arc::new(store),
            client,
            renderer: None,
            frontier,
            visited: VisitedSet::new(),
            stats: CrawlStats::new(),
            state: CrawlState::Idle,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Injects a render collaborator for the simple backend's fallback path
    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Current engine state
    pub fn state(&self) -> CrawlState {
        self.state
    }

    /// Handle for requesting a cooperative stop
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.stop))
    }

    /// Runs the crawl to a terminal state and returns the final report
    pub async fn run(mut self) -> CrawlReport {
        self.state = CrawlState::Running;
        tracing::info!(
            "Starting crawl of {} (max_depth={}, max_pages={}, method={:?}, backend={:?})",
            self.seed,
            self.config.max_depth,
            self.config.max_pages,
            self.config.crawl_method,
            self.config.backend
        );

        // Seed enters at depth 0; dedup starts here
        self.visited.insert(&self.seed);
        self.frontier.push(CrawlTarget::seed(self.seed.clone()));

        let result = match self.config.backend {
            BackendKind::Simple => self.run_sequential().await,
            BackendKind::Concurrent => self.run_concurrent().await,
        };

        let abort_reason = match result {
            Ok(RunEnd::Completed) => {
                self.state = CrawlState::Completed;
                None
            }
            Ok(RunEnd::Stopped) => {
                self.state = CrawlState::Aborted;
                Some("stop requested".to_string())
            }
            Err(e) => {
                tracing::error!("Crawl aborted: {}", e);
                self.state = CrawlState::Aborted;
                Some(e.to_string())
            }
        };

        tracing::info!(
            "Crawl {:?}: {} crawled, {} failed, {} skipped, {} links rejected, {} bytes",
            self.state,
            self.stats.pages_crawled,
            self.stats.pages_failed,
            self.stats.pages_skipped,
            self.stats.links_rejected,
            self.stats.bytes_fetched
        );

        CrawlReport {
            state: self.state,
            stats: self.stats,
            ledger_path: self.store.ledger_path(),
            abort_reason,
        }
    }

    /// Single-threaded traversal: fetch, process, delay, repeat
    async fn run_sequential(&mut self) -> Result<RunEnd, CrawlError> {
        let fetcher = SimpleFetcher::new(self.client.clone(), self.renderer.clone());

        loop {
            if self.stop.load(Ordering::Relaxed) {
                return Ok(RunEnd::Stopped);
            }

            if self.stats.pages_crawled >= self.config.max_pages {
                tracing::info!("Reached max_pages={}", self.config.max_pages);
                return Ok(RunEnd::Completed);
            }

            let Some(target) = self.frontier.pop() else {
                tracing::info!("Frontier is empty, crawl complete");
                return Ok(RunEnd::Completed);
            };

            // Frontier invariant: depth was bounded at enqueue time
            debug_assert!(target.depth <= self.config.max_depth);

            if !self.gate.allows(&target.url).await {
                tracing::info!("Skipping {} (disallowed by robots.txt)", target.url);
                self.store.append(&PageRecord::skipped(
                    &target.url,
                    target.referrer.as_deref(),
                    target.depth,
                    "robots.txt",
                ))?;
                self.stats.pages_skipped += 1;
                continue;
            }

            self.gate.acquire_slot().await;

            match fetcher.fetch(&target.url).await {
                FetchOutcome::Fetched {
                    html,
                    final_url,
                    status,
                    rendered,
                } => {
                    let parsed = parse_page(&html, &final_url);
                    let (html_path, text_path) =
                        self.store
                            .write_artifacts(&target.url, &html, &parsed.text)?;

                    self.store.append(&PageRecord::fetched(
                        &target.url,
                        &final_url,
                        target.referrer.as_deref(),
                        target.depth,
                        status,
                        rendered,
                        parsed.links.clone(),
                        html_path,
                        text_path,
                    ))?;

                    self.stats.pages_crawled += 1;
                    self.stats.bytes_fetched += html.len() as u64;
                    tracing::info!(
                        "Crawled [{}] {} (depth {})",
                        self.stats.pages_crawled,
                        target.url,
                        target.depth
                    );

                    if target.depth < self.config.max_depth {
                        self.enqueue_links(
                            &parsed.links,
                            &final_url,
                            target.depth + 1,
                            target.url.as_str(),
                        );
                    }
                }

                FetchOutcome::Failed { reason } => {
                    tracing::warn!("Fetch failed for {}: {}", target.url, reason);
                    self.store.append(&PageRecord::failed(
                        &target.url,
                        target.referrer.as_deref(),
                        target.depth,
                        reason.to_string(),
                    ))?;
                    self.stats.pages_failed += 1;
                }
            }
        }
    }

    /// Normalizes, scope-checks, and dedups discovered links, queueing the
    /// survivors at the given depth in DOM order
    fn enqueue_links(&mut self, links: &[String], base: &Url, depth: u32, referrer: &str) {
        for link in links {
            match self.scope.admit(link, base) {
                Ok(url) => {
                    if self.visited.insert(&url) {
                        self.frontier.push(CrawlTarget {
                            url,
                            depth,
                            referrer: Some(referrer.to_string()),
                        });
                    }
                }
                Err(rejection) => {
                    tracing::trace!("Rejected link {}: {}", link, rejection);
                    self.stats.links_rejected += 1;
                }
            }
        }
    }

    /// Hands the seeded frontier to the high-throughput worker pool
    async fn run_concurrent(&mut self) -> Result<RunEnd, CrawlError> {
        let frontier = std::mem::replace(&mut self.frontier, Frontier::new(self.config.crawl_method));
        let visited = std::mem::take(&mut self.visited);

        let crawler = ConcurrentCrawler::new(
            Arc::clone(&self.scope),
            Arc::clone(&self.gate),
            Arc::clone(&self.store),
            self.client.clone(),
            self.config.max_depth,
            self.config.max_pages,
            self.config.concurrency,
            Arc::clone(&self.stop),
            frontier,
            visited,
        );

        let (stats, end) = crawler.run().await?;
        self.stats = stats;
        Ok(end)
    }
}
