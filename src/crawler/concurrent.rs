//! High-throughput fetch backend: a bounded worker pool over a shared frontier
//!
//! The pool owns its own frontier and visited set behind one mutex, so
//! dedup-on-enqueue holds under concurrency: no URL is ever dispatched twice.
//! The politeness delay paces dispatch of the pool's own requests (fetches
//! themselves overlap); robots.txt checks go through the same shared gate.
//!
//! `max_pages` enforcement: each worker checks the crawled-page counter
//! before dispatching a fetch. Workers that passed the check while the
//! counter was still below the limit may already be in flight when it is
//! reached, so the ledger can exceed `max_pages` by at most `concurrency - 1`
//! fetched records. The bound is deliberate; eliminating it would serialize
//! dispatch.

use crate::crawler::engine::RunEnd;
use crate::crawler::fetch::get_once;
use crate::crawler::frontier::{CrawlTarget, Frontier, VisitedSet};
use crate::crawler::parser::parse_page;
use crate::crawler::stats::CrawlStats;
use crate::politeness::PolitenessGate;
use crate::store::{PageRecord, PageStore, StoreError};
use crate::url::UrlScope;
use crate::CrawlError;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinSet;

/// How long an idle worker sleeps before re-checking the frontier
const IDLE_POLL: Duration = Duration::from_millis(20);

/// Frontier state shared by all workers, guarded by a single lock
struct PoolState {
    frontier: Frontier,
    visited: VisitedSet,
    /// Workers currently processing a target
    active: usize,
    /// Set when the page budget is spent, the stop flag fired, or storage
    /// failed; workers drain and exit
    halted: bool,
}

struct Shared {
    scope: Arc<UrlScope>,
    gate: Arc<PolitenessGate>,
    store: Arc<PageStore>,
    client: Client,
    max_depth: u32,
    max_pages: usize,
    stop: Arc<AtomicBool>,
    state: Mutex<PoolState>,
    crawled: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
    rejected: AtomicUsize,
    bytes: AtomicU64,
    /// First storage error; aborts the run
    store_error: Mutex<Option<StoreError>>,
}

/// The concurrent crawl driver
pub(crate) struct ConcurrentCrawler {
    shared: Arc<Shared>,
    concurrency: usize,
}

impl ConcurrentCrawler {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        scope: Arc<UrlScope>,
        gate: Arc<PolitenessGate>,
        store: Arc<PageStore>,
        client: Client,
        max_depth: u32,
        max_pages: usize,
        concurrency: usize,
        stop: Arc<AtomicBool>,
        frontier: Frontier,
        visited: VisitedSet,
    ) -> Self {
        let shared = Shared {
            scope,
            gate,
            store,
            client,
            max_depth,
            max_pages,
            stop,
            state: Mutex::new(PoolState {
                frontier,
                visited,
                active: 0,
                halted: false,
            }),
            crawled: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            rejected: AtomicUsize::new(0),
            bytes: AtomicU64::new(0),
            store_error: Mutex::new(None),
        };

        Self {
            shared: Arc::new(shared),
            concurrency,
        }
    }

    /// Runs the worker pool until the frontier drains or a halt condition hits
    pub(crate) async fn run(self) -> Result<(CrawlStats, RunEnd), CrawlError> {
        tracing::info!("Starting {} fetch workers", self.concurrency);

        let mut workers = JoinSet::new();
        for id in 0..self.concurrency {
            let shared = Arc::clone(&self.shared);
            workers.spawn(worker_loop(id, shared));
        }

        while workers.join_next().await.is_some() {}

        let shared = self.shared;
        if let Some(error) = shared.store_error.lock().expect("store error lock").take() {
            return Err(CrawlError::Store(error));
        }

        let stats = CrawlStats {
            pages_crawled: shared.crawled.load(Ordering::SeqCst),
            pages_failed: shared.failed.load(Ordering::SeqCst),
            pages_skipped: shared.skipped.load(Ordering::SeqCst),
            links_rejected: shared.rejected.load(Ordering::SeqCst),
            bytes_fetched: shared.bytes.load(Ordering::SeqCst),
        };

        let end = if shared.stop.load(Ordering::Relaxed) {
            RunEnd::Stopped
        } else {
            RunEnd::Completed
        };

        Ok((stats, end))
    }
}

/// What a worker decided to do after consulting the shared state
enum Decision {
    Work(CrawlTarget),
    Wait,
    Exit,
}

async fn worker_loop(id: usize, shared: Arc<Shared>) {
    loop {
        let decision = {
            let mut state = shared.state.lock().expect("pool state lock");

            if shared.stop.load(Ordering::Relaxed) {
                state.halted = true;
            }

            if state.halted {
                Decision::Exit
            } else if shared.crawled.load(Ordering::SeqCst) >= shared.max_pages {
                // Page budget spent; in-flight fetches are allowed to finish
                tracing::debug!("Worker {} observed max_pages reached", id);
                state.halted = true;
                Decision::Exit
            } else {
                match state.frontier.pop() {
                    Some(target) => {
                        state.active += 1;
                        Decision::Work(target)
                    }
                    None if state.active == 0 => Decision::Exit,
                    None => Decision::Wait,
                }
            }
        };

        match decision {
            Decision::Exit => return,
            Decision::Wait => {
                // Another worker may still discover links; check back shortly
                tokio::time::sleep(IDLE_POLL).await;
            }
            Decision::Work(target) => {
                process_target(&shared, target).await;
                let mut state = shared.state.lock().expect("pool state lock");
                state.active -= 1;
            }
        }
    }
}

/// Fetches one target and records the outcome; a single attempt, no retry
async fn process_target(shared: &Shared, target: CrawlTarget) {
    if !shared.gate.allows(&target.url).await {
        tracing::info!("Skipping {} (disallowed by robots.txt)", target.url);
        let record = PageRecord::skipped(
            &target.url,
            target.referrer.as_deref(),
            target.depth,
            "robots.txt",
        );
        if append_or_halt(shared, &record) {
            shared.skipped.fetch_add(1, Ordering::SeqCst);
        }
        return;
    }

    // Paces this pool's own requests; does not serialize the fetches
    shared.gate.acquire_slot().await;

    match get_once(&shared.client, &target.url).await {
        Ok(raw) => {
            let parsed = parse_page(&raw.html, &raw.final_url);

            let artifacts = shared
                .store
                .write_artifacts(&target.url, &raw.html, &parsed.text);
            let (html_path, text_path) = match artifacts {
                Ok(paths) => paths,
                Err(e) => {
                    halt_with_error(shared, e);
                    return;
                }
            };

            let record = PageRecord::fetched(
                &target.url,
                &raw.final_url,
                target.referrer.as_deref(),
                target.depth,
                raw.status,
                false,
                parsed.links.clone(),
                html_path,
                text_path,
            );
            if !append_or_halt(shared, &record) {
                return;
            }

            let crawled = shared.crawled.fetch_add(1, Ordering::SeqCst) + 1;
            shared
                .bytes
                .fetch_add(raw.html.len() as u64, Ordering::SeqCst);
            tracing::info!(
                "Crawled [{}] {} (depth {})",
                crawled,
                target.url,
                target.depth
            );

            if target.depth < shared.max_depth {
                enqueue_links(shared, &parsed.links, &raw.final_url, &target);
            }
        }

        Err(reason) => {
            tracing::warn!("Fetch failed for {}: {}", target.url, reason);
            let record = PageRecord::failed(
                &target.url,
                target.referrer.as_deref(),
                target.depth,
                reason.to_string(),
            );
            if append_or_halt(shared, &record) {
                shared.failed.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}

/// Admits discovered links into the shared frontier under the pool lock
fn enqueue_links(shared: &Shared, links: &[String], base: &url::Url, target: &CrawlTarget) {
    let mut state = shared.state.lock().expect("pool state lock");

    for link in links {
        match shared.scope.admit(link, base) {
            Ok(url) => {
                if state.visited.insert(&url) {
                    state.frontier.push(CrawlTarget {
                        url,
                        depth: target.depth + 1,
                        referrer: Some(target.url.to_string()),
                    });
                }
            }
            Err(_) => {
                shared.rejected.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}

/// Appends a record; on storage failure, halts the pool and reports false
fn append_or_halt(shared: &Shared, record: &PageRecord) -> bool {
    match shared.store.append(record) {
        Ok(()) => true,
        Err(e) => {
            halt_with_error(shared, e);
            false
        }
    }
}

fn halt_with_error(shared: &Shared, error: StoreError) {
    tracing::error!("Storage failure, halting crawl: {}", error);
    let mut slot = shared.store_error.lock().expect("store error lock");
    if slot.is_none() {
        *slot = Some(error);
    }
    shared.state.lock().expect("pool state lock").halted = true;
}
