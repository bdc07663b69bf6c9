//! HTTP fetching: client construction, outcome classification, and the
//! simple backend with retry and render fallback
//!
//! The retry/fallback control flow is an explicit per-attempt state machine
//! (`Attempt -> Retry -> Fallback -> Fail`) so the backoff policy is testable
//! without nesting error handling.

use crate::crawler::parser::visible_text;
use crate::crawler::render::PageRenderer;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Total request timeout per attempt
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect timeout per attempt
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Attempts the simple backend makes before giving up
pub const MAX_ATTEMPTS: u32 = 3;

/// Base delay for exponential retry backoff
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Pages with less visible text than this look blocked or script-rendered
const MIN_TEXT_LEN: usize = 500;

/// Markers of anti-bot interstitials worth a render fallback
const ANTI_BOT_MARKERS: &[&str] = &[
    "Just a moment...",
    "Attention Required!",
    "cf-challenge",
    "Access denied",
    "Verify you are a human",
];

/// Why a fetch attempt (or the whole fetch) failed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchFailure {
    #[error("request timeout")]
    Timeout,

    #[error("connection failed")]
    Connect,

    #[error("HTTP {0}")]
    Http(u16),

    #[error("not an HTML document ({0})")]
    NotHtml(String),

    #[error("failed to read body: {0}")]
    Body(String),

    #[error("render fallback failed: {0}")]
    Render(String),
}

impl FetchFailure {
    /// Transient failures are worth retrying; the rest fail immediately
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Connect => true,
            Self::Http(status) => *status >= 500,
            _ => false,
        }
    }
}

/// Result of fetching one URL
#[derive(Debug)]
pub enum FetchOutcome {
    /// The page was retrieved; `rendered` marks the render-fallback path
    Fetched {
        html: String,
        final_url: Url,
        status: u16,
        rendered: bool,
    },

    /// The backend gave up on this page
    Failed { reason: FetchFailure },
}

/// Builds the shared HTTP client
///
/// Redirects are followed by the client (bounded by reqwest's default hop
/// limit); the response URL after redirects becomes the record's final URL.
pub fn build_http_client(user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(FETCH_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .gzip(true)
        .brotli(true)
        .build()
}

/// One fetched response before blocked-content checks
#[derive(Debug)]
pub(crate) struct RawFetch {
    pub(crate) html: String,
    pub(crate) final_url: Url,
    pub(crate) status: u16,
}

impl RawFetch {
    fn into_outcome(self) -> FetchOutcome {
        FetchOutcome::Fetched {
            html: self.html,
            final_url: self.final_url,
            status: self.status,
            rendered: false,
        }
    }
}

/// State of the simple backend's per-fetch state machine
enum Step {
    /// Issue attempt number `n` (0-based); waits out backoff first when n > 0
    Attempt(u32),
    /// Transient retries exhausted; the renderer is the only option left
    FallbackAfterFailure(FetchFailure),
    /// Fetch succeeded but the content looks blocked; a render may improve it
    FallbackThin(RawFetch),
    /// Terminal: report this failure
    Fail(FetchFailure),
}

/// Sequential fetch backend: one GET per attempt, bounded retry with
/// exponential backoff on transient failures, single render fallback
pub struct SimpleFetcher {
    client: Client,
    renderer: Option<Arc<dyn PageRenderer>>,
    max_attempts: u32,
}

impl SimpleFetcher {
    pub fn new(client: Client, renderer: Option<Arc<dyn PageRenderer>>) -> Self {
        Self {
            client,
            renderer,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    /// Fetches one URL, driving the attempt state machine to a terminal state
    pub async fn fetch(&self, url: &Url) -> FetchOutcome {
        let mut step = Step::Attempt(0);

        loop {
            step = match step {
                Step::Attempt(n) => {
                    if n > 0 {
                        tokio::time::sleep(backoff_delay(n)).await;
                        tracing::debug!(
                            "Retrying {} (attempt {}/{})",
                            url,
                            n + 1,
                            self.max_attempts
                        );
                    }

                    match self.try_get(url).await {
                        Ok(raw) if looks_blocked(&raw.html) => {
                            tracing::debug!("Content from {} looks blocked or empty", url);
                            Step::FallbackThin(raw)
                        }
                        Ok(raw) => return raw.into_outcome(),
                        Err(failure) if failure.is_transient() && n + 1 < self.max_attempts => {
                            Step::Attempt(n + 1)
                        }
                        Err(failure) if failure.is_transient() => {
                            Step::FallbackAfterFailure(failure)
                        }
                        Err(failure) => Step::Fail(failure),
                    }
                }

                Step::FallbackAfterFailure(original) => match self.render(url).await {
                    Some(Ok(outcome)) => return outcome,
                    Some(Err(failure)) => Step::Fail(failure),
                    // No renderer configured: the original failure stands
                    None => Step::Fail(original),
                },

                Step::FallbackThin(raw) => match self.render(url).await {
                    Some(Ok(outcome)) => return outcome,
                    Some(Err(failure)) => Step::Fail(failure),
                    // No renderer configured: thin content is still content
                    None => return raw.into_outcome(),
                },

                Step::Fail(reason) => return FetchOutcome::Failed { reason },
            };
        }
    }

    /// Runs the render collaborator once, if one is configured
    async fn render(&self, url: &Url) -> Option<Result<FetchOutcome, FetchFailure>> {
        let renderer = self.renderer.as_ref()?;
        tracing::info!("Falling back to renderer for {}", url);

        let result = renderer
            .render(url.as_str(), Duration::from_secs(5), true)
            .await;

        Some(match result {
            Ok(html) => Ok(FetchOutcome::Fetched {
                html,
                final_url: url.clone(),
                status: 200,
                rendered: true,
            }),
            Err(e) => Err(FetchFailure::Render(e.to_string())),
        })
    }

    async fn try_get(&self, url: &Url) -> Result<RawFetch, FetchFailure> {
        get_once(&self.client, url).await
    }
}

/// Issues one GET and classifies the response
///
/// Shared by both backends: the simple fetcher wraps it in retry/fallback
/// handling, the concurrent backend calls it exactly once per page.
pub(crate) async fn get_once(client: &Client, url: &Url) -> Result<RawFetch, FetchFailure> {
    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(classify_request_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchFailure::Http(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    // Missing content-type is given the benefit of the doubt
    if !content_type.is_empty()
        && !content_type.contains("text/html")
        && !content_type.contains("application/xhtml")
    {
        return Err(FetchFailure::NotHtml(content_type));
    }

    let final_url = response.url().clone();
    let html = response
        .text()
        .await
        .map_err(|e| FetchFailure::Body(e.to_string()))?;

    Ok(RawFetch {
        html,
        final_url,
        status: status.as_u16(),
    })
}

/// Classifies a reqwest error into a retry-relevant failure
fn classify_request_error(error: reqwest::Error) -> FetchFailure {
    if error.is_timeout() {
        FetchFailure::Timeout
    } else if error.is_connect() {
        FetchFailure::Connect
    } else {
        FetchFailure::Body(error.to_string())
    }
}

/// Backoff before attempt `n` (n >= 1): 500ms, 1s, 2s, ...
fn backoff_delay(n: u32) -> Duration {
    RETRY_BASE_DELAY * 2u32.saturating_pow(n - 1)
}

/// Heuristic: does this HTML look like an empty shell or a bot challenge?
fn looks_blocked(html: &str) -> bool {
    if ANTI_BOT_MARKERS.iter().any(|m| html.contains(m)) {
        return true;
    }

    visible_text(html).len() < MIN_TEXT_LEN
}
