//! Render collaborator interface
//!
//! The simple backend falls back to a render-capable collaborator when plain
//! HTTP yields content that looks empty or blocked. Rendering itself (browser
//! automation) lives outside this crate; callers inject an implementation.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors from a render attempt
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("No renderer available")]
    Unavailable,

    #[error("Render failed: {0}")]
    Failed(String),
}

/// A collaborator that can produce HTML for a URL via a real browser
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Renders the page and returns its HTML after scripts have run
    async fn render(
        &self,
        url: &str,
        wait_time: Duration,
        headless: bool,
    ) -> Result<String, RenderError>;
}

/// Default renderer: always reports that rendering is unavailable
///
/// With this in place the simple backend's fallback path degrades to a plain
/// fetch failure instead of hanging on a missing browser.
pub struct NullRenderer;

#[async_trait]
impl PageRenderer for NullRenderer {
    async fn render(
        &self,
        _url: &str,
        _wait_time: Duration,
        _headless: bool,
    ) -> Result<String, RenderError> {
        Err(RenderError::Unavailable)
    }
}
