//! Page store: per-page artifacts and the crawl-wide metadata ledger
//!
//! Layout under the output directory:
//!
//! ```text
//! crawl_data/
//!   ledger.jsonl        one PageRecord per line, append-only
//!   a1b2c3.../page.html raw HTML for one fetched page
//!   a1b2c3.../page.txt  derived visible text
//! ```
//!
//! Artifact directories are named by a hash of the normalized URL, so reruns
//! land pages in the same place. Ledger writes happen one full line at a time
//! under a mutex: records never interleave, which is what makes the ledger
//! safe for the concurrent backend's workers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use url::Url;

/// Ledger file name inside the output directory
pub const LEDGER_FILE: &str = "ledger.jsonl";

/// Errors from the page store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// How a crawl target ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageOutcome {
    /// Page was fetched; `rendered` marks the render-fallback path
    Fetched { status: u16, rendered: bool },
    /// Fetch failed after the backend gave up
    Failed { reason: String },
    /// Target was never fetched (robots.txt denial)
    Skipped { reason: String },
}

/// Immutable result record of one fetch attempt
///
/// Created once per consumed crawl target and appended to the ledger; never
/// updated afterwards. Outbound links are recorded scope-unfiltered so the
/// ledger reflects what the page actually contained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    /// Normalized URL that was scheduled
    pub url: String,

    /// Final URL after redirects (fetched pages only)
    pub final_url: Option<String>,

    /// URL of the page this target was discovered on; `None` for the seed
    pub referrer: Option<String>,

    /// Link depth from the seed
    pub depth: u32,

    pub outcome: PageOutcome,

    /// Outbound links in DOM order, before scope filtering
    pub links: Vec<String>,

    pub html_path: Option<PathBuf>,
    pub text_path: Option<PathBuf>,

    pub fetched_at: DateTime<Utc>,
}

impl PageRecord {
    /// Record for a successfully fetched page
    pub fn fetched(
        url: &Url,
        final_url: &Url,
        referrer: Option<&str>,
        depth: u32,
        status: u16,
        rendered: bool,
        links: Vec<String>,
        html_path: PathBuf,
        text_path: PathBuf,
    ) -> Self {
        Self {
            url: url.to_string(),
            final_url: Some(final_url.to_string()),
            referrer: referrer.map(str::to_string),
            depth,
            outcome: PageOutcome::Fetched { status, rendered },
            links,
            html_path: Some(html_path),
            text_path: Some(text_path),
            fetched_at: Utc::now(),
        }
    }

    /// Record for a page the backend could not fetch
    pub fn failed(url: &Url, referrer: Option<&str>, depth: u32, reason: String) -> Self {
        Self {
            url: url.to_string(),
            final_url: None,
            referrer: referrer.map(str::to_string),
            depth,
            outcome: PageOutcome::Failed { reason },
            links: Vec::new(),
            html_path: None,
            text_path: None,
            fetched_at: Utc::now(),
        }
    }

    /// Record for a target skipped before any network fetch
    pub fn skipped(url: &Url, referrer: Option<&str>, depth: u32, reason: &str) -> Self {
        Self {
            url: url.to_string(),
            final_url: None,
            referrer: referrer.map(str::to_string),
            depth,
            outcome: PageOutcome::Skipped {
                reason: reason.to_string(),
            },
            links: Vec::new(),
            html_path: None,
            text_path: None,
            fetched_at: Utc::now(),
        }
    }
}

/// File-backed page store for one crawl run
pub struct PageStore {
    root: PathBuf,
    ledger: Mutex<File>,
}

impl PageStore {
    /// Opens (creating if needed) the store rooted at `root`
    ///
    /// Failing to create the directory or the ledger file is fatal for the
    /// whole run, so this happens during engine construction.
    pub fn open(root: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(root)?;

        let ledger = OpenOptions::new()
            .create(true)
            .append(true)
            .open(root.join(LEDGER_FILE))?;

        Ok(Self {
            root: root.to_path_buf(),
            ledger: Mutex::new(ledger),
        })
    }

    /// Path of the metadata ledger
    pub fn ledger_path(&self) -> PathBuf {
        self.root.join(LEDGER_FILE)
    }

    /// Deterministic artifact directory key for a normalized URL
    pub fn page_key(url: &Url) -> String {
        let digest = Sha256::digest(url.as_str().as_bytes());
        hex::encode(&digest[..8])
    }

    /// Writes the HTML and derived-text artifacts for one page
    ///
    /// Returns the paths recorded in the ledger.
    pub fn write_artifacts(
        &self,
        url: &Url,
        html: &str,
        text: &str,
    ) -> StoreResult<(PathBuf, PathBuf)> {
        let dir = self.root.join(Self::page_key(url));
        std::fs::create_dir_all(&dir)?;

        let html_path = dir.join("page.html");
        let text_path = dir.join("page.txt");
        std::fs::write(&html_path, html)?;
        std::fs::write(&text_path, text)?;

        Ok((html_path, text_path))
    }

    /// Appends one record to the ledger
    ///
    /// The full line is serialized before the lock is taken and written with
    /// a single call, so concurrent appenders cannot interleave records.
    pub fn append(&self, record: &PageRecord) -> StoreResult<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut ledger = self.ledger.lock().expect("ledger lock poisoned");
        ledger.write_all(line.as_bytes())?;
        ledger.flush()?;

        Ok(())
    }
}

/// Reads all records from a ledger file
pub fn load_ledger(path: &Path) -> StoreResult<Vec<PageRecord>> {
    let content = std::fs::read_to_string(path)?;
    let mut records = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        records.push(serde_json::from_str(line)?);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_url(path: &str) -> Url {
        Url::parse(&format!("https://example.com{}", path)).unwrap()
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("nested/crawl");
        let store = PageStore::open(&root).unwrap();
        assert!(root.is_dir());
        assert!(store.ledger_path().is_file());
    }

    #[test]
    fn test_page_key_is_deterministic() {
        let url = sample_url("/product/1");
        assert_eq!(PageStore::page_key(&url), PageStore::page_key(&url));
        assert_ne!(
            PageStore::page_key(&url),
            PageStore::page_key(&sample_url("/product/2"))
        );
        assert_eq!(PageStore::page_key(&url).len(), 16);
    }

    #[test]
    fn test_write_artifacts() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::open(dir.path()).unwrap();

        let url = sample_url("/page");
        let (html_path, text_path) = store
            .write_artifacts(&url, "<html>hi</html>", "hi")
            .unwrap();

        assert_eq!(std::fs::read_to_string(html_path).unwrap(), "<html>hi</html>");
        assert_eq!(std::fs::read_to_string(text_path).unwrap(), "hi");
    }

    #[test]
    fn test_append_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::open(dir.path()).unwrap();

        let fetched = PageRecord::fetched(
            &sample_url("/"),
            &sample_url("/"),
            None,
            0,
            200,
            false,
            vec!["https://example.com/a".to_string()],
            PathBuf::from("x/page.html"),
            PathBuf::from("x/page.txt"),
        );
        let failed = PageRecord::failed(&sample_url("/a"), Some("https://example.com/"), 1, "timeout".into());
        let skipped = PageRecord::skipped(&sample_url("/b"), Some("https://example.com/"), 1, "robots.txt");

        store.append(&fetched).unwrap();
        store.append(&failed).unwrap();
        store.append(&skipped).unwrap();

        let records = load_ledger(&store.ledger_path()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].url, "https://example.com/");
        assert!(matches!(
            records[0].outcome,
            PageOutcome::Fetched { status: 200, rendered: false }
        ));
        assert!(matches!(records[1].outcome, PageOutcome::Failed { .. }));
        assert!(matches!(records[2].outcome, PageOutcome::Skipped { .. }));
        assert_eq!(records[1].depth, 1);
        assert_eq!(records[2].referrer.as_deref(), Some("https://example.com/"));
    }

    #[test]
    fn test_load_missing_ledger_errors() {
        let dir = TempDir::new().unwrap();
        assert!(load_ledger(&dir.path().join("missing.jsonl")).is_err());
    }
}
