//! Deepcrawl command-line entry point

use anyhow::Context;
use clap::Parser;
use deepcrawl::config::{load_config, BackendKind, CrawlConfig, CrawlMethod};
use deepcrawl::crawler::CrawlEngine;
use deepcrawl::graph::CrawlGraph;
use deepcrawl::CrawlState;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Deepcrawl: a bounded, polite web crawler
///
/// Crawls a site breadth- or depth-first from a seed URL, within depth and
/// page-count limits, saving page HTML, derived text, and a metadata ledger.
#[derive(Parser, Debug)]
#[command(name = "deepcrawl")]
#[command(version)]
#[command(about = "A bounded, polite web crawler", long_about = None)]
struct Cli {
    /// URL to start crawling from
    #[arg(value_name = "URL", required_unless_present = "config")]
    url: Option<String>,

    /// Load the full crawl configuration from a TOML file instead
    #[arg(long, conflicts_with = "url")]
    config: Option<PathBuf>,

    /// Directory to save crawled data
    #[arg(short, long, default_value = "./crawl_data")]
    output: PathBuf,

    /// Maximum crawl depth
    #[arg(short, long, default_value_t = 5)]
    depth: u32,

    /// Maximum number of pages to crawl
    #[arg(short, long, default_value_t = 1000)]
    pages: usize,

    /// Delay between requests in seconds
    #[arg(long, default_value_t = 0.1)]
    delay: f64,

    /// Randomize each delay within [0.5x, 1.5x]
    #[arg(long)]
    randomize_delay: bool,

    /// Traversal order
    #[arg(long, value_enum, default_value_t = CrawlMethod::Breadth)]
    method: CrawlMethod,

    /// Only follow URLs containing this regex pattern
    #[arg(long)]
    pattern: Option<String>,

    /// Follow links to subdomains of the seed host
    #[arg(long)]
    subdomains: bool,

    /// Ignore robots.txt
    #[arg(long)]
    ignore_robots: bool,

    /// Fetch backend
    #[arg(long, value_enum, default_value_t = BackendKind::Simple)]
    backend: BackendKind,

    /// Worker count for the concurrent backend
    #[arg(long, default_value_t = 8)]
    concurrency: usize,

    /// User agent for requests
    #[arg(long)]
    user_agent: Option<String>,

    /// Write a DOT graph of the crawl next to the ledger
    #[arg(long)]
    graph: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Assembles the crawl configuration from the config file or flags
    fn into_config(self) -> anyhow::Result<(CrawlConfig, bool)> {
        let graph = self.graph;

        if let Some(path) = &self.config {
            let config = load_config(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?;
            return Ok((config, graph));
        }

        let mut config = CrawlConfig::new(self.url.expect("clap enforces url"));
        config.output_dir = self.output;
        config.max_depth = self.depth;
        config.max_pages = self.pages;
        config.delay = self.delay;
        config.delay_randomize = self.randomize_delay;
        config.crawl_method = self.method;
        config.url_pattern = self.pattern;
        config.follow_subdomains = self.subdomains;
        config.respect_robots_txt = !self.ignore_robots;
        config.backend = self.backend;
        config.concurrency = self.concurrency;
        config.user_agent = self.user_agent;

        Ok((config, graph))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    let (config, want_graph) = cli.into_config()?;

    tracing::info!("Starting crawl of {}", config.seed);
    let engine = CrawlEngine::new(config).context("failed to build crawl engine")?;
    let report = engine.run().await;

    println!("\nCrawl {:?}", report.state);
    println!("Pages crawled: {}", report.stats.pages_crawled);
    println!("Pages failed:  {}", report.stats.pages_failed);
    println!("Pages skipped: {}", report.stats.pages_skipped);
    println!("Links rejected by scope: {}", report.stats.links_rejected);
    println!("Bytes fetched: {}", report.stats.bytes_fetched);
    println!("Ledger: {}", report.ledger_path.display());

    if let Some(reason) = &report.abort_reason {
        println!("Aborted: {}", reason);
    }

    if want_graph {
        let graph = CrawlGraph::from_ledger(&report.ledger_path)
            .context("failed to build crawl graph from ledger")?;
        let dot_path = report
            .ledger_path
            .parent()
            .map(|p| p.join("graph.dot"))
            .unwrap_or_else(|| PathBuf::from("graph.dot"));
        std::fs::write(&dot_path, graph.to_dot())
            .with_context(|| format!("failed to write {}", dot_path.display()))?;
        println!("Graph: {}", dot_path.display());
    }

    if report.state == CrawlState::Aborted {
        anyhow::bail!("crawl aborted");
    }

    Ok(())
}

/// Maps verbosity flags onto tracing filter directives
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("deepcrawl=info,warn"),
            1 => EnvFilter::new("deepcrawl=debug,info"),
            2 => EnvFilter::new("deepcrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
