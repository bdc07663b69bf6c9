//! Crawl graph data for visualization collaborators
//!
//! Reconstructs the link structure of a crawl from the metadata ledger:
//! one node per ledger record, edges where a recorded outbound link points at
//! another crawled page. Rendering is left to external tooling; the DOT
//! export is the hand-off format.

use crate::store::{load_ledger, PageRecord, StoreResult};
use std::collections::HashMap;
use std::path::Path;

/// One crawled page in the graph
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub url: String,
    pub depth: u32,
    pub referrer: Option<String>,
}

/// Directed link graph over the pages of one crawl run
#[derive(Debug, Default)]
pub struct CrawlGraph {
    pub nodes: Vec<GraphNode>,
    /// Edges as (from, to) indices into `nodes`
    pub edges: Vec<(usize, usize)>,
}

impl CrawlGraph {
    /// Builds the graph from ledger records
    ///
    /// Only links whose target was itself crawled become edges; links that
    /// led out of scope or were never reached stay out of the graph.
    pub fn from_records(records: &[PageRecord]) -> Self {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut nodes = Vec::with_capacity(records.len());

        for record in records {
            index.insert(record.url.as_str(), nodes.len());
            nodes.push(GraphNode {
                url: record.url.clone(),
                depth: record.depth,
                referrer: record.referrer.clone(),
            });
        }

        let mut edges = Vec::new();
        for (from, record) in records.iter().enumerate() {
            for link in &record.links {
                if let Some(&to) = index.get(link.as_str()) {
                    if from != to && !edges.contains(&(from, to)) {
                        edges.push((from, to));
                    }
                }
            }
        }

        Self { nodes, edges }
    }

    /// Loads a ledger file and builds its graph
    pub fn from_ledger(path: &Path) -> StoreResult<Self> {
        let records = load_ledger(path)?;
        Ok(Self::from_records(&records))
    }

    /// Serializes the graph in Graphviz DOT format
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph crawl {\n    rankdir=LR;\n");

        for (i, node) in self.nodes.iter().enumerate() {
            out.push_str(&format!(
                "    n{} [label=\"{}\\ndepth {}\"];\n",
                i,
                escape_label(&node.url),
                node.depth
            ));
        }

        for (from, to) in &self.edges {
            out.push_str(&format!("    n{} -> n{};\n", from, to));
        }

        out.push_str("}\n");
        out
    }
}

fn escape_label(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
