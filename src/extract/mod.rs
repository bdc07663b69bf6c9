//! LLM-backed extraction of structured product information
//!
//! Takes derived page text and asks a hosted model to pull out product name,
//! price, description, and attributes. The crawler core never depends on
//! this module; it consumes artifacts the store already wrote.

mod client;
mod pricing;

pub use client::{ExtractClient, Extraction, TokenUsage, DEFAULT_MODEL, DEFAULT_PROMPT};
pub use pricing::{estimate_cost, CostBreakdown, ModelPrice, MODEL_PRICING};

use thiserror::Error;

/// Errors from the extraction client
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("API key not configured (set {0})")]
    MissingApiKey(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed API response: {0}")]
    MalformedResponse(String),

    #[error("All {attempts} attempts failed; last error: {last}")]
    Exhausted { attempts: u32, last: String },
}

/// Result type for extraction operations
pub type ExtractResult<T> = Result<T, ExtractError>;
