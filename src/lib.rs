//! Crawl-Conductor: a resumable, multi-site crawl orchestrator
//!
//! This crate drives large crawls of many target sites through a pluggable page visitor,
//! keeps a durable per-domain frontier so interrupted crawls resume where they stopped,
//! checks each visited page for a consent-management dialog, and writes per-site results
//! into a stable, deduplicated directory layout.

pub mod config;
pub mod consent;
pub mod frontier;
pub mod logging;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod url;
pub mod worker;

use thiserror::Error;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Frontier error: {0}")]
    Frontier(#[from] frontier::FrontierError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unknown collector \"{id}\". Valid collector names are: {valid}")]
    UnknownCollector { id: String, valid: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Empty input")]
    Empty,
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

// Re-export commonly used types
pub use config::Config;
pub use orchestrator::{Orchestrator, RunInputs};
pub use output::{OutputNamer, RunSummary};
pub use url::{extract_domain, normalize_input, registrable_domain};
