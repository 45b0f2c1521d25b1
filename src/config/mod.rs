//! Configuration module for Crawl-Conductor
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so a crawl can also run from command-line flags alone.
//!
//! # Example
//!
//! ```no_run
//! use crawl_conductor::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! println!("Crawlers: {}", config.crawler.number_of_crawlers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, ConsentConfig, CrawlerConfig, OutputConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
