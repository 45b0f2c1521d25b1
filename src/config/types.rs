use crate::consent::{ConsentAction, HandshakeTiming};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub consent: ConsentConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum number of page visits running at once
    pub number_of_crawlers: u32,

    /// Overwrite result files that already exist instead of skipping their URLs
    pub force_overwrite: bool,

    /// Save the links collector output to a separate file
    pub scrape_links: bool,

    /// Ask the visitor to emulate a mobile device
    pub emulate_mobile: bool,

    /// Optional proxy the visitor routes traffic through
    pub proxy_host: Option<String>,

    /// Two-letter region code, recorded in the run summary only
    pub region_code: Option<String>,

    /// Collector ids to run; empty means all registered collectors
    pub data_collectors: Vec<String>,

    /// Per-visit timeout (milliseconds)
    pub page_timeout_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            number_of_crawlers: 4,
            force_overwrite: false,
            scrape_links: false,
            emulate_mobile: false,
            proxy_host: None,
            region_code: None,
            data_collectors: Vec::new(),
            page_timeout_ms: 30_000,
        }
    }
}

impl CrawlerConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }
}

/// Consent handshake configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ConsentConfig {
    /// What the in-page detection engine does with a dialog it finds
    pub action: ConsentAction,

    /// Interval between bridge polls (milliseconds)
    pub poll_interval_ms: u64,

    /// Detection ceiling (milliseconds)
    pub max_wait_ms: u64,

    /// Extra wait after a detection (milliseconds)
    pub settle_ms: u64,
}

impl Default for ConsentConfig {
    fn default() -> Self {
        let timing = HandshakeTiming::default();
        Self {
            action: ConsentAction::default(),
            poll_interval_ms: timing.poll_interval.as_millis() as u64,
            max_wait_ms: timing.max_wait.as_millis() as u64,
            settle_ms: timing.settle.as_millis() as u64,
        }
    }
}

impl ConsentConfig {
    /// Converts the millisecond settings into handshake timing
    pub fn timing(&self) -> HandshakeTiming {
        HandshakeTiming {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_wait: Duration::from_millis(self.max_wait_ms),
            settle: Duration::from_millis(self.settle_ms),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "CrawlConductor".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Root directory for result files and the run summary
    pub directory: PathBuf,

    /// Store results under `data.{registrable domain}` subdirectories
    pub partition_by_domain: bool,

    /// Optional plain-text log file
    pub log_file: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            partition_by_domain: false,
            log_file: None,
        }
    }
}
