//! Run summary
//!
//! Written once per run as `metadata.json` in the output root: timing, a snapshot of the
//! effective configuration, the final tallies, and the fatal error if the run aborted.

use crate::consent::ConsentAction;
use crate::output::{write_atomic, OutputError, OutputResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the run summary inside the output root
pub const SUMMARY_FILE: &str = "metadata.json";

/// Record of one finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,

    // Configuration snapshot
    pub number_of_crawlers: u32,
    pub force_overwrite: bool,
    pub scrape_links: bool,
    pub emulate_mobile: bool,
    pub proxy_host: Option<String>,
    pub region_code: Option<String>,
    pub partition_by_domain: bool,
    pub consent_action: ConsentAction,
    pub data_collectors: Vec<String>,

    // Tallies
    /// Number of input URLs
    pub urls: u64,
    /// Units dispatched to the pool
    pub attempted: u64,
    pub successes: u64,
    pub failures: u64,
    /// Inputs never dispatched (invalid, duplicate, or already crawled)
    pub skipped: u64,

    /// Message of the error that aborted the run, if any
    pub fatal_error: Option<String>,
}

impl RunSummary {
    /// Path of the summary file under `root`
    pub fn path_in(root: &Path) -> PathBuf {
        root.join(SUMMARY_FILE)
    }

    /// Writes the summary to `{root}/metadata.json`, replacing any earlier one
    pub fn write(&self, root: &Path) -> OutputResult<PathBuf> {
        let path = Self::path_in(root);
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(&path, json.as_bytes()).map_err(OutputError::write(&path))?;
        Ok(path)
    }

    /// Reads the summary stored under `root`, if any
    pub fn read(root: &Path) -> OutputResult<Option<Self>> {
        let path = Self::path_in(root);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(OutputError::Read { path, source }),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Wall-clock duration of the run
    pub fn duration(&self) -> chrono::Duration {
        self.end_time - self.start_time
    }

    /// Share of dispatched units that succeeded, in percent
    pub fn success_percent(&self) -> f64 {
        percent(self.successes, self.attempted)
    }

    /// Share of dispatched units that failed, in percent
    pub fn failure_percent(&self) -> f64 {
        percent(self.failures, self.attempted)
    }

    /// Whether the tallies account for every input
    pub fn is_balanced(&self) -> bool {
        self.successes + self.failures + self.skipped == self.urls
    }
}

/// Whether `root` already holds the summary of an earlier run
pub fn summary_exists(root: &Path) -> bool {
    RunSummary::path_in(root).is_file()
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64) * 100.0
}
