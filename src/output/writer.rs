//! Result persistence
//!
//! Turns one successful visit into files under its [`OutputName`]: binary payloads are
//! written next to the result and replaced by textual pointers, links go to their own file,
//! and everything else lands in the `{stem}.json` envelope.

use crate::output::{write_atomic, OutputError, OutputName, OutputResult};
use crate::worker::collectors::{LINKS, SCREENSHOTS};
use crate::worker::{CollectedResult, Payload};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Pointer left in place of links when link scraping is off
pub const NO_LINKS_SENTINEL: &str = "No internal links were collected";

/// Per-URL result file layout
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResultEnvelope<'a> {
    initial_url: &'a str,
    final_url: &'a str,
    timeout: bool,
    /// Milliseconds since the Unix epoch
    test_started: i64,
    test_finished: i64,
    data: Map<String, Value>,
}

/// Writes successful visits to disk
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultWriter {
    scrape_links: bool,
}

impl ResultWriter {
    /// Creates a writer; with `scrape_links` the `links` payload goes to its own file
    pub fn new(scrape_links: bool) -> Self {
        Self { scrape_links }
    }

    /// Persists one visit
    ///
    /// # Arguments
    ///
    /// * `name` - Output location of the visited URL
    /// * `result` - The collected data; binary payloads are consumed
    ///
    /// # Returns
    ///
    /// Path of the written `{stem}.json`
    pub fn persist(&self, name: &OutputName, result: CollectedResult) -> OutputResult<PathBuf> {
        let CollectedResult {
            initial_url,
            final_url,
            timeout,
            started,
            finished,
            data: payloads,
        } = result;

        let mut data = Map::new();
        let mut links = None;
        for (key, payload) in payloads {
            if key == LINKS {
                links = Some(payload);
                continue;
            }
            let value = match payload {
                Payload::Binary(bytes) => Value::String(self.write_binary(name, &key, &bytes)?),
                other => other.into_json(),
            };
            data.insert(key, value);
        }

        let links_value = match links {
            Some(payload) if self.scrape_links => {
                let path = name.links_path();
                let json = serde_json::to_string_pretty(&payload.into_json())?;
                write_atomic(&path, json.as_bytes()).map_err(OutputError::write(&path))?;
                format!("Internal links were collected and saved to {}", path.display())
            }
            _ => NO_LINKS_SENTINEL.to_string(),
        };
        data.insert(LINKS.to_string(), Value::String(links_value));

        let envelope = ResultEnvelope {
            initial_url: initial_url.as_str(),
            final_url: final_url.as_str(),
            timeout,
            test_started: started.timestamp_millis(),
            test_finished: finished.timestamp_millis(),
            data,
        };

        let path = name.result_path();
        let json = serde_json::to_string_pretty(&envelope)?;
        write_atomic(&path, json.as_bytes()).map_err(OutputError::write(&path))?;
        tracing::debug!("Wrote result for {} to {}", initial_url, path.display());
        Ok(path)
    }

    fn write_binary(&self, name: &OutputName, key: &str, bytes: &[u8]) -> OutputResult<String> {
        if key == SCREENSHOTS {
            let path = name.screenshot_path();
            write_atomic(&path, bytes).map_err(OutputError::write(&path))?;
            Ok(format!("Screenshot saved to {}", path.display()))
        } else {
            let path = name.binary_path(key);
            write_atomic(&path, bytes).map_err(OutputError::write(&path))?;
            Ok(format!("Binary data saved to {}", path.display()))
        }
    }
}
