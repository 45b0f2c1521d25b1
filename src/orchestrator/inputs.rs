//! Run inputs
//!
//! A run starts from raw input strings: a single URL, the lines of a URL list, or the
//! pending URLs drained from the frontier records of a domain list.

use crate::frontier::{FrontierError, FrontierStore};
use crate::logging::LogSink;
use crate::url::domain_of_line;
use crate::Result;
use std::path::Path;

/// Raw inputs of one run, in dispatch order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunInputs {
    pub urls: Vec<String>,
}

impl RunInputs {
    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
        }
    }

    /// Reads one input per line; blank lines are dropped
    pub fn from_list_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_urls(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        ))
    }

    /// Drains the pending URLs of every listed domain from the frontier
    ///
    /// Each domain's record is created on first use, seeded with the domain line itself.
    /// A corrupt record is reported and its domain skipped; the record is left untouched.
    ///
    /// # Arguments
    ///
    /// * `store` - The frontier store of this crawl
    /// * `domains` - Domain lines, e.g. `www.example.com`
    /// * `log` - Sink for the corrupt-record report
    pub fn from_frontier(
        store: &dyn FrontierStore,
        domains: &[String],
        log: &dyn LogSink,
    ) -> Result<Self> {
        let mut urls = Vec::new();

        for line in domains.iter().map(|d| d.trim()).filter(|d| !d.is_empty()) {
            let domain = domain_of_line(line);

            let drained = store
                .load(&domain, line)
                .and_then(|_| store.drain_to_crawl(&domain));
            match drained {
                Ok(pending) => {
                    tracing::debug!("Drained {} pending URLs for {}", pending.len(), domain);
                    urls.extend(pending);
                }
                Err(e @ FrontierError::Corrupt { .. }) => {
                    tracing::error!("{}", e);
                    log.line(&format!("Skipping domain {}: {}", domain, e));
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(Self { urls })
    }

    /// Reads a domain list file and drains its domains from the frontier
    pub fn from_domain_file(
        path: &Path,
        store: &dyn FrontierStore,
        log: &dyn LogSink,
    ) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let domains: Vec<String> = content.lines().map(str::to_string).collect();
        Self::from_frontier(store, &domains, log)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontier::JsonFrontierStore;
    use crate::logging::MemorySink;
    use tempfile::TempDir;

    #[test]
    fn test_from_list_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "example.com\n\n  https://a.test/x  \n").unwrap();

        let inputs = RunInputs::from_list_file(&path).unwrap();
        assert_eq!(inputs.urls, vec!["example.com", "https://a.test/x"]);
    }

    #[test]
    fn test_from_frontier_seeds_and_drains() {
        let dir = TempDir::new().unwrap();
        let store = JsonFrontierStore::new(dir.path());
        let log = MemorySink::default();

        let inputs = RunInputs::from_frontier(
            &store,
            &["www.shop.example.co.uk".to_string(), "".to_string()],
            &log,
        )
        .unwrap();

        assert_eq!(inputs.urls, vec!["www.shop.example.co.uk"]);
        let record = store.read("example.co.uk").unwrap().unwrap();
        assert!(record.to_crawl.is_empty());

        // a second session finds nothing left to crawl
        let again = RunInputs::from_frontier(&store, &["www.shop.example.co.uk".to_string()], &log)
            .unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn test_from_frontier_skips_corrupt_domain() {
        let dir = TempDir::new().unwrap();
        let store = JsonFrontierStore::new(dir.path());
        let bad = store.record_path("bad.test");
        std::fs::create_dir_all(bad.parent().unwrap()).unwrap();
        std::fs::write(&bad, "[[[").unwrap();
        let log = MemorySink::default();

        let inputs = RunInputs::from_frontier(
            &store,
            &["bad.test".to_string(), "good.test".to_string()],
            &log,
        )
        .unwrap();

        assert_eq!(inputs.urls, vec!["good.test"]);
        assert!(log.lines()[0].starts_with("Skipping domain bad.test"));
        assert_eq!(std::fs::read_to_string(&bad).unwrap(), "[[[");
    }
}
