//! JSON-file frontier store
//!
//! One file per domain at `{root}/data.{domain}/admin.{domain}.json`, replaced atomically on
//! every change.

use crate::frontier::{FrontierError, FrontierRecord, FrontierResult, FrontierStore};
use crate::output::write_atomic;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Frontier store keeping each domain's record in its own JSON file
#[derive(Debug)]
pub struct JsonFrontierStore {
    root: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl JsonFrontierStore {
    /// Creates a store rooted at `root`; nothing is touched on disk until first use
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a domain's record and its partitioned results
    pub fn domain_dir(&self, domain: &str) -> PathBuf {
        self.root.join(format!("data.{}", domain))
    }

    /// Path of a domain's record file
    pub fn record_path(&self, domain: &str) -> PathBuf {
        self.domain_dir(domain).join(format!("admin.{}.json", domain))
    }

    /// Reads a record without creating it
    pub fn read(&self, domain: &str) -> FrontierResult<Option<FrontierRecord>> {
        self.with_domain(domain, || self.read_unlocked(domain))
    }

    fn domain_lock(&self, domain: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(domain.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Runs `op` while holding the domain's mutex
    fn with_domain<T>(
        &self,
        domain: &str,
        op: impl FnOnce() -> FrontierResult<T>,
    ) -> FrontierResult<T> {
        check_domain(domain)?;
        let lock = self.domain_lock(domain);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        op()
    }

    fn read_unlocked(&self, domain: &str) -> FrontierResult<Option<FrontierRecord>> {
        let path = self.record_path(domain);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(FrontierError::Corrupt {
                    domain: domain.to_string(),
                    path,
                    reason: e.to_string(),
                })
            }
        };

        FrontierRecord::from_json(&content)
            .map(Some)
            .map_err(|e| FrontierError::Corrupt {
                domain: domain.to_string(),
                path,
                reason: e.to_string(),
            })
    }

    fn write_unlocked(&self, domain: &str, record: &FrontierRecord) -> FrontierResult<()> {
        let json = record
            .to_json()
            .map_err(|e| FrontierError::Serialization(e.to_string()))?;
        write_atomic(&self.record_path(domain), json.as_bytes()).map_err(|source| {
            FrontierError::Io {
                domain: domain.to_string(),
                source,
            }
        })
    }
}

impl FrontierStore for JsonFrontierStore {
    fn load(&self, domain: &str, seed: &str) -> FrontierResult<FrontierRecord> {
        self.with_domain(domain, || {
            if let Some(record) = self.read_unlocked(domain)? {
                return Ok(record);
            }

            let record = FrontierRecord::seeded(seed);
            self.write_unlocked(domain, &record)?;
            tracing::debug!("Created frontier record for {} seeded with {}", domain, seed);
            Ok(record)
        })
    }

    fn drain_to_crawl(&self, domain: &str) -> FrontierResult<Vec<String>> {
        self.with_domain(domain, || {
            let Some(mut record) = self.read_unlocked(domain)? else {
                return Ok(Vec::new());
            };
            if record.to_crawl.is_empty() {
                return Ok(Vec::new());
            }

            let drained = record.drain();
            self.write_unlocked(domain, &record)?;
            Ok(drained)
        })
    }

    fn mark_visited(&self, domain: &str, url: &str) -> FrontierResult<()> {
        self.with_domain(domain, || {
            let mut record = self.read_unlocked(domain)?.unwrap_or_default();
            if record.mark_visited(url) {
                self.write_unlocked(domain, &record)?;
            }
            Ok(())
        })
    }

    fn enqueue(&self, domain: &str, urls: &[String]) -> FrontierResult<usize> {
        self.with_domain(domain, || {
            let mut record = self.read_unlocked(domain)?.unwrap_or_default();
            let added = record.enqueue(urls);
            if added > 0 {
                self.write_unlocked(domain, &record)?;
            }
            Ok(added)
        })
    }

    fn domains(&self) -> FrontierResult<Vec<String>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(FrontierError::Io {
                    domain: String::new(),
                    source,
                })
            }
        };

        let mut domains: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let domain = name.strip_prefix("data.")?.to_string();
                self.record_path(&domain).is_file().then_some(domain)
            })
            .collect();
        domains.sort();
        Ok(domains)
    }
}

fn check_domain(domain: &str) -> FrontierResult<()> {
    let invalid = domain.is_empty()
        || domain.contains(['/', '\\'])
        || domain == "."
        || domain == ".."
        || domain.starts_with('.');
    if invalid {
        return Err(FrontierError::InvalidDomain(domain.to_string()));
    }
    Ok(())
}
