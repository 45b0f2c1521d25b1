//! Frontier storage trait and error types

use crate::frontier::FrontierRecord;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during frontier operations
#[derive(Debug, Error)]
pub enum FrontierError {
    #[error("Frontier record for {domain} at {path} is corrupt: {reason}")]
    Corrupt {
        domain: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Frontier I/O error for {domain}: {source}")]
    Io {
        domain: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid frontier domain: {0:?}")]
    InvalidDomain(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for frontier operations
pub type FrontierResult<T> = Result<T, FrontierError>;

/// Trait for frontier storage backends
///
/// Calls for one domain are serialized; calls for different domains may run concurrently.
/// Implementations never repair or discard a record they cannot read.
pub trait FrontierStore: Send + Sync {
    /// Loads the record for a domain, creating it if absent
    ///
    /// # Arguments
    ///
    /// * `domain` - The registrable domain owning the record
    /// * `seed` - The single pending URL of a newly created record
    ///
    /// # Returns
    ///
    /// The stored record, or the freshly persisted seeded record
    fn load(&self, domain: &str, seed: &str) -> FrontierResult<FrontierRecord>;

    /// Empties the pending list and returns its URLs in order
    ///
    /// Already-visited URLs and repeats are dropped from the returned list. A domain with
    /// no record yields an empty list.
    fn drain_to_crawl(&self, domain: &str) -> FrontierResult<Vec<String>>;

    /// Records a terminal outcome for a URL
    ///
    /// Idempotent. Also removes the URL from the pending list. Creates the record if the
    /// domain has none.
    fn mark_visited(&self, domain: &str, url: &str) -> FrontierResult<()>;

    /// Appends URLs that are neither visited nor pending
    ///
    /// # Returns
    ///
    /// The number of URLs appended
    fn enqueue(&self, domain: &str, urls: &[String]) -> FrontierResult<usize>;

    /// Lists the domains that have a persisted record, sorted
    fn domains(&self) -> FrontierResult<Vec<String>>;
}
