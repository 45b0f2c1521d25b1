//! Output naming
//!
//! Every crawled URL maps to a stable file stem so repeated runs find earlier results and
//! overwrite protection can skip them.

use crate::url::registrable_domain;
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};
use url::Url;

/// Number of hex characters of the URL digest kept in a stem
const DIGEST_CHARS: usize = 4;

/// Where the files of one URL go
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputName {
    /// `{hostname}_{4 hex chars of SHA-1(url)}`
    pub stem: String,
    /// Directory holding every file of this URL
    pub directory: PathBuf,
}

impl OutputName {
    /// `{directory}/{stem}.json`
    pub fn result_path(&self) -> PathBuf {
        self.directory.join(format!("{}.json", self.stem))
    }

    /// `{directory}/{stem}.png`
    pub fn screenshot_path(&self) -> PathBuf {
        self.directory.join(format!("{}.png", self.stem))
    }

    /// `{directory}/links.{stem}.json`
    pub fn links_path(&self) -> PathBuf {
        self.directory.join(format!("links.{}.json", self.stem))
    }

    /// `{directory}/{key}.{stem}.bin`, for binary payloads other than screenshots
    pub fn binary_path(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{}.{}.bin", key, self.stem))
    }

    /// Whether a result file from an earlier run exists
    pub fn result_exists(&self) -> bool {
        self.result_path().is_file()
    }
}

/// Maps URLs to output locations
#[derive(Debug, Clone)]
pub struct OutputNamer {
    root: PathBuf,
    partition_by_domain: bool,
}

impl OutputNamer {
    /// Creates a namer
    ///
    /// # Arguments
    ///
    /// * `root` - The output root directory
    /// * `partition_by_domain` - Place each URL under `{root}/data.{registrable domain}`
    pub fn new(root: impl Into<PathBuf>, partition_by_domain: bool) -> Self {
        Self {
            root: root.into(),
            partition_by_domain,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_partitioned(&self) -> bool {
        self.partition_by_domain
    }

    /// Computes the stem and directory of a URL
    ///
    /// Deterministic and sensitive to the full URL: two URLs on one host differing only in
    /// path get different stems (up to the 16-bit digest, where the last write wins).
    pub fn name_for(&self, url: &Url) -> OutputName {
        let directory = if self.partition_by_domain {
            let domain = registrable_domain(url)
                .unwrap_or_else(|| url.host_str().unwrap_or_default().to_lowercase());
            self.root.join(format!("data.{}", domain))
        } else {
            self.root.clone()
        };

        OutputName {
            stem: stem_for(url),
            directory,
        }
    }
}

/// `{hostname}_{first 4 hex chars of SHA-1(url)}`
pub fn stem_for(url: &Url) -> String {
    let digest = hex::encode(Sha1::digest(url.as_str().as_bytes()));
    format!(
        "{}_{}",
        url.host_str().unwrap_or_default(),
        &digest[..DIGEST_CHARS]
    )
}
