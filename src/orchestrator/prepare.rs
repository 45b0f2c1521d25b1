//! Input filtering
//!
//! Turns raw inputs into crawl units: normalize, drop what cannot be crawled, drop repeats,
//! and, unless overwriting, drop URLs whose result file already exists.

use crate::output::{OutputName, OutputNamer};
use crate::url::normalize_input;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// One URL scheduled for a visit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlUnit {
    pub url: Url,
    pub output: OutputName,
    /// Collector ids run on this unit
    pub collectors: Vec<String>,
}

/// Why an input was not dispatched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Invalid(String),
    Duplicate,
    AlreadyCrawled(PathBuf),
}

/// An input that was not dispatched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedInput {
    pub input: String,
    pub reason: SkipReason,
}

impl fmt::Display for SkippedInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            SkipReason::Invalid(error) => write!(f, "Invalid URL \"{}\": {}", self.input, error),
            SkipReason::Duplicate => write!(f, "Skipping \"{}\" because it is a duplicate.", self.input),
            SkipReason::AlreadyCrawled(_) => write!(
                f,
                "Skipping \"{}\" because output file already exists.",
                self.input
            ),
        }
    }
}

/// Result of filtering a run's inputs
#[derive(Debug, Clone, Default)]
pub struct Prepared {
    pub units: Vec<CrawlUnit>,
    pub skipped: Vec<SkippedInput>,
}

impl Prepared {
    /// Number of inputs considered
    pub fn input_count(&self) -> usize {
        self.units.len() + self.skipped.len()
    }
}

/// Filters raw inputs into crawl units, keeping input order
///
/// # Arguments
///
/// * `inputs` - Raw input strings
/// * `namer` - Output namer of the run
/// * `collectors` - Collector ids attached to every unit
/// * `force_overwrite` - Keep URLs whose result file already exists
pub fn prepare_units(
    inputs: &[String],
    namer: &OutputNamer,
    collectors: &[String],
    force_overwrite: bool,
) -> Prepared {
    let mut prepared = Prepared::default();
    let mut seen = HashSet::new();

    for input in inputs {
        let skip = |reason| SkippedInput {
            input: input.clone(),
            reason,
        };

        let url = match normalize_input(input) {
            Ok(url) => url,
            Err(e) => {
                prepared.skipped.push(skip(SkipReason::Invalid(e.to_string())));
                continue;
            }
        };

        if !seen.insert(url.as_str().to_string()) {
            prepared.skipped.push(skip(SkipReason::Duplicate));
            continue;
        }

        let output = namer.name_for(&url);
        if !force_overwrite && output.result_exists() {
            prepared
                .skipped
                .push(skip(SkipReason::AlreadyCrawled(output.result_path())));
            continue;
        }

        prepared.units.push(CrawlUnit {
            url,
            output,
            collectors: collectors.to_vec(),
        });
    }

    prepared
}
