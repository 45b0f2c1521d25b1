//! Statistics of an existing output directory
//!
//! Reads back the run summary and any frontier records under an output root, for the
//! binary's `--stats` mode.

use crate::frontier::{FrontierStore, JsonFrontierStore};
use crate::output::RunSummary;
use crate::CrawlError;
use std::path::Path;

/// Frontier totals of one domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainTotals {
    pub domain: String,
    pub pending: usize,
    pub visited: usize,
}

/// Everything `--stats` reports about an output root
#[derive(Debug, Clone)]
pub struct RunStatistics {
    /// Summary of the last run, if one finished here
    pub summary: Option<RunSummary>,

    /// Per-domain frontier totals, sorted by domain
    pub domains: Vec<DomainTotals>,
}

impl RunStatistics {
    pub fn total_pending(&self) -> usize {
        self.domains.iter().map(|d| d.pending).sum()
    }

    pub fn total_visited(&self) -> usize {
        self.domains.iter().map(|d| d.visited).sum()
    }
}

/// Loads statistics from an output root
///
/// # Arguments
///
/// * `root` - The output directory of a previous run
///
/// # Returns
///
/// * `Ok(RunStatistics)` - Successfully loaded statistics
/// * `Err(CrawlError)` - A summary or frontier record could not be read
pub fn load_statistics(root: &Path) -> Result<RunStatistics, CrawlError> {
    let summary = RunSummary::read(root)?;

    let store = JsonFrontierStore::new(root);
    let mut domains = Vec::new();
    for domain in store.domains()? {
        if let Some(record) = store.read(&domain)? {
            domains.push(DomainTotals {
                domain,
                pending: record.to_crawl.len(),
                visited: record.visited.len(),
            });
        }
    }

    Ok(RunStatistics { summary, domains })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Crawl Statistics ===\n");

    match &stats.summary {
        Some(summary) => {
            println!("Last run:");
            println!("  Started:  {}", summary.start_time.to_rfc2822());
            println!("  Finished: {}", summary.end_time.to_rfc2822());
            println!("  Duration: {}s", summary.duration().num_seconds());
            println!("  Crawlers: {}", summary.number_of_crawlers);
            println!("  Collectors: {}", summary.data_collectors.join(", "));
            println!("  Consent action: {}", summary.consent_action);
            println!();

            println!("Inputs:");
            println!("  URLs given:  {}", summary.urls);
            println!("  Skipped:     {}", summary.skipped);
            println!("  Dispatched:  {}", summary.attempted);
            println!(
                "  Successful:  {} ({:.2}%)",
                summary.successes,
                summary.success_percent()
            );
            println!(
                "  Failed:      {} ({:.2}%)",
                summary.failures,
                summary.failure_percent()
            );
            println!();

            if let Some(error) = &summary.fatal_error {
                println!("Fatal error: {}", error);
                println!();
            }
        }
        None => {
            println!("No finished run found.");
            println!();
        }
    }

    if !stats.domains.is_empty() {
        println!("Frontier ({} domains):", stats.domains.len());
        for totals in &stats.domains {
            println!(
                "  {}: {} pending, {} visited",
                totals.domain, totals.pending, totals.visited
            );
        }
        println!(
            "  Total: {} pending, {} visited",
            stats.total_pending(),
            stats.total_visited()
        );
    }
}
