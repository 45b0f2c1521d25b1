//! Run coordination
//!
//! The orchestrator owns one run from inputs to summary:
//! - Filtering inputs into crawl units
//! - Dispatching units to the worker pool
//! - Reconciling each outcome into result files, the frontier, and the progress counters
//! - Writing the run summary, even when the run aborts

use crate::config::Config;
use crate::frontier::FrontierStore;
use crate::logging::{LogSink, NullSink};
use crate::orchestrator::prepare::{prepare_units, CrawlUnit, Prepared};
use crate::orchestrator::RunInputs;
use crate::output::{ensure_dir, summary_exists, OutputError, OutputNamer, ResultWriter, RunSummary};
use crate::progress::{Aggregator, UnitOutcomeKind};
use crate::url::registrable_domain;
use crate::worker::{PoolEvent, UnitOutcome, WorkerPool};
use crate::{CrawlError, Result, UrlError};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Drives crawl runs
pub struct Orchestrator {
    config: Arc<Config>,
    namer: OutputNamer,
    writer: ResultWriter,
    frontier: Option<Arc<dyn FrontierStore>>,
    log: Arc<dyn LogSink>,
    show_progress: bool,
}

impl Orchestrator {
    /// Creates an orchestrator writing under `config.output.directory`
    ///
    /// Results are partitioned by domain when the config asks for it; attaching a frontier
    /// with [`Orchestrator::with_frontier`] always partitions.
    pub fn new(config: Config) -> Self {
        let namer = OutputNamer::new(
            config.output.directory.clone(),
            config.output.partition_by_domain,
        );
        let writer = ResultWriter::new(config.crawler.scrape_links);

        Self {
            config: Arc::new(config),
            namer,
            writer,
            frontier: None,
            log: Arc::new(NullSink),
            show_progress: false,
        }
    }

    /// Marks every terminal unit visited in `store`
    pub fn with_frontier(mut self, store: Arc<dyn FrontierStore>) -> Self {
        self.namer = OutputNamer::new(self.config.output.directory.clone(), true);
        self.frontier = Some(store);
        self
    }

    pub fn with_log(mut self, log: Arc<dyn LogSink>) -> Self {
        self.log = log;
        self
    }

    /// Writes a progress line to the log after each completed unit
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn namer(&self) -> &OutputNamer {
        &self.namer
    }

    /// Ensures the output root exists and does not hold a finished run
    ///
    /// A root that already holds a run summary is refused unless `force_overwrite` is set
    /// or a frontier is attached, since resumed crawls reuse their directory.
    pub fn check_output_root(&self) -> Result<()> {
        let root = self.namer.root();
        ensure_dir(root).map_err(OutputError::write(root))?;

        if summary_exists(root) && !self.config.crawler.force_overwrite && self.frontier.is_none()
        {
            return Err(OutputError::RunExists(root.to_path_buf()).into());
        }
        Ok(())
    }

    /// Filters inputs into crawl units
    ///
    /// Every skipped input is written to the log.
    pub fn prepare(&self, inputs: &RunInputs, collectors: &[String]) -> Prepared {
        let prepared = prepare_units(
            &inputs.urls,
            &self.namer,
            collectors,
            self.config.crawler.force_overwrite,
        );

        for skipped in &prepared.skipped {
            tracing::warn!("{}", skipped);
            self.log.line(&skipped.to_string());
        }

        prepared
    }

    /// Runs one crawl
    ///
    /// # Arguments
    ///
    /// * `inputs` - Raw inputs of the run
    /// * `pool` - The worker pool visiting the units
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - The run finished or stopped on a pool-wide fault; the summary
    ///   (with `fatal_error` set in the latter case) has been written
    /// * `Err(CrawlError)` - A result, frontier or summary write failed; the summary was
    ///   still attempted
    pub async fn run(&self, inputs: RunInputs, pool: &WorkerPool) -> Result<RunSummary> {
        let start_time = Utc::now();
        let collectors = pool.collector_ids();
        let prepared = self.prepare(&inputs, &collectors);
        let skipped = prepared.skipped.len() as u64;

        self.log
            .line(&format!("Start time: {}", start_time.to_rfc2822()));
        self.log.line(&format!(
            "Number of urls to crawl: {}",
            prepared.units.len()
        ));
        tracing::info!(
            "Starting run: {} inputs, {} units, {} skipped, {} crawlers",
            prepared.input_count(),
            prepared.units.len(),
            skipped,
            pool.concurrency()
        );

        let aggregator = Arc::new(Aggregator::new(prepared.units.len() as u64));
        let cancel = CancellationToken::new();

        let units = prepared.units;
        let index: HashMap<&str, usize> = units
            .iter()
            .enumerate()
            .map(|(i, unit)| (unit.url.as_str(), i))
            .collect();
        let urls = units.iter().map(|unit| unit.url.clone()).collect();

        let mut run = pool.dispatch(urls, cancel.clone());
        let mut fatal_error: Option<String> = None;
        let mut persist_error: Option<CrawlError> = None;
        let mut reported = HashSet::new();

        while let Some(event) = run.next_event().await {
            match event {
                PoolEvent::Outcome(outcome) => {
                    let Some(&i) = index.get(outcome.url.as_str()) else {
                        tracing::error!("Outcome for unknown unit {}", outcome.url);
                        continue;
                    };
                    let unit = &units[i];
                    reported.insert(i);
                    if let Err(e) = self.reconcile(unit, outcome, &aggregator) {
                        tracing::error!("Failed to record outcome of {}: {}", unit.url, e);
                        if persist_error.is_none() {
                            fatal_error = Some(e.to_string());
                            cancel.cancel();
                            persist_error = Some(e);
                        }
                    }
                }
                PoolEvent::Fatal(reason) => {
                    tracing::error!("Worker pool failure: {}", reason);
                    cancel.cancel();
                    fatal_error.get_or_insert(reason);
                }
            }
        }

        let attempted = run.finish().await as u64;

        if cancel.is_cancelled() {
            let pending = units
                .iter()
                .enumerate()
                .filter(|(i, _)| !reported.contains(i))
                .map(|(_, unit)| unit);
            match self.restore_undispatched(pending) {
                Ok(0) => {}
                Ok(restored) => self.log.line(&format!(
                    "Returned {} undispatched URLs to the frontier",
                    restored
                )),
                Err(e) => {
                    tracing::error!("Failed to return undispatched URLs: {}", e);
                    self.log
                        .line(&format!("Failed to return undispatched URLs: {}", e));
                    persist_error.get_or_insert(e);
                }
            }
        }

        let tally = aggregator.finalize();
        let summary = self.summarize(
            start_time,
            Utc::now(),
            &collectors,
            inputs.len() as u64,
            attempted,
            tally.success,
            tally.failure,
            skipped,
            fatal_error,
        );
        self.log_final_lines(&summary);

        let written = summary.write(self.namer.root());
        match (persist_error, written) {
            (Some(e), written) => {
                if let Err(write_error) = written {
                    tracing::error!("Failed to write run summary: {}", write_error);
                }
                Err(e)
            }
            (None, Err(e)) => Err(e.into()),
            (None, Ok(path)) => {
                tracing::info!("Run summary written to {}", path.display());
                Ok(summary)
            }
        }
    }

    /// Records one terminal outcome
    ///
    /// Success writes the result files; every outcome marks the URL visited (frontier mode)
    /// and ticks the progress counters exactly once. A unit whose result cannot be written
    /// counts as a failure and is still marked visited, so it never drops out of the frontier.
    fn reconcile(
        &self,
        unit: &CrawlUnit,
        outcome: UnitOutcome,
        aggregator: &Aggregator,
    ) -> Result<()> {
        let kind = match outcome.result {
            Ok(result) => {
                if let Err(e) = self.writer.persist(&unit.output, result) {
                    if let Err(mark_error) = self.mark_visited(unit) {
                        tracing::error!("Failed to mark {} visited: {}", unit.url, mark_error);
                    }
                    self.tick(aggregator, unit, UnitOutcomeKind::Failure);
                    return Err(e.into());
                }
                UnitOutcomeKind::Success
            }
            Err(failure) => {
                tracing::debug!("Unit {} failed: {}", unit.url, failure);
                UnitOutcomeKind::Failure
            }
        };

        let marked = self.mark_visited(unit);
        self.tick(aggregator, unit, kind);
        marked
    }

    fn mark_visited(&self, unit: &CrawlUnit) -> Result<()> {
        let Some(store) = &self.frontier else {
            return Ok(());
        };
        let domain = registrable_domain(&unit.url).ok_or(UrlError::MissingDomain)?;
        store.mark_visited(&domain, unit.url.as_str())?;
        Ok(())
    }

    /// Puts units that were never dispatched back into their frontier records
    fn restore_undispatched<'a>(&self, units: impl Iterator<Item = &'a CrawlUnit>) -> Result<usize> {
        let Some(store) = &self.frontier else {
            return Ok(0);
        };

        let mut by_domain: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for unit in units {
            let domain = registrable_domain(&unit.url).ok_or(UrlError::MissingDomain)?;
            by_domain
                .entry(domain)
                .or_default()
                .push(unit.url.as_str().to_string());
        }

        let mut restored = 0;
        for (domain, urls) in by_domain {
            restored += store.enqueue(&domain, &urls)?;
        }
        Ok(restored)
    }

    fn tick(&self, aggregator: &Aggregator, unit: &CrawlUnit, kind: UnitOutcomeKind) {
        let snapshot = aggregator.tick(unit.url.as_str(), kind);
        if self.show_progress {
            self.log.line(&snapshot.to_string());
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn summarize(
        &self,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        collectors: &[String],
        urls: u64,
        attempted: u64,
        successes: u64,
        failures: u64,
        skipped: u64,
        fatal_error: Option<String>,
    ) -> RunSummary {
        let crawler = &self.config.crawler;
        RunSummary {
            start_time,
            end_time,
            number_of_crawlers: crawler.number_of_crawlers,
            force_overwrite: crawler.force_overwrite,
            scrape_links: crawler.scrape_links,
            emulate_mobile: crawler.emulate_mobile,
            proxy_host: crawler.proxy_host.clone(),
            region_code: crawler.region_code.clone(),
            partition_by_domain: self.namer.is_partitioned(),
            consent_action: self.config.consent.action,
            data_collectors: collectors.to_vec(),
            urls,
            attempted,
            successes,
            failures,
            skipped,
            fatal_error,
        }
    }

    fn log_final_lines(&self, summary: &RunSummary) {
        match &summary.fatal_error {
            None => self.log.line("Finished successfully."),
            Some(error) => self.log.line(&format!("Fatal error: {}", error)),
        }
        self.log
            .line(&format!("Finish time: {}", summary.end_time.to_rfc2822()));
        self.log.line(&format!(
            "Successful crawls: {}/{} ({:.2}%)",
            summary.successes,
            summary.attempted,
            summary.success_percent()
        ));
        self.log.line(&format!(
            "Failed crawls: {}/{} ({:.2}%)",
            summary.failures,
            summary.attempted,
            summary.failure_percent()
        ));
    }
}
