//! Crawl-Conductor main entry point
//!
//! This is the command-line interface for the Crawl-Conductor crawl orchestrator.

use clap::{ArgGroup, Parser};
use crawl_conductor::config::{load_config_with_hash, validate, Config};
use crawl_conductor::consent::ConsentAction;
use crawl_conductor::frontier::JsonFrontierStore;
use crawl_conductor::logging::{FileSink, LogSink, Tee, TracingSink};
use crawl_conductor::url::domain_of_line;
use crawl_conductor::worker::collectors::SCREENSHOTS;
use crawl_conductor::worker::{create_collectors_for, HttpVisitor, VisitOptions, WorkerPool};
use crawl_conductor::{Orchestrator, RunInputs};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Crawl-Conductor: a resumable multi-site crawl orchestrator
///
/// Crawl-Conductor visits many target sites with a bounded pool of crawlers, runs data
/// collectors on every page, and writes one result file per site. Domain lists are crawled
/// through a durable per-domain frontier, so an interrupted crawl resumes where it stopped.
#[derive(Parser, Debug)]
#[command(name = "crawl-conductor")]
#[command(version)]
#[command(about = "A resumable multi-site crawl orchestrator", long_about = None)]
#[command(group(ArgGroup::new("input").args(["url", "input_list", "input_domains"])))]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Single URL to crawl
    #[arg(short, long)]
    url: Option<String>,

    /// File with one URL per line
    #[arg(short, long, value_name = "FILE")]
    input_list: Option<PathBuf>,

    /// File with one domain per line; crawls through a frontier in `{FILE}-crawl`
    #[arg(short = 'd', long, value_name = "FILE")]
    input_domains: Option<PathBuf>,

    /// Output directory (ignored with --input-domains)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Number of concurrent crawlers
    #[arg(long)]
    crawlers: Option<u32>,

    /// Overwrite existing results and reuse an output directory holding a finished run
    #[arg(short, long)]
    force_overwrite: bool,

    /// Comma separated collector ids, e.g. `links,metadata`
    #[arg(short = 'e', long, value_delimiter = ',')]
    data_collectors: Option<Vec<String>>,

    /// Save collected links to a separate file per site
    #[arg(long)]
    scrape_links: bool,

    /// Emulate a mobile device
    #[arg(short, long)]
    mobile: bool,

    /// Proxy every request through this host
    #[arg(long, value_name = "HOST")]
    proxy_config: Option<String>,

    /// Two-letter region code recorded in the run summary
    #[arg(long)]
    region_code: Option<String>,

    /// What to do with detected consent dialogs: NO_ACTION, ACCEPT_ALL or REJECT_ALL
    #[arg(long)]
    consent_action: Option<ConsentAction>,

    /// Plain-text log file (ignored with --input-domains)
    #[arg(short, long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show which URLs would be crawled without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show the summary and frontier totals of an existing output directory and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

impl Cli {
    /// Directory the frontier and results of a domain-list crawl live in
    fn crawl_dir(domains: &Path) -> PathBuf {
        let mut dir = domains.as_os_str().to_owned();
        dir.push("-crawl");
        PathBuf::from(dir)
    }

    /// Applies command-line overrides on top of the file configuration
    fn apply(&self, config: &mut Config) {
        let crawler = &mut config.crawler;
        if let Some(crawlers) = self.crawlers {
            crawler.number_of_crawlers = crawlers;
        }
        if let Some(ids) = &self.data_collectors {
            crawler.data_collectors = ids
                .iter()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect();
        }
        crawler.force_overwrite |= self.force_overwrite;
        crawler.scrape_links |= self.scrape_links;
        crawler.emulate_mobile |= self.mobile;
        if self.proxy_config.is_some() {
            crawler.proxy_host = self.proxy_config.clone();
        }
        if self.region_code.is_some() {
            crawler.region_code = self.region_code.clone();
        }
        if let Some(action) = self.consent_action {
            config.consent.action = action;
        }

        match &self.input_domains {
            Some(domains) => {
                let dir = Self::crawl_dir(domains);
                let name = domains
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "domains".to_string());
                config.output.log_file = Some(dir.join(format!("{}.log", name)));
                config.output.directory = dir;
                config.output.partition_by_domain = true;
            }
            None => {
                if let Some(output) = &self.output {
                    config.output.directory = output.clone();
                }
                if self.log_file.is_some() {
                    config.output.log_file = self.log_file.clone();
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((cfg, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    cfg
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => Config::default(),
    };
    cli.apply(&mut config);
    validate(&config)?;

    if cli.stats {
        return handle_stats(&config);
    }

    if cli.url.is_none() && cli.input_list.is_none() && cli.input_domains.is_none() {
        return Err("one of --url, --input-list or --input-domains is required".into());
    }

    if cli.dry_run {
        handle_dry_run(&cli, config)
    } else {
        handle_crawl(&cli, config, cli.verbose == 0 && !cli.quiet).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawl_conductor=info,warn"),
            1 => EnvFilter::new("crawl_conductor=debug,info"),
            2 => EnvFilter::new("crawl_conductor=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Resolves the run inputs for the selected input mode
fn resolve_inputs(
    cli: &Cli,
    frontier: Option<&JsonFrontierStore>,
    log: &dyn LogSink,
) -> crawl_conductor::Result<RunInputs> {
    match (&cli.url, &cli.input_list, &cli.input_domains, frontier) {
        (Some(url), _, _, _) => Ok(RunInputs::from_urls([url.as_str()])),
        (_, Some(list), _, _) => RunInputs::from_list_file(list),
        (_, _, Some(domains), Some(store)) => RunInputs::from_domain_file(domains, store, log),
        _ => Ok(RunInputs::default()),
    }
}

/// Handles the --stats mode: shows the summary and frontier totals of an output directory
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use crawl_conductor::output::{load_statistics, print_statistics};

    println!("Output: {}\n", config.output.directory.display());

    let stats = load_statistics(&config.output.directory)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --dry-run mode: shows which URLs would be dispatched
///
/// Frontier records are only read, never drained, so a dry run leaves a resumable crawl as it was.
fn handle_dry_run(cli: &Cli, mut config: Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Crawl-Conductor Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Crawlers: {}", config.crawler.number_of_crawlers);
    println!("  Force overwrite: {}", config.crawler.force_overwrite);
    println!("  Scrape links: {}", config.crawler.scrape_links);
    println!("  Mobile: {}", config.crawler.emulate_mobile);
    println!("  Consent action: {}", config.consent.action);
    println!("  Output: {}", config.output.directory.display());

    let visitor = HttpVisitor::new(&config.user_agent, config.crawler.proxy_host.as_deref())?;
    let collectors = create_collectors_for(&config.crawler.data_collectors, &visitor)?;
    let ids: Vec<String> = collectors.iter().map(|c| c.id().to_string()).collect();
    println!("  Collectors: {}", ids.join(", "));

    let inputs = match &cli.input_domains {
        Some(domains) => {
            let store = JsonFrontierStore::new(&config.output.directory);
            let content = std::fs::read_to_string(domains)?;
            let mut urls = Vec::new();
            for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
                match store.read(&domain_of_line(line))? {
                    Some(record) => urls.extend(
                        record
                            .to_crawl
                            .into_iter()
                            .filter(|u| !record.visited.contains(u)),
                    ),
                    None => urls.push(line.to_string()),
                }
            }
            RunInputs::from_urls(urls)
        }
        None => resolve_inputs(cli, None, &TracingSink)?,
    };

    // the crawl would partition a frontier run; name outputs the same way here
    config.output.partition_by_domain |= cli.input_domains.is_some();
    let orchestrator = Orchestrator::new(config);
    let prepared = orchestrator.prepare(&inputs, &ids);

    println!("\nWould crawl {} URLs:", prepared.units.len());
    for unit in &prepared.units {
        println!("  - {} -> {}", unit.url, unit.output.result_path().display());
    }
    println!("\nSkipped {} inputs", prepared.skipped.len());

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    cli: &Cli,
    config: Config,
    show_progress: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut sink = Tee::new().with(TracingSink);
    if let Some(path) = &config.output.log_file {
        let file = FileSink::create(path)?;
        tracing::info!("Writing run log to {}", file.path().display());
        sink = sink.with(file);
    }
    let log: Arc<dyn LogSink> = Arc::new(sink);

    let visitor = HttpVisitor::new(&config.user_agent, config.crawler.proxy_host.as_deref())?;
    let collectors = create_collectors_for(&config.crawler.data_collectors, &visitor)?;
    let options = VisitOptions {
        emulate_mobile: config.crawler.emulate_mobile,
        proxy_host: config.crawler.proxy_host.clone(),
        page_timeout: config.crawler.page_timeout(),
        consent_action: config.consent.action,
        handshake: config.consent.timing(),
        capture_screenshot: collectors.iter().any(|c| c.id() == SCREENSHOTS),
    };
    let pool = WorkerPool::new(
        Arc::new(visitor),
        config.crawler.number_of_crawlers as usize,
    )
    .with_collectors(collectors)
    .with_options(options)
    .with_log(log.clone());
    if let Some(warning) = pool.consent_warning() {
        tracing::warn!("{}", warning);
        log.line(&warning);
    }

    let mut orchestrator = Orchestrator::new(config)
        .with_log(log.clone())
        .with_progress(show_progress);

    let frontier = if cli.input_domains.is_some() {
        let store = Arc::new(JsonFrontierStore::new(&orchestrator.config().output.directory));
        orchestrator = orchestrator.with_frontier(store.clone());
        Some(store)
    } else {
        None
    };

    orchestrator.check_output_root().map_err(|e| {
        tracing::error!("{}. Use --force-overwrite to overwrite.", e);
        e
    })?;

    let inputs = resolve_inputs(cli, frontier.as_deref(), log.as_ref())?;
    tracing::info!("Resolved {} inputs", inputs.len());

    match orchestrator.run(inputs, &pool).await {
        Ok(summary) => match summary.fatal_error {
            None => {
                tracing::info!("Crawl completed successfully");
                Ok(())
            }
            Some(error) => {
                tracing::error!("Crawl stopped: {}", error);
                Err(error.into())
            }
        },
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
