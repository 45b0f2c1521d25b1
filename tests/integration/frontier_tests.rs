//! Runs driven by a domain list through the frontier store

use crate::{mount_page, test_config};
use async_trait::async_trait;
use crawl_conductor::frontier::{FrontierRecord, FrontierStore, JsonFrontierStore};
use crawl_conductor::logging::MemorySink;
use crawl_conductor::worker::{
    HttpVisitor, PageSnapshot, PageVisitor, VisitError, VisitOptions, WorkerPool,
};
use crawl_conductor::{Orchestrator, RunInputs};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use url::Url;
use wiremock::MockServer;

const LOCAL: &str = "127.0.0.1";

/// Visitor whose driver is gone
struct DisconnectedVisitor;

#[async_trait]
impl PageVisitor for DisconnectedVisitor {
    async fn visit(&self, _url: &Url, _options: &VisitOptions) -> Result<PageSnapshot, VisitError> {
        Err(VisitError::Fatal("browser disconnected".to_string()))
    }
}

fn admin_file(root: &Path, domain: &str) -> std::path::PathBuf {
    root.join(format!("data.{}", domain))
        .join(format!("admin.{}.json", domain))
}

fn write_admin(root: &Path, domain: &str, json: &str) {
    let path = admin_file(root, domain);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, json).unwrap();
}

fn http_pool(concurrency: usize) -> WorkerPool {
    let config = crawl_conductor::Config::default();
    let visitor = HttpVisitor::new(&config.user_agent, None).unwrap();
    WorkerPool::new(Arc::new(visitor), concurrency)
}

#[tokio::test]
async fn test_resume_drains_pending_urls() {
    let server = MockServer::start().await;
    mount_page(&server, "/pending", "<title>Pending</title>").await;
    let pending = format!("{}/pending", server.uri());
    let done = format!("{}/done", server.uri());

    let dir = TempDir::new().unwrap();
    write_admin(
        dir.path(),
        LOCAL,
        &format!(
            r#"{{"tocrawl":["{}"],"visited":{{"{}":true}},"product":{{}}}}"#,
            pending, done
        ),
    );

    let store = Arc::new(JsonFrontierStore::new(dir.path()));
    let log = MemorySink::default();
    let inputs =
        RunInputs::from_frontier(store.as_ref(), &[server.address().to_string()], &log).unwrap();
    assert_eq!(inputs.urls, vec![pending.clone()]);

    // drained before any visit
    assert!(store.read(LOCAL).unwrap().unwrap().to_crawl.is_empty());

    let orchestrator = Orchestrator::new(test_config(dir.path())).with_frontier(store.clone());
    let summary = orchestrator.run(inputs, &http_pool(2)).await.unwrap();
    assert_eq!(summary.successes, 1);
    assert!(summary.partition_by_domain);

    let record = store.read(LOCAL).unwrap().unwrap();
    assert!(record.to_crawl.is_empty());
    assert!(record.is_visited(&pending));
    assert!(record.is_visited(&done));

    let name = orchestrator.namer().name_for(&Url::parse(&pending).unwrap());
    assert!(name.result_exists());
    assert_eq!(name.directory, dir.path().join(format!("data.{}", LOCAL)));
}

#[tokio::test]
async fn test_new_domain_is_seeded_and_visited() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "<title>Home</title>").await;

    let dir = TempDir::new().unwrap();
    let domains = dir.path().join("domains.txt");
    std::fs::write(&domains, format!("{}\n\n", server.address())).unwrap();

    let root = dir.path().join("domains.txt-crawl");
    let store = Arc::new(JsonFrontierStore::new(&root));
    let log = MemorySink::default();
    let inputs = RunInputs::from_domain_file(&domains, store.as_ref(), &log).unwrap();
    assert_eq!(inputs.urls, vec![server.address().to_string()]);

    let orchestrator = Orchestrator::new(test_config(&root)).with_frontier(store.clone());
    let summary = orchestrator.run(inputs, &http_pool(1)).await.unwrap();
    assert_eq!(summary.successes, 1);

    let record = store.read(LOCAL).unwrap().unwrap();
    assert!(record.to_crawl.is_empty());
    assert!(record.is_visited(&format!("{}/", server.uri())));
    assert!(root.join("metadata.json").is_file());
}

#[tokio::test]
async fn test_corrupt_record_skips_its_domain() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "<title>Home</title>").await;

    let dir = TempDir::new().unwrap();
    write_admin(dir.path(), "broken.test", "{not json");

    let store = JsonFrontierStore::new(dir.path());
    let log = MemorySink::default();
    let domains = vec!["broken.test".to_string(), server.address().to_string()];
    let inputs = RunInputs::from_frontier(&store, &domains, &log).unwrap();

    assert_eq!(inputs.urls, vec![server.address().to_string()]);
    assert!(log
        .lines()
        .iter()
        .any(|l| l.starts_with("Skipping domain broken.test")));
    assert_eq!(
        std::fs::read_to_string(admin_file(dir.path(), "broken.test")).unwrap(),
        "{not json"
    );
}

#[tokio::test]
async fn test_interrupted_run_resumes() {
    let server = MockServer::start().await;
    let pages = ["/a", "/b", "/c"];
    for page in pages {
        mount_page(&server, page, "<title>Page</title>").await;
    }
    let urls: Vec<String> = pages
        .iter()
        .map(|p| format!("{}{}", server.uri(), p))
        .collect();

    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFrontierStore::new(dir.path()));
    store.load(LOCAL, &urls[0]).unwrap();
    store.enqueue(LOCAL, &urls[1..]).unwrap();
    let domains = vec![LOCAL.to_string()];

    // first run: the visitor dies on the first unit
    let log = MemorySink::default();
    let inputs = RunInputs::from_frontier(store.as_ref(), &domains, &log).unwrap();
    assert_eq!(inputs.urls, urls);

    let pool = WorkerPool::new(Arc::new(DisconnectedVisitor), 1);
    let orchestrator = Orchestrator::new(test_config(dir.path())).with_frontier(store.clone());
    let summary = orchestrator.run(inputs, &pool).await.unwrap();

    assert_eq!(summary.fatal_error.as_deref(), Some("browser disconnected"));
    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.failures, 1);

    let record: FrontierRecord = store.read(LOCAL).unwrap().unwrap();
    assert!(record.is_visited(&urls[0]));
    assert_eq!(record.to_crawl, urls[1..].to_vec());

    // second run picks up the two returned URLs
    let inputs = RunInputs::from_frontier(store.as_ref(), &domains, &log).unwrap();
    assert_eq!(inputs.urls, urls[1..].to_vec());

    let orchestrator = Orchestrator::new(test_config(dir.path())).with_frontier(store.clone());
    let summary = orchestrator.run(inputs, &http_pool(2)).await.unwrap();
    assert_eq!(summary.successes, 2);
    assert!(summary.fatal_error.is_none());

    let record = store.read(LOCAL).unwrap().unwrap();
    assert!(record.to_crawl.is_empty());
    assert!(urls.iter().all(|u| record.is_visited(u)));
}
