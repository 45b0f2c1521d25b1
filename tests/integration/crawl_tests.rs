//! Runs driven by plain URL inputs

use crate::{mount_page, test_config};
use crawl_conductor::logging::MemorySink;
use crawl_conductor::worker::{create_collectors_for, HttpVisitor, WorkerPool};
use crawl_conductor::{Orchestrator, RunInputs, RunSummary};
use std::sync::Arc;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http_pool(config: &crawl_conductor::Config, log: Arc<MemorySink>) -> WorkerPool {
    let visitor = HttpVisitor::new(&config.user_agent, None).expect("client builds");
    let collectors = create_collectors_for(&config.crawler.data_collectors, &visitor)
        .expect("known collectors");
    WorkerPool::new(Arc::new(visitor), config.crawler.number_of_crawlers as usize)
        .with_collectors(collectors)
        .with_log(log)
}

#[tokio::test]
async fn test_crawl_writes_result_files() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(
        &server,
        "/",
        &format!(
            r#"<html><head><title>Home</title></head><body>
            <a href="{base}/about">About</a>
            <a href="https://elsewhere.test/">Elsewhere</a>
            </body></html>"#
        ),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.crawler.scrape_links = true;
    let log = Arc::new(MemorySink::default());
    let pool = http_pool(&config, log.clone());
    let orchestrator = Orchestrator::new(config).with_log(log.clone());

    let summary = orchestrator
        .run(RunInputs::from_urls([base.as_str()]), &pool)
        .await
        .expect("run succeeds");

    assert_eq!(summary.successes, 1);
    assert_eq!(summary.failures, 0);
    // the HTTP visitor takes no screenshots, so that collector is left out
    assert_eq!(summary.data_collectors, vec!["links", "metadata"]);

    let url = Url::parse(&base).unwrap();
    let name = orchestrator.namer().name_for(&url);
    let result: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(name.result_path()).unwrap()).unwrap();

    assert_eq!(result["initialUrl"], format!("{}/", base));
    assert_eq!(result["timeout"], false);
    assert_eq!(result["data"]["metadata"]["title"], "Home");
    assert_eq!(result["data"]["metadata"]["status"], 200);
    assert!(result["data"].get("screenshots").is_none());
    assert!(result["data"]["links"]
        .as_str()
        .unwrap()
        .starts_with("Internal links were collected and saved to"));

    let links: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(name.links_path()).unwrap()).unwrap();
    assert_eq!(links["internal"][0], format!("{}/about", base));
    assert_eq!(links["external"][0], "https://elsewhere.test/");

    assert!(!log
        .lines()
        .iter()
        .any(|l| l.contains("failed to collect data")));
    assert!(log.lines().iter().any(|l| l == "Finished successfully."));
}

#[tokio::test]
async fn test_mixed_inputs_dispatch_once() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "<title>Home</title>").await;

    let address = server.address().to_string();
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let pool = http_pool(&config, Arc::default());
    let orchestrator = Orchestrator::new(config);

    let inputs = RunInputs::from_urls([
        address.clone(),
        "not a url".to_string(),
        format!("http://{}", address),
    ]);
    let summary = orchestrator.run(inputs, &pool).await.unwrap();

    assert_eq!(summary.urls, 3);
    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.successes + summary.failures + summary.skipped, 3);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_http_error_counts_as_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let log = Arc::new(MemorySink::default());
    let pool = http_pool(&config, log.clone());
    let orchestrator = Orchestrator::new(config).with_log(log.clone());

    let url = format!("{}/down", server.uri());
    let summary = orchestrator
        .run(RunInputs::from_urls([url.as_str()]), &pool)
        .await
        .unwrap();

    assert_eq!(summary.failures, 1);
    assert_eq!(summary.successes, 0);
    assert!(summary.fatal_error.is_none());

    let name = orchestrator.namer().name_for(&Url::parse(&url).unwrap());
    assert!(!name.result_exists());
    assert!(log
        .lines()
        .iter()
        .any(|l| l == &format!("Failed to visit {}: HTTP 503", url)));
}

#[tokio::test]
async fn test_existing_results_skipped_unless_forced() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "<title>Home</title>").await;
    let dir = TempDir::new().unwrap();
    let inputs = RunInputs::from_urls([server.uri()]);

    let config = test_config(dir.path());
    let pool = http_pool(&config, Arc::default());
    let first = Orchestrator::new(config.clone())
        .run(inputs.clone(), &pool)
        .await
        .unwrap();
    assert_eq!(first.successes, 1);

    let second = Orchestrator::new(config.clone())
        .run(inputs.clone(), &pool)
        .await
        .unwrap();
    assert_eq!(second.attempted, 0);
    assert_eq!(second.skipped, 1);

    let mut forced = config;
    forced.crawler.force_overwrite = true;
    let third = Orchestrator::new(forced).run(inputs, &pool).await.unwrap();
    assert_eq!(third.successes, 1);
    assert!(third.force_overwrite);

    assert_eq!(RunSummary::read(dir.path()).unwrap(), Some(third));
}

#[tokio::test]
async fn test_finished_root_refused_without_force() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "<title>Home</title>").await;
    let dir = TempDir::new().unwrap();

    let config = test_config(dir.path());
    let pool = http_pool(&config, Arc::default());
    let orchestrator = Orchestrator::new(config);
    orchestrator.check_output_root().unwrap();
    orchestrator
        .run(RunInputs::from_urls([server.uri()]), &pool)
        .await
        .unwrap();

    assert!(orchestrator.check_output_root().is_err());
}
