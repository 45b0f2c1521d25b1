//! Integration tests for crawl-conductor
//!
//! These tests use wiremock to serve pages and drive whole runs through the orchestrator,
//! the worker pool and the HTTP visitor.

mod crawl_tests;
mod frontier_tests;

use crawl_conductor::config::Config;
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Configuration writing under `root`
pub fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.output.directory = root.to_path_buf();
    config.crawler.number_of_crawlers = 2;
    config.user_agent.crawler_name = "TestBot".to_string();
    config
}

/// Serves `html` at `route`
pub async fn mount_page(server: &MockServer, route: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html"))
        .mount(server)
        .await;
}
