//! Plain HTTP page visitor
//!
//! Fetches pages with `reqwest` without running scripts. There is no page context to inspect,
//! so no consent handshake happens and no screenshot can be taken.

use crate::config::UserAgentConfig;
use crate::worker::{PageSnapshot, PageVisitor, VisitError, VisitOptions};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Proxy};
use std::time::Duration;
use url::Url;

/// Device string appended to the user agent when mobile emulation is requested
const MOBILE_DEVICE: &str = "Mobile; Android 13; Pixel 7";

/// Formats the crawler's user agent
///
/// Format: `CrawlerName/Version (+ContactURL)`, or `CrawlerName/Version` without a contact URL
pub fn user_agent_string(config: &UserAgentConfig, mobile: bool) -> String {
    let mut agent = format!("{}/{}", config.crawler_name, config.crawler_version);
    match (&config.contact_url, mobile) {
        (Some(contact), true) => agent.push_str(&format!(" (+{}; {})", contact, MOBILE_DEVICE)),
        (Some(contact), false) => agent.push_str(&format!(" (+{})", contact)),
        (None, true) => agent.push_str(&format!(" ({})", MOBILE_DEVICE)),
        (None, false) => {}
    }
    agent
}

/// Builds the HTTP client shared by every visit
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `proxy_host` - Optional proxy every request is routed through
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client, e.g. an unparsable proxy
pub fn build_http_client(
    config: &UserAgentConfig,
    proxy_host: Option<&str>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(user_agent_string(config, false))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy_host {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}

/// Visitor fetching pages over HTTP
#[derive(Debug, Clone)]
pub struct HttpVisitor {
    client: Client,
    mobile_agent: String,
}

impl HttpVisitor {
    pub fn new(config: &UserAgentConfig, proxy_host: Option<&str>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config, proxy_host)?,
            mobile_agent: user_agent_string(config, true),
        })
    }
}

#[async_trait]
impl PageVisitor for HttpVisitor {
    async fn visit(&self, url: &Url, options: &VisitOptions) -> Result<PageSnapshot, VisitError> {
        let mut request = self.client.get(url.clone()).timeout(options.page_timeout);
        if options.emulate_mobile {
            request = request.header(USER_AGENT, self.mobile_agent.as_str());
        }

        let response = request.send().await.map_err(classify_error)?;
        let status = response.status();
        let final_url = response.url().clone();

        if !status.is_success() {
            return Err(VisitError::Unit(format!("HTTP {}", status.as_u16())));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.text().await.map_err(classify_error)?;
        let is_html = content_type
            .as_deref()
            .map_or(true, |ct| ct.contains("html"));

        Ok(PageSnapshot {
            requested_url: Some(url.clone()),
            final_url: Some(final_url),
            status: Some(status.as_u16()),
            content_type,
            html: is_html.then_some(body),
            screenshot: None,
            timed_out: false,
            consent: None,
        })
    }

    fn captures_screenshots(&self) -> bool {
        false
    }

    fn runs_consent_handshake(&self) -> bool {
        false
    }
}

fn classify_error(e: reqwest::Error) -> VisitError {
    if e.is_timeout() {
        VisitError::Unit("Request timeout".to_string())
    } else if e.is_connect() {
        VisitError::Unit(format!("Connection failed: {}", e))
    } else if e.is_builder() {
        VisitError::Fatal(e.to_string())
    } else {
        VisitError::Unit(e.to_string())
    }
}
