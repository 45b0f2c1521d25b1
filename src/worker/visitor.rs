//! Page visitor seam
//!
//! The pool drives every visit through a [`PageVisitor`]. Browser automation lives behind
//! [`BrowserDriver`]; [`BrowserVisitor`] adapts any driver into a visitor and runs the
//! consent handshake on each page before capturing it.

use crate::consent::{run_handshake, PageContext};
use crate::logging::LogSink;
use crate::worker::{PageSnapshot, VisitError, VisitOptions};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Visits one URL and captures the page
#[async_trait]
pub trait PageVisitor: Send + Sync {
    /// Loads `url` and returns what was captured
    ///
    /// # Errors
    ///
    /// * `VisitError::Unit` - this URL failed; the pool moves on
    /// * `VisitError::Fatal` - the visitor cannot serve any further URL
    async fn visit(&self, url: &Url, options: &VisitOptions) -> Result<PageSnapshot, VisitError>;

    /// Whether snapshots can carry a screenshot
    fn captures_screenshots(&self) -> bool {
        true
    }

    /// Whether visits run the consent handshake
    fn runs_consent_handshake(&self) -> bool {
        true
    }
}

/// Response facts of a navigation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Navigation {
    pub status: Option<u16>,
    pub content_type: Option<String>,
    /// The load did not finish within the timeout; the page is captured as it stands
    pub timed_out: bool,
}

/// One open browser tab
#[async_trait]
pub trait BrowserPage: PageContext {
    async fn goto(&self, url: &Url, timeout: Duration) -> Result<Navigation, VisitError>;

    /// Serialized DOM of the page
    async fn content(&self) -> Result<String, VisitError>;

    /// PNG screenshot of the viewport
    async fn screenshot(&self) -> Result<Vec<u8>, VisitError>;

    async fn close(&self);
}

/// Opens browser tabs
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    type Page: BrowserPage + 'static;

    /// Opens a tab set up for `options` (device emulation, proxy)
    async fn open_page(&self, options: &VisitOptions) -> Result<Self::Page, VisitError>;
}

/// Visitor running each page through a browser driver and the consent handshake
pub struct BrowserVisitor<D> {
    driver: D,
    log: Arc<dyn LogSink>,
}

impl<D: BrowserDriver> BrowserVisitor<D> {
    pub fn new(driver: D, log: Arc<dyn LogSink>) -> Self {
        Self { driver, log }
    }

    async fn capture(
        &self,
        page: &D::Page,
        url: &Url,
        options: &VisitOptions,
    ) -> Result<PageSnapshot, VisitError> {
        let navigation = page.goto(url, options.page_timeout).await?;
        if navigation.timed_out {
            self.log.line(&format!("Page load timed out for {}", url));
        }

        let consent = run_handshake(
            page,
            options.consent_action,
            &options.handshake,
            self.log.as_ref(),
        )
        .await;

        let html = match page.content().await {
            Ok(html) => Some(html),
            Err(e) => {
                self.log.line(&format!("Failed to read content of {}: {}", url, e));
                None
            }
        };

        let screenshot = if options.capture_screenshot {
            match page.screenshot().await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    self.log.line(&format!("Failed to take screenshot of {}: {}", url, e));
                    None
                }
            }
        } else {
            None
        };

        let final_url = Url::parse(&page.url()).unwrap_or_else(|_| url.clone());

        Ok(PageSnapshot {
            requested_url: Some(url.clone()),
            final_url: Some(final_url),
            status: navigation.status,
            content_type: navigation.content_type,
            html,
            screenshot,
            timed_out: navigation.timed_out,
            consent: Some(consent),
        })
    }
}

#[async_trait]
impl<D: BrowserDriver> PageVisitor for BrowserVisitor<D> {
    async fn visit(&self, url: &Url, options: &VisitOptions) -> Result<PageSnapshot, VisitError> {
        let page = self.driver.open_page(options).await?;
        let result = self.capture(&page, url, options).await;
        page.close().await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::{ConsentError, HandshakeOutcome, HandshakeTiming};
    use crate::logging::MemorySink;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct FakeDriver {
        closed: Arc<AtomicUsize>,
        fail_navigation: bool,
    }

    struct FakePage {
        url: Mutex<String>,
        closed: Arc<AtomicUsize>,
        fail_navigation: bool,
        bridge: Mutex<Option<mpsc::UnboundedSender<String>>>,
    }

    #[async_trait]
    impl PageContext for FakePage {
        fn url(&self) -> String {
            self.url.lock().unwrap().clone()
        }

        async fn expose_bridge(
            &self,
            _name: &str,
        ) -> Result<mpsc::UnboundedReceiver<String>, ConsentError> {
            let (tx, rx) = mpsc::unbounded_channel();
            *self.bridge.lock().unwrap() = Some(tx);
            Ok(rx)
        }

        async fn evaluate(&self, _script: &str) -> Result<(), ConsentError> {
            if let Some(tx) = self.bridge.lock().unwrap().as_ref() {
                let _ = tx.send("OneTrust".to_string());
            }
            Ok(())
        }
    }

    #[async_trait]
    impl BrowserPage for FakePage {
        async fn goto(&self, url: &Url, _timeout: Duration) -> Result<Navigation, VisitError> {
            if self.fail_navigation {
                return Err(VisitError::Unit("net::ERR_NAME_NOT_RESOLVED".into()));
            }
            *self.url.lock().unwrap() = format!("{}welcome", url);
            Ok(Navigation {
                status: Some(200),
                content_type: Some("text/html".into()),
                timed_out: false,
            })
        }

        async fn content(&self) -> Result<String, VisitError> {
            Ok("<title>Welcome</title>".into())
        }

        async fn screenshot(&self) -> Result<Vec<u8>, VisitError> {
            Ok(vec![0x89, 0x50])
        }

        async fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl BrowserDriver for FakeDriver {
        type Page = FakePage;

        async fn open_page(&self, _options: &VisitOptions) -> Result<FakePage, VisitError> {
            Ok(FakePage {
                url: Mutex::new("about:blank".into()),
                closed: self.closed.clone(),
                fail_navigation: self.fail_navigation,
                bridge: Mutex::new(None),
            })
        }
    }

    fn options() -> VisitOptions {
        VisitOptions {
            capture_screenshot: true,
            handshake: HandshakeTiming {
                settle: Duration::from_millis(0),
                ..HandshakeTiming::default()
            },
            ..VisitOptions::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_visit_runs_handshake_and_captures() {
        let driver = FakeDriver::default();
        let closed = driver.closed.clone();
        let log = Arc::new(MemorySink::default());
        let visitor = BrowserVisitor::new(driver, log.clone());
        let url = Url::parse("https://example.com/").unwrap();

        let snapshot = visitor.visit(&url, &options()).await.unwrap();

        assert_eq!(
            snapshot.final_url.as_ref().map(Url::as_str),
            Some("https://example.com/welcome")
        );
        assert_eq!(snapshot.status, Some(200));
        assert_eq!(snapshot.screenshot, Some(vec![0x89, 0x50]));
        assert!(matches!(
            snapshot.consent,
            Some(HandshakeOutcome::Detected { ref mechanism, .. }) if mechanism == "OneTrust"
        ));
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert!(log.lines()[0].starts_with("CMP detected on https://example.com/welcome"));
    }

    #[tokio::test]
    async fn test_navigation_failure_closes_page() {
        let driver = FakeDriver {
            fail_navigation: true,
            ..FakeDriver::default()
        };
        let closed = driver.closed.clone();
        let visitor = BrowserVisitor::new(driver, Arc::new(MemorySink::default()));
        let url = Url::parse("https://nowhere.invalid/").unwrap();

        let err = visitor.visit(&url, &options()).await.unwrap_err();

        assert_eq!(err, VisitError::Unit("net::ERR_NAME_NOT_RESOLVED".into()));
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }
}
