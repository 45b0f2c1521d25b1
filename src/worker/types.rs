//! Data exchanged between the orchestrator, the pool, visitors and collectors

use crate::consent::{ConsentAction, HandshakeOutcome, HandshakeTiming};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// One collector's output
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Raw bytes, written to a side file by the result writer
    Binary(Vec<u8>),
    Json(Value),
    Text(String),
    /// The collector failed or had nothing to report
    Null,
}

impl Payload {
    /// JSON form of a non-binary payload; binary data becomes its byte count
    pub fn into_json(self) -> Value {
        match self {
            Self::Binary(bytes) => Value::from(format!("<{} bytes>", bytes.len())),
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
            Self::Null => Value::Null,
        }
    }
}

/// Everything a successful visit produced
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedResult {
    /// URL the unit was dispatched with
    pub initial_url: Url,
    /// URL after redirects
    pub final_url: Url,
    /// Whether the page load hit the visit timeout
    pub timeout: bool,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    /// Collector id to payload
    pub data: BTreeMap<String, Payload>,
}

/// What a visitor captured from one page, handed to every collector
#[derive(Debug, Clone, Default)]
pub struct PageSnapshot {
    pub requested_url: Option<Url>,
    pub final_url: Option<Url>,
    pub status: Option<u16>,
    pub content_type: Option<String>,
    pub html: Option<String>,
    pub screenshot: Option<Vec<u8>>,
    pub timed_out: bool,
    /// Result of the consent handshake, if the visitor ran one
    pub consent: Option<HandshakeOutcome>,
}

impl PageSnapshot {
    /// Snapshot of a page that loaded at `url` without redirects
    pub fn new(url: Url) -> Self {
        Self {
            requested_url: Some(url.clone()),
            final_url: Some(url),
            ..Self::default()
        }
    }
}

/// Per-visit settings passed to the visitor
#[derive(Debug, Clone)]
pub struct VisitOptions {
    pub emulate_mobile: bool,
    pub proxy_host: Option<String>,
    pub page_timeout: Duration,
    pub consent_action: ConsentAction,
    pub handshake: HandshakeTiming,
    /// Set when the screenshots collector is enabled
    pub capture_screenshot: bool,
}

impl Default for VisitOptions {
    fn default() -> Self {
        Self {
            emulate_mobile: false,
            proxy_host: None,
            page_timeout: Duration::from_secs(30),
            consent_action: ConsentAction::default(),
            handshake: HandshakeTiming::default(),
            capture_screenshot: false,
        }
    }
}

/// Errors a visitor can report
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VisitError {
    /// This URL could not be visited; the run continues
    #[error("{0}")]
    Unit(String),

    /// The visitor itself is broken; no further unit can succeed
    #[error("fatal visitor error: {0}")]
    Fatal(String),
}

/// Why a unit failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitFailure {
    pub reason: String,
}

impl std::fmt::Display for VisitFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Terminal outcome of one dispatched unit
#[derive(Debug, Clone)]
pub struct UnitOutcome {
    pub url: Url,
    pub result: Result<CollectedResult, VisitFailure>,
}

impl UnitOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Events a pool run delivers to its consumer
#[derive(Debug, Clone)]
pub enum PoolEvent {
    /// Exactly one per dispatched unit
    Outcome(UnitOutcome),
    /// The pool stopped dispatching because of a pool-wide fault
    Fatal(String),
}
