//! Worker module for page visits and data collection
//!
//! This module contains:
//! - The page visitor seam (`PageVisitor`) and the browser driver seam (`BrowserDriver`)
//! - A plain HTTP visitor (`HttpVisitor`)
//! - The collector contract and its built-in collectors
//! - The bounded worker pool that runs visits and reports one outcome per unit

pub mod collectors;
mod http;
mod parser;
mod pool;
mod types;
mod visitor;

pub use collectors::{
    collector_ids, create_collector, create_collectors, create_collectors_for, Collector,
    CollectorError,
};
pub use http::{build_http_client, user_agent_string, HttpVisitor};
pub use parser::{parse_html, ParsedPage};
pub use pool::{PoolRun, WorkerPool};
pub use types::{
    CollectedResult, PageSnapshot, Payload, PoolEvent, UnitOutcome, VisitError, VisitFailure,
    VisitOptions,
};
pub use visitor::{BrowserDriver, BrowserPage, BrowserVisitor, Navigation, PageVisitor};
