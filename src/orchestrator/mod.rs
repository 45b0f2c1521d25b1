//! Orchestrator module
//!
//! Runs a crawl end to end: inputs are filtered into units, units are dispatched to the
//! worker pool, and each outcome is reconciled into result files, the frontier, and the
//! progress counters before the run summary is written.

mod coordinator;
mod inputs;
mod prepare;

pub use coordinator::Orchestrator;
pub use inputs::RunInputs;
pub use prepare::{prepare_units, CrawlUnit, Prepared, SkipReason, SkippedInput};
