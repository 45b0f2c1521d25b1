//! Frontier module
//!
//! Durable, per-domain crawl state. Each registrable domain owns one record holding the
//! ordered URLs still to crawl, the set of URLs already visited, and an opaque product map
//! carried through untouched. Records survive process restarts so an interrupted crawl
//! resumes where it stopped.
//!
//! # Components
//!
//! - `FrontierRecord`: the typed record and its in-memory transitions
//! - `FrontierStore`: the storage seam
//! - `JsonFrontierStore`: one JSON file per domain, written atomically

mod json;
mod record;
mod traits;

pub use json::JsonFrontierStore;
pub use record::FrontierRecord;
pub use traits::{FrontierError, FrontierResult, FrontierStore};
