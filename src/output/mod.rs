//! Output module
//!
//! This module handles:
//! - Naming the files of each crawled URL (`OutputNamer`)
//! - Persisting successful visits (`ResultWriter`)
//! - The per-run summary file (`RunSummary`)
//! - Reading an output root back for `--stats`

mod namer;
mod persist;
mod stats;
mod summary;
mod traits;
mod writer;

pub use namer::{stem_for, OutputName, OutputNamer};
pub use persist::{ensure_dir, write_atomic};
pub use stats::{load_statistics, print_statistics, DomainTotals, RunStatistics};
pub use summary::{summary_exists, RunSummary, SUMMARY_FILE};
pub use traits::{OutputError, OutputResult};
pub use writer::{ResultWriter, NO_LINKS_SENTINEL};
